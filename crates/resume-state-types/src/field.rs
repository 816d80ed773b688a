//! Names for the diffable fields of `UserInfo`.
use std::fmt;
use std::str::FromStr;

/// Scalar fields compared by plain inequality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarField {
    Name,
    Email,
    Phone,
    Address,
    CustomUrl,
}

impl ScalarField {
    /// All scalar fields, in diff order.
    pub const ALL: [ScalarField; 5] = [
        ScalarField::Name,
        ScalarField::Email,
        ScalarField::Phone,
        ScalarField::Address,
        ScalarField::CustomUrl,
    ];

    /// Serialized (camelCase) key.
    pub fn key(self) -> &'static str {
        match self {
            ScalarField::Name => "name",
            ScalarField::Email => "email",
            ScalarField::Phone => "phone",
            ScalarField::Address => "address",
            ScalarField::CustomUrl => "customUrl",
        }
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            ScalarField::Name => "Name",
            ScalarField::Email => "Email",
            ScalarField::Phone => "Phone",
            ScalarField::Address => "Address",
            ScalarField::CustomUrl => "Custom URL",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.key() == key)
    }
}

impl fmt::Display for ScalarField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ScalarField {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_key(s).ok_or_else(|| anyhow::anyhow!("unknown scalar field: {s}"))
    }
}

/// Ordered collections compared by serialized equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrayField {
    Experiences,
    Education,
    Skills,
    Certifications,
    Links,
}

impl ArrayField {
    /// All array fields, in diff order.
    pub const ALL: [ArrayField; 5] = [
        ArrayField::Experiences,
        ArrayField::Education,
        ArrayField::Skills,
        ArrayField::Certifications,
        ArrayField::Links,
    ];

    /// Serialized (camelCase) key.
    pub fn key(self) -> &'static str {
        match self {
            ArrayField::Experiences => "experiences",
            ArrayField::Education => "education",
            ArrayField::Skills => "skills",
            ArrayField::Certifications => "certifications",
            ArrayField::Links => "links",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.key() == key)
    }
}

impl fmt::Display for ArrayField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ArrayField {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_key(s).ok_or_else(|| anyhow::anyhow!("unknown array field: {s}"))
    }
}

/// Moves the element at `from` to `to`, shifting the elements in between.
///
/// Returns `false` without touching `items` if either index is out of range.
pub fn move_item<T>(items: &mut Vec<T>, from: usize, to: usize) -> bool {
    if from >= items.len() || to >= items.len() {
        return false;
    }
    if from != to {
        let item = items.remove(from);
        items.insert(to, item);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_item_forward_and_back() {
        let mut v = vec![1, 2, 3, 4];
        assert!(move_item(&mut v, 0, 3));
        assert_eq!(v, vec![2, 3, 4, 1]);
        assert!(move_item(&mut v, 3, 1));
        assert_eq!(v, vec![2, 1, 3, 4]);
    }

    #[test]
    fn test_move_item_same_index() {
        let mut v = vec!['a', 'b'];
        assert!(move_item(&mut v, 1, 1));
        assert_eq!(v, vec!['a', 'b']);
    }

    #[test]
    fn test_move_item_out_of_range() {
        let mut v = vec![1, 2];
        assert!(!move_item(&mut v, 2, 0));
        assert!(!move_item(&mut v, 0, 2));
        let mut empty: Vec<i32> = Vec::new();
        assert!(!move_item(&mut empty, 0, 0));
        assert_eq!(v, vec![1, 2]);
    }

    #[test]
    fn test_field_keys_parse_back() {
        for field in ScalarField::ALL {
            assert_eq!(field.key().parse::<ScalarField>().unwrap(), field);
        }
        for field in ArrayField::ALL {
            assert_eq!(field.key().parse::<ArrayField>().unwrap(), field);
        }
        assert!("nickname".parse::<ScalarField>().is_err());
        assert!("hobbies".parse::<ArrayField>().is_err());
    }
}
