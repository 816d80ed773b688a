//! Personal information and the resume record collections.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::field::{move_item, ArrayField, ScalarField};

/// One work experience entry.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Experience {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Education {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub institution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degree: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_of_study: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Skill {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Certification {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Link {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub url: String,
}

/// The personal-information slice of the application state.
///
/// Unknown keys are kept in `extra` so data written by newer front-ends
/// survives a round trip. An empty value serializes as `{}`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_url: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub experiences: Vec<Experience>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub education: Vec<Education>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skills: Vec<Skill>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub certifications: Vec<Certification>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserInfo {
    /// Returns true when no field, known or extra, carries a value.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Reads a scalar field.
    pub fn scalar(&self, field: ScalarField) -> Option<&str> {
        match field {
            ScalarField::Name => self.name.as_deref(),
            ScalarField::Email => self.email.as_deref(),
            ScalarField::Phone => self.phone.as_deref(),
            ScalarField::Address => self.address.as_deref(),
            ScalarField::CustomUrl => self.custom_url.as_deref(),
        }
    }

    /// Overwrites a scalar field. `None` clears it.
    pub fn set_scalar(&mut self, field: ScalarField, value: Option<String>) {
        let slot = match field {
            ScalarField::Name => &mut self.name,
            ScalarField::Email => &mut self.email,
            ScalarField::Phone => &mut self.phone,
            ScalarField::Address => &mut self.address,
            ScalarField::CustomUrl => &mut self.custom_url,
        };
        *slot = value;
    }

    /// Number of elements in an array field.
    pub fn array_len(&self, field: ArrayField) -> usize {
        match field {
            ArrayField::Experiences => self.experiences.len(),
            ArrayField::Education => self.education.len(),
            ArrayField::Skills => self.skills.len(),
            ArrayField::Certifications => self.certifications.len(),
            ArrayField::Links => self.links.len(),
        }
    }

    /// Serializes an array field to JSON.
    pub fn array_value(&self, field: ArrayField) -> Value {
        let value = match field {
            ArrayField::Experiences => serde_json::to_value(&self.experiences),
            ArrayField::Education => serde_json::to_value(&self.education),
            ArrayField::Skills => serde_json::to_value(&self.skills),
            ArrayField::Certifications => serde_json::to_value(&self.certifications),
            ArrayField::Links => serde_json::to_value(&self.links),
        };
        // Plain structs with string keys always serialize
        value.unwrap_or(Value::Array(Vec::new()))
    }

    /// Replaces an array field from its JSON form.
    ///
    /// # Errors
    ///
    /// Returns an error if `value` does not match the field's record shape.
    pub fn set_array_value(&mut self, field: ArrayField, value: Value) -> anyhow::Result<()> {
        match field {
            ArrayField::Experiences => self.experiences = serde_json::from_value(value)?,
            ArrayField::Education => self.education = serde_json::from_value(value)?,
            ArrayField::Skills => self.skills = serde_json::from_value(value)?,
            ArrayField::Certifications => self.certifications = serde_json::from_value(value)?,
            ArrayField::Links => self.links = serde_json::from_value(value)?,
        }
        Ok(())
    }

    /// Moves one element of an array field from `from` to `to`.
    ///
    /// Returns `false` and leaves the field untouched if either index is
    /// out of range.
    pub fn reorder(&mut self, field: ArrayField, from: usize, to: usize) -> bool {
        match field {
            ArrayField::Experiences => move_item(&mut self.experiences, from, to),
            ArrayField::Education => move_item(&mut self.education, from, to),
            ArrayField::Skills => move_item(&mut self.skills, from, to),
            ArrayField::Certifications => move_item(&mut self.certifications, from, to),
            ArrayField::Links => move_item(&mut self.links, from, to),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn skill(name: &str) -> Skill {
        Skill {
            name: name.to_string(),
            level: None,
        }
    }

    #[test]
    fn test_empty_user_info_serializes_as_empty_object() {
        let value = serde_json::to_value(UserInfo::default()).unwrap();
        assert_eq!(value, json!({}));
        assert!(UserInfo::default().is_empty());
    }

    #[test]
    fn test_camel_case_keys() {
        let info = UserInfo {
            custom_url: Some("https://alice.dev".to_string()),
            ..Default::default()
        };
        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(value, json!({"customUrl": "https://alice.dev"}));
    }

    #[test]
    fn test_extra_fields_survive_round_trip() {
        let raw = json!({
            "name": "Alice",
            "summary": "Systems engineer",
            "pronouns": null,
            "skills": [{"name": "Rust", "level": "expert"}]
        });
        let info: UserInfo = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(info.name.as_deref(), Some("Alice"));
        assert_eq!(info.skills.len(), 1);
        assert_eq!(info.extra["summary"], "Systems engineer");
        assert!(!info.is_empty());

        let back = serde_json::to_value(&info).unwrap();
        assert_eq!(back, raw);
    }

    #[test]
    fn test_scalar_accessors() {
        let mut info = UserInfo::default();
        info.set_scalar(ScalarField::Phone, Some("555-0100".to_string()));
        assert_eq!(info.scalar(ScalarField::Phone), Some("555-0100"));
        info.set_scalar(ScalarField::Phone, None);
        assert_eq!(info.scalar(ScalarField::Phone), None);
    }

    #[test]
    fn test_array_value_round_trip_through_setter() {
        let mut info = UserInfo {
            skills: vec![skill("Rust"), skill("SQL")],
            ..Default::default()
        };
        let value = info.array_value(ArrayField::Skills);
        assert_eq!(value, json!([{"name": "Rust"}, {"name": "SQL"}]));

        info.set_array_value(ArrayField::Skills, json!([{"name": "Go"}]))
            .unwrap();
        assert_eq!(info.skills, vec![skill("Go")]);
        assert_eq!(info.array_len(ArrayField::Skills), 1);
    }

    #[test]
    fn test_set_array_value_rejects_wrong_shape() {
        let mut info = UserInfo::default();
        assert!(info
            .set_array_value(ArrayField::Links, json!("not an array"))
            .is_err());
        assert!(info.links.is_empty());
    }

    #[test]
    fn test_reorder_moves_element() {
        let mut info = UserInfo {
            skills: vec![skill("a"), skill("b"), skill("c")],
            ..Default::default()
        };
        assert!(info.reorder(ArrayField::Skills, 0, 2));
        let names: Vec<&str> = info.skills.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_reorder_out_of_range_is_noop() {
        let mut info = UserInfo {
            skills: vec![skill("a")],
            ..Default::default()
        };
        assert!(!info.reorder(ArrayField::Skills, 0, 3));
        assert!(!info.reorder(ArrayField::Experiences, 0, 0));
        assert_eq!(info.skills, vec![skill("a")]);
    }
}
