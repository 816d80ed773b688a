//! Field-level diffing of `UserInfo` states.
use serde_json::Value;

use resume_state_types::{ArrayField, ScalarField, UserInfo};

use crate::change::{ChangeKind, HistoryChange, Section};

fn scalar_value(value: Option<&str>) -> Value {
    value.map_or(Value::Null, |s| Value::String(s.to_string()))
}

/// Computes the changes that turn `old` into `new`.
///
/// Scalars produce one change each when they differ. Each array field
/// produces at most one change: `Added`/`Removed` with the lengths when the
/// length changed, `Updated` with both full arrays otherwise. Extra
/// (unknown) fields are not compared.
pub fn diff_user_info(old: &UserInfo, new: &UserInfo) -> Vec<HistoryChange> {
    let mut changes = Vec::new();

    for field in ScalarField::ALL {
        let (before, after) = (old.scalar(field), new.scalar(field));
        if before != after {
            changes.push(HistoryChange {
                field: field.key().to_string(),
                label: field.label().to_string(),
                kind: ChangeKind::Modified,
                old_value: scalar_value(before),
                new_value: scalar_value(after),
                section: Section::Personal,
            });
        }
    }

    for field in ArrayField::ALL {
        let before = old.array_value(field);
        let after = new.array_value(field);
        if before == after {
            continue;
        }

        let section = Section::from(field);
        let (old_len, new_len) = (old.array_len(field), new.array_len(field));
        let change = if new_len > old_len {
            HistoryChange {
                field: field.key().to_string(),
                label: format!("Added {section}"),
                kind: ChangeKind::Added,
                old_value: Value::from(old_len),
                new_value: Value::from(new_len),
                section,
            }
        } else if new_len < old_len {
            HistoryChange {
                field: field.key().to_string(),
                label: format!("Removed {section}"),
                kind: ChangeKind::Removed,
                old_value: Value::from(old_len),
                new_value: Value::from(new_len),
                section,
            }
        } else {
            HistoryChange {
                field: field.key().to_string(),
                label: format!("Updated {section}"),
                kind: ChangeKind::Updated,
                old_value: before,
                new_value: after,
                section,
            }
        };
        changes.push(change);
    }

    changes
}

/// Builds the human-readable description of an entry: the label of a
/// single change, or a count.
pub fn describe(changes: &[HistoryChange]) -> String {
    match changes {
        [] => "No changes".to_string(),
        [single] => single.label.clone(),
        many => format!("Updated {} fields", many.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resume_state_types::{Education, Experience, Link};
    use serde_json::json;

    fn with_name(name: &str) -> UserInfo {
        UserInfo {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    fn experience(company: &str) -> Experience {
        Experience {
            company: Some(company.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_identical_states_produce_no_changes() {
        let info = with_name("Alice");
        assert!(diff_user_info(&info, &info.clone()).is_empty());
        assert!(diff_user_info(&UserInfo::default(), &UserInfo::default()).is_empty());
    }

    #[test]
    fn test_scalar_change() {
        let changes = diff_user_info(&with_name("Alice"), &with_name("Bob"));
        assert_eq!(changes.len(), 1);
        let change = &changes[0];
        assert_eq!(change.field, "name");
        assert_eq!(change.label, "Name");
        assert_eq!(change.kind, ChangeKind::Modified);
        assert_eq!(change.old_value, json!("Alice"));
        assert_eq!(change.new_value, json!("Bob"));
        assert_eq!(change.section, Section::Personal);
    }

    #[test]
    fn test_scalar_set_from_missing_uses_null() {
        let after = UserInfo {
            custom_url: Some("https://bob.dev".to_string()),
            ..Default::default()
        };
        let changes = diff_user_info(&UserInfo::default(), &after);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, "customUrl");
        assert_eq!(changes[0].old_value, Value::Null);
    }

    #[test]
    fn test_array_added_carries_lengths() {
        let before = UserInfo {
            experiences: vec![experience("Acme")],
            ..Default::default()
        };
        let mut after = before.clone();
        after.experiences.push(experience("Globex"));

        let changes = diff_user_info(&before, &after);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, ChangeKind::Added);
        assert_eq!(changes[0].label, "Added Experience");
        assert_eq!(changes[0].old_value, json!(1));
        assert_eq!(changes[0].new_value, json!(2));
        assert_eq!(changes[0].section, Section::Experience);
    }

    #[test]
    fn test_array_removed_carries_lengths() {
        let before = UserInfo {
            education: vec![Education::default(), Education::default()],
            ..Default::default()
        };
        let after = UserInfo {
            education: vec![Education::default()],
            ..Default::default()
        };
        let changes = diff_user_info(&before, &after);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, ChangeKind::Removed);
        assert_eq!(changes[0].label, "Removed Education");
        assert_eq!(changes[0].new_value, json!(1));
    }

    #[test]
    fn test_array_updated_carries_full_payload() {
        let before = UserInfo {
            links: vec![Link {
                label: None,
                url: "https://a.example".to_string(),
            }],
            ..Default::default()
        };
        let mut after = before.clone();
        after.links[0].url = "https://b.example".to_string();

        let changes = diff_user_info(&before, &after);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, ChangeKind::Updated);
        assert_eq!(changes[0].old_value, json!([{"url": "https://a.example"}]));
        assert_eq!(changes[0].new_value, json!([{"url": "https://b.example"}]));
    }

    #[test]
    fn test_reorder_is_an_update() {
        let before = UserInfo {
            experiences: vec![experience("A"), experience("B")],
            ..Default::default()
        };
        let mut after = before.clone();
        after.reorder(ArrayField::Experiences, 0, 1);

        let changes = diff_user_info(&before, &after);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, ChangeKind::Updated);
    }

    #[test]
    fn test_extra_fields_are_ignored() {
        let mut after = UserInfo::default();
        after.extra.insert("summary".to_string(), json!("hello"));
        assert!(diff_user_info(&UserInfo::default(), &after).is_empty());
    }

    #[test]
    fn test_describe() {
        let single = diff_user_info(&with_name("Alice"), &with_name("Bob"));
        assert_eq!(describe(&single), "Name");

        let mut after = with_name("Bob");
        after.phone = Some("1".to_string());
        let many = diff_user_info(&with_name("Alice"), &after);
        assert_eq!(describe(&many), "Updated 2 fields");

        let added = diff_user_info(
            &UserInfo::default(),
            &UserInfo {
                experiences: vec![experience("Acme")],
                ..Default::default()
            },
        );
        assert_eq!(describe(&added), "Added Experience");
    }
}
