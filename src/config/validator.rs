//! Structural checks over model definitions. Cross-model references and rest operation names
//! are left to registration, so one broken model cannot take down the rest.

use crate::config::{resolved::ID_PATH, FieldTypeConfig, ListConfig};
use crate::error::ConfigError;
use std::collections::HashSet;

pub fn validate(configs: &[ListConfig]) -> Result<(), ConfigError> {
    let mut names = HashSet::new();
    let mut collections = HashSet::new();
    for list in configs {
        if !names.insert(list.name.as_str()) {
            return Err(ConfigError::Duplicate { kind: "model", name: list.name.clone() });
        }
        let collection = super::collection_name(list).to_lowercase();
        if !collections.insert(collection.clone()) {
            return Err(ConfigError::Duplicate { kind: "collection", name: collection });
        }
    }

    for list in configs {
        let mut paths = HashSet::new();
        let version_key = list.version_key.as_deref().unwrap_or(super::resolved::DEFAULT_VERSION_KEY);
        for f in &list.fields {
            if f.path.is_empty() {
                return Err(ConfigError::Validation(format!("{}: empty field path", list.name)));
            }
            if f.path == ID_PATH || f.path == version_key {
                return Err(ConfigError::Validation(format!(
                    "{}: '{}' is managed by the store and cannot be declared",
                    list.name, f.path
                )));
            }
            if !paths.insert(f.path.as_str()) {
                return Err(ConfigError::Duplicate {
                    kind: "field",
                    name: format!("{}.{}", list.name, f.path),
                });
            }
            match f.type_ {
                FieldTypeConfig::Reference | FieldTypeConfig::ReferenceArray if f.reference.is_none() => {
                    return Err(ConfigError::Validation(format!(
                        "{}.{}: reference field without 'ref'",
                        list.name, f.path
                    )));
                }
                FieldTypeConfig::Enum => {
                    if f.enum_values.is_empty() {
                        return Err(ConfigError::Validation(format!(
                            "{}.{}: enum field without values",
                            list.name, f.path
                        )));
                    }
                }
                _ => {}
            }
        }

        if let Some(key) = &list.autokey {
            for from in &key.from {
                if !paths.contains(from.as_str()) {
                    return Err(ConfigError::MissingReference {
                        kind: "autokey source field",
                        id: format!("{}.{}", list.name, from),
                    });
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn lists(v: serde_json::Value) -> Vec<ListConfig> {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn dangling_targets_and_operations_are_not_structural() {
        let configs = lists(json!([
            { "name": "Post", "fields": [{ "path": "author", "type": "reference", "ref": "User" }] },
            { "name": "Tag", "fields": [], "rest": { "enabled": true, "operations": "list purge" } }
        ]));
        assert!(validate(&configs).is_ok());

        let no_ref = lists(json!([{ "name": "Post", "fields": [{ "path": "author", "type": "reference" }] }]));
        assert!(matches!(validate(&no_ref), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn rejects_duplicate_fields_and_reserved_paths() {
        let dup = lists(json!([
            { "name": "Post", "fields": [{ "path": "title", "type": "string" }, { "path": "title", "type": "string" }] }
        ]));
        assert!(matches!(validate(&dup), Err(ConfigError::Duplicate { kind: "field", .. })));

        let reserved = lists(json!([{ "name": "Post", "fields": [{ "path": "_id", "type": "string" }] }]));
        assert!(matches!(validate(&reserved), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn accepts_cross_references() {
        let configs = lists(json!([
            { "name": "User", "fields": [{ "path": "posts", "type": "reference_array", "ref": "Post" }] },
            { "name": "Post", "fields": [{ "path": "author", "type": "reference", "ref": "User" }] }
        ]));
        assert!(validate(&configs).is_ok());
    }
}
