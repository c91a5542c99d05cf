//! Load model definitions from disk or memory and resolve them into a [`ModelCatalog`].

use crate::config::resolved::{
    AutoKey, FieldDefault, FieldDescriptor, FieldType, ModelCatalog, ModelDescriptor, Operation, RestOptions,
    DEFAULT_VERSION_KEY,
};
use crate::config::types::*;
use crate::config::validate;
use crate::error::ConfigError;
use std::path::Path;

/// Collection name for a definition: explicit, or lower-cased model name pluralized with `s`.
pub fn collection_name(list: &ListConfig) -> String {
    if let Some(c) = list.collection.as_deref().filter(|c| !c.is_empty()) {
        return c.to_string();
    }
    let lower = list.name.to_lowercase();
    if lower.ends_with('s') {
        lower
    } else {
        format!("{}s", lower)
    }
}

/// Build the catalog from definitions (validates first).
pub fn resolve(configs: &[ListConfig]) -> Result<ModelCatalog, ConfigError> {
    validate(configs)?;
    let mut models = Vec::with_capacity(configs.len());
    for list in configs {
        models.push(resolve_model(list)?);
    }
    Ok(ModelCatalog::new(models))
}

fn resolve_model(list: &ListConfig) -> Result<ModelDescriptor, ConfigError> {
    let mut fields = list
        .fields
        .iter()
        .map(|f| resolve_field(&list.name, f))
        .collect::<Result<Vec<_>, _>>()?;

    let auto_key = list.autokey.as_ref().map(|k| AutoKey {
        path: k.path.clone(),
        from: k.from.clone(),
    });
    // autokey paths need not be declared; they become plain string fields
    if let Some(key) = &auto_key {
        if !fields.iter().any(|f| f.path == key.path) {
            fields.push(FieldDescriptor {
                path: key.path.clone(),
                type_: FieldType::String,
                required: false,
                default: None,
                selected: true,
                editable: true,
            });
        }
    }

    let rest = list.rest.as_ref().map(resolve_rest);

    Ok(ModelDescriptor {
        name: list.name.clone(),
        collection: collection_name(list),
        fields,
        auto_key,
        version_key: list.version_key.clone().unwrap_or_else(|| DEFAULT_VERSION_KEY.into()),
        rest,
    })
}

fn resolve_field(model: &str, f: &FieldConfig) -> Result<FieldDescriptor, ConfigError> {
    let missing_ref = || ConfigError::Validation(format!("{}.{}: reference field without 'ref'", model, f.path));
    let type_ = match f.type_ {
        FieldTypeConfig::String => FieldType::String,
        FieldTypeConfig::Number => FieldType::Number,
        FieldTypeConfig::Boolean => FieldType::Boolean,
        FieldTypeConfig::Date => FieldType::Date,
        FieldTypeConfig::Object => FieldType::Object,
        FieldTypeConfig::Enum => FieldType::Enum(f.enum_values.clone()),
        FieldTypeConfig::Reference => FieldType::Reference(f.reference.clone().ok_or_else(missing_ref)?),
        FieldTypeConfig::ReferenceArray => FieldType::ReferenceArray(f.reference.clone().ok_or_else(missing_ref)?),
    };
    let default = match &f.default {
        None => None,
        Some(DefaultConfig::Literal(v)) => Some(FieldDefault::Literal(v.clone())),
        Some(DefaultConfig::Expression { expression }) => Some(match expression.to_lowercase().as_str() {
            "now" | "date.now" => FieldDefault::Now,
            "uuid" => FieldDefault::Uuid,
            other => {
                return Err(ConfigError::Validation(format!(
                    "{}.{}: unknown default expression '{}'",
                    model, f.path, other
                )))
            }
        }),
    };
    Ok(FieldDescriptor {
        path: f.path.clone(),
        type_,
        required: f.required,
        default,
        selected: f.selected != Some(false),
        editable: f.editable != Some(false),
    })
}

/// Unrecognized operation names are kept aside; registration of that model reports them.
fn resolve_rest(rest: &RestConfig) -> RestOptions {
    let mut operations = Vec::new();
    let mut unknown_operations = Vec::new();
    for name in rest.operations.names() {
        match name.parse::<Operation>() {
            Ok(op) if !operations.contains(&op) => operations.push(op),
            Ok(_) => {}
            Err(_) => unknown_operations.push(name.to_string()),
        }
    }
    operations.sort();
    RestOptions {
        enabled: rest.enabled,
        operations,
        unknown_operations,
        hooks: Default::default(),
        relationships: rest.relationships.clone(),
    }
}

/// Read a JSON array of model definitions from `path`.
pub async fn load_from_path(path: impl AsRef<Path>) -> Result<Vec<ListConfig>, ConfigError> {
    let path = path.as_ref();
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&raw).map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))
}

/// Read and resolve in one step.
pub async fn load_catalog(path: impl AsRef<Path>) -> Result<ModelCatalog, ConfigError> {
    let configs = load_from_path(path).await?;
    let catalog = resolve(&configs)?;
    tracing::info!(models = catalog.models().len(), "model definitions loaded");
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn configs() -> Vec<ListConfig> {
        serde_json::from_value(json!([
            {
                "name": "Post",
                "fields": [
                    { "path": "title", "type": "string", "required": true },
                    { "path": "secret", "type": "string", "selected": false },
                    { "path": "views", "type": "number", "editable": false, "default": 0 },
                    { "path": "publishedAt", "type": "date", "default": { "expression": "now" } },
                    { "path": "author", "type": "reference", "ref": "User" }
                ],
                "autokey": { "path": "slug", "from": ["title"] },
                "rest": { "enabled": true, "operations": "show list list", "relationships": [] }
            },
            { "name": "User", "collection": "people", "fields": [] }
        ]))
        .unwrap()
    }

    #[test]
    fn resolves_flags_defaults_and_collections() {
        let catalog = resolve(&configs()).unwrap();
        let post = catalog.get("Post").unwrap();
        assert_eq!(post.collection, "posts");
        assert_eq!(catalog.get("User").unwrap().collection, "people");
        assert!(!post.field("secret").unwrap().selected);
        assert!(!post.field("views").unwrap().editable);
        assert_eq!(post.field("publishedAt").unwrap().default, Some(FieldDefault::Now));
        assert_eq!(post.field("author").unwrap().reference(), Some("User"));
        assert_eq!(post.version_key, "__v");
    }

    #[test]
    fn autokey_path_becomes_a_field() {
        let catalog = resolve(&configs()).unwrap();
        let post = catalog.get("Post").unwrap();
        assert_eq!(post.find_by(), "slug");
        assert_eq!(post.fields.last().unwrap().path, "slug");
    }

    #[test]
    fn operations_are_deduplicated_in_canonical_order() {
        let catalog = resolve(&configs()).unwrap();
        let rest = catalog.get("Post").unwrap().rest.clone().unwrap();
        assert_eq!(rest.operations, vec![Operation::List, Operation::Show]);
        assert!(catalog.get("User").unwrap().rest.is_none());
    }

    #[test]
    fn unknown_operations_and_targets_still_resolve() {
        let configs: Vec<ListConfig> = serde_json::from_value(json!([
            {
                "name": "Post",
                "fields": [{ "path": "owner", "type": "reference", "ref": "Ghost" }],
                "rest": { "enabled": true, "operations": "list purge show" }
            }
        ]))
        .unwrap();
        let catalog = resolve(&configs).unwrap();
        let post = catalog.get("Post").unwrap();
        let rest = post.rest.as_ref().unwrap();
        assert_eq!(rest.operations, vec![Operation::List, Operation::Show]);
        assert_eq!(rest.unknown_operations, vec!["purge".to_string()]);
        assert_eq!(post.field("owner").unwrap().reference(), Some("Ghost"));
    }

    #[test]
    fn unknown_default_expression_is_rejected() {
        let configs: Vec<ListConfig> = serde_json::from_value(json!([
            { "name": "Post", "fields": [{ "path": "at", "type": "date", "default": { "expression": "tomorrow" } }] }
        ]))
        .unwrap();
        assert!(matches!(resolve(&configs), Err(ConfigError::Validation(_))));
    }

    #[tokio::test]
    async fn missing_file_is_a_load_error() {
        let err = load_from_path("/nonexistent/models.json").await.unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }
}
