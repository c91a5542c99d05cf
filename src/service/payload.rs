//! Body preparation for create and update: reference flattening, write protection, defaults, auto-keys.

use crate::config::{FieldDefault, FieldType, ModelDescriptor, ID_PATH};
use crate::error::RestError;
use crate::store::Document;
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::OnceLock;

pub fn body_to_document(value: Value) -> Result<Document, RestError> {
    match value {
        Value::Object(m) => Ok(m),
        _ => Err(RestError::BadRequest("body must be a JSON object".into())),
    }
}

fn reference_id(value: &Value) -> Value {
    match value {
        Value::Object(obj) => obj.get(ID_PATH).cloned().unwrap_or(Value::Null),
        other => other.clone(),
    }
}

/// Replace embedded related documents with their `_id`. Ids and empty values are left as-is.
pub fn flatten_relationships(model: &ModelDescriptor, body: &mut Document) {
    for field in model.relationship_fields() {
        let Some(value) = body.get_mut(&field.path) else { continue };
        let flat = match (&field.type_, &*value) {
            (FieldType::Reference(_), Value::Object(_)) => reference_id(value),
            (FieldType::ReferenceArray(_), Value::Array(items)) => Value::Array(items.iter().map(reference_id).collect()),
            _ => continue,
        };
        *value = flat;
    }
}

pub fn strip_uneditable(body: &mut Document, uneditable: &HashSet<String>) {
    body.retain(|k, _| !uneditable.contains(k));
}

/// Drop everything that is not a declared field (the id and version key included).
pub fn retain_declared(model: &ModelDescriptor, body: &mut Document) {
    body.retain(|k, _| model.field(k).is_some());
}

/// Fill missing fields that declare a default.
pub fn apply_defaults(model: &ModelDescriptor, doc: &mut Document) {
    for field in &model.fields {
        if doc.get(&field.path).map(|v| !v.is_null()).unwrap_or(false) {
            continue;
        }
        let Some(default) = &field.default else { continue };
        let value = match default {
            FieldDefault::Literal(v) => v.clone(),
            FieldDefault::Now => Value::String(chrono::Utc::now().to_rfc3339()),
            FieldDefault::Uuid => Value::String(uuid::Uuid::new_v4().to_string()),
        };
        doc.insert(field.path.clone(), value);
    }
}

fn slug_separator() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("static pattern"))
}

/// `"Hello, World!"` → `"hello-world"`.
pub fn slugify(s: &str) -> String {
    let lower = s.to_lowercase();
    slug_separator().replace_all(&lower, "-").trim_matches('-').to_string()
}

/// Slug candidate built from the auto-key source fields, if the body does not carry one already.
pub fn auto_key_base(model: &ModelDescriptor, doc: &Document) -> Option<String> {
    let key = model.auto_key.as_ref()?;
    let supplied = doc.get(&key.path).and_then(Value::as_str).map(str::trim).unwrap_or("");
    if !supplied.is_empty() {
        return None;
    }
    let parts: Vec<String> = key
        .from
        .iter()
        .filter_map(|f| match doc.get(f) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        })
        .collect();
    Some(slugify(&parts.join(" ")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve, ListConfig};
    use serde_json::json;
    use std::sync::Arc;

    fn post() -> Arc<ModelDescriptor> {
        let configs: Vec<ListConfig> = serde_json::from_value(json!([
            { "name": "User", "fields": [] },
            {
                "name": "Post",
                "fields": [
                    { "path": "title", "type": "string" },
                    { "path": "views", "type": "number", "default": 0, "editable": false },
                    { "path": "author", "type": "reference", "ref": "User" },
                    { "path": "readers", "type": "reference_array", "ref": "User" },
                    { "path": "token", "type": "string", "default": { "expression": "uuid" } }
                ],
                "autokey": { "path": "slug", "from": ["title"] }
            }
        ]))
        .unwrap();
        resolve(&configs).unwrap().get("Post").unwrap().clone()
    }

    fn doc(v: Value) -> Document {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn flattens_embedded_references() {
        let model = post();
        let mut body = doc(json!({
            "title": { "_id": "not-a-ref" },
            "author": { "_id": "u1", "name": "Ann" },
            "readers": [{ "_id": "u2" }, "u3", null, { "name": "no id" }]
        }));
        flatten_relationships(&model, &mut body);
        assert_eq!(body["author"], json!("u1"));
        assert_eq!(body["readers"], json!(["u2", "u3", null, null]));
        assert_eq!(body["title"], json!({ "_id": "not-a-ref" }));

        let mut already = doc(json!({ "author": "u9", "readers": [] }));
        flatten_relationships(&model, &mut already);
        assert_eq!(already, doc(json!({ "author": "u9", "readers": [] })));
    }

    #[test]
    fn strips_protected_and_unknown_paths() {
        let model = post();
        let mut body = doc(json!({ "title": "A", "views": 99, "_id": "x", "__v": 3, "extra": true }));
        strip_uneditable(&mut body, &crate::fields::uneditable_fields(&model));
        retain_declared(&model, &mut body);
        assert_eq!(body, doc(json!({ "title": "A" })));
    }

    #[test]
    fn defaults_fill_only_missing_values() {
        let model = post();
        let mut body = doc(json!({ "title": "A" }));
        apply_defaults(&model, &mut body);
        assert_eq!(body["views"], json!(0));
        assert!(uuid::Uuid::parse_str(body["token"].as_str().unwrap()).is_ok());

        let mut body = doc(json!({ "token": "mine" }));
        apply_defaults(&model, &mut body);
        assert_eq!(body["token"], json!("mine"));
    }

    #[test]
    fn slugs() {
        assert_eq!(slugify("  Hello, World!  "), "hello-world");
        assert_eq!(slugify("Ünïcode & more"), "n-code-more");
        let model = post();
        assert_eq!(auto_key_base(&model, &doc(json!({ "title": "My First Post" }))), Some("my-first-post".into()));
        assert_eq!(auto_key_base(&model, &doc(json!({ "title": "x", "slug": "given" }))), None);
    }
}
