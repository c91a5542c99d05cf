//! Request query parameters → store query: criteria, projection, pagination, sort, population.

use crate::config::{FieldType, ModelDescriptor, ID_PATH};
use crate::store::{Document, Filter, FindQuery};
use serde_json::Value;
use std::collections::HashMap;

/// Parameters with a meaning of their own; everything else is an equality filter. `_` is a cache-buster.
pub const RESERVED_PARAMS: [&str; 6] = ["populate", "_", "limit", "skip", "sort", "select"];

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RequestQuery {
    /// Equality criteria, ordered by parameter name.
    pub criteria: Vec<(String, String)>,
    pub select: Option<Vec<String>>,
    pub populate: Vec<String>,
    pub limit: Option<String>,
    pub skip: Option<String>,
    pub sort: Option<String>,
}

/// Split a comma-separated parameter, dropping blanks.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

impl RequestQuery {
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let mut criteria: Vec<(String, String)> = params
            .iter()
            .filter(|(k, _)| !RESERVED_PARAMS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        criteria.sort();
        RequestQuery {
            criteria,
            select: params.get("select").map(|s| split_list(s)),
            populate: params.get("populate").map(|s| split_list(s)).unwrap_or_default(),
            limit: params.get("limit").cloned(),
            skip: params.get("skip").cloned(),
            sort: params.get("sort").cloned().filter(|s| !s.trim().is_empty()),
        }
    }

    /// Requested fields restricted to `allowed`; the full `allowed` list when nothing usable was requested.
    pub fn projection(&self, allowed: &[String]) -> Vec<String> {
        let requested: Vec<String> = match &self.select {
            Some(fields) => fields.iter().filter(|f| allowed.contains(f)).cloned().collect(),
            None => Vec::new(),
        };
        if requested.is_empty() {
            allowed.to_vec()
        } else {
            requested
        }
    }

    pub fn filter(&self, model: &ModelDescriptor) -> Filter {
        Filter {
            equals: self
                .criteria
                .iter()
                .map(|(k, v)| (k.clone(), filter_value(model, k, v)))
                .collect(),
            id_in: None,
        }
    }

    /// Store query for this request, optionally scoped to an id set.
    pub fn find_query(&self, model: &ModelDescriptor, id_in: Option<Vec<String>>) -> FindQuery {
        let mut filter = self.filter(model);
        filter.id_in = id_in;
        FindQuery {
            filter,
            sort: self.sort.clone(),
            skip: self.skip.clone(),
            limit: self.limit.clone(),
        }
    }
}

/// Coerce a query-string value to the JSON type of the field it filters.
pub fn filter_value(model: &ModelDescriptor, path: &str, raw: &str) -> Value {
    if path == ID_PATH {
        return Value::String(raw.to_string());
    }
    match model.field(path).map(|f| &f.type_) {
        Some(FieldType::Number) => {
            if let Ok(n) = raw.parse::<i64>() {
                return Value::Number(n.into());
            }
            if let Some(n) = raw.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
                return Value::Number(n);
            }
        }
        Some(FieldType::Boolean) => {
            if raw.eq_ignore_ascii_case("true") {
                return Value::Bool(true);
            }
            if raw.eq_ignore_ascii_case("false") {
                return Value::Bool(false);
            }
        }
        _ => {}
    }
    Value::String(raw.to_string())
}

/// Keep `_id`, the version key, and the listed fields.
pub fn project(doc: &Document, fields: &[String], version_key: &str) -> Document {
    let mut out = Document::new();
    for key in [ID_PATH, version_key] {
        if let Some(v) = doc.get(key) {
            out.insert(key.to_string(), v.clone());
        }
    }
    for f in fields {
        if let Some(v) = doc.get(f) {
            out.insert(f.clone(), v.clone());
        }
    }
    out
}
