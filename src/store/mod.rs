//! Persistence seam. Generated handlers only talk to a [`DocumentStore`].

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::{ensure_database_exists, PgDocumentStore};

use crate::error::StoreError;
use async_trait::async_trait;
use serde_json::{Map, Value};

pub type Document = Map<String, Value>;

/// Equality criteria plus an optional id set (`_id IN (...)`).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Filter {
    pub equals: Vec<(String, Value)>,
    pub id_in: Option<Vec<String>>,
}

impl Filter {
    pub fn eq(path: impl Into<String>, value: Value) -> Self {
        Filter {
            equals: vec![(path.into(), value)],
            id_in: None,
        }
    }

    /// Document matches when every criterion holds.
    pub fn matches(&self, doc: &Document) -> bool {
        if let Some(ids) = &self.id_in {
            let Some(id) = doc.get(crate::config::ID_PATH).and_then(Value::as_str) else {
                return false;
            };
            if !ids.iter().any(|i| i == id) {
                return false;
            }
        }
        self.equals.iter().all(|(path, expected)| match doc.get(path) {
            Some(Value::Array(items)) if !expected.is_array() => items.contains(expected),
            Some(actual) => actual == expected,
            None => expected.is_null(),
        })
    }
}

/// `find` arguments. Pagination and sort are raw client strings; each store parses them.
#[derive(Clone, Debug, Default)]
pub struct FindQuery {
    pub filter: Filter,
    pub sort: Option<String>,
    pub skip: Option<String>,
    pub limit: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortKey {
    pub path: String,
    pub descending: bool,
}

/// Parse `"title -createdAt"` / `"title,-createdAt"`; a leading `-` sorts descending.
pub fn parse_sort(raw: &str) -> Result<Vec<SortKey>, StoreError> {
    let mut keys = Vec::new();
    for part in raw.split(|c: char| c == ',' || c.is_whitespace()).filter(|p| !p.is_empty()) {
        let (path, descending) = match part.strip_prefix('-') {
            Some(rest) => (rest, true),
            None => (part.strip_prefix('+').unwrap_or(part), false),
        };
        if path.is_empty() || path.starts_with('-') {
            return Err(StoreError::InvalidQuery(format!("bad sort key '{}'", part)));
        }
        keys.push(SortKey {
            path: path.to_string(),
            descending,
        });
    }
    Ok(keys)
}

/// Parse a non-negative `skip`/`limit` value. Empty means unset.
pub fn parse_count(name: &str, raw: Option<&str>) -> Result<Option<u64>, StoreError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => s
            .parse::<u64>()
            .map(Some)
            .map_err(|_| StoreError::InvalidQuery(format!("{} must be a non-negative integer, got '{}'", name, s))),
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Number of documents in `collection` matching `filter`.
    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError>;

    /// Documents matching the query, in natural (insertion) order unless sorted.
    async fn find(&self, collection: &str, query: &FindQuery) -> Result<Vec<Document>, StoreError>;

    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Document>, StoreError> {
        let query = FindQuery {
            filter: filter.clone(),
            limit: Some("1".into()),
            ..Default::default()
        };
        Ok(self.find(collection, &query).await?.into_iter().next())
    }

    /// Insert a document that already carries its `_id`. Returns the stored document.
    async fn insert(&self, collection: &str, doc: Document) -> Result<Document, StoreError>;

    /// Replace the document with this `_id`, provided it still matches `guard`; the check and the write are atomic.
    /// `None` when no such document exists or the guard no longer holds.
    async fn replace(
        &self,
        collection: &str,
        id: &str,
        guard: &Filter,
        doc: Document,
    ) -> Result<Option<Document>, StoreError>;

    /// Remove the document with this `_id`. Returns whether anything was removed.
    async fn remove(&self, collection: &str, id: &str) -> Result<bool, StoreError>;
}
