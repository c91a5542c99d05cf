//! In-process document store. Collections are created on first write.

use super::{parse_count, parse_sort, Document, DocumentStore, Filter, FindQuery, SortKey};
use crate::config::ID_PATH;
use crate::error::StoreError;
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a collection in natural order.
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.read().get(collection).cloned().unwrap_or_default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Vec<Document>>> {
        self.collections.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Vec<Document>>> {
        self.collections.write().unwrap_or_else(|e| e.into_inner())
    }
}

fn id_of(doc: &Document) -> Option<&str> {
    doc.get(ID_PATH).and_then(Value::as_str)
}

fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Object(_) => 3,
        Value::Array(_) => 4,
        Value::Bool(_) => 5,
    }
}

/// Total order over JSON values: null < numbers < strings < objects < arrays < booleans.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .unwrap_or(0.0)
            .partial_cmp(&y.as_f64().unwrap_or(0.0))
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn compare_docs(a: &Document, b: &Document, keys: &[SortKey]) -> Ordering {
    for key in keys {
        let ord = compare_values(
            a.get(&key.path).unwrap_or(&Value::Null),
            b.get(&key.path).unwrap_or(&Value::Null),
        );
        let ord = if key.descending { ord.reverse() } else { ord };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        let guard = self.read();
        let n = guard
            .get(collection)
            .map(|docs| docs.iter().filter(|d| filter.matches(d)).count())
            .unwrap_or(0);
        Ok(n as u64)
    }

    async fn find(&self, collection: &str, query: &FindQuery) -> Result<Vec<Document>, StoreError> {
        let sort = query.sort.as_deref().map(parse_sort).transpose()?.unwrap_or_default();
        let skip = parse_count("skip", query.skip.as_deref())?.unwrap_or(0) as usize;
        let limit = parse_count("limit", query.limit.as_deref())?;

        let mut out: Vec<Document> = {
            let guard = self.read();
            guard
                .get(collection)
                .map(|docs| docs.iter().filter(|d| query.filter.matches(d)).cloned().collect())
                .unwrap_or_default()
        };
        if !sort.is_empty() {
            out.sort_by(|a, b| compare_docs(a, b, &sort));
        }
        let iter = out.into_iter().skip(skip);
        // limit 0 means no limit
        Ok(match limit {
            Some(n) if n > 0 => iter.take(n as usize).collect(),
            _ => iter.collect(),
        })
    }

    async fn insert(&self, collection: &str, doc: Document) -> Result<Document, StoreError> {
        let id = id_of(&doc)
            .ok_or_else(|| StoreError::InvalidQuery("document without _id".into()))?
            .to_string();
        let mut guard = self.write();
        let docs = guard.entry(collection.to_string()).or_default();
        if docs.iter().any(|d| id_of(d) == Some(id.as_str())) {
            return Err(StoreError::DuplicateKey {
                collection: collection.to_string(),
                id,
            });
        }
        docs.push(doc.clone());
        Ok(doc)
    }

    async fn replace(
        &self,
        collection: &str,
        id: &str,
        guard: &Filter,
        doc: Document,
    ) -> Result<Option<Document>, StoreError> {
        let mut collections = self.write();
        let Some(slot) = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| id_of(d) == Some(id)))
            .filter(|d| guard.matches(d))
        else {
            return Ok(None);
        };
        *slot = doc.clone();
        Ok(Some(doc))
    }

    async fn remove(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let mut guard = self.write();
        let Some(docs) = guard.get_mut(collection) else {
            return Ok(false);
        };
        let before = docs.len();
        docs.retain(|d| id_of(d) != Some(id));
        Ok(docs.len() != before)
    }
}
