//! Builds parameterized SQL over JSONB document tables.
//! Each collection is a table `(id TEXT PRIMARY KEY, seq BIGSERIAL, doc JSONB)`; `seq` keeps insertion order.

use crate::config::ID_PATH;
use crate::store::{Filter, SortKey};
use serde_json::Value;

/// Quote identifier for PostgreSQL.
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Full qualified table name.
fn qualified_table(schema: &str, collection: &str) -> String {
    format!("{}.{}", quoted(schema), quoted(collection))
}

/// SQL text plus text parameters, bound in order.
#[derive(Debug, Default)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<String>,
}

impl QueryBuf {
    fn new() -> Self {
        Self::default()
    }

    fn push_param(&mut self, v: impl Into<String>) -> usize {
        self.params.push(v.into());
        self.params.len()
    }
}

pub fn create_schema(schema: &str) -> String {
    format!("CREATE SCHEMA IF NOT EXISTS {}", quoted(schema))
}

pub fn create_collection(schema: &str, collection: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (id TEXT PRIMARY KEY, seq BIGSERIAL, doc JSONB NOT NULL)",
        qualified_table(schema, collection)
    )
}

fn id_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn where_clause(q: &mut QueryBuf, filter: &Filter) -> String {
    let mut parts = Vec::new();
    if let Some(ids) = &filter.id_in {
        if ids.is_empty() {
            parts.push("1 = 0".to_string());
        } else {
            let placeholders: Vec<String> = ids
                .iter()
                .map(|id| format!("${}", q.push_param(id.clone())))
                .collect();
            parts.push(format!("id IN ({})", placeholders.join(", ")));
        }
    }
    for (path, value) in &filter.equals {
        if path == ID_PATH {
            let n = q.push_param(id_text(value));
            parts.push(format!("id = ${}", n));
            continue;
        }
        let k = q.push_param(path.clone());
        if value.is_null() {
            parts.push(format!("COALESCE(doc -> ${}::text, 'null'::jsonb) = 'null'::jsonb", k));
            continue;
        }
        let v = q.push_param(value.to_string());
        // scalar criteria also match array members
        parts.push(format!(
            "(doc -> ${k}::text = ${v}::jsonb OR (jsonb_typeof(doc -> ${k}::text) = 'array' AND doc -> ${k}::text @> jsonb_build_array(${v}::jsonb)))",
            k = k,
            v = v
        ));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", parts.join(" AND "))
    }
}

/// SELECT COUNT(*) with filter.
pub fn count(schema: &str, collection: &str, filter: &Filter) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(schema, collection);
    let where_clause = where_clause(&mut q, filter);
    q.sql = format!("SELECT COUNT(*) FROM {}{}", table, where_clause);
    q
}

/// SELECT doc with filter, sort keys (then insertion order), optional OFFSET/LIMIT. Limit 0 means unlimited.
pub fn select(
    schema: &str,
    collection: &str,
    filter: &Filter,
    sort: &[SortKey],
    skip: Option<u64>,
    limit: Option<u64>,
) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(schema, collection);
    let where_clause = where_clause(&mut q, filter);
    let mut order = Vec::new();
    for key in sort {
        let dir = if key.descending { "DESC" } else { "ASC" };
        if key.path == ID_PATH {
            order.push(format!("id {}", dir));
        } else {
            let n = q.push_param(key.path.clone());
            order.push(format!("doc -> ${}::text {}", n, dir));
        }
    }
    order.push("seq ASC".to_string());
    let limit_clause = limit.filter(|n| *n > 0).map(|n| format!(" LIMIT {}", n)).unwrap_or_default();
    let offset_clause = skip.filter(|n| *n > 0).map(|n| format!(" OFFSET {}", n)).unwrap_or_default();
    q.sql = format!(
        "SELECT doc FROM {}{} ORDER BY {}{}{}",
        table,
        where_clause,
        order.join(", "),
        limit_clause,
        offset_clause
    );
    q
}

pub fn insert(schema: &str, collection: &str, id: &str, doc: &Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(schema, collection);
    let id_param = q.push_param(id);
    let doc_param = q.push_param(doc.to_string());
    q.sql = format!(
        "INSERT INTO {} (id, doc) VALUES (${}, ${}::jsonb) RETURNING doc",
        table, id_param, doc_param
    );
    q
}

/// UPDATE one row by id, only while it still matches `guard`. No row comes back when the guard fails.
pub fn replace(schema: &str, collection: &str, id: &str, guard: &Filter, doc: &Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(schema, collection);
    let doc_param = q.push_param(doc.to_string());
    let mut filter = guard.clone();
    filter.equals.insert(0, (ID_PATH.to_string(), Value::String(id.to_string())));
    let where_clause = where_clause(&mut q, &filter);
    q.sql = format!(
        "UPDATE {} SET doc = ${}::jsonb{} RETURNING doc",
        table, doc_param, where_clause
    );
    q
}

pub fn delete(schema: &str, collection: &str, id: &str) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(schema, collection);
    let id_param = q.push_param(id);
    q.sql = format!("DELETE FROM {} WHERE id = ${}", table, id_param);
    q
}
