//! PostgreSQL document store: one JSONB table per collection inside a dedicated schema.

use super::{parse_count, parse_sort, Document, DocumentStore, Filter, FindQuery};
use crate::config::ModelCatalog;
use crate::error::StoreError;
use crate::sql::{self, QueryBuf};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::{ConnectOptions, PgPool, Row};
use std::str::FromStr;

#[derive(Clone, Debug)]
pub struct PgDocumentStore {
    pool: PgPool,
    schema: String,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool, schema: impl Into<String>) -> Self {
        PgDocumentStore {
            pool,
            schema: schema.into(),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the schema and one table per collection if missing.
    pub async fn ensure_collections(&self, catalog: &ModelCatalog) -> Result<(), StoreError> {
        sqlx::query(&sql::create_schema(&self.schema)).execute(&self.pool).await?;
        for model in catalog.models() {
            let ddl = sql::create_collection(&self.schema, &model.collection);
            tracing::debug!(sql = %ddl, "ensure collection");
            sqlx::query(&ddl).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn fetch_docs(&self, collection: &str, q: &QueryBuf) -> Result<Vec<Document>, StoreError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(p.as_str());
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(|r| row_to_doc(collection, r)).collect()
    }

    async fn fetch_doc(&self, collection: &str, q: &QueryBuf) -> Result<Option<Document>, StoreError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(p.as_str());
        }
        let row = query.fetch_optional(&self.pool).await.map_err(|e| map_unique(e, collection, q))?;
        row.map(|r| row_to_doc(collection, &r)).transpose()
    }
}

fn map_unique(e: sqlx::Error, collection: &str, q: &QueryBuf) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.code().as_deref() == Some("23505") {
            return StoreError::DuplicateKey {
                collection: collection.to_string(),
                id: q.params.first().cloned().unwrap_or_default(),
            };
        }
    }
    StoreError::Db(e)
}

fn row_to_doc(collection: &str, row: &sqlx::postgres::PgRow) -> Result<Document, StoreError> {
    let v: Value = row.try_get("doc")?;
    match v {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Corrupt {
            collection: collection.to_string(),
            message: format!("expected object, found {}", other),
        }),
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        let q = sql::count(&self.schema, collection, filter);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(p.as_str());
        }
        let row = query.fetch_one(&self.pool).await?;
        let n: i64 = row.try_get(0)?;
        Ok(n.max(0) as u64)
    }

    async fn find(&self, collection: &str, query: &FindQuery) -> Result<Vec<Document>, StoreError> {
        let sort = query.sort.as_deref().map(parse_sort).transpose()?.unwrap_or_default();
        let skip = parse_count("skip", query.skip.as_deref())?;
        let limit = parse_count("limit", query.limit.as_deref())?;
        let q = sql::select(&self.schema, collection, &query.filter, &sort, skip, limit);
        self.fetch_docs(collection, &q).await
    }

    async fn insert(&self, collection: &str, doc: Document) -> Result<Document, StoreError> {
        let id = doc
            .get(crate::config::ID_PATH)
            .and_then(Value::as_str)
            .ok_or_else(|| StoreError::InvalidQuery("document without _id".into()))?
            .to_string();
        let q = sql::insert(&self.schema, collection, &id, &Value::Object(doc));
        self.fetch_doc(collection, &q).await?.ok_or_else(|| StoreError::Corrupt {
            collection: collection.to_string(),
            message: "insert returned no row".into(),
        })
    }

    async fn replace(
        &self,
        collection: &str,
        id: &str,
        guard: &Filter,
        doc: Document,
    ) -> Result<Option<Document>, StoreError> {
        let q = sql::replace(&self.schema, collection, id, guard, &Value::Object(doc));
        self.fetch_doc(collection, &q).await
    }

    async fn remove(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let q = sql::delete(&self.schema, collection, id);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let result = sqlx::query(&q.sql).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Ensure the database in `database_url` exists; create it if not. Connects to the
/// default `postgres` database to run CREATE DATABASE. Call before creating the main pool.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), StoreError> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url)
        .map_err(|e| StoreError::InvalidQuery(format!("invalid DATABASE_URL: {}", e)))?;
    let mut conn: sqlx::PgConnection = opts.connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE {}", sql::quoted(&db_name)))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}

fn parse_db_name_from_url(url: &str) -> Result<(String, String), StoreError> {
    let path_start = url
        .rfind('/')
        .ok_or_else(|| StoreError::InvalidQuery("DATABASE_URL: no path".into()))?
        + 1;
    let path_and_query = url.get(path_start..).unwrap_or("");
    let db_name = path_and_query.split('?').next().unwrap_or("").trim();
    let base = url.get(..path_start).unwrap_or(url);
    let admin_url = format!("{}postgres", base);
    Ok((admin_url, db_name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_name_is_split_from_url() {
        let (admin, db) = parse_db_name_from_url("postgres://u:p@localhost:5432/blog?sslmode=disable").unwrap();
        assert_eq!(admin, "postgres://u:p@localhost:5432/postgres");
        assert_eq!(db, "blog");
        assert!(parse_db_name_from_url("nonsense").is_err());
    }
}
