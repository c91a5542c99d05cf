//! Generic CRUD over a [`DocumentStore`], one model at a time.

use super::payload::{
    apply_defaults, auto_key_base, body_to_document, flatten_relationships, retain_declared,
    strip_uneditable,
};
use super::validation::PayloadValidator;
use crate::config::{FieldType, ModelDescriptor, ID_PATH};
use crate::error::{RestError, StoreError};
use crate::fields::selected_fields;
use crate::query::{project, RequestQuery};
use crate::state::{ModelContext, RestState};
use crate::store::{parse_count, Document, Filter};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};

pub struct RestService;

impl RestService {
    /// Matching documents plus the unfiltered collection size.
    pub async fn list(ctx: &ModelContext, query: &RequestQuery) -> Result<(Vec<Value>, u64), RestError> {
        let total = ctx.store().count(ctx.collection(), &Filter::default()).await?;
        let docs = ctx
            .store()
            .find(ctx.collection(), &query.find_query(&ctx.model, None))
            .await?;
        let docs = Self::shape(&ctx.state, &ctx.model, &ctx.selected, docs, query).await?;
        Ok((docs, total))
    }

    pub async fn show(ctx: &ModelContext, key: &str, query: &RequestQuery) -> Result<Value, RestError> {
        let doc = Self::locate(ctx, key).await?;
        Self::shape_one(ctx, doc, query).await
    }

    pub async fn create(ctx: &ModelContext, body: Value) -> Result<Value, RestError> {
        let model = &ctx.model;
        let mut doc = body_to_document(body)?;
        flatten_relationships(model, &mut doc);
        strip_uneditable(&mut doc, &ctx.uneditable);
        retain_declared(model, &mut doc);
        apply_defaults(model, &mut doc);

        let id = uuid::Uuid::new_v4().to_string();
        if let Some(auto_key) = &model.auto_key {
            match auto_key_base(model, &doc) {
                Some(base) => {
                    let key = Self::unique_auto_key(ctx, &auto_key.path, &base, &id).await?;
                    doc.insert(auto_key.path.clone(), Value::String(key));
                }
                None => Self::ensure_key_free(ctx, &auto_key.path, &doc, None).await?,
            }
        }
        PayloadValidator::validate(&mut doc, model)?;

        doc.insert(ID_PATH.to_string(), Value::String(id));
        doc.insert(model.version_key.clone(), json!(0));
        let stored = ctx.store().insert(ctx.collection(), doc).await?;
        tracing::debug!(collection = %ctx.collection(), id = ?stored.get(ID_PATH), "created");
        Ok(Value::Object(project(&stored, &ctx.selected, &model.version_key)))
    }

    /// Shared by PUT and PATCH: the body is merged into the stored document.
    /// The write only lands if the stored version is still the one the merge was built on;
    /// otherwise the document is read again and the merge retried.
    pub async fn update(
        ctx: &ModelContext,
        key: &str,
        body: Value,
        query: &RequestQuery,
    ) -> Result<Value, RestError> {
        let model = &ctx.model;
        let mut body = body_to_document(body)?;
        flatten_relationships(model, &mut body);
        strip_uneditable(&mut body, &ctx.uneditable);
        let submitted = body.get(&model.version_key).cloned();
        retain_declared(model, &mut body);

        loop {
            let stored = Self::locate(ctx, key).await?;
            Self::check_version(ctx, key, submitted.as_ref(), &stored)?;
            let id = Self::id_of(ctx, &stored)?;
            if let Some(auto_key) = &model.auto_key {
                Self::ensure_key_free(ctx, &auto_key.path, &body, Some(id.as_str())).await?;
            }

            let read_version = stored.get(&model.version_key).cloned().unwrap_or(Value::Null);
            let next_version = read_version.as_i64().unwrap_or(0) + 1;
            let mut merged = stored;
            merged.extend(body.clone());
            PayloadValidator::validate(&mut merged, model)?;
            merged.insert(model.version_key.clone(), json!(next_version));

            let guard = Filter::eq(model.version_key.clone(), read_version);
            if ctx.store().replace(ctx.collection(), &id, &guard, merged).await?.is_none() {
                tracing::debug!(collection = %ctx.collection(), %id, "concurrent write, retrying update");
                continue;
            }
            let fresh = ctx
                .store()
                .find_one(ctx.collection(), &Filter::eq(ID_PATH, Value::String(id)))
                .await?
                .ok_or_else(|| Self::not_found(ctx, key))?;
            return Self::shape_one(ctx, fresh, query).await;
        }
    }

    pub async fn delete(ctx: &ModelContext, key: &str) -> Result<Value, RestError> {
        let stored = Self::locate(ctx, key).await?;
        let id = Self::id_of(ctx, &stored)?;
        if !ctx.store().remove(ctx.collection(), &id).await? {
            return Err(Self::not_found(ctx, key));
        }
        Ok(json!({ "message": format!("Successfully deleted {}", ctx.collection()) }))
    }

    /// Documents referenced by `relationship` on the parent located by `key`.
    /// Without `sort`, results follow the stored reference order.
    pub async fn list_related(
        ctx: &ModelContext,
        key: &str,
        relationship: &str,
        query: &RequestQuery,
    ) -> Result<(Vec<Value>, u64), RestError> {
        let target = ctx
            .model
            .field(relationship)
            .and_then(|f| f.reference())
            .and_then(|name| ctx.state.catalog.get(name))
            .cloned()
            .ok_or_else(|| RestError::BadRequest(format!("unknown relationship '{}'", relationship)))?;
        let parent = Self::locate(ctx, key).await?;
        let ids = reference_ids(parent.get(relationship));
        let total = ids.len() as u64;

        let docs = if query.sort.is_some() {
            let find = query.find_query(&target, Some(ids));
            ctx.store().find(&target.collection, &find).await?
        } else {
            let mut unpaged = query.clone();
            unpaged.skip = None;
            unpaged.limit = None;
            let find = unpaged.find_query(&target, Some(ids.clone()));
            let found = ctx.store().find(&target.collection, &find).await?;
            let skip = parse_count("skip", query.skip.as_deref())?.unwrap_or(0) as usize;
            let limit = parse_count("limit", query.limit.as_deref())?
                .filter(|&n| n > 0)
                .map(|n| n as usize)
                .unwrap_or(usize::MAX);
            in_reference_order(found, &ids)
                .into_iter()
                .skip(skip)
                .take(limit)
                .collect()
        };
        let selected = selected_fields(&target);
        let docs = Self::shape(&ctx.state, &target, &selected, docs, query).await?;
        Ok((docs, total))
    }

    fn not_found(ctx: &ModelContext, key: &str) -> RestError {
        RestError::NotFound {
            collection: ctx.collection().to_string(),
            key: key.to_string(),
        }
    }

    /// Filter locating one document by the model's `find_by` path.
    pub fn key_filter(model: &ModelDescriptor, key: &str) -> Result<Filter, RestError> {
        let path = model.find_by();
        if path == ID_PATH {
            uuid::Uuid::parse_str(key).map_err(|_| RestError::MalformedIdentifier(key.to_string()))?;
        }
        Ok(Filter::eq(path, Value::String(key.to_string())))
    }

    async fn locate(ctx: &ModelContext, key: &str) -> Result<Document, RestError> {
        let filter = Self::key_filter(&ctx.model, key)?;
        ctx.store()
            .find_one(ctx.collection(), &filter)
            .await?
            .ok_or_else(|| Self::not_found(ctx, key))
    }

    fn id_of(ctx: &ModelContext, doc: &Document) -> Result<String, RestError> {
        doc.get(ID_PATH)
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| {
                RestError::Store(StoreError::Corrupt {
                    collection: ctx.collection().to_string(),
                    message: "document without _id".into(),
                })
            })
    }

    /// An absent token skips the check. Anything but an integer at least as new as the stored one conflicts.
    fn check_version(
        ctx: &ModelContext,
        key: &str,
        submitted: Option<&Value>,
        stored: &Document,
    ) -> Result<(), RestError> {
        let Some(submitted) = submitted else {
            return Ok(());
        };
        let stored_token = stored.get(&ctx.model.version_key).cloned().unwrap_or(Value::Null);
        match (submitted.as_i64(), stored_token.as_i64()) {
            (Some(s), Some(current)) if s >= current => Ok(()),
            _ => Err(RestError::VersionConflict {
                collection: ctx.collection().to_string(),
                key: key.to_string(),
                submitted: submitted.clone(),
                stored: stored_token,
            }),
        }
    }

    /// `base`, then `base-2`, `base-3`, ... until no document holds it. Empty slugs fall back to the id.
    async fn unique_auto_key(ctx: &ModelContext, path: &str, base: &str, id: &str) -> Result<String, RestError> {
        if base.is_empty() {
            return Ok(id.to_string());
        }
        let mut candidate = base.to_string();
        let mut n = 2;
        while ctx
            .store()
            .find_one(ctx.collection(), &Filter::eq(path, Value::String(candidate.clone())))
            .await?
            .is_some()
        {
            candidate = format!("{}-{}", base, n);
            n += 1;
        }
        Ok(candidate)
    }

    /// A supplied auto-key must not already belong to another document.
    async fn ensure_key_free(
        ctx: &ModelContext,
        path: &str,
        doc: &Document,
        own_id: Option<&str>,
    ) -> Result<(), RestError> {
        let Some(Value::String(key)) = doc.get(path) else {
            return Ok(());
        };
        let holder = ctx
            .store()
            .find_one(ctx.collection(), &Filter::eq(path, Value::String(key.clone())))
            .await?;
        match holder {
            Some(other) if other.get(ID_PATH).and_then(Value::as_str) != own_id => Err(RestError::KeyTaken {
                collection: ctx.collection().to_string(),
                path: path.to_string(),
                key: key.clone(),
            }),
            _ => Ok(()),
        }
    }

    async fn shape_one(ctx: &ModelContext, doc: Document, query: &RequestQuery) -> Result<Value, RestError> {
        let mut shaped = Self::shape(&ctx.state, &ctx.model, &ctx.selected, vec![doc], query).await?;
        Ok(shaped.pop().unwrap_or(Value::Null))
    }

    /// Projection through the allow-list, then population.
    async fn shape(
        state: &RestState,
        model: &ModelDescriptor,
        allowed: &[String],
        docs: Vec<Document>,
        query: &RequestQuery,
    ) -> Result<Vec<Value>, RestError> {
        let fields = query.projection(allowed);
        let mut docs: Vec<Document> = docs
            .iter()
            .map(|d| project(d, &fields, &model.version_key))
            .collect();
        Self::populate(state, model, &mut docs, &query.populate).await?;
        Ok(docs.into_iter().map(Value::Object).collect())
    }

    /// Expand relationship ids into the related documents (their default selection), one level deep.
    /// Paths that are not relationship fields are ignored.
    pub async fn populate(
        state: &RestState,
        model: &ModelDescriptor,
        docs: &mut [Document],
        paths: &[String],
    ) -> Result<(), RestError> {
        for path in paths {
            let Some(field) = model.field(path) else { continue };
            let Some(target) = field.reference().and_then(|t| state.catalog.get(t)) else {
                continue;
            };
            let mut wanted: Vec<String> = Vec::new();
            let mut seen = HashSet::new();
            for doc in docs.iter() {
                for id in reference_ids(doc.get(path)) {
                    if seen.insert(id.clone()) {
                        wanted.push(id);
                    }
                }
            }
            if wanted.is_empty() {
                continue;
            }
            let filter = Filter {
                equals: Vec::new(),
                id_in: Some(wanted),
            };
            let selected = selected_fields(target);
            let related: HashMap<String, Value> = state
                .store
                .find(&target.collection, &crate::store::FindQuery { filter, ..Default::default() })
                .await?
                .into_iter()
                .filter_map(|d| {
                    let id = d.get(ID_PATH)?.as_str()?.to_string();
                    Some((id, Value::Object(project(&d, &selected, &target.version_key))))
                })
                .collect();

            for doc in docs.iter_mut() {
                let Some(value) = doc.get_mut(path) else { continue };
                let expanded = match (&field.type_, &*value) {
                    (FieldType::Reference(_), Value::String(id)) => related.get(id).cloned().unwrap_or(Value::Null),
                    (FieldType::ReferenceArray(_), Value::Array(items)) => Value::Array(
                        items
                            .iter()
                            .filter_map(|i| i.as_str().and_then(|id| related.get(id)).cloned())
                            .collect(),
                    ),
                    _ => continue,
                };
                *value = expanded;
            }
        }
        Ok(())
    }
}

/// Ids held by a reference or reference-array value.
fn reference_ids(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
        Some(Value::Array(items)) => items.iter().filter_map(|v| v.as_str().map(String::from)).collect(),
        _ => Vec::new(),
    }
}

/// Reorder to follow `ids`. Repeated ids repeat the document; ids with no document are skipped.
fn in_reference_order(docs: Vec<Document>, ids: &[String]) -> Vec<Document> {
    let by_id: HashMap<String, Document> = docs
        .into_iter()
        .filter_map(|d| Some((d.get(ID_PATH)?.as_str()?.to_string(), d)))
        .collect();
    ids.iter().filter_map(|id| by_id.get(id).cloned()).collect()
}
