//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Problems found while loading or resolving model definitions.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing reference: {kind} '{id}'")]
    MissingReference { kind: &'static str, id: String },
    #[error("duplicate {kind}: {name}")]
    Duplicate { kind: &'static str, name: String },
    #[error("unknown operation '{0}'")]
    UnknownOperation(String),
    #[error("config load: {0}")]
    Load(String),
    #[error("validation: {0}")]
    Validation(String),
}

/// Errors raised by a [`crate::store::DocumentStore`].
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    #[error("duplicate key in {collection}: {id}")]
    DuplicateKey { collection: String, id: String },
    #[error("corrupt document in {collection}: {message}")]
    Corrupt { collection: String, message: String },
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
}

/// A single model could not be registered. Other models are unaffected.
#[derive(Error, Debug)]
pub enum RegistrationError {
    #[error("{model}: no rest operations enabled")]
    NoOperations { model: String },
    #[error("{model}: '{field}' is not a relationship field")]
    UnknownRelationship { model: String, field: String },
    #[error("{model}: field '{field}' references unknown model '{target}'")]
    UnknownReference { model: String, field: String, target: String },
    #[error("{model}: unknown rest operation '{operation}'")]
    UnknownOperation { model: String, operation: String },
    #[error("{model}: route {method} {path} is already registered")]
    RouteConflict { model: String, method: &'static str, path: String },
}

/// Request-time failures. `IntoResponse` is the centralized error stage for generated routes.
#[derive(Error, Debug)]
pub enum RestError {
    #[error("Could not find {collection} with id {key}")]
    NotFound { collection: String, key: String },
    #[error("validation: {0}")]
    Validation(String),
    #[error("version conflict on {collection} {key}: submitted {submitted}, stored {stored}")]
    VersionConflict {
        collection: String,
        key: String,
        submitted: serde_json::Value,
        stored: serde_json::Value,
    },
    #[error("{collection}: {path} '{key}' is already taken")]
    KeyTaken { collection: String, path: String, key: String },
    #[error("malformed identifier: {0}")]
    MalformedIdentifier(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Body sent with every 404: `{ "status": "missing", "message": ... }`.
#[derive(Serialize)]
pub struct MissingBody {
    pub status: &'static str,
    pub message: String,
}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        if let RestError::NotFound { .. } = &self {
            let body = MissingBody {
                status: "missing",
                message: self.to_string(),
            };
            return (StatusCode::NOT_FOUND, Json(body)).into_response();
        }
        let (status, code) = match &self {
            RestError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            RestError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
            RestError::VersionConflict { .. } => (StatusCode::CONFLICT, "version_conflict"),
            RestError::KeyTaken { .. } => (StatusCode::CONFLICT, "duplicate_key"),
            RestError::MalformedIdentifier(_) => (StatusCode::BAD_REQUEST, "malformed_identifier"),
            RestError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            RestError::Store(StoreError::InvalidQuery(_)) => (StatusCode::BAD_REQUEST, "invalid_query"),
            RestError::Store(StoreError::DuplicateKey { .. }) => (StatusCode::CONFLICT, "duplicate_key"),
            RestError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
        };
        let details = match &self {
            RestError::VersionConflict { submitted, stored, .. } => Some(serde_json::json!({
                "submitted": submitted,
                "stored": stored,
            })),
            _ => None,
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
                details,
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_renders_missing_body() {
        let err = RestError::NotFound {
            collection: "posts".into(),
            key: "abc".into(),
        };
        assert_eq!(err.to_string(), "Could not find posts with id abc");
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn status_codes_by_kind() {
        let conflict = RestError::VersionConflict {
            collection: "posts".into(),
            key: "k".into(),
            submitted: serde_json::json!(1),
            stored: serde_json::json!(2),
        };
        assert_eq!(conflict.into_response().status(), StatusCode::CONFLICT);
        let taken = RestError::KeyTaken {
            collection: "pages".into(),
            path: "slug".into(),
            key: "home".into(),
        };
        assert_eq!(taken.to_string(), "pages: slug 'home' is already taken");
        assert_eq!(taken.into_response().status(), StatusCode::CONFLICT);
        assert_eq!(
            RestError::MalformedIdentifier("x".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            RestError::Validation("title is required".into()).into_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            RestError::Store(StoreError::InvalidQuery("limit".into())).into_response().status(),
            StatusCode::BAD_REQUEST
        );
    }
}
