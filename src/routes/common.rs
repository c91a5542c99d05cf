//! Common routes: health, version, rendered API documentation.

use axum::{
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
}

async fn health() -> Json<HealthBody> {
    Json(HealthBody { status: "ok" })
}

async fn version() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Common routes (no state): GET /health, GET /version.
pub fn common_routes() -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/version", get(version))
}

/// Common routes plus `GET {path}` serving the API Blueprint text as markdown.
pub fn common_routes_with_docs(path: &str, docs: impl Into<Arc<str>>) -> Router {
    let docs: Arc<str> = docs.into();
    common_routes().route(
        path,
        get(move || {
            let docs = docs.clone();
            async move { ([(header::CONTENT_TYPE, "text/markdown; charset=utf-8")], docs.to_string()).into_response() }
        }),
    )
}
