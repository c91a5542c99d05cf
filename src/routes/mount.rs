//! Host binding. The registry only knows [`RouteBinder`]; [`AxumBinder`] turns descriptors into an axum router.

use super::descriptor::RouteDescriptor;
use crate::error::RestError;
use crate::handlers::RestRequest;
use axum::{
    body::Bytes,
    extract::{Path, Query, Request},
    middleware::{from_fn, Next},
    routing::on,
    Router,
};
use serde_json::Value;
use std::collections::HashMap;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;

/// Receives generated routes at mount time, one call per descriptor, in registry order.
pub trait RouteBinder {
    fn bind(&mut self, route: &RouteDescriptor);
}

/// Default request body limit: 1 MiB.
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

pub struct AxumBinder {
    router: Router,
    body_limit: usize,
}

impl AxumBinder {
    pub fn new(body_limit: usize) -> Self {
        AxumBinder {
            router: Router::new(),
            body_limit,
        }
    }

    pub fn into_router(self) -> Router {
        self.router
            .layer(ServiceBuilder::new().layer(RequestBodyLimitLayer::new(self.body_limit)))
    }
}

impl Default for AxumBinder {
    fn default() -> Self {
        Self::new(DEFAULT_BODY_LIMIT)
    }
}

fn parse_body(bytes: &Bytes) -> Result<Option<Value>, RestError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(bytes)
        .map(Some)
        .map_err(|e| RestError::BadRequest(format!("invalid JSON body: {}", e)))
}

impl RouteBinder for AxumBinder {
    fn bind(&mut self, route: &RouteDescriptor) {
        let handler = route.handler.clone();
        let endpoint = move |params: Option<Path<HashMap<String, String>>>,
                             Query(query): Query<HashMap<String, String>>,
                             body: Bytes| {
            let handler = handler.clone();
            async move {
                let req = RestRequest {
                    params: params.map(|Path(p)| p).unwrap_or_default(),
                    query,
                    body: parse_body(&body)?,
                };
                handler(req).await
            }
        };
        let mut method_router = on(route.method.filter(), endpoint);
        // last layer added runs first
        for mw in route.middleware.iter().rev() {
            let mw = mw.clone();
            method_router = method_router.layer(from_fn(move |req: Request, next: Next| {
                let mw = mw.clone();
                async move { mw.call(req, next).await }
            }));
        }
        tracing::debug!(method = %route.method, path = %route.path, model = %route.model, "bind route");
        let router = std::mem::take(&mut self.router);
        self.router = router.route(&route.path, method_router);
    }
}
