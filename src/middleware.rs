//! Per-operation hooks that run before a generated handler.

use axum::{
    extract::Request,
    middleware::Next,
    response::Response,
};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub type MiddlewareFuture = Pin<Box<dyn Future<Output = Response> + Send>>;

type MiddlewareFn = dyn Fn(Request, Next) -> MiddlewareFuture + Send + Sync;

/// A shared async hook `(Request, Next) -> Response`. Call `next.run(req)` to continue the chain,
/// or return a response directly to short-circuit it.
#[derive(Clone)]
pub struct Middleware {
    name: Arc<str>,
    f: Arc<MiddlewareFn>,
}

impl Middleware {
    pub fn from_fn<F, Fut>(name: &str, f: F) -> Self
    where
        F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        Middleware {
            name: Arc::from(name),
            f: Arc::new(move |req, next| Box::pin(f(req, next))),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn call(&self, req: Request, next: Next) -> Response {
        (self.f)(req, next).await
    }
}

impl fmt::Debug for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Middleware").field(&self.name).finish()
    }
}
