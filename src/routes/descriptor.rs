//! Route descriptors: what the registry hands to a [`super::RouteBinder`].

use crate::config::Operation;
use crate::error::RestError;
use crate::handlers::RestRequest;
use crate::middleware::Middleware;
use crate::response::RestResponse;
use axum::routing::MethodFilter;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<RestResponse, RestError>> + Send>>;

pub type RouteHandler = Arc<dyn Fn(RestRequest) -> HandlerFuture + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RouteMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl RouteMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteMethod::Get => "GET",
            RouteMethod::Post => "POST",
            RouteMethod::Put => "PUT",
            RouteMethod::Patch => "PATCH",
            RouteMethod::Delete => "DELETE",
        }
    }

    pub fn filter(&self) -> MethodFilter {
        match self {
            RouteMethod::Get => MethodFilter::GET,
            RouteMethod::Post => MethodFilter::POST,
            RouteMethod::Put => MethodFilter::PUT,
            RouteMethod::Patch => MethodFilter::PATCH,
            RouteMethod::Delete => MethodFilter::DELETE,
        }
    }
}

impl fmt::Display for RouteMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One generated route. `path` uses `:name` parameters.
#[derive(Clone)]
pub struct RouteDescriptor {
    pub method: RouteMethod,
    pub path: String,
    /// Model the route was generated for.
    pub model: String,
    /// `None` for relationship sub-list routes.
    pub operation: Option<Operation>,
    /// Runs in order before the handler.
    pub middleware: Vec<Middleware>,
    pub handler: RouteHandler,
}

impl RouteDescriptor {
    pub fn key(&self) -> (RouteMethod, &str) {
        (self.method, self.path.as_str())
    }
}

impl fmt::Debug for RouteDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDescriptor")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("model", &self.model)
            .field("operation", &self.operation)
            .field("middleware", &self.middleware)
            .finish_non_exhaustive()
    }
}
