//! Route synthesis: one descriptor per enabled operation (update yields PUT and PATCH),
//! plus one GET per listed relationship.

use super::descriptor::{HandlerFuture, RouteDescriptor, RouteHandler, RouteMethod};
use crate::config::Operation;
use crate::error::{RestError, RegistrationError};
use crate::handlers::{self, RestRequest};
use crate::response::RestResponse;
use crate::state::ModelContext;
use std::future::Future;
use std::sync::Arc;

fn handler<F, Fut>(ctx: &ModelContext, f: F) -> RouteHandler
where
    F: Fn(ModelContext, RestRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<RestResponse, RestError>> + Send + 'static,
{
    let ctx = ctx.clone();
    Arc::new(move |req| -> HandlerFuture { Box::pin(f(ctx.clone(), req)) })
}

fn route(ctx: &ModelContext, op: Option<Operation>, method: RouteMethod, path: String, handler: RouteHandler) -> RouteDescriptor {
    let rest = ctx.model.rest.as_ref();
    // sub-list routes share the list hooks
    let middleware = rest
        .map(|r| r.middleware(op.unwrap_or(Operation::List)))
        .unwrap_or_default();
    RouteDescriptor {
        method,
        path,
        model: ctx.model.name.clone(),
        operation: op,
        middleware,
        handler,
    }
}

/// Descriptors for one operation of the model. `root` starts and ends with `/`.
pub fn operation_routes(ctx: &ModelContext, op: Operation, root: &str) -> Vec<RouteDescriptor> {
    let collection = format!("{}{}", root, ctx.model.endpoint());
    let item = format!("{}/:id", collection);
    match op {
        Operation::List => vec![route(ctx, Some(op), RouteMethod::Get, collection, handler(ctx, handlers::list))],
        Operation::Show => vec![route(ctx, Some(op), RouteMethod::Get, item, handler(ctx, handlers::show))],
        Operation::Create => vec![route(ctx, Some(op), RouteMethod::Post, collection, handler(ctx, handlers::create))],
        Operation::Update => {
            let h = handler(ctx, handlers::update);
            vec![
                route(ctx, Some(op), RouteMethod::Put, item.clone(), h.clone()),
                route(ctx, Some(op), RouteMethod::Patch, item, h),
            ]
        }
        Operation::Delete => vec![route(ctx, Some(op), RouteMethod::Delete, item, handler(ctx, handlers::delete))],
    }
}

/// `GET {root}{endpoint}/:id/{relationship}`. The relationship must name a reference field whose
/// target model is in the catalog. The route carries no operation of its own and runs the
/// model's list middleware.
pub fn relationship_route(ctx: &ModelContext, relationship: &str, root: &str) -> Result<RouteDescriptor, RegistrationError> {
    let model = &ctx.model;
    let field = model
        .field(relationship)
        .filter(|f| f.reference().is_some())
        .ok_or_else(|| RegistrationError::UnknownRelationship {
            model: model.name.clone(),
            field: relationship.to_string(),
        })?;
    let target = field.reference().unwrap_or_default();
    if ctx.state.catalog.get(target).is_none() {
        return Err(RegistrationError::UnknownReference {
            model: model.name.clone(),
            field: relationship.to_string(),
            target: target.to_string(),
        });
    }
    let path = format!("{}{}/:id/{}", root, model.endpoint(), relationship);
    let name = relationship.to_string();
    let h = handler(ctx, move |ctx, req| handlers::list_related(ctx, name.clone(), req));
    Ok(route(ctx, None, RouteMethod::Get, path, h))
}

/// All routes of a REST-enabled model, in canonical operation order then relationship order.
pub fn model_routes(ctx: &ModelContext, root: &str) -> Result<Vec<RouteDescriptor>, RegistrationError> {
    let model = &ctx.model;
    let Some(rest) = model.rest.as_ref() else {
        return Ok(Vec::new());
    };
    if let Some(name) = rest.unknown_operations.first() {
        return Err(RegistrationError::UnknownOperation {
            model: model.name.clone(),
            operation: name.clone(),
        });
    }
    if rest.operations.is_empty() {
        return Err(RegistrationError::NoOperations { model: model.name.clone() });
    }
    for field in model.relationship_fields() {
        let target = field.reference().unwrap_or_default();
        if ctx.state.catalog.get(target).is_none() {
            return Err(RegistrationError::UnknownReference {
                model: model.name.clone(),
                field: field.path.clone(),
                target: target.to_string(),
            });
        }
    }
    let mut routes: Vec<RouteDescriptor> = rest
        .operations
        .iter()
        .flat_map(|&op| operation_routes(ctx, op, root))
        .collect();
    for relationship in &rest.relationships {
        routes.push(relationship_route(ctx, relationship, root)?);
    }
    Ok(routes)
}
