//! Generated-route handlers: decode the request, call [`RestService`], wrap the result.

use crate::error::RestError;
use crate::query::RequestQuery;
use crate::response::RestResponse;
use crate::service::RestService;
use crate::state::ModelContext;
use serde_json::Value;
use std::collections::HashMap;

/// Framework-neutral view of an incoming request.
#[derive(Clone, Debug, Default)]
pub struct RestRequest {
    pub params: HashMap<String, String>,
    pub query: HashMap<String, String>,
    pub body: Option<Value>,
}

impl RestRequest {
    fn id(&self) -> Result<&str, RestError> {
        self.params
            .get("id")
            .map(String::as_str)
            .ok_or_else(|| RestError::BadRequest("missing id parameter".into()))
    }

    fn query(&self) -> RequestQuery {
        RequestQuery::from_params(&self.query)
    }

    fn body(&mut self) -> Value {
        self.body.take().unwrap_or(Value::Null)
    }
}

pub async fn list(ctx: ModelContext, req: RestRequest) -> Result<RestResponse, RestError> {
    let (items, total) = RestService::list(&ctx, &req.query()).await?;
    Ok(RestResponse::list(items, total))
}

pub async fn show(ctx: ModelContext, req: RestRequest) -> Result<RestResponse, RestError> {
    let doc = RestService::show(&ctx, req.id()?, &req.query()).await?;
    Ok(RestResponse::ok(doc))
}

pub async fn create(ctx: ModelContext, mut req: RestRequest) -> Result<RestResponse, RestError> {
    let doc = RestService::create(&ctx, req.body()).await?;
    Ok(RestResponse::ok(doc))
}

pub async fn update(ctx: ModelContext, mut req: RestRequest) -> Result<RestResponse, RestError> {
    let body = req.body();
    let doc = RestService::update(&ctx, req.id()?, body, &req.query()).await?;
    Ok(RestResponse::ok(doc))
}

pub async fn delete(ctx: ModelContext, req: RestRequest) -> Result<RestResponse, RestError> {
    let message = RestService::delete(&ctx, req.id()?).await?;
    Ok(RestResponse::ok(message))
}

pub async fn list_related(
    ctx: ModelContext,
    relationship: String,
    req: RestRequest,
) -> Result<RestResponse, RestError> {
    let (items, total) = RestService::list_related(&ctx, req.id()?, &relationship, &req.query()).await?;
    Ok(RestResponse::list(items, total))
}
