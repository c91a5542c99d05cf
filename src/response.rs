//! Response envelope for generated routes.

use axum::{
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

/// Header carrying the collection size on list responses.
pub const TOTAL_HEADER: HeaderName = HeaderName::from_static("total");

#[derive(Debug, Clone, PartialEq)]
pub struct RestResponse {
    pub status: StatusCode,
    /// Sent as the `total` header when set.
    pub total: Option<u64>,
    pub body: Value,
}

impl RestResponse {
    pub fn ok(body: Value) -> Self {
        RestResponse {
            status: StatusCode::OK,
            total: None,
            body,
        }
    }

    pub fn list(items: Vec<Value>, total: u64) -> Self {
        RestResponse {
            status: StatusCode::OK,
            total: Some(total),
            body: Value::Array(items),
        }
    }
}

impl IntoResponse for RestResponse {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.body)).into_response();
        if let Some(total) = self.total {
            response.headers_mut().insert(TOTAL_HEADER, HeaderValue::from(total));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn list_sets_total_header() {
        let res = RestResponse::list(vec![json!({ "a": 1 })], 7).into_response();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers().get("total").unwrap(), "7");

        let res = RestResponse::ok(json!({})).into_response();
        assert!(res.headers().get("total").is_none());
    }
}
