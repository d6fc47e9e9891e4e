use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
    http::{header, HeaderMap, StatusCode},
};
use serde_json::{Map, Value};

use crate::error::ApiError;

/// Lenient JSON body.
///
/// A request that is not `application/json`, or whose body is empty, reads as
/// `{}`. Only an unreadable body (e.g. over the size limit) or unparseable
/// JSON is rejected. Field types are not checked here.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonBody(pub Value);

impl JsonBody {
    /// String value of `key`; missing keys and non-strings read as absent.
    pub fn string(&self, key: &str) -> Option<String> {
        self.0.get(key).and_then(Value::as_str).map(str::to_string)
    }
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
}

#[async_trait]
impl<S> FromRequest<S> for JsonBody
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let empty = || JsonBody(Value::Object(Map::new()));
        if !is_json(req.headers()) {
            return Ok(empty());
        }

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::new(e.status(), e.body_text()))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(empty());
        }

        let value: Value = serde_json::from_slice(&bytes)
            .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, e.to_string()))?;
        // only objects and arrays are accepted at the top level
        if !(value.is_object() || value.is_array()) {
            return Err(ApiError::new(
                StatusCode::BAD_REQUEST,
                "JSON body must be an object or an array",
            ));
        }
        Ok(JsonBody(value))
    }
}
