//! Standard JSON response envelope
//!
//! Every JSON route answers with the same shape:
//!
//! ```json
//! {"status": "success", "code": 200, "data": [...], "message": null, "meta": {"count": 2}}
//! ```
//!
//! Handlers may return a prebuilt [`JsonResponse`]; anything else is wrapped
//! with [`JsonResponse::standard`].

use crate::HttpStatus;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Content type of every JSON body the dispatcher writes
pub const JSON_CONTENT_TYPE: &str = "application/json;charset=UTF-8";

/// Cache directive sent with JSON route results
pub const NO_CACHE: &str = "no-cache, no-store, must-revalidate";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonResponse {
    pub status: String,
    pub code: u16,
    pub data: Value,
    pub message: Option<String>,
    #[serde(default)]
    pub meta: Map<String, Value>,
}

impl JsonResponse {
    pub fn new(status: impl Into<String>, code: u16, data: Value, message: Option<String>) -> Self {
        Self {
            status: status.into(),
            code,
            data,
            message,
            meta: Map::new(),
        }
    }

    pub fn success(data: Value) -> Self {
        Self::new("success", HttpStatus::Ok.code(), data, None)
    }

    pub fn success_with_message(data: Value, message: impl Into<String>) -> Self {
        Self::new("success", HttpStatus::Ok.code(), data, Some(message.into()))
    }

    /// Success carrying `meta.count`
    pub fn success_with_count(data: Value, count: usize) -> Self {
        Self::success(data).with_meta("count", count)
    }

    pub fn error(message: impl Into<String>, code: u16) -> Self {
        Self::new("error", code, Value::Null, Some(message.into()))
    }

    pub fn not_found() -> Self {
        Self::error("Resource not found", HttpStatus::NotFound.code())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::error(message, HttpStatus::BadRequest.code())
    }

    /// Wrap a handler result: arrays get `meta.count`.
    pub fn standard(data: Value) -> Self {
        match &data {
            Value::Array(items) => {
                let count = items.len();
                Self::success_with_count(data, count)
            }
            _ => Self::success(data),
        }
    }

    /// Add a meta entry; values that fail to serialize are stored as `null`.
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.meta.insert(key.into(), value);
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}
