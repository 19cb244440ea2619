//! Transport shim: request/response calls to the fleet service and the
//! push channel that delivers live events.

pub mod event_system;
pub mod http;
pub mod socket;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),
    #[error("HTTP status {status} for {action}")]
    Status { action: String, status: u16 },
    #[error("Request failed: {0}")]
    Request(String),
    #[error("Response is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// One field of a multipart upload.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text { name: String, value: String },
    File { name: String, file_name: String, contents: Vec<u8> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Json(Value),
    Multipart(Vec<Part>),
}

/// A single call against a named remote action.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub action: String,
    pub method: Method,
    pub query: Vec<(String, String)>,
    pub body: Option<Body>,
}

impl ApiRequest {
    pub fn get(action: &str) -> Self {
        Self {
            action: action.to_string(),
            method: Method::Get,
            query: Vec::new(),
            body: None,
        }
    }

    pub fn post(action: &str, body: Value) -> Self {
        Self {
            action: action.to_string(),
            method: Method::Post,
            query: Vec::new(),
            body: Some(Body::Json(body)),
        }
    }

    pub fn multipart(action: &str, parts: Vec<Part>) -> Self {
        Self {
            action: action.to_string(),
            method: Method::Post,
            query: Vec::new(),
            body: Some(Body::Multipart(parts)),
        }
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn json_body(&self) -> Option<&Value> {
        match &self.body {
            Some(Body::Json(value)) => Some(value),
            _ => None,
        }
    }
}

/// Performs request/response calls. `Ok(None)` means the service answered
/// with an empty body. A failure status carrying a JSON body is returned as
/// `Ok(Some(body))`; without one it is `TransportError::Status`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(&self, request: ApiRequest) -> Result<Option<Value>, TransportError>;
}

/// Empty replies: `null`, `false`, `0` and `""`. Arrays and objects
/// always count as a value.
pub fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}
