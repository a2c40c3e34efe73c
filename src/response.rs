//! Uniform wrapper around a BrightLocal API reply

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Response from an API call
///
/// Wraps the HTTP status code together with the decoded JSON payload. A reply
/// with a 4xx/5xx status is still a response; check [`ApiResponse::is_success`].
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    status_code: u16,
    result: Value,
}

impl ApiResponse {
    pub fn new(status_code: u16, result: Value) -> Self {
        Self {
            status_code,
            result,
        }
    }

    /// Decode a raw response body
    ///
    /// An empty body is read as an empty object.
    pub fn from_body(status_code: u16, body: &str) -> Result<Self> {
        let result = if body.trim().is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_str(body).map_err(|e| {
                Error::UnexpectedResponse(format!("Failed to parse response: {}", e))
            })?
        };
        Ok(Self::new(status_code, result))
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn result(&self) -> &Value {
        &self.result
    }

    pub fn into_result(self) -> Value {
        self.result
    }

    /// Look up a top-level field of the result
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.result.get(key)
    }

    /// The `errors` entry reported by the server, if any
    pub fn errors(&self) -> Option<&Value> {
        self.get("errors").filter(|errors| !errors.is_null())
    }

    /// Whether the call succeeded
    ///
    /// A `success` field in the payload takes precedence; otherwise a 200 or
    /// 201 status counts as success.
    pub fn is_success(&self) -> bool {
        match self.get("success") {
            Some(success) => is_truthy(success),
            None => matches!(self.status_code, 200 | 201),
        }
    }

    /// Deserialize the result payload into a typed structure
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.result.clone()).map_err(Error::Json)
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !(s.is_empty() || s == "0" || s.eq_ignore_ascii_case("false")),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}
