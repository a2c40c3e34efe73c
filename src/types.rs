//! Type definitions for the BrightLocal crate
//!
//! This module contains the client configuration and the request parameter map.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Default API endpoint
pub const DEFAULT_ENDPOINT: &str = "https://tools.brightlocal.com/seo-tools/api";

/// Signatures can't be valid for more than 30 minutes
pub const MAX_SIGNATURE_TTL_SECS: u64 = 1800;

/// Default timeout for HTTP requests in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// HTTP method used for an API call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            other => Err(Error::InvalidRequest(format!(
                "Unsupported HTTP method: {}",
                other
            ))),
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Flat mapping of request parameters
///
/// Keys are kept sorted so the encoded request is deterministic. Values are
/// encoded on the wire as follows: strings verbatim, numbers in decimal,
/// booleans as `1`/`0`, arrays and objects as compact JSON text. Nulls are
/// dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(BTreeMap<String, Value>);

impl Params {
    /// Create an empty parameter map
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter, builder style
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert a parameter, replacing any previous value under the same key
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Merge `other` into this map; values from `other` win
    pub fn extend(&mut self, other: Params) {
        self.0.extend(other.0);
    }

    /// Encode the parameters as key/value pairs for a query string or form body
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .filter_map(|(key, value)| encode_value(value).map(|v| (key.clone(), v)))
            .collect()
    }
}

fn encode_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl TryFrom<Value> for Params {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(map.into_iter().collect()),
            Value::Null => Ok(Params::new()),
            other => Err(Error::InvalidRequest(format!(
                "Parameters must be a JSON object, got {}",
                other
            ))),
        }
    }
}

/// Options for client configuration
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Base URL the resources are resolved against
    pub endpoint: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// How long a request signature stays valid, at most 1800 seconds
    pub signature_ttl_secs: u64,

    /// User agent sent with every request
    pub user_agent: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            signature_ttl_secs: MAX_SIGNATURE_TTL_SECS,
            user_agent: format!("brightlocal-rs/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientOptions {
    /// Create a builder starting from the default options
    pub fn builder() -> ClientOptionsBuilder {
        ClientOptionsBuilder::default()
    }

    /// Check the options are usable
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(Error::Config("Endpoint must not be empty".to_string()));
        }
        url::Url::parse(&self.endpoint)
            .map_err(|e| Error::Config(format!("Invalid endpoint {}: {}", self.endpoint, e)))?;
        if self.signature_ttl_secs == 0 || self.signature_ttl_secs > MAX_SIGNATURE_TTL_SECS {
            return Err(Error::Config(format!(
                "Signature TTL must be between 1 and {} seconds, got {}",
                MAX_SIGNATURE_TTL_SECS, self.signature_ttl_secs
            )));
        }
        Ok(())
    }
}

/// Builder for ClientOptions
#[derive(Debug, Default)]
pub struct ClientOptionsBuilder {
    options: ClientOptions,
}

impl ClientOptionsBuilder {
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.options.endpoint = endpoint.into();
        self
    }

    pub fn timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.options.timeout_secs = timeout_secs;
        self
    }

    pub fn signature_ttl_secs(mut self, signature_ttl_secs: u64) -> Self {
        self.options.signature_ttl_secs = signature_ttl_secs;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.options.user_agent = user_agent.into();
        self
    }

    pub fn build(self) -> ClientOptions {
        self.options
    }
}
