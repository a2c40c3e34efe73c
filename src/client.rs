//! Client implementation for the BrightLocal crate
//!
//! This module provides the main client interface for interacting with the
//! BrightLocal API.

use crate::auth::Credentials;
use crate::batch::{Batch, BatchError};
use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::response::ApiResponse;
use crate::types::{ClientOptions, Method, Params};

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "BRIGHT_LOCAL_API_KEY";

/// Environment variable holding the API secret
pub const API_SECRET_ENV: &str = "BRIGHT_LOCAL_API_SECRET";

/// Environment variable overriding the API endpoint
pub const ENDPOINT_ENV: &str = "BRIGHT_LOCAL_ENDPOINT";

/// Client for the BrightLocal API
///
/// This is the main entry point. Every call is signed with the credentials
/// given at construction and returns an [`ApiResponse`] whatever the HTTP
/// status. Clones share the same connection pool.
///
/// # Examples
///
/// ```no_run
/// use brightlocal::Client;
///
/// # async fn run() -> brightlocal::Result<()> {
/// let client = Client::new("api-key", "api-secret")?;
/// let response = client.get("/v1/clients-and-locations/clients/1", Default::default()).await?;
/// println!("{}", response.result());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Client {
    http_client: HttpClient,
}

impl Client {
    /// Create a new client with the default options
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Result<Self> {
        Self::with_options(api_key, api_secret, ClientOptions::default())
    }

    /// Create a new client with custom options
    pub fn with_options(
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        options: ClientOptions,
    ) -> Result<Self> {
        let credentials = Credentials::new(api_key, api_secret)?;
        let http_client = HttpClient::new(credentials, options)?;
        Ok(Self { http_client })
    }

    /// Create a new client from the `BRIGHT_LOCAL_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_env_with_options(Self::env_options())
    }

    /// Create a new client with credentials from the environment and custom options
    ///
    /// Use [`Client::env_options`] as a starting point to keep honouring
    /// `BRIGHT_LOCAL_ENDPOINT`.
    pub fn from_env_with_options(options: ClientOptions) -> Result<Self> {
        Self::from_lookup(env_lookup, options)
    }

    /// Default options with the endpoint taken from `BRIGHT_LOCAL_ENDPOINT` when set
    pub fn env_options() -> ClientOptions {
        options_from_lookup(env_lookup)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>, options: ClientOptions) -> Result<Self> {
        let api_key = require_var(&lookup, API_KEY_ENV)?;
        let api_secret = require_var(&lookup, API_SECRET_ENV)?;
        Self::with_options(api_key, api_secret, options)
    }

    /// The endpoint resources are resolved against
    pub fn endpoint(&self) -> &str {
        self.http_client.endpoint()
    }

    /// Make a signed call with the given method
    pub async fn call(&self, method: Method, resource: &str, params: Params) -> Result<ApiResponse> {
        self.http_client.call(method, resource, params).await
    }

    pub async fn get(&self, resource: &str, params: Params) -> Result<ApiResponse> {
        self.call(Method::Get, resource, params).await
    }

    pub async fn post(&self, resource: &str, params: Params) -> Result<ApiResponse> {
        self.call(Method::Post, resource, params).await
    }

    pub async fn put(&self, resource: &str, params: Params) -> Result<ApiResponse> {
        self.call(Method::Put, resource, params).await
    }

    pub async fn delete(&self, resource: &str, params: Params) -> Result<ApiResponse> {
        self.call(Method::Delete, resource, params).await
    }

    /// A batch handle bound to this client, not yet created on the server
    pub fn batch(&self) -> Batch {
        Batch::new(self.clone())
    }

    /// Create a new batch on the server
    pub async fn create_batch(
        &self,
        stop_on_job_error: bool,
        callback_url: Option<&str>,
    ) -> std::result::Result<Batch, BatchError> {
        let mut batch = self.batch();
        batch.create(stop_on_job_error, callback_url).await?;
        Ok(batch)
    }

    /// A handle for a batch that already exists on the server
    pub fn get_batch(&self, batch_id: i64) -> Batch {
        Batch::with_id(self.clone(), batch_id)
    }
}

fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn options_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ClientOptions {
    let mut options = ClientOptions::default();
    if let Some(endpoint) = lookup(ENDPOINT_ENV) {
        options.endpoint = endpoint;
    }
    options
}

fn require_var(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<String> {
    lookup(name)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| Error::Config(format!("{} environment variable must be set", name)))
}
