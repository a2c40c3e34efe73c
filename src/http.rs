//! HTTP client implementation for the BrightLocal crate
//!
//! This module provides the HTTP client for making signed requests to the
//! BrightLocal API.

use crate::auth::Credentials;
use crate::error::{Error, Result};
use crate::response::ApiResponse;
use crate::types::{ClientOptions, Method, Params};
use reqwest::{Client as ReqwestClient, RequestBuilder};
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

/// Prefix older resource paths were written with; the endpoint already carries it
const LEGACY_PATH_PREFIX: &str = "/seo-tools/api";

/// HTTP client for making requests to the BrightLocal API
///
/// Authentication parameters are merged into every request. GET requests send
/// their parameters in the query string, every other method sends them as a
/// form encoded body.
#[derive(Clone)]
pub struct HttpClient {
    /// The underlying reqwest client
    client: ReqwestClient,

    /// Base URL for API requests
    endpoint: String,

    /// API key and secret
    credentials: Credentials,

    /// How long each request signature stays valid
    signature_ttl_secs: u64,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("endpoint", &self.endpoint)
            .field("credentials", &self.credentials)
            .field("signature_ttl_secs", &self.signature_ttl_secs)
            .finish()
    }
}

impl HttpClient {
    /// Create a new HTTP client with custom options
    pub fn new(credentials: Credentials, options: ClientOptions) -> Result<Self> {
        options.validate()?;

        let client = ReqwestClient::builder()
            .timeout(Duration::from_secs(options.timeout_secs))
            .user_agent(options.user_agent)
            .build()
            .map_err(Error::Http)?;

        Ok(Self {
            client,
            endpoint: options.endpoint.trim_end_matches('/').to_string(),
            credentials,
            signature_ttl_secs: options.signature_ttl_secs,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Build the URL for a resource
    ///
    /// Accepts a plain path, a path still carrying the `/seo-tools/api` prefix,
    /// or a full URL under the configured endpoint.
    fn build_url(&self, resource: &str) -> Result<Url> {
        let resource = resource.strip_prefix(&self.endpoint).unwrap_or(resource);
        let resource = resource.replace(LEGACY_PATH_PREFIX, "");
        let url = format!("{}/{}", self.endpoint, resource.trim_start_matches('/'));
        Url::parse(&url).map_err(|e| Error::InvalidRequest(format!("Invalid URL {}: {}", url, e)))
    }

    /// Merge authentication parameters with the caller's; the caller's win
    fn signed_params(&self, params: Params) -> Result<Params> {
        let mut signed = self.credentials.auth_params(self.signature_ttl_secs)?;
        signed.extend(params);
        Ok(signed)
    }

    /// Send a request and wrap the reply
    #[instrument(skip(self, params), level = "debug")]
    pub async fn call(&self, method: Method, resource: &str, params: Params) -> Result<ApiResponse> {
        let url = self.build_url(resource)?;
        let pairs = self.signed_params(params)?.to_pairs();

        let request = self.client.request(method.into(), url);
        let request = match method {
            Method::Get => request.query(&pairs),
            Method::Post | Method::Put | Method::Delete => request.form(&pairs),
        };

        debug!("Sending {} request to {}", method, resource);
        self.execute_request(request).await
    }

    /// Execute an HTTP request and handle the response
    async fn execute_request(&self, request: RequestBuilder) -> Result<ApiResponse> {
        let response = request.send().await.map_err(Error::Http)?;

        let status = response.status();
        let response_text = response.text().await.map_err(Error::Http)?;

        if !status.is_success() {
            warn!("API returned {} - {}", status, response_text);
        }

        ApiResponse::from_body(status.as_u16(), &response_text)
    }
}
