//! Request signing for the BrightLocal API
//!
//! Every request carries `api-key`, `expires` and `sig`, where `sig` is the
//! base64 encoded HMAC-SHA1 of the API key followed by `expires`, keyed with
//! the API secret.

use crate::error::{Error, Result};
use crate::types::Params;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// API credentials
#[derive(Clone)]
pub struct Credentials {
    api_key: String,
    api_secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Create credentials from an API key and secret
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        let api_secret = api_secret.into();

        if api_key.trim().is_empty() {
            return Err(Error::Auth("API key must not be empty".to_string()));
        }
        if api_secret.trim().is_empty() {
            return Err(Error::Auth("API secret must not be empty".to_string()));
        }

        Ok(Self {
            api_key,
            api_secret,
        })
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Sign the API key for the given expiry timestamp
    pub fn sign(&self, expires: i64) -> Result<String> {
        let mut mac = HmacSha1::new_from_slice(self.api_secret.as_bytes())
            .map_err(|e| Error::Auth(format!("Invalid API secret: {}", e)))?;
        mac.update(self.api_key.as_bytes());
        mac.update(expires.to_string().as_bytes());
        Ok(base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
    }

    /// Authentication parameters valid for `ttl_secs` from now
    pub fn auth_params(&self, ttl_secs: u64) -> Result<Params> {
        let ttl = i64::try_from(ttl_secs)
            .map_err(|_| Error::Config(format!("Signature TTL too large: {}", ttl_secs)))?;
        let expires = chrono::Utc::now().timestamp() + ttl;
        self.auth_params_at(expires)
    }

    fn auth_params_at(&self, expires: i64) -> Result<Params> {
        Ok(Params::new()
            .with("api-key", self.api_key.clone())
            .with("sig", self.sign(expires)?)
            .with("expires", expires))
    }
}
