//! # BrightLocal - API client for Rust
//!
//! This crate provides an idiomatic Rust interface to the BrightLocal SEO tools
//! API: signed requests to any resource, and a [`Batch`] helper that groups
//! jobs into a server side batch.
//!
//! ## Features
//!
//! - Request signing with the API key and secret
//! - Uniform [`ApiResponse`] for every call, whatever the HTTP status
//! - Batch lifecycle: create, add jobs, commit, stop, delete, read results
//! - Typed errors per batch operation carrying the server's error list
//! - Async API with Tokio
//!
//! ## Example
//!
//! ```rust,no_run
//! use brightlocal::{Client, Params};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::from_env()?;
//!
//!     let mut batch = client.create_batch(false, None).await?;
//!     let job = batch
//!         .add_job(
//!             "/v4/rankings/bulk-search",
//!             Params::new()
//!                 .with("search-engine", "google")
//!                 .with("country", "USA"),
//!         )
//!         .await?;
//!     println!("Added job {}", job.result());
//!
//!     batch.commit().await?;
//!     let results = batch.get_results().await?;
//!     println!("{}", results.result());
//!     Ok(())
//! }
//! ```

mod auth;
pub mod batch;
mod client;
mod error;
mod http;
mod response;
pub mod types;

pub use auth::Credentials;
pub use batch::{Batch, BatchError, BatchState, BatchStatus};
pub use client::{API_KEY_ENV, API_SECRET_ENV, Client, ENDPOINT_ENV};
pub use error::{Error, Result};
pub use response::ApiResponse;
pub use types::{ClientOptions, Method, Params};

/// Re-export of common types for public use
pub mod prelude {
    pub use crate::batch::{Batch, BatchError};
    pub use crate::client::Client;
    pub use crate::error::{Error, Result};
    pub use crate::response::ApiResponse;
    pub use crate::types::{Method, Params};
}
