//! Batch service for the BrightLocal crate
//!
//! A batch groups API calls on the server so they can be committed or rolled
//! back together. The lifecycle is:
//!
//! 1. [`Batch::create`] asks the server for a new batch and stores its id.
//! 2. [`Batch::add_job`] enqueues any number of jobs under that id.
//! 3. [`Batch::commit`] starts processing, or [`Batch::stop`] / [`Batch::delete`]
//!    abandon the batch.
//! 4. [`Batch::get_results`] (or [`Batch::wait_for_results`]) reads the outcome.
//!
//! Every operation performs exactly one HTTP call, except the polling helper.
//! Operations that need a batch id fail with [`BatchError::Unbound`] before
//! sending anything when the batch has none.

mod error;

pub use error::BatchError;

use crate::client::Client;
use crate::response::ApiResponse;
use crate::types::Params;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, instrument};

/// Batch resource path
const BATCH_RESOURCE: &str = "/v4/batch";

/// Resource used to stop a running batch
const BATCH_STOP_RESOURCE: &str = "/v4/batch/stop";

/// Parameter carrying the batch id
const BATCH_ID_PARAM: &str = "batch-id";

/// Local view of where a batch is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    /// No server side batch yet
    Unbound,
    /// Created (or bound to an id) and accepting jobs
    Open,
    Committed,
    Stopped,
    Deleted,
}

/// Processing status reported in batch results
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchStatus {
    Finished,
    Stopped,
    /// Any other status, the batch is still being worked on
    InProgress(String),
}

impl BatchStatus {
    /// Read the `status` field of a results response
    pub fn from_response(response: &ApiResponse) -> Option<Self> {
        response.get("status").and_then(Value::as_str).map(Self::from)
    }

    /// Whether the server is done with the batch
    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchStatus::Finished | BatchStatus::Stopped)
    }
}

impl From<&str> for BatchStatus {
    fn from(status: &str) -> Self {
        match status {
            "Finished" => BatchStatus::Finished,
            "Stopped" => BatchStatus::Stopped,
            other => BatchStatus::InProgress(other.to_string()),
        }
    }
}

/// A server side batch of API calls
///
/// Not meant to be shared across concurrent operations; every call that talks
/// to the server takes `&mut self` or awaits a single request.
#[derive(Debug, Clone)]
pub struct Batch {
    client: Client,
    batch_id: Option<i64>,
    stop_on_job_error: bool,
    callback_url: Option<String>,
    state: BatchState,
}

impl Batch {
    /// Create a batch handle that is not yet bound to a server side batch
    pub fn new(client: Client) -> Self {
        Self {
            client,
            batch_id: None,
            stop_on_job_error: false,
            callback_url: None,
            state: BatchState::Unbound,
        }
    }

    /// Bind a handle to a batch that already exists on the server
    pub fn with_id(client: Client, batch_id: i64) -> Self {
        let mut batch = Self::new(client);
        batch.set_id(batch_id);
        batch
    }

    pub fn id(&self) -> Option<i64> {
        self.batch_id
    }

    pub fn set_id(&mut self, batch_id: i64) {
        self.batch_id = Some(batch_id);
        self.state = BatchState::Open;
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    pub fn stop_on_job_error(&self) -> bool {
        self.stop_on_job_error
    }

    pub fn callback_url(&self) -> Option<&str> {
        self.callback_url.as_deref()
    }

    /// Create the batch on the server
    ///
    /// # Arguments
    ///
    /// * `stop_on_job_error` - Whether the server should stop the batch when a job fails
    /// * `callback_url` - URL the server calls once the batch is done, ignored when empty
    ///
    /// # Returns
    ///
    /// The batch itself, now holding the id assigned by the server. On failure the
    /// batch is left untouched.
    #[instrument(skip(self), level = "debug")]
    pub async fn create(
        &mut self,
        stop_on_job_error: bool,
        callback_url: Option<&str>,
    ) -> Result<&mut Self, BatchError> {
        let params = create_params(stop_on_job_error, callback_url);
        let response = self.client.post(BATCH_RESOURCE, params).await?;

        let batch_id = match response.get(BATCH_ID_PARAM) {
            Some(id) => id.as_i64(),
            None => None,
        };
        let batch_id = match batch_id {
            Some(id) if response.is_success() => id,
            _ => {
                error!(
                    "Batch creation failed: status {} - {}",
                    response.status_code(),
                    response.result()
                );
                return Err(BatchError::Create {
                    errors: errors_of(&response),
                });
            }
        };

        debug!("Created batch {}", batch_id);
        self.batch_id = Some(batch_id);
        self.stop_on_job_error = stop_on_job_error;
        self.callback_url = callback_url.filter(|url| !url.is_empty()).map(String::from);
        self.state = BatchState::Open;
        Ok(self)
    }

    /// Commit the batch so the server starts processing its jobs
    ///
    /// Returns `true` on success; a refusal is an error, never `false`.
    #[instrument(skip(self), fields(batch_id = ?self.batch_id), level = "debug")]
    pub async fn commit(&mut self) -> Result<bool, BatchError> {
        let params = self.id_params("commit")?;
        let response = self.client.put(BATCH_RESOURCE, params).await?;
        if !response.is_success() {
            error!("Batch commit failed: {}", response.result());
            return Err(BatchError::Commit {
                errors: errors_of(&response),
            });
        }

        debug!("Committed batch");
        self.state = BatchState::Committed;
        Ok(true)
    }

    /// Add a job to the batch
    ///
    /// `batch-id` is injected into `params`, replacing any value the caller put
    /// there. The full response is returned so the caller can read the job id.
    #[instrument(skip(self, params), fields(batch_id = ?self.batch_id), level = "debug")]
    pub async fn add_job(
        &mut self,
        resource: &str,
        mut params: Params,
    ) -> Result<ApiResponse, BatchError> {
        let batch_id = self.require_id("add a job to")?;
        params.insert(BATCH_ID_PARAM, batch_id);

        let response = self.client.post(resource, params).await?;
        if !response.is_success() {
            error!("Adding job to {} failed: {}", resource, response.result());
            return Err(BatchError::AddJob {
                errors: errors_of(&response),
            });
        }

        debug!("Added job {} to batch", resource);
        Ok(response)
    }

    /// Stop a batch the server is processing
    #[instrument(skip(self), fields(batch_id = ?self.batch_id), level = "debug")]
    pub async fn stop(&mut self) -> Result<bool, BatchError> {
        let params = self.id_params("stop")?;
        let response = self.client.put(BATCH_STOP_RESOURCE, params).await?;
        if !response.is_success() {
            error!("Batch stop failed: {}", response.result());
            return Err(BatchError::Stop {
                errors: errors_of(&response),
            });
        }

        debug!("Stopped batch");
        self.state = BatchState::Stopped;
        Ok(true)
    }

    /// Delete the batch and the jobs in it
    ///
    /// Returns `true` on success; a refusal is an error, never `false`.
    #[instrument(skip(self), fields(batch_id = ?self.batch_id), level = "debug")]
    pub async fn delete(&mut self) -> Result<bool, BatchError> {
        let params = self.id_params("delete")?;
        let response = self.client.delete(BATCH_RESOURCE, params).await?;
        if !response.is_success() {
            error!("Batch delete failed: {}", response.result());
            return Err(BatchError::Delete {
                errors: errors_of(&response),
            });
        }

        debug!("Deleted batch");
        self.state = BatchState::Deleted;
        Ok(true)
    }

    /// Fetch the batch results
    ///
    /// The response is returned whatever its success flag; check
    /// [`ApiResponse::is_success`].
    #[instrument(skip(self), fields(batch_id = ?self.batch_id), level = "debug")]
    pub async fn get_results(&self) -> Result<ApiResponse, BatchError> {
        let params = self.id_params("get results of")?;
        Ok(self.client.get(BATCH_RESOURCE, params).await?)
    }

    /// Poll the results until the batch is finished or stopped
    ///
    /// Sleeps `interval` between polls and gives up with
    /// [`BatchError::PollTimeout`] after `max_polls` unfinished replies.
    #[instrument(skip(self), fields(batch_id = ?self.batch_id), level = "debug")]
    pub async fn wait_for_results(
        &self,
        interval: Duration,
        max_polls: u32,
    ) -> Result<ApiResponse, BatchError> {
        let batch_id = self.require_id("wait for results of")?;
        let max_polls = max_polls.max(1);

        for poll in 1..=max_polls {
            let response = self.get_results().await?;
            match BatchStatus::from_response(&response) {
                Some(status) if status.is_terminal() => return Ok(response),
                status => debug!("Poll {}/{}: batch status {:?}", poll, max_polls, status),
            }
            if poll < max_polls {
                tokio::time::sleep(interval).await;
            }
        }

        Err(BatchError::PollTimeout {
            batch_id,
            polls: max_polls,
        })
    }

    fn require_id(&self, operation: &'static str) -> Result<i64, BatchError> {
        self.batch_id.ok_or(BatchError::Unbound { operation })
    }

    fn id_params(&self, operation: &'static str) -> Result<Params, BatchError> {
        Ok(Params::new().with(BATCH_ID_PARAM, self.require_id(operation)?))
    }
}

/// Parameters for creating a batch
fn create_params(stop_on_job_error: bool, callback_url: Option<&str>) -> Params {
    let mut params = Params::new().with("stop-on-job-error", u8::from(stop_on_job_error));
    if let Some(callback_url) = callback_url.filter(|url| !url.is_empty()) {
        params.insert("callback", callback_url);
    }
    params
}

fn errors_of(response: &ApiResponse) -> Value {
    response.errors().cloned().unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ClientOptions;
    use mockito::{Matcher, Server, ServerGuard};
    use serde_json::json;

    fn test_client(server: &ServerGuard) -> Client {
        let options = ClientOptions::builder().endpoint(server.url()).build();
        Client::with_options("test-key", "test-secret", options).unwrap()
    }

    fn test_batch(server: &ServerGuard, batch_id: i64) -> Batch {
        Batch::with_id(test_client(server), batch_id)
    }

    #[test]
    fn test_create_params() {
        let params = create_params(true, Some("https://cb.example/hook"));
        assert_eq!(params.get("stop-on-job-error"), Some(&json!(1)));
        assert_eq!(params.get("callback"), Some(&json!("https://cb.example/hook")));

        let params = create_params(false, None);
        assert_eq!(params.get("stop-on-job-error"), Some(&json!(0)));
        assert!(!params.contains_key("callback"));

        let params = create_params(false, Some(""));
        assert!(!params.contains_key("callback"));
    }

    #[test]
    fn test_batch_status() {
        assert!(BatchStatus::from("Finished").is_terminal());
        assert!(BatchStatus::from("Stopped").is_terminal());
        assert_eq!(
            BatchStatus::from("Running"),
            BatchStatus::InProgress("Running".to_string())
        );
        assert!(!BatchStatus::from("Running").is_terminal());
    }

    #[tokio::test]
    async fn test_create_batch() {
        let mut server = Server::new_async().await;
        let mock_server = server
            .mock("POST", "/v4/batch")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("stop-on-job-error".into(), "1".into()),
                Matcher::UrlEncoded("callback".into(), "https://cb.example/hook".into()),
                Matcher::UrlEncoded("api-key".into(), "test-key".into()),
            ]))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success": true, "batch-id": 42}"#)
            .expect(1)
            .create_async()
            .await;

        let mut batch = Batch::new(test_client(&server));
        assert_eq!(batch.state(), BatchState::Unbound);

        batch
            .create(true, Some("https://cb.example/hook"))
            .await
            .unwrap();

        assert_eq!(batch.id(), Some(42));
        assert_eq!(batch.state(), BatchState::Open);
        assert!(batch.stop_on_job_error());
        assert_eq!(batch.callback_url(), Some("https://cb.example/hook"));

        mock_server.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_batch_failure_keeps_state() {
        let mut server = Server::new_async().await;
        let mock_server = server
            .mock("POST", "/v4/batch")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success": false, "errors": {"INVALID_CALLBACK": "Invalid callback URL"}}"#)
            .expect(1)
            .create_async()
            .await;

        let mut batch = test_batch(&server, 7);

        match batch.create(false, Some("not-a-url")).await {
            Err(BatchError::Create { errors }) => {
                assert_eq!(errors, json!({"INVALID_CALLBACK": "Invalid callback URL"}));
            }
            other => panic!("Expected create error, got {:?}", other.map(|b| b.id())),
        }
        assert_eq!(batch.id(), Some(7));
        assert_eq!(batch.callback_url(), None);

        mock_server.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_batch_rejects_non_integer_id() {
        let mut server = Server::new_async().await;
        let mock_server = server
            .mock("POST", "/v4/batch")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success": true, "batch-id": "42"}"#)
            .expect(1)
            .create_async()
            .await;

        let mut batch = Batch::new(test_client(&server));

        assert!(matches!(
            batch.create(false, None).await,
            Err(BatchError::Create { .. })
        ));
        assert_eq!(batch.id(), None);
        assert_eq!(batch.state(), BatchState::Unbound);

        mock_server.assert_async().await;
    }

    #[tokio::test]
    async fn test_add_job_injects_batch_id() {
        let mut server = Server::new_async().await;
        let mock_server = server
            .mock("POST", "/v4/clients")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("name".into(), "Acme".into()),
                Matcher::UrlEncoded("batch-id".into(), "42".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success": true, "job-id": 318}"#)
            .expect(1)
            .create_async()
            .await;

        let mut batch = test_batch(&server, 42);
        let params = Params::new().with("name", "Acme").with("batch-id", 999);
        let response = batch.add_job("/v4/clients", params).await.unwrap();

        assert_eq!(response.get("job-id"), Some(&json!(318)));

        mock_server.assert_async().await;
    }

    #[tokio::test]
    async fn test_add_job_failure() {
        let mut server = Server::new_async().await;
        let mock_server = server
            .mock("POST", "/v4/rankings/bulk-search")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success": false, "errors": {"search-engine": "Invalid search engine"}}"#)
            .expect(1)
            .create_async()
            .await;

        let mut batch = test_batch(&server, 42);
        let result = batch
            .add_job("/v4/rankings/bulk-search", Params::new().with("search-engine", "bing!"))
            .await;

        let err = result.unwrap_err();
        assert!(matches!(err, BatchError::AddJob { .. }));
        assert_eq!(
            err.errors(),
            Some(&json!({"search-engine": "Invalid search engine"}))
        );

        mock_server.assert_async().await;
    }

    #[tokio::test]
    async fn test_commit_batch() {
        let mut server = Server::new_async().await;
        let mock_server = server
            .mock("PUT", "/v4/batch")
            .match_body(Matcher::UrlEncoded("batch-id".into(), "42".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success": true}"#)
            .expect(1)
            .create_async()
            .await;

        let mut batch = test_batch(&server, 42);
        assert!(batch.commit().await.unwrap());
        assert_eq!(batch.state(), BatchState::Committed);

        mock_server.assert_async().await;
    }

    #[tokio::test]
    async fn test_commit_failure() {
        let mut server = Server::new_async().await;
        let mock_server = server
            .mock("PUT", "/v4/batch")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success": false, "errors": {"INVALID_JOBS_COUNT": "Batch has no jobs"}}"#)
            .expect(1)
            .create_async()
            .await;

        let mut batch = test_batch(&server, 42);
        let result = batch.commit().await;

        assert!(matches!(result, Err(BatchError::Commit { .. })));
        assert_eq!(batch.state(), BatchState::Open);

        mock_server.assert_async().await;
    }

    #[tokio::test]
    async fn test_stop_batch() {
        let mut server = Server::new_async().await;
        let mock_server = server
            .mock("PUT", "/v4/batch/stop")
            .match_body(Matcher::UrlEncoded("batch-id".into(), "42".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success": true}"#)
            .expect(1)
            .create_async()
            .await;

        let mut batch = test_batch(&server, 42);
        assert!(batch.stop().await.unwrap());
        assert_eq!(batch.state(), BatchState::Stopped);

        mock_server.assert_async().await;
    }

    #[tokio::test]
    async fn test_delete_batch() {
        let mut server = Server::new_async().await;
        let mock_server = server
            .mock("DELETE", "/v4/batch")
            .match_body(Matcher::UrlEncoded("batch-id".into(), "42".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success": true}"#)
            .expect(1)
            .create_async()
            .await;

        let mut batch = test_batch(&server, 42);
        assert!(batch.delete().await.unwrap());
        assert_eq!(batch.state(), BatchState::Deleted);

        mock_server.assert_async().await;
    }

    #[tokio::test]
    async fn test_delete_failure() {
        let mut server = Server::new_async().await;
        let mock_server = server
            .mock("DELETE", "/v4/batch")
            .with_status(404)
            .with_header("content-type", "application/json")
            .with_body(r#"{"errors": {"INVALID_BATCH_ID": "Batch ID not found"}}"#)
            .expect(1)
            .create_async()
            .await;

        let mut batch = test_batch(&server, 42);
        let result = batch.delete().await;

        assert!(matches!(result, Err(BatchError::Delete { .. })));

        mock_server.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_results_does_not_translate_failure() {
        let mut server = Server::new_async().await;
        let mock_server = server
            .mock("GET", "/v4/batch")
            .match_query(Matcher::UrlEncoded("batch-id".into(), "42".into()))
            .with_status(404)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success": false, "errors": {"INVALID_BATCH_ID": "Batch ID not found"}}"#)
            .expect(1)
            .create_async()
            .await;

        let batch = test_batch(&server, 42);
        let response = batch.get_results().await.unwrap();

        assert!(!response.is_success());
        assert!(response.errors().is_some());

        mock_server.assert_async().await;
    }

    #[tokio::test]
    async fn test_wait_for_results_stops_when_finished() {
        let mut server = Server::new_async().await;
        let mock_server = server
            .mock("GET", "/v4/batch")
            .match_query(Matcher::UrlEncoded("batch-id".into(), "42".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success": true, "status": "Finished", "results": {}}"#)
            .expect(1)
            .create_async()
            .await;

        let batch = test_batch(&server, 42);
        let response = batch
            .wait_for_results(Duration::from_millis(1), 5)
            .await
            .unwrap();

        assert_eq!(
            BatchStatus::from_response(&response),
            Some(BatchStatus::Finished)
        );

        mock_server.assert_async().await;
    }

    #[tokio::test]
    async fn test_wait_for_results_times_out() {
        let mut server = Server::new_async().await;
        let mock_server = server
            .mock("GET", "/v4/batch")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success": true, "status": "Running"}"#)
            .expect(3)
            .create_async()
            .await;

        let batch = test_batch(&server, 42);
        let result = batch.wait_for_results(Duration::from_millis(1), 3).await;

        assert!(matches!(
            result,
            Err(BatchError::PollTimeout {
                batch_id: 42,
                polls: 3
            })
        ));

        mock_server.assert_async().await;
    }

    #[tokio::test]
    async fn test_unbound_batch_sends_nothing() {
        let mut server = Server::new_async().await;
        let mock_server = server
            .mock("PUT", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let mut batch = Batch::new(test_client(&server));

        assert!(matches!(
            batch.commit().await,
            Err(BatchError::Unbound { operation: "commit" })
        ));
        assert!(matches!(
            batch.stop().await,
            Err(BatchError::Unbound { .. })
        ));
        assert!(matches!(
            batch.add_job("/v4/clients", Params::new()).await,
            Err(BatchError::Unbound { .. })
        ));
        assert!(matches!(
            batch.delete().await,
            Err(BatchError::Unbound { .. })
        ));
        assert!(matches!(
            batch.get_results().await,
            Err(BatchError::Unbound { .. })
        ));

        mock_server.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_batch_without_id_fails() {
        let mut server = Server::new_async().await;
        let mock_server = server
            .mock("POST", "/v4/batch")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success": true}"#)
            .expect(1)
            .create_async()
            .await;

        let mut batch = Batch::new(test_client(&server));

        match batch.create(false, None).await {
            Err(BatchError::Create { errors }) => assert_eq!(errors, Value::Null),
            other => panic!("Expected create error, got {:?}", other.map(|b| b.id())),
        }
        assert_eq!(batch.id(), None);
        assert_eq!(batch.state(), BatchState::Unbound);

        mock_server.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_batch_rejects_float_id() {
        let mut server = Server::new_async().await;
        let mock_server = server
            .mock("POST", "/v4/batch")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success": true, "batch-id": 42.0}"#)
            .expect(1)
            .create_async()
            .await;

        let mut batch = Batch::new(test_client(&server));

        assert!(matches!(
            batch.create(false, None).await,
            Err(BatchError::Create { .. })
        ));
        assert_eq!(batch.id(), None);

        mock_server.assert_async().await;
    }

    #[tokio::test]
    async fn test_stop_failure() {
        let mut server = Server::new_async().await;
        let mock_server = server
            .mock("PUT", "/v4/batch/stop")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success": false, "errors": ["Batch is not running"]}"#)
            .expect(1)
            .create_async()
            .await;

        let mut batch = test_batch(&server, 42);

        match batch.stop().await {
            Err(BatchError::Stop { errors }) => {
                assert_eq!(errors, json!(["Batch is not running"]));
            }
            other => panic!("Expected stop error, got {:?}", other),
        }
        assert_eq!(batch.state(), BatchState::Open);

        mock_server.assert_async().await;
    }

    #[tokio::test]
    async fn test_transport_failure_surfaces_as_client_error() {
        // Nothing listens on port 1
        let options = ClientOptions::builder()
            .endpoint("http://127.0.0.1:1")
            .timeout_secs(5)
            .build();
        let client = Client::with_options("test-key", "test-secret", options).unwrap();
        let mut batch = Batch::with_id(client, 42);

        let result = batch.commit().await;

        assert!(matches!(
            result,
            Err(BatchError::Client(crate::error::Error::Http(_)))
        ));
        assert_eq!(batch.state(), BatchState::Open);
    }

    #[tokio::test]
    async fn test_wait_for_results_on_unbound_batch() {
        let mut server = Server::new_async().await;
        let mock_server = server
            .mock("GET", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let batch = Batch::new(test_client(&server));
        let result = batch.wait_for_results(Duration::from_millis(1), 3).await;

        assert!(matches!(
            result,
            Err(BatchError::Unbound {
                operation: "wait for results of"
            })
        ));

        mock_server.assert_async().await;
    }
}
