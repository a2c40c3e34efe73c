//! Error types for the batch module

use crate::error::Error as CrateError;
use serde_json::Value;
use thiserror::Error;

/// Error type for batch operations
///
/// Server reported failures carry the `errors` payload from the response,
/// `Value::Null` when the server sent none.
#[derive(Debug, Error)]
pub enum BatchError {
    /// The server refused to create the batch or returned no usable batch id
    #[error("An error occurred and we were unable to create the batch. Errors: {errors}")]
    Create { errors: Value },

    /// The server refused to commit the batch
    #[error("An error occurred and we aren't able to commit the batch. Errors: {errors}")]
    Commit { errors: Value },

    /// The server refused to add the job to the batch
    #[error("An error occurred and we weren't able to add the job to the batch. Errors: {errors}")]
    AddJob { errors: Value },

    /// The server refused to delete the batch
    #[error("An error occurred and we weren't able to delete the batch. Errors: {errors}")]
    Delete { errors: Value },

    /// The server refused to stop the batch
    #[error("An error occurred and we weren't able to stop the batch. Errors: {errors}")]
    Stop { errors: Value },

    /// The batch has no id yet; `create` it or bind it to an existing id first
    #[error("Cannot {operation} a batch that has not been created")]
    Unbound { operation: &'static str },

    /// Results were still pending after the allowed number of polls
    #[error("Batch {batch_id} did not finish after {polls} polls")]
    PollTimeout { batch_id: i64, polls: u32 },

    /// Transport or decoding failure from the underlying client
    #[error(transparent)]
    Client(#[from] CrateError),
}

impl BatchError {
    /// The server reported errors, if this is a server side failure
    pub fn errors(&self) -> Option<&Value> {
        match self {
            BatchError::Create { errors }
            | BatchError::Commit { errors }
            | BatchError::AddJob { errors }
            | BatchError::Delete { errors }
            | BatchError::Stop { errors } => Some(errors),
            _ => None,
        }
    }
}

impl From<BatchError> for CrateError {
    fn from(err: BatchError) -> Self {
        match err {
            BatchError::Client(e) => e,
            _ => CrateError::Batch(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_error_keeps_its_kind() {
        let err = BatchError::Client(CrateError::UnexpectedResponse("not json".to_string()));
        assert!(matches!(
            CrateError::from(err),
            CrateError::UnexpectedResponse(message) if message == "not json"
        ));
    }

    #[tokio::test]
    async fn test_http_error_is_preserved() {
        let http_error = reqwest::Client::new()
            .get("http://127.0.0.1:1")
            .send()
            .await
            .unwrap_err();

        let err = CrateError::from(BatchError::Client(CrateError::Http(http_error)));
        assert!(matches!(err, CrateError::Http(_)));
    }

    #[test]
    fn test_server_failures_become_batch_errors() {
        let err = CrateError::from(BatchError::Unbound { operation: "commit" });
        assert!(matches!(
            err,
            CrateError::Batch(ref message) if message == "Cannot commit a batch that has not been created"
        ));

        let err = CrateError::from(BatchError::Delete {
            errors: json!({"INVALID_BATCH_ID": "Batch ID not found"}),
        });
        match err {
            CrateError::Batch(message) => assert!(message.contains("INVALID_BATCH_ID")),
            other => panic!("Expected batch error, got {:?}", other),
        }
    }

    #[test]
    fn test_errors_accessor() {
        let err = BatchError::Commit {
            errors: json!(["Batch has no jobs"]),
        };
        assert_eq!(err.errors(), Some(&json!(["Batch has no jobs"])));
        assert_eq!(BatchError::Unbound { operation: "stop" }.errors(), None);
    }
}
