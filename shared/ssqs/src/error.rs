use aws_sdk_sqs::error::SdkError;
use aws_sdk_sqs::operation::delete_message::DeleteMessageError;
use aws_sdk_sqs::operation::receive_message::ReceiveMessageError;
use thiserror::Error;

use crate::types::Message;

/// Result type alias for queue client operations
pub type QueueResult<T> = Result<T, QueueError>;

/// Result type alias for consumer operations
pub type ConsumerResult<T> = Result<T, ConsumerError>;

/// Error types for queue client operations
#[derive(Error, Debug)]
pub enum QueueError {
    /// Error receiving messages from SQS
    #[error("Failed to receive messages from SQS")]
    ReceiveMessage(#[from] SdkError<ReceiveMessageError>),

    /// Error deleting message from SQS
    #[error("Failed to delete message from SQS")]
    DeleteMessage(#[from] SdkError<DeleteMessageError>),

    /// Error reported by a queue backend that is not the AWS SDK
    #[error("Queue service error: {0}")]
    Service(String),

    /// Invalid message format
    #[error("Invalid message format: {0}")]
    InvalidMessage(String),

    /// Error deserializing a message body from JSON
    #[error("Failed to deserialize message: {0}")]
    Deserialization(#[from] serde_json::Error),
}

impl QueueError {
    /// Checks if this error represents an upstream (5xx) error
    #[must_use]
    pub fn is_upstream_error(&self) -> bool {
        match self {
            Self::ReceiveMessage(sdk_err) => Self::check_sdk_error_status(sdk_err),
            Self::DeleteMessage(sdk_err) => Self::check_sdk_error_status(sdk_err),
            _ => false,
        }
    }

    fn check_sdk_error_status<E>(sdk_err: &SdkError<E>) -> bool {
        if let SdkError::ServiceError(err) = sdk_err {
            return err.raw().status().as_u16() >= 500;
        }
        false
    }
}

/// Returned when deleting a message fails. The message is not retried.
#[derive(Error, Debug)]
#[error("error deleting message: {}", .message.message_id)]
pub struct DeleteError {
    /// The message whose deletion failed
    pub message: Message,
    /// The underlying queue error
    #[source]
    pub source: QueueError,
}

/// Error types surfaced by the consumer
#[derive(Error, Debug)]
pub enum ConsumerError {
    /// The queue configuration was rejected at construction
    #[error("Invalid queue configuration: {0}")]
    InvalidConfig(String),

    /// `start` was called on a consumer that was already started
    #[error("Consumer has already been started")]
    AlreadyStarted,

    /// A receive call failed; polling continues
    #[error("Failed to receive messages")]
    Receive(#[source] QueueError),

    /// A delete call failed
    #[error(transparent)]
    Delete(#[from] DeleteError),

    /// The polling task panicked or was aborted
    #[error("Consumer task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
