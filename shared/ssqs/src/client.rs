//! Queue client adapter
//!
//! [`QueueClient`] is the narrow capability the consumer drives. [`SqsQueueClient`]
//! implements it on top of the AWS SDK; tests substitute an in-memory client.

use std::sync::Arc;

use aws_sdk_sqs::Client as SqsClient;

use crate::error::QueueResult;
use crate::types::RawMessage;

/// Receive and delete operations of a remote queue
///
/// Implementations must not retry, batch or back off: failures are handed to the consumer as-is.
#[async_trait::async_trait]
pub trait QueueClient: Send + Sync + 'static {
    /// Long-polls the queue for up to `wait_time_seconds`
    ///
    /// Returns the received messages in service order, or an empty vector if the
    /// wait elapsed with nothing available.
    async fn receive_messages(
        &self,
        queue_url: &str,
        visibility_timeout: i32,
        wait_time_seconds: i32,
        max_messages: i32,
    ) -> QueueResult<Vec<RawMessage>>;

    /// Deletes a received message using its receipt handle
    async fn delete_message(&self, queue_url: &str, receipt_handle: &str) -> QueueResult<()>;
}

/// [`QueueClient`] backed by AWS SQS
#[derive(Debug, Clone)]
pub struct SqsQueueClient {
    sqs_client: Arc<SqsClient>,
}

impl SqsQueueClient {
    /// Creates a new SQS queue client
    ///
    /// # Arguments
    ///
    /// * `sqs_client` - Pre-configured SQS client
    #[must_use]
    pub const fn new(sqs_client: Arc<SqsClient>) -> Self {
        Self { sqs_client }
    }
}

#[async_trait::async_trait]
impl QueueClient for SqsQueueClient {
    async fn receive_messages(
        &self,
        queue_url: &str,
        visibility_timeout: i32,
        wait_time_seconds: i32,
        max_messages: i32,
    ) -> QueueResult<Vec<RawMessage>> {
        let result = self
            .sqs_client
            .receive_message()
            .queue_url(queue_url)
            .max_number_of_messages(max_messages)
            .visibility_timeout(visibility_timeout)
            .wait_time_seconds(wait_time_seconds)
            .send()
            .await?;

        Ok(result
            .messages()
            .iter()
            .map(|msg| RawMessage {
                message_id: msg.message_id().map(ToString::to_string),
                body: msg.body().map(ToString::to_string),
                receipt_handle: msg.receipt_handle().map(ToString::to_string),
            })
            .collect())
    }

    async fn delete_message(&self, queue_url: &str, receipt_handle: &str) -> QueueResult<()> {
        self.sqs_client
            .delete_message()
            .queue_url(queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await?;

        Ok(())
    }
}
