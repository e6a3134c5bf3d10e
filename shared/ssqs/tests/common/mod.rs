//! LocalStack SQS test setup utilities

#![allow(dead_code)]

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_sqs::{config::Region, Client as SqsClient};
use ssqs::Queue;
use std::sync::Arc;
use uuid::Uuid;

/// Test context that provides an SQS client and a fresh queue
pub struct QueueTestContext {
    pub sqs_client: Arc<SqsClient>,
    pub queue_name: String,
    pub queue_url: String,
}

impl QueueTestContext {
    /// Creates a new test context with a unique standard queue
    pub async fn new(test_name: &str) -> Self {
        let queue_name = format!("{}-{}", test_name, Uuid::new_v4());

        // Setup LocalStack client with hardcoded credentials for CI
        let credentials = Credentials::from_keys(
            "test", // AWS_ACCESS_KEY_ID
            "test", // AWS_SECRET_ACCESS_KEY
            None,   // no session token
        );

        let config = aws_config::defaults(BehaviorVersion::latest())
            .endpoint_url("http://localhost:4566")
            .region(Region::new("us-east-1"))
            .credentials_provider(credentials)
            .load()
            .await;

        let sqs_client = Arc::new(SqsClient::new(&config));

        let result = sqs_client
            .create_queue()
            .queue_name(&queue_name)
            .send()
            .await
            .expect("Failed to create test queue");

        let queue_url = result
            .queue_url()
            .expect("Queue URL not returned")
            .to_string();

        Self {
            sqs_client,
            queue_name,
            queue_url,
        }
    }

    /// Queue config pointing at the test queue
    pub fn queue(&self, poll_duration: i32) -> Queue {
        Queue {
            name: self.queue_name.clone(),
            url: self.queue_url.clone(),
            poll_duration,
            visibility_timeout: 30,
            max_messages: 10,
            region: Some("us-east-1".to_string()),
        }
    }

    /// Sends a raw body to the test queue and returns its message ID
    pub async fn send(&self, body: &str) -> String {
        self.sqs_client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(body)
            .send()
            .await
            .expect("Failed to send test message")
            .message_id()
            .unwrap_or_default()
            .to_string()
    }
}

impl Drop for QueueTestContext {
    fn drop(&mut self) {
        // Clean up the queue
        let client = self.sqs_client.clone();
        let queue_url = self.queue_url.clone();

        // Use tokio runtime to delete queue
        let handle = tokio::runtime::Handle::try_current();
        if let Ok(handle) = handle {
            handle.spawn(async move {
                let _ = client.delete_queue().queue_url(&queue_url).send().await;
            });
        }
    }
}
