//! In-memory [`QueueClient`] for tests

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::client::QueueClient;
use crate::error::{QueueError, QueueResult};
use crate::types::RawMessage;

/// Parameters of one `receive_messages` call seen by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveCall {
    /// Queue URL passed by the consumer
    pub queue_url: String,
    /// Visibility timeout passed by the consumer
    pub visibility_timeout: i32,
    /// Long-poll wait passed by the consumer
    pub wait_time_seconds: i32,
    /// Batch size passed by the consumer
    pub max_messages: i32,
}

/// Scripted queue client
///
/// Each receive call pops the next scripted poll result. Once the script is exhausted the
/// mock behaves like an empty queue: it waits for the requested long-poll duration
/// (at least one millisecond) and returns no messages.
#[derive(Debug, Default)]
pub struct MockQueueClient {
    polls: Mutex<VecDeque<QueueResult<Vec<RawMessage>>>>,
    failing_receipts: HashSet<String>,
    receive_calls: Mutex<Vec<ReceiveCall>>,
    deleted_receipts: Mutex<Vec<String>>,
    receive_count: AtomicUsize,
}

impl MockQueueClient {
    /// Creates a mock that returns `polls` in order, then an empty queue forever
    #[must_use]
    pub fn new(polls: impl IntoIterator<Item = QueueResult<Vec<RawMessage>>>) -> Self {
        Self {
            polls: Mutex::new(polls.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Makes `delete_message` fail for the given receipt handle
    #[must_use]
    pub fn fail_delete_for(mut self, receipt_handle: &str) -> Self {
        self.failing_receipts.insert(receipt_handle.to_string());
        self
    }

    /// Number of receive calls made so far
    #[must_use]
    pub fn receive_count(&self) -> usize {
        self.receive_count.load(Ordering::SeqCst)
    }

    /// Every receive call made so far, in order
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned
    #[must_use]
    pub fn receive_calls(&self) -> Vec<ReceiveCall> {
        self.receive_calls.lock().expect("mock lock poisoned").clone()
    }

    /// Receipt handles successfully deleted so far, in order
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned
    #[must_use]
    pub fn deleted_receipts(&self) -> Vec<String> {
        self.deleted_receipts.lock().expect("mock lock poisoned").clone()
    }
}

#[async_trait::async_trait]
impl QueueClient for MockQueueClient {
    async fn receive_messages(
        &self,
        queue_url: &str,
        visibility_timeout: i32,
        wait_time_seconds: i32,
        max_messages: i32,
    ) -> QueueResult<Vec<RawMessage>> {
        self.receive_count.fetch_add(1, Ordering::SeqCst);
        self.receive_calls
            .lock()
            .expect("mock lock poisoned")
            .push(ReceiveCall {
                queue_url: queue_url.to_string(),
                visibility_timeout,
                wait_time_seconds,
                max_messages,
            });

        let next = self.polls.lock().expect("mock lock poisoned").pop_front();
        if let Some(result) = next {
            return result;
        }

        let wait = Duration::from_secs(u64::try_from(wait_time_seconds).unwrap_or_default());
        tokio::time::sleep(wait.max(Duration::from_millis(1))).await;
        Ok(Vec::new())
    }

    async fn delete_message(&self, _queue_url: &str, receipt_handle: &str) -> QueueResult<()> {
        if self.failing_receipts.contains(receipt_handle) {
            return Err(QueueError::Service(format!(
                "receipt handle {receipt_handle} is invalid"
            )));
        }

        self.deleted_receipts
            .lock()
            .expect("mock lock poisoned")
            .push(receipt_handle.to_string());
        Ok(())
    }
}

/// Builds a raw message with every field present
#[must_use]
pub fn raw_message(message_id: &str, body: &str, receipt_handle: &str) -> RawMessage {
    RawMessage {
        message_id: Some(message_id.to_string()),
        body: Some(body.to_string()),
        receipt_handle: Some(receipt_handle.to_string()),
    }
}
