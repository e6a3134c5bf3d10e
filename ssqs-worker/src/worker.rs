use anyhow::Context;
use ssqs::{Consumer, ConsumerError, Message, QueueClient};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

/// Counters reported when the worker stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Messages received and deleted
    pub processed: u64,
    /// Messages whose delete failed
    pub delete_failures: u64,
    /// Errors reported by the consumer's polling task
    pub receive_failures: u64,
}

/// `QueueWorker` drains a consumer, logging and acknowledging every message
pub struct QueueWorker<C> {
    consumer: Consumer<C>,
    shutdown: CancellationToken,
    stats: WorkerStats,
}

impl<C: QueueClient> QueueWorker<C> {
    /// Creates a new `QueueWorker`
    #[must_use]
    pub const fn new(consumer: Consumer<C>, shutdown: CancellationToken) -> Self {
        Self {
            consumer,
            shutdown,
            stats: WorkerStats {
                processed: 0,
                delete_failures: 0,
                receive_failures: 0,
            },
        }
    }

    /// Runs until the shutdown token is cancelled or the consumer stops
    ///
    /// After shutdown is requested the worker keeps draining so that messages already
    /// received are still processed, then waits for the polling task to exit.
    ///
    /// # Errors
    ///
    /// Returns an error if the consumer channels were already taken, the consumer was
    /// already started, or its polling task panicked.
    pub async fn run(mut self) -> anyhow::Result<WorkerStats> {
        let mut messages = self
            .consumer
            .messages()
            .context("Consumer messages channel already taken")?;
        let mut errors = self
            .consumer
            .errors()
            .context("Consumer errors channel already taken")?;

        self.consumer.start().context("Failed to start consumer")?;
        info!(queue = %self.consumer.queue().name, "Starting QueueWorker");

        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => {
                    info!("Queue worker shutting down");
                    break;
                }
                message = messages.recv() => match message {
                    Some(message) => self.process_and_ack(message).await,
                    // The polling task is gone
                    None => break,
                },
                Some(err) = errors.recv() => self.record_error(&err),
            }
        }

        self.consumer.close();
        self.drain(&mut messages, &mut errors).await;
        self.consumer
            .wait()
            .await
            .context("Consumer task failed")?;

        info!(
            processed = self.stats.processed,
            delete_failures = self.stats.delete_failures,
            receive_failures = self.stats.receive_failures,
            "QueueWorker shutdown complete"
        );

        Ok(self.stats)
    }

    /// Processes whatever the polling task still delivers until it drops its senders
    async fn drain(
        &mut self,
        messages: &mut mpsc::Receiver<Message>,
        errors: &mut mpsc::Receiver<ConsumerError>,
    ) {
        loop {
            tokio::select! {
                Some(message) = messages.recv() => self.process_and_ack(message).await,
                Some(err) = errors.recv() => self.record_error(&err),
                else => break,
            }
        }
    }

    #[instrument(skip(self, message), fields(message_id = %message.message_id))]
    async fn process_and_ack(&mut self, message: Message) {
        info!(body = %message.body, "Processing message");

        match self.consumer.delete(&message).await {
            Ok(()) => self.stats.processed += 1,
            Err(e) => {
                self.stats.delete_failures += 1;
                warn!(error = ?e.source, "{e}");
            }
        }
    }

    fn record_error(&mut self, err: &ConsumerError) {
        self.stats.receive_failures += 1;
        error!(error = ?err, "Failed to receive messages");
    }
}
