//! Polling consumer
//!
//! A [`Consumer`] owns one background task that long-polls the queue and forwards every
//! received [`Message`] to the caller over a bounded channel, reporting failures on a
//! second channel. The task is single-shot: `NotStarted -> Polling -> Terminated`.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::client::QueueClient;
use crate::error::{ConsumerError, ConsumerResult, DeleteError};
use crate::types::{Message, Queue};

/// Capacity of the messages and errors channels
///
/// The polling task hands off at most one value ahead of the caller, so a slow caller
/// applies backpressure to polling and `close` takes effect after at most one buffered
/// delivery.
pub const CHANNEL_CAPACITY: usize = 1;

/// Lifecycle of the polling task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    /// Created, `start` not called yet
    NotStarted,
    /// The polling task is running
    Polling,
    /// The polling task has exited; the consumer cannot be restarted
    Terminated,
}

/// Sender halves, moved into the polling task on start
struct Outbound {
    messages: mpsc::Sender<Message>,
    errors: mpsc::Sender<ConsumerError>,
}

/// Queue consumer driving a single polling task
pub struct Consumer<C> {
    client: Arc<C>,
    queue: Arc<Queue>,
    shutdown: CancellationToken,
    outbound: Option<Outbound>,
    messages: Option<mpsc::Receiver<Message>>,
    errors: Option<mpsc::Receiver<ConsumerError>>,
    state: ConsumerState,
    handle: Option<JoinHandle<()>>,
}

impl<C: QueueClient> Consumer<C> {
    /// Creates a consumer for `queue`. Polling does not begin until [`Consumer::start`].
    ///
    /// # Errors
    ///
    /// Returns `ConsumerError::InvalidConfig` if the queue configuration is out of range
    pub fn new(client: Arc<C>, queue: Queue) -> ConsumerResult<Self> {
        queue.validate().map_err(ConsumerError::InvalidConfig)?;

        let (messages_tx, messages_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (errors_tx, errors_rx) = mpsc::channel(CHANNEL_CAPACITY);

        Ok(Self {
            client,
            queue: Arc::new(queue),
            shutdown: CancellationToken::new(),
            outbound: Some(Outbound {
                messages: messages_tx,
                errors: errors_tx,
            }),
            messages: Some(messages_rx),
            errors: Some(errors_rx),
            state: ConsumerState::NotStarted,
            handle: None,
        })
    }

    /// The queue this consumer polls
    #[must_use]
    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    /// Takes the receiving end of the messages channel. Returns `None` after the first call.
    ///
    /// Dropping the receiver stops the polling task.
    pub fn messages(&mut self) -> Option<mpsc::Receiver<Message>> {
        self.messages.take()
    }

    /// Takes the receiving end of the errors channel. Returns `None` after the first call.
    ///
    /// Must be taken before [`Consumer::start`]; if it was not, the receiver is dropped on
    /// start and errors are discarded with a warning instead of stalling the polling task.
    pub fn errors(&mut self) -> Option<mpsc::Receiver<ConsumerError>> {
        self.errors.take()
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> ConsumerState {
        match (self.state, &self.handle) {
            (ConsumerState::Polling, Some(handle)) if !handle.is_finished() => {
                ConsumerState::Polling
            }
            (ConsumerState::NotStarted, _) => ConsumerState::NotStarted,
            _ => ConsumerState::Terminated,
        }
    }

    /// Spawns the polling task and returns immediately
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `ConsumerError::AlreadyStarted` if the consumer was started before
    pub fn start(&mut self) -> ConsumerResult<()> {
        let Some(outbound) = self.outbound.take() else {
            return Err(ConsumerError::AlreadyStarted);
        };
        // Nobody would drain an untaken errors receiver
        self.errors = None;

        let poller = Poller {
            client: Arc::clone(&self.client),
            queue: Arc::clone(&self.queue),
            shutdown: self.shutdown.clone(),
            outbound,
        };
        self.handle = Some(tokio::spawn(poller.run()));
        self.state = ConsumerState::Polling;

        Ok(())
    }

    /// Requests termination of the polling task
    ///
    /// Never blocks. The task observes the request before its next receive call; a receive
    /// or delivery already in progress completes first.
    pub fn close(&self) {
        self.shutdown.cancel();
    }

    /// Waits for the polling task to exit
    ///
    /// Returns immediately if the consumer was never started. The caller must keep draining
    /// the messages channel (or drop it), otherwise a pending delivery keeps the task alive.
    ///
    /// # Errors
    ///
    /// Returns `ConsumerError::Task` if the polling task panicked
    pub async fn wait(&mut self) -> ConsumerResult<()> {
        if let Some(handle) = self.handle.as_mut() {
            let result = handle.await;
            self.handle = None;
            result?;
        }
        if self.state == ConsumerState::Polling {
            self.state = ConsumerState::Terminated;
        }
        Ok(())
    }

    /// Closes the consumer and waits for the polling task to exit
    ///
    /// # Errors
    ///
    /// Returns `ConsumerError::Task` if the polling task panicked
    pub async fn shutdown(mut self) -> ConsumerResult<()> {
        self.close();
        self.wait().await
    }

    /// Deletes (acknowledges) a message
    ///
    /// The receipt handle is forwarded unchanged. Failures are not retried and the
    /// message is not re-delivered.
    ///
    /// # Errors
    ///
    /// Returns a `DeleteError` carrying `message` if the queue rejects the delete
    #[instrument(skip(self, message), fields(queue = %self.queue.name, message_id = %message.message_id))]
    pub async fn delete(&self, message: &Message) -> Result<(), DeleteError> {
        match self
            .client
            .delete_message(&self.queue.url, &message.receipt_handle)
            .await
        {
            Ok(()) => {
                debug!("Deleted message");
                Ok(())
            }
            Err(source) => Err(DeleteError {
                message: message.clone(),
                source,
            }),
        }
    }
}

/// The polling task
struct Poller<C> {
    client: Arc<C>,
    queue: Arc<Queue>,
    shutdown: CancellationToken,
    outbound: Outbound,
}

impl<C: QueueClient> Poller<C> {
    async fn run(self) {
        info!(queue = %self.queue.name, "Starting consumer");

        while !self.shutdown.is_cancelled() {
            if self.outbound.messages.is_closed() || !self.poll_once().await {
                debug!(queue = %self.queue.name, "Messages receiver dropped, stopping");
                break;
            }
        }

        info!(queue = %self.queue.name, "Consumer shutdown complete");
    }

    /// Runs one receive call and delivers its results.
    /// Returns `false` once the messages receiver is gone.
    async fn poll_once(&self) -> bool {
        let received = self
            .client
            .receive_messages(
                &self.queue.url,
                self.queue.visibility_timeout,
                self.queue.poll_duration,
                self.queue.max_messages,
            )
            .await;

        let raw_messages = match received {
            Ok(raw_messages) => raw_messages,
            Err(e) => {
                self.report(ConsumerError::Receive(e)).await;
                return true;
            }
        };

        debug!(
            queue = %self.queue.name,
            count = raw_messages.len(),
            "Received messages"
        );

        for raw in raw_messages {
            match Message::try_from(raw) {
                Ok(message) => {
                    if self.outbound.messages.send(message).await.is_err() {
                        return false;
                    }
                }
                Err(e) => self.report(ConsumerError::Receive(e)).await,
            }
        }

        true
    }

    async fn report(&self, error: ConsumerError) {
        if let Err(mpsc::error::SendError(error)) = self.outbound.errors.send(error).await {
            warn!(queue = %self.queue.name, error = %error, "Errors receiver dropped, discarding error");
        }
    }
}
