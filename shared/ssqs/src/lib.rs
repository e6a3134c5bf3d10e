//! Super simple SQS consumer
//!
//! This crate polls a single SQS queue on a background task and hands every received
//! message to the caller over a channel. Messages are acknowledged with
//! [`Consumer::delete`] once processed.

#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    dead_code
)]

pub mod client;
pub mod consumer;
/// Error types for queue and consumer operations
pub mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
/// Queue configuration and message types
pub mod types;

pub use client::{QueueClient, SqsQueueClient};
pub use consumer::{Consumer, ConsumerState, CHANNEL_CAPACITY};
pub use error::{ConsumerError, ConsumerResult, DeleteError, QueueError, QueueResult};
pub use types::{Message, Queue, RawMessage};
