use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::{QueueError, QueueResult};

/// Longest long-poll wait SQS accepts (in seconds)
pub const MAX_POLL_DURATION_SECS: i32 = 20;
/// Longest visibility timeout SQS accepts (in seconds, 12 hours)
pub const MAX_VISIBILITY_TIMEOUT_SECS: i32 = 43_200;
/// Most messages a single receive call may request
pub const MAX_MESSAGES_PER_RECEIVE: i32 = 10;

/// Identifies the queue a consumer polls and how it polls it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Queue {
    /// Queue name, used for log context
    pub name: String,
    /// Queue URL
    pub url: String,
    /// Long-poll wait time for each receive call (in seconds)
    pub poll_duration: i32,
    /// How long a received message stays hidden from other receivers (in seconds)
    pub visibility_timeout: i32,
    /// Maximum number of messages to request per receive call
    pub max_messages: i32,
    /// AWS region hosting the queue; the default provider chain is used when absent
    pub region: Option<String>,
}

impl Queue {
    /// Checks that every field is within the range the queue service accepts
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field
    pub fn validate(&self) -> Result<(), String> {
        if self.url.trim().is_empty() {
            return Err("queue url must not be empty".to_string());
        }
        if !(0..=MAX_POLL_DURATION_SECS).contains(&self.poll_duration) {
            return Err(format!(
                "poll duration must be between 0 and {MAX_POLL_DURATION_SECS} seconds, got {}",
                self.poll_duration
            ));
        }
        if !(0..=MAX_VISIBILITY_TIMEOUT_SECS).contains(&self.visibility_timeout) {
            return Err(format!(
                "visibility timeout must be between 0 and {MAX_VISIBILITY_TIMEOUT_SECS} seconds, got {}",
                self.visibility_timeout
            ));
        }
        if !(1..=MAX_MESSAGES_PER_RECEIVE).contains(&self.max_messages) {
            return Err(format!(
                "max messages must be between 1 and {MAX_MESSAGES_PER_RECEIVE}, got {}",
                self.max_messages
            ));
        }
        Ok(())
    }
}

/// A message as returned by the queue service, before the consumer checks it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawMessage {
    /// Queue-assigned message ID
    pub message_id: Option<String>,
    /// Message payload
    pub body: Option<String>,
    /// Receipt handle for this delivery
    pub receipt_handle: Option<String>,
}

/// A received message handed to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// The message body
    pub body: String,
    /// Message ID
    pub message_id: String,
    /// Receipt handle for acknowledging the message; only valid while the
    /// message is inside its visibility window
    pub receipt_handle: String,
}

impl Message {
    /// Deserializes the body as JSON
    ///
    /// # Errors
    ///
    /// Returns `QueueError::Deserialization` if the body is not valid JSON for `T`
    pub fn parse_body<T: DeserializeOwned>(&self) -> QueueResult<T> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

impl TryFrom<RawMessage> for Message {
    type Error = QueueError;

    fn try_from(raw: RawMessage) -> QueueResult<Self> {
        let Some(message_id) = raw.message_id else {
            return Err(QueueError::InvalidMessage(
                "message has no message id".to_string(),
            ));
        };
        let Some(receipt_handle) = raw.receipt_handle else {
            return Err(QueueError::InvalidMessage(format!(
                "message {message_id} has no receipt handle"
            )));
        };

        Ok(Self {
            body: raw.body.unwrap_or_default(),
            message_id,
            receipt_handle,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn queue() -> Queue {
        Queue {
            name: "orders".to_string(),
            url: "http://localhost:4566/000000000000/orders".to_string(),
            poll_duration: 20,
            visibility_timeout: 30,
            max_messages: 10,
            region: Some("us-east-1".to_string()),
        }
    }

    #[test]
    fn test_valid_queue_passes() {
        assert_eq!(queue().validate(), Ok(()));
    }

    #[test]
    fn test_queue_limits_are_enforced() {
        let empty_url = Queue {
            url: "  ".to_string(),
            ..queue()
        };
        assert!(empty_url.validate().is_err());

        let long_poll = Queue {
            poll_duration: 21,
            ..queue()
        };
        assert!(long_poll.validate().unwrap_err().contains("poll duration"));

        let negative_visibility = Queue {
            visibility_timeout: -1,
            ..queue()
        };
        assert!(negative_visibility
            .validate()
            .unwrap_err()
            .contains("visibility timeout"));

        let no_messages = Queue {
            max_messages: 0,
            ..queue()
        };
        assert!(no_messages.validate().unwrap_err().contains("max messages"));
    }

    #[test]
    fn test_raw_message_conversion() {
        let message = Message::try_from(RawMessage {
            message_id: Some("1".to_string()),
            body: None,
            receipt_handle: Some("r1".to_string()),
        })
        .unwrap();

        assert_eq!(
            message,
            Message {
                body: String::new(),
                message_id: "1".to_string(),
                receipt_handle: "r1".to_string(),
            }
        );

        let missing_receipt = Message::try_from(RawMessage {
            message_id: Some("2".to_string()),
            body: Some("b".to_string()),
            receipt_handle: None,
        });
        assert!(matches!(missing_receipt, Err(QueueError::InvalidMessage(msg)) if msg.contains('2')));

        let missing_id = Message::try_from(RawMessage::default());
        assert!(matches!(missing_id, Err(QueueError::InvalidMessage(_))));
    }

    #[test]
    fn test_parse_body() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Order {
            id: u32,
        }

        let message = Message {
            body: r#"{"id":7}"#.to_string(),
            message_id: "1".to_string(),
            receipt_handle: "r1".to_string(),
        };
        assert_eq!(message.parse_body::<Order>().unwrap(), Order { id: 7 });

        let garbage = Message {
            body: "not json".to_string(),
            ..message
        };
        assert!(matches!(
            garbage.parse_body::<Order>(),
            Err(QueueError::Deserialization(_))
        ));
    }
}
