//! Abstract interface for queue transports.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

use std::error::Error;
use std::fmt::Debug;

use async_trait::async_trait;
use serde::Deserialize;

/// Marker trait for queue transport errors
pub trait QueueTransportError: Debug + Error + Send + Sync + 'static {}

/// A message as delivered by a queue transport.
///
/// Deserializes from the transport's wire record, which carries the
/// identifier under `MessageId`, the acknowledgment token under
/// `ReceiptHandle`, and the raw body under `Body`.
#[derive(Clone, Debug, Deserialize)]
pub struct RawMessage {
    /// Transport-assigned message identifier.
    #[serde(rename = "MessageId")]
    pub id: String,

    /// Opaque token used to acknowledge this delivery of the message.
    #[serde(rename = "ReceiptHandle")]
    pub receipt_handle: String,

    /// Raw message body.
    #[serde(rename = "Body")]
    pub body: String,
}

/// A trait representing a queue transport with asynchronous operations.
///
/// Deleting a received message is the acknowledgment: a message that is
/// received but never deleted becomes eligible for redelivery once the
/// transport's visibility window lapses.
#[async_trait]
pub trait QueueTransport
where
    Self: Clone + Send + Sync + 'static,
{
    /// The error type for the transport.
    type Error: QueueTransportError;

    /// Receives the next batch of messages from the named queue.
    ///
    /// Returns zero or more messages in transport order, which is not
    /// guaranteed to be FIFO.
    async fn receive(&self, queue: &str) -> Result<Vec<RawMessage>, Self::Error>;

    /// Deletes a message from the named queue, acknowledging it.
    async fn delete(&self, queue: &str, receipt_handle: &str) -> Result<(), Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_wire_record() {
        let record = serde_json::json!({
            "MessageId": "one",
            "ReceiptHandle": "delete-one",
            "Body": "{\"Message\":\"\\\"Foo\\\"\",\"TopicArn\":\"arn:aws:sns:us-east-1:123456789012:test-event-task-changed\"}",
        });

        let message: RawMessage = serde_json::from_value(record).unwrap();

        assert_eq!(message.id, "one");
        assert_eq!(message.receipt_handle, "delete-one");
        assert!(message.body.contains("TopicArn"));
    }
}
