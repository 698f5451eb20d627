//! In-memory (single process) queue transport for local development.
//!
//! Mimics the delivery semantics the subscriber relies on from a real queue
//! service: each received message is hidden from other receivers for a
//! visibility window and becomes receivable again if it is not deleted
//! before the window lapses.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;

pub use error::Error;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use circuitry_queue::{QueueTransport, RawMessage};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

/// Options for the in-memory queue transport.
#[derive(Clone, Copy, Debug)]
pub struct MemoryQueueOptions {
    /// Maximum number of messages handed out per `receive` call.
    pub max_messages: usize,

    /// How long a received message stays hidden before it becomes eligible
    /// for redelivery.
    pub visibility_timeout: Duration,
}

impl Default for MemoryQueueOptions {
    fn default() -> Self {
        Self {
            max_messages: 10,
            visibility_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Clone, Debug)]
struct QueuedMessage {
    id: String,
    receipt_handle: String,
    body: String,
    invisible_until: Option<Instant>,
}

/// In-memory queue transport.
#[derive(Clone, Debug, Default)]
pub struct MemoryQueue {
    queues: Arc<Mutex<HashMap<String, Vec<QueuedMessage>>>>,
    options: MemoryQueueOptions,
}

impl MemoryQueue {
    /// Creates a new `MemoryQueue` with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(MemoryQueueOptions::default())
    }

    /// Creates a new `MemoryQueue` with the given options.
    #[must_use]
    pub fn with_options(options: MemoryQueueOptions) -> Self {
        Self {
            queues: Arc::new(Mutex::new(HashMap::new())),
            options,
        }
    }

    /// Appends a message with the given body to the named queue.
    ///
    /// Returns the transport-assigned message identifier.
    ///
    /// # Errors
    ///
    /// Infallible for the in-memory transport; typed for parity with remote
    /// transports.
    pub async fn publish<B: Into<String> + Send>(
        &self,
        queue: &str,
        body: B,
    ) -> Result<String, Error> {
        let id = Uuid::new_v4().to_string();

        let mut queues = self.queues.lock().await;
        queues
            .entry(queue.to_owned())
            .or_default()
            .push(QueuedMessage {
                id: id.clone(),
                receipt_handle: Uuid::new_v4().to_string(),
                body: body.into(),
                invisible_until: None,
            });

        Ok(id)
    }
}

#[async_trait]
impl QueueTransport for MemoryQueue {
    type Error = Error;

    async fn receive(&self, queue: &str) -> Result<Vec<RawMessage>, Self::Error> {
        let mut queues = self.queues.lock().await;
        let now = Instant::now();

        let Some(messages) = queues.get_mut(queue) else {
            return Ok(Vec::new());
        };

        let mut batch = Vec::new();

        for message in messages.iter_mut() {
            if batch.len() == self.options.max_messages {
                break;
            }

            if message.invisible_until.is_some_and(|until| until > now) {
                continue;
            }

            // Each delivery hides the message for one visibility window and
            // gets its own acknowledgment token.
            message.invisible_until = Some(now + self.options.visibility_timeout);
            message.receipt_handle = Uuid::new_v4().to_string();

            batch.push(RawMessage {
                id: message.id.clone(),
                receipt_handle: message.receipt_handle.clone(),
                body: message.body.clone(),
            });
        }

        debug!("delivered {} messages from {queue}", batch.len());

        Ok(batch)
    }

    async fn delete(&self, queue: &str, receipt_handle: &str) -> Result<(), Self::Error> {
        let mut queues = self.queues.lock().await;

        if let Some(messages) = queues.get_mut(queue) {
            messages.retain(|message| message.receipt_handle != receipt_handle);
        }

        Ok(())
    }
}
