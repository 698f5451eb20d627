use std::error::Error;

use async_trait::async_trait;
use serde_json::Value;

/// Marker trait for event handler errors
pub trait EventHandlerError: Error + Send + Sync + 'static {}

/// A trait representing an application handler for decoded events.
#[async_trait]
pub trait EventHandler
where
    Self: Clone + Send + Sync + 'static,
{
    /// The error type for the handler.
    type Error: EventHandlerError;

    /// Handles one decoded event.
    ///
    /// `payload` is whatever the published payload decodes to; `topic` is
    /// the topic's short name. Returning an error leaves the originating
    /// message unacknowledged, so the transport will redeliver it.
    async fn handle(&self, payload: Value, topic: &str) -> Result<(), Self::Error>;
}
