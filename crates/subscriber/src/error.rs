use circuitry_queue::QueueTransportError;
use thiserror::Error;

use crate::handler::EventHandlerError;

/// Errors that can occur while subscribing to a queue.
#[derive(Debug, Error)]
pub enum Error<E>
where
    E: QueueTransportError,
{
    /// The queue identifier was missing or empty.
    #[error("queue identifier must not be empty")]
    EmptyQueue,

    /// The transport's receive or delete call failed.
    ///
    /// Retry and backoff policy belongs to the integrator; the loop ends
    /// and the caller decides whether to subscribe again.
    #[error("transport error: {0}")]
    Transport(#[from] E),
}

/// A single message's processing failure.
///
/// Recovered inside the poll loop: logged, handed to the error observer,
/// and the message is left unacknowledged for the transport to redeliver.
#[derive(Debug, Error)]
pub enum DispatchError<E>
where
    E: EventHandlerError,
{
    /// The message body was not a valid publish envelope, or its inner
    /// payload was not valid JSON.
    #[error(transparent)]
    Envelope(#[from] serde_json::Error),

    /// The application handler signaled failure.
    #[error(transparent)]
    Handler(E),
}
