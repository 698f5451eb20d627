use circuitry_queue::QueueTransportError;
use thiserror::Error;

/// Errors that can occur in this crate.
#[derive(Clone, Debug, Error)]
#[error("queue transport error")]
pub struct Error;

impl QueueTransportError for Error {}
