use circuitry_locks::LockBackendError;
use thiserror::Error;

/// Errors that can occur in this crate.
#[derive(Clone, Debug, Error)]
#[error("lock backend error")]
pub struct Error;

impl LockBackendError for Error {}
