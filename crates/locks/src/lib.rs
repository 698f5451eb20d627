//! Abstract interface for dual-TTL processing locks.
//!
//! A soft lock brackets one in-flight processing attempt; a hard lock
//! brackets the much longer window during which a transport may redeliver an
//! already-processed event. Both classes map an identifier to the same
//! backend key, so whichever class acquired first wins.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod noop;

pub use noop::NoopLockBackend;

use std::error::Error;
use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::time::Instant;

/// Default TTL for soft (in-flight) locks: 15 minutes.
pub const DEFAULT_SOFT_TTL: Duration = Duration::from_secs(15 * 60);

/// Default TTL for hard (post-success) locks: 24 hours.
pub const DEFAULT_HARD_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Marker trait for lock backend errors
pub trait LockBackendError: Debug + Error + Send + Sync + 'static {}

impl LockBackendError for std::convert::Infallible {}

/// A trait representing a lock storage backend with asynchronous operations.
///
/// A record is held iff its stored expiry is strictly in the future; an
/// expired record that has not yet been reaped counts as not held.
#[async_trait]
pub trait LockBackend
where
    Self: Clone + Send + Sync + 'static,
{
    /// The error type for the backend.
    type Error: LockBackendError;

    /// Atomically creates a record for `key` valid for `ttl`.
    ///
    /// Returns `true` iff the record was created. The check-and-set must be
    /// a single atomic operation against the backend, so that exactly one of
    /// two racing callers observes success.
    async fn lock(&self, key: &str, ttl: Duration) -> Result<bool, Self::Error>;

    /// Returns the stored expiry for `key`, or `None` if no record exists.
    async fn ttl(&self, key: &str) -> Result<Option<Instant>, Self::Error>;

    /// Removes all records whose expiry has passed.
    ///
    /// Must never remove a record whose expiry is still in the future, and
    /// must be safe to call concurrently with any other operation.
    async fn reap(&self) -> Result<(), Self::Error>;
}

/// TTL configuration for a [`LockManager`].
///
/// Immutable once the manager is constructed.
#[derive(Clone, Copy, Debug)]
pub struct LockConfig {
    /// TTL applied by [`LockManager::soft_lock`].
    pub soft_ttl: Duration,

    /// TTL applied by [`LockManager::hard_lock`].
    pub hard_ttl: Duration,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            soft_ttl: DEFAULT_SOFT_TTL,
            hard_ttl: DEFAULT_HARD_TTL,
        }
    }
}

/// Error returned when a [`LockManager`] is constructed with a zero TTL.
#[derive(Clone, Debug, Error)]
#[error("lock TTLs must be positive durations")]
pub struct InvalidLockConfig;

/// Named-TTL mutual exclusion over arbitrary identifiers, backed by a
/// pluggable store.
#[derive(Clone, Debug)]
pub struct LockManager<B> {
    backend: B,
    config: LockConfig,
}

impl<B> LockManager<B>
where
    B: LockBackend,
{
    /// Creates a new `LockManager` over the given backend.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidLockConfig`] if either TTL is zero.
    pub fn new(backend: B, config: LockConfig) -> Result<Self, InvalidLockConfig> {
        if config.soft_ttl.is_zero() || config.hard_ttl.is_zero() {
            return Err(InvalidLockConfig);
        }

        Ok(Self { backend, config })
    }

    /// The TTL configuration this manager was constructed with.
    #[must_use]
    pub const fn config(&self) -> LockConfig {
        self.config
    }

    /// Attempts to acquire the lock for `id` with the soft TTL.
    ///
    /// Returns `false` if the lock is already held by anyone, including a
    /// previous acquisition through this manager, and has not yet expired.
    ///
    /// # Errors
    ///
    /// Returns the backend's error if the acquisition attempt fails.
    pub async fn soft_lock(&self, id: &str) -> Result<bool, B::Error> {
        self.backend
            .lock(&lock_key(id), self.config.soft_ttl)
            .await
    }

    /// Attempts to acquire the lock for `id` with the hard TTL.
    ///
    /// Typically called after successful processing to suppress reprocessing
    /// for much longer than the in-flight soft window.
    ///
    /// # Errors
    ///
    /// Returns the backend's error if the acquisition attempt fails.
    pub async fn hard_lock(&self, id: &str) -> Result<bool, B::Error> {
        self.backend
            .lock(&lock_key(id), self.config.hard_ttl)
            .await
    }

    /// Returns `true` iff the lock for `id` is currently held.
    ///
    /// A missing record and an expired-but-unreaped record are identically
    /// not held.
    ///
    /// # Errors
    ///
    /// Returns the backend's error if the expiry read fails.
    pub async fn is_locked(&self, id: &str) -> Result<bool, B::Error> {
        let expires_at = self.backend.ttl(&lock_key(id)).await?;

        Ok(expires_at.is_some_and(|at| at > Instant::now()))
    }

    /// Purges expired lock records from the backend.
    ///
    /// # Errors
    ///
    /// Returns the backend's error if the purge fails.
    pub async fn reap(&self) -> Result<(), B::Error> {
        self.backend.reap().await
    }
}

// Same id, same key, regardless of which TTL class is requested.
fn lock_key(id: &str) -> String {
    format!("circuitry:lock:{id}")
}
