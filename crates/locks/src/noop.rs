use std::convert::Infallible;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::LockBackend;

/// A lock backend that grants every acquisition and stores nothing.
///
/// Disables dedup entirely: every message is processed as delivered. Useful
/// for local development and for integrations that handle idempotency some
/// other way.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopLockBackend;

#[async_trait]
impl LockBackend for NoopLockBackend {
    type Error = Infallible;

    async fn lock(&self, _key: &str, _ttl: Duration) -> Result<bool, Self::Error> {
        Ok(true)
    }

    async fn ttl(&self, _key: &str) -> Result<Option<Instant>, Self::Error> {
        Ok(None)
    }

    async fn reap(&self) -> Result<(), Self::Error> {
        Ok(())
    }
}
