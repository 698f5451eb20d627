//! In-memory (single process) implementation of lock storage for local
//! development.
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
use circuitry_locks::LockBackend;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// In-memory lock backend.
///
/// Records expire at their TTL boundary without any housekeeping: an expired
/// entry is treated as absent by `lock` and `ttl`, and `reap` merely frees
/// the memory it occupies.
#[derive(Clone, Debug, Default)]
pub struct MemoryLockBackend {
    map: Arc<Mutex<HashMap<String, Instant>>>,
}

impl MemoryLockBackend {
    /// Creates a new `MemoryLockBackend`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            map: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl LockBackend for MemoryLockBackend {
    type Error = Error;

    async fn lock(&self, key: &str, ttl: Duration) -> Result<bool, Self::Error> {
        // Check-and-set in one critical section: of two racers on the same
        // key, exactly one observes success.
        let mut map = self.map.lock().await;
        let now = Instant::now();

        match map.get(key) {
            Some(&expires_at) if expires_at > now => Ok(false),
            _ => {
                map.insert(key.to_owned(), now + ttl);
                Ok(true)
            }
        }
    }

    async fn ttl(&self, key: &str) -> Result<Option<Instant>, Self::Error> {
        let map = self.map.lock().await;

        Ok(map.get(key).copied())
    }

    async fn reap(&self) -> Result<(), Self::Error> {
        let mut map = self.map.lock().await;
        let now = Instant::now();
        let before = map.len();

        map.retain(|_, expires_at| *expires_at > now);

        debug!("reaped {} expired lock records", before - map.len());

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use circuitry_locks::{LockConfig, LockManager};

    fn manager(backend: MemoryLockBackend) -> LockManager<MemoryLockBackend> {
        let config = LockConfig {
            soft_ttl: Duration::from_secs(900),
            hard_ttl: Duration::from_secs(86_400),
        };

        LockManager::new(backend, config).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_soft_lock_then_is_locked() {
        let manager = manager(MemoryLockBackend::new());

        assert!(manager.soft_lock("abc").await.unwrap());
        assert!(manager.is_locked("abc").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_soft_lock_expires_without_reap() {
        let manager = manager(MemoryLockBackend::new());

        assert!(manager.soft_lock("abc").await.unwrap());

        tokio::time::advance(Duration::from_secs(901)).await;

        assert!(!manager.is_locked("abc").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_lock_refused_while_held_even_by_self() {
        let manager = manager(MemoryLockBackend::new());

        assert!(manager.soft_lock("abc").await.unwrap());
        assert!(!manager.soft_lock("abc").await.unwrap());
        assert!(!manager.hard_lock("abc").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_lock_reacquired_after_expiry() {
        let manager = manager(MemoryLockBackend::new());

        assert!(manager.soft_lock("abc").await.unwrap());

        tokio::time::advance(Duration::from_secs(901)).await;

        assert!(manager.soft_lock("abc").await.unwrap());
        assert!(manager.is_locked("abc").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hard_lock_outlives_soft_window() {
        let manager = manager(MemoryLockBackend::new());

        assert!(manager.hard_lock("abc").await.unwrap());

        tokio::time::advance(Duration::from_secs(901)).await;

        assert!(manager.is_locked("abc").await.unwrap());

        tokio::time::advance(Duration::from_secs(86_400)).await;

        assert!(!manager.is_locked("abc").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_lock_has_one_winner() {
        let backend = MemoryLockBackend::new();
        let ttl = Duration::from_secs(900);

        let (first, second) = tokio::join!(
            backend.lock("circuitry:lock:abc", ttl),
            backend.lock("circuitry:lock:abc", ttl),
        );

        assert!(first.unwrap() ^ second.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_lock_key_derivation() {
        let backend = MemoryLockBackend::new();
        let manager = manager(backend.clone());

        assert!(manager.soft_lock("abc").await.unwrap());

        // The same id maps to the same backend key for every operation.
        assert!(backend.ttl("circuitry:lock:abc").await.unwrap().is_some());
        assert!(backend.ttl("abc").await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reap_removes_all_and_only_expired_records() {
        let backend = MemoryLockBackend::new();

        assert!(
            backend
                .lock("expired-one", Duration::from_secs(10))
                .await
                .unwrap()
        );
        assert!(
            backend
                .lock("expired-two", Duration::from_secs(20))
                .await
                .unwrap()
        );
        assert!(
            backend
                .lock("live", Duration::from_secs(900))
                .await
                .unwrap()
        );

        tokio::time::advance(Duration::from_secs(30)).await;

        backend.reap().await.unwrap();

        assert!(backend.ttl("expired-one").await.unwrap().is_none());
        assert!(backend.ttl("expired-two").await.unwrap().is_none());
        assert!(backend.ttl("live").await.unwrap().is_some());
    }
}
