//! Consumer side of a topic/queue messaging layer: pulls envelope-wrapped
//! events off a queue, dispatches decoded payloads to an application
//! handler, and acknowledges only the messages that were handled
//! successfully. Failed messages are left for the transport to redeliver,
//! giving at-least-once delivery with application-assisted dedup via the
//! companion lock crates.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod envelope;
mod error;
mod handler;

pub use envelope::PublishEnvelope;
pub use error::{DispatchError, Error};
pub use handler::{EventHandler, EventHandlerError};

use std::error::Error as StdError;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;
use std::time::Duration;

use circuitry_locks::{InvalidLockConfig, LockBackend, LockConfig, LockManager};
use circuitry_queue::{QueueTransport, RawMessage};
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

/// Callback invoked with each per-message processing failure.
pub type ErrorHandler = Arc<dyn Fn(&(dyn StdError + 'static)) + Send + Sync>;

/// Credentials required to reach the queue transport.
#[derive(Clone, Debug)]
pub struct QueueCredentials {
    /// Access key identifier.
    pub access_key_id: String,

    /// Secret access key.
    pub secret_access_key: String,

    /// Region the queue lives in.
    pub region: String,
}

impl QueueCredentials {
    fn configured(&self) -> bool {
        !self.access_key_id.is_empty()
            && !self.secret_access_key.is_empty()
            && !self.region.is_empty()
    }
}

/// Options for configuring a [`Subscriber`].
#[derive(Clone, Default)]
pub struct SubscriberOptions {
    /// Credentials for the queue transport. Subscription is a warned no-op
    /// while these are absent or incomplete.
    pub credentials: Option<QueueCredentials>,

    /// Observer invoked with each per-message processing failure, after it
    /// has been logged.
    pub error_handler: Option<ErrorHandler>,

    /// Soft TTL for the subscriber's lock configuration. Defaults to
    /// [`circuitry_locks::DEFAULT_SOFT_TTL`].
    pub soft_ttl: Option<Duration>,

    /// Hard TTL for the subscriber's lock configuration. Defaults to
    /// [`circuitry_locks::DEFAULT_HARD_TTL`].
    pub hard_ttl: Option<Duration>,
}

impl Debug for SubscriberOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("SubscriberOptions")
            .field("credentials", &self.credentials)
            .field("error_handler", &self.error_handler.is_some())
            .field("soft_ttl", &self.soft_ttl)
            .field("hard_ttl", &self.hard_ttl)
            .finish()
    }
}

/// Pulls envelope-wrapped events off a queue and dispatches them to an
/// application handler.
///
/// The poll loop is single-threaded from its own point of view; running
/// many independent subscribers against the same queue is safe because the
/// transport hands each message to one receiver at a time for a visibility
/// window.
#[derive(Clone)]
pub struct Subscriber<Q> {
    transport: Q,
    options: SubscriberOptions,
    shutdown_token: CancellationToken,
}

impl<Q> Subscriber<Q>
where
    Q: QueueTransport,
{
    /// Creates a new `Subscriber` over the given transport.
    #[must_use]
    pub fn new(transport: Q, options: SubscriberOptions) -> Self {
        Self {
            transport,
            options,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Requests that the poll loop stop after the current batch.
    pub fn shutdown(&self) {
        self.shutdown_token.cancel();
    }

    /// The token the poll loop checks each iteration, for wiring into
    /// external shutdown plumbing.
    #[must_use]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// The lock configuration derived from this subscriber's options.
    #[must_use]
    pub fn lock_config(&self) -> LockConfig {
        let defaults = LockConfig::default();

        LockConfig {
            soft_ttl: self.options.soft_ttl.unwrap_or(defaults.soft_ttl),
            hard_ttl: self.options.hard_ttl.unwrap_or(defaults.hard_ttl),
        }
    }

    /// Builds the lock manager for application-level dedup around this
    /// subscriber's handler, using the TTLs from its options.
    ///
    /// The loop itself never consults the locks; bracketing message
    /// processing with soft and hard locks is the handler's affair.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidLockConfig`] if the configured TTLs are not
    /// positive.
    pub fn lock_manager<B>(&self, backend: B) -> Result<LockManager<B>, InvalidLockConfig>
    where
        B: LockBackend,
    {
        LockManager::new(backend, self.lock_config())
    }

    /// Polls the named queue indefinitely, dispatching each delivered
    /// message to `handler`.
    ///
    /// Messages the handler processes successfully are deleted from the
    /// queue; a message whose envelope fails to decode or whose handler
    /// fails is logged, handed to the configured error observer, and left
    /// unacknowledged for redelivery. One message's failure never aborts
    /// the batch or the loop.
    ///
    /// Returns without error when subscription is not currently permitted
    /// (after a single warning) or when [`shutdown`](Self::shutdown) is
    /// requested.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyQueue`] before any I/O when `queue` is blank,
    /// and [`Error::Transport`] when the transport's receive or delete call
    /// fails.
    pub async fn subscribe<X>(&self, queue: &str, handler: X) -> Result<(), Error<Q::Error>>
    where
        X: EventHandler,
    {
        if queue.trim().is_empty() {
            return Err(Error::EmptyQueue);
        }

        if !self.can_subscribe() {
            warn!("circuitry unable to subscribe: queue credentials are not set");
            return Ok(());
        }

        while !self.shutdown_token.is_cancelled() {
            let messages = self.transport.receive(queue).await?;

            for message in messages {
                match Self::dispatch(&message, &handler).await {
                    Ok(()) => {
                        // Deleting is the acknowledgment, so it happens only
                        // on success.
                        self.transport
                            .delete(queue, &message.receipt_handle)
                            .await?;
                    }
                    Err(dispatch_error) => {
                        error!("Error handling message {}: {dispatch_error}", message.id);

                        if let Some(error_handler) = &self.options.error_handler {
                            error_handler(&dispatch_error);
                        }
                    }
                }
            }
        }

        Ok(())
    }

    fn can_subscribe(&self) -> bool {
        self.options
            .credentials
            .as_ref()
            .is_some_and(QueueCredentials::configured)
    }

    async fn dispatch<X>(
        message: &RawMessage,
        handler: &X,
    ) -> Result<(), DispatchError<X::Error>>
    where
        X: EventHandler,
    {
        let envelope = PublishEnvelope::decode(&message.body)?;
        let payload = envelope.payload()?;

        handler
            .handle(payload, envelope.topic_short_name())
            .await
            .map_err(DispatchError::Handler)
    }
}
