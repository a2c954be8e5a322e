//! Connection supervisor - bounded, fixed-delay connection acquisition
//!
//! `acquire` tries `connect` followed by `ping`. A failed attempt (either step)
//! sleeps the configured delay and tries again, up to `retries` attempts total.
//! On exhaustion the last underlying error is returned inside
//! `ConnectionError::RetriesExhausted`.

pub mod connector;
pub mod retry;

pub use connector::Connector;
pub use retry::{FixedDelayRetry, MaxRetriesExceeded};

use crate::error::ConnectionError;
use std::time::Duration;

pub const DEFAULT_RETRIES: u32 = 5;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct ConnectionSupervisor {
    retries: u32,
    delay: Duration,
}

impl Default for ConnectionSupervisor {
    fn default() -> Self {
        Self::new(DEFAULT_RETRIES, DEFAULT_RETRY_DELAY)
    }
}

impl ConnectionSupervisor {
    pub fn new(retries: u32, delay: Duration) -> Self {
        Self {
            retries: retries.max(1),
            delay,
        }
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Acquire a verified handle from `connector`
    pub async fn acquire<C>(&self, connector: &C) -> Result<C::Handle, ConnectionError>
    where
        C: Connector + ?Sized,
    {
        let backend = connector.backend_type();
        let mut retry = FixedDelayRetry::new(self.delay, self.retries);

        loop {
            let err = match connector.connect().await {
                Ok(mut handle) => match connector.ping(&mut handle).await {
                    Ok(()) => {
                        if retry.attempt() > 1 {
                            log::info!("🔌 {} connected on attempt {}", backend, retry.attempt());
                        } else {
                            log::debug!("🔌 {} connected", backend);
                        }
                        return Ok(handle);
                    }
                    Err(e) => {
                        connector.release(handle).await;
                        e
                    }
                },
                Err(e) => e,
            };

            log::warn!(
                "⚠️  {} connection attempt {}/{} failed: {}",
                backend,
                retry.attempt(),
                retry.max_attempts(),
                err
            );

            if retry.sleep().await.is_err() {
                log::error!(
                    "❌ {} unreachable after {} attempts",
                    backend,
                    retry.max_attempts()
                );
                return Err(ConnectionError::RetriesExhausted {
                    backend,
                    attempts: retry.max_attempts(),
                    last: Box::new(err),
                });
            }
        }
    }
}
