//! Connector trait shared by the relational source and the document sink

use crate::error::ConnectionError;
use async_trait::async_trait;

/// A backend that hands out per-cycle connection handles
///
/// Handles are never cached: every cycle connects, verifies, uses and releases.
#[async_trait]
pub trait Connector: Send + Sync {
    type Handle: Send;

    /// Open a fresh connection
    async fn connect(&self) -> Result<Self::Handle, ConnectionError>;

    /// Lightweight liveness check on a freshly opened handle
    async fn ping(&self, handle: &mut Self::Handle) -> Result<(), ConnectionError>;

    /// Close the handle. Release failures are logged, never returned.
    async fn release(&self, handle: Self::Handle);

    /// Get backend type for logging
    fn backend_type(&self) -> &'static str;
}
