//! Trait abstraction for the radio transport to enable testing

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// Trait for radio transport operations
///
/// The radio module owns network configuration and framing; this seam only
/// exposes what the telemetry cycles consume: transmit a byte buffer, poll
/// the receive queue, and drain whatever arrived.
#[async_trait]
pub trait RadioLink: Send {
    /// Transmit a byte buffer over the air
    async fn transmit(&mut self, data: &[u8]) -> Result<()>;

    /// Poll the receive queue, returning true if data is pending
    async fn poll_receive(&mut self, timeout: Duration) -> Result<bool>;

    /// Take the next pending chunk of received bytes
    ///
    /// May be called repeatedly while [`poll_receive`](Self::poll_receive)
    /// keeps reporting pending data; chunk boundaries are transport
    /// artifacts, not frame boundaries.
    async fn drain(&mut self) -> Result<Vec<u8>>;
}
