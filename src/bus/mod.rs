//! Bus capability seams between the device controller and the MQTT session.
//!
//! The controller consumes a [`BusHandle`] for outbound subscribe/publish and
//! implements the two observer traits. The session loop holds the observers
//! by reference and invokes them one event at a time, so observer methods are
//! never re-entered concurrently.

pub mod mqtt;
pub mod topics;

use anyhow::Result;
use async_trait::async_trait;

/// Outcome of a broker connection attempt, as seen by observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectStatus {
    Accepted,
    /// Broker refused the session; carries the return code.
    Refused(String),
}

/// Outbound bus operations available to the controller.
///
/// All deliveries are at-least-once.
#[async_trait]
pub trait BusHandle: Send + Sync {
    async fn subscribe(&self, topic: &str) -> Result<()>;
    async fn publish(&self, topic: &str, payload: &str, retain: bool) -> Result<()>;
}

/// Receives the connection-established event.
#[async_trait]
pub trait ConnectionObserver: Send + Sync {
    async fn on_connect(&self, status: ConnectStatus);
}

/// Receives inbound bus messages.
#[async_trait]
pub trait MessageObserver: Send + Sync {
    async fn on_message(&self, topic: &str, payload: &[u8]);
}
