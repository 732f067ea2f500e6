//! Transport contract
//!
//! The session only needs best-effort, unordered, possibly lossy datagrams
//! addressed by peer id. Connection brokering, signaling and retries belong
//! to the implementation (WebRTC data channels, UDP, the in-memory
//! [`LoopbackNetwork`](crate::LoopbackNetwork), ...).

use meshfire_core::ClientId;

/// Peer identifier; the same value as the peer's client id
pub type PeerId = ClientId;

/// Datagram transport between peers
pub trait Transport: Send + Sync {
    /// Error type for this transport
    type Error: std::error::Error + Send + Sync + 'static;

    /// Send a datagram to a peer; delivery is not guaranteed
    fn send(&self, data: &[u8], to: PeerId) -> Result<(), Self::Error>;

    /// Receive one datagram (non-blocking)
    ///
    /// Returns `Ok(None)` if no data is available.
    fn recv(&self) -> Result<Option<(PeerId, Vec<u8>)>, Self::Error>;

    /// Whether the link to a peer is currently up
    fn is_connected(&self, peer: PeerId) -> bool;
}
