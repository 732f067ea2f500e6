//! In-memory transport
//!
//! A simulated datagram network for tests and headless matches. Delivery
//! is driven by an explicit step counter rather than wall time: each
//! datagram gets a random delay of up to `max_delay` steps (so packets
//! overtake each other) and is lost with probability `loss_percent`. All
//! randomness comes from a seeded [`GameRng`], which makes runs repeatable.

use crate::transport::{PeerId, Transport};
use meshfire_core::GameRng;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Loopback transport errors
#[derive(Debug, Error)]
pub enum LoopbackError {
    #[error("loopback network lock poisoned")]
    Poisoned,

    #[error("peer {0} is not attached")]
    Detached(PeerId),
}

#[derive(Debug)]
struct Datagram {
    from: PeerId,
    data: Vec<u8>,
    deliver_at: u64,
}

#[derive(Debug)]
struct Net {
    rng: GameRng,
    loss_percent: u32,
    max_delay: u32,
    step: u64,
    queues: HashMap<PeerId, Vec<Datagram>>,
    up: HashMap<PeerId, bool>,
    sent: u64,
    dropped: u64,
}

impl Net {
    fn link_up(&self, a: PeerId, b: PeerId) -> bool {
        self.up.get(&a).copied().unwrap_or(false) && self.up.get(&b).copied().unwrap_or(false)
    }
}

/// Shared simulated network; clone freely
#[derive(Debug, Clone)]
pub struct LoopbackNetwork {
    inner: Arc<Mutex<Net>>,
}

/// Delivery counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopbackStats {
    pub sent: u64,
    pub dropped: u64,
    pub in_flight: usize,
}

impl LoopbackNetwork {
    /// A perfect network: no loss, delivery on the next step
    pub fn new(seed: u32) -> Self {
        Self::with_conditions(seed, 0, 1)
    }

    /// A network that drops `loss_percent`% of datagrams and delays each
    /// by 1 to `max_delay` steps
    pub fn with_conditions(seed: u32, loss_percent: u32, max_delay: u32) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Net {
                rng: GameRng::new(seed),
                loss_percent: loss_percent.min(100),
                max_delay: max_delay.max(1),
                step: 0,
                queues: HashMap::new(),
                up: HashMap::new(),
                sent: 0,
                dropped: 0,
            })),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Net>, LoopbackError> {
        self.inner.lock().map_err(|_| LoopbackError::Poisoned)
    }

    /// Attach a peer and return its transport
    pub fn endpoint(&self, id: PeerId) -> LoopbackEndpoint {
        if let Ok(mut net) = self.lock() {
            net.up.insert(id, true);
            net.queues.entry(id).or_default();
        }
        LoopbackEndpoint {
            id,
            net: self.clone(),
        }
    }

    /// Bring a peer's links down or back up
    ///
    /// Datagrams to or from a peer that is down are dropped.
    pub fn set_connected(&self, id: PeerId, connected: bool) {
        if let Ok(mut net) = self.lock() {
            net.up.insert(id, connected);
            if !connected {
                let lost = net.queues.get_mut(&id).map_or(0, |q| {
                    let n = q.len();
                    q.clear();
                    n
                });
                net.dropped += lost as u64;
            }
        }
    }

    /// Move the delivery clock forward one step
    pub fn advance(&self) {
        if let Ok(mut net) = self.lock() {
            net.step += 1;
        }
    }

    pub fn stats(&self) -> LoopbackStats {
        self.lock().map_or_else(
            |_| LoopbackStats::default(),
            |net| LoopbackStats {
                sent: net.sent,
                dropped: net.dropped,
                in_flight: net.queues.values().map(Vec::len).sum(),
            },
        )
    }
}

/// One peer's handle on a [`LoopbackNetwork`]
#[derive(Debug, Clone)]
pub struct LoopbackEndpoint {
    id: PeerId,
    net: LoopbackNetwork,
}

impl LoopbackEndpoint {
    pub fn id(&self) -> PeerId {
        self.id
    }
}

impl Transport for LoopbackEndpoint {
    type Error = LoopbackError;

    fn send(&self, data: &[u8], to: PeerId) -> Result<(), Self::Error> {
        let mut net = self.net.lock()?;
        net.sent += 1;
        if !net.link_up(self.id, to) {
            net.dropped += 1;
            return Ok(());
        }
        let loss = net.loss_percent;
        if loss > 0 && net.rng.percent(loss) {
            net.dropped += 1;
            return Ok(());
        }
        let max_delay = net.max_delay;
        let delay = 1 + net.rng.below(max_delay) as u64;
        let deliver_at = net.step + delay;
        let from = self.id;
        net.queues
            .get_mut(&to)
            .ok_or(LoopbackError::Detached(to))?
            .push(Datagram {
                from,
                data: data.to_vec(),
                deliver_at,
            });
        Ok(())
    }

    fn recv(&self) -> Result<Option<(PeerId, Vec<u8>)>, Self::Error> {
        let mut net = self.net.lock()?;
        let step = net.step;
        let queue = net
            .queues
            .get_mut(&self.id)
            .ok_or(LoopbackError::Detached(self.id))?;
        let Some(pos) = queue.iter().position(|d| d.deliver_at <= step) else {
            return Ok(None);
        };
        let datagram = queue.remove(pos);
        Ok(Some((datagram.from, datagram.data)))
    }

    fn is_connected(&self, peer: PeerId) -> bool {
        self.net
            .lock()
            .map(|net| net.link_up(self.id, peer))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_waits_for_step() {
        let net = LoopbackNetwork::new(1);
        let a = net.endpoint(1);
        let b = net.endpoint(2);
        a.send(b"hi", 2).unwrap();
        assert!(b.recv().unwrap().is_none());
        net.advance();
        assert_eq!(b.recv().unwrap(), Some((1, b"hi".to_vec())));
        assert!(b.recv().unwrap().is_none());
    }

    #[test]
    fn test_unknown_peer_is_not_connected() {
        let net = LoopbackNetwork::new(1);
        let a = net.endpoint(1);
        assert!(!a.is_connected(7));
        assert!(a.send(b"x", 7).is_ok());
        assert_eq!(net.stats().dropped, 1);
    }

    #[test]
    fn test_down_link_drops() {
        let net = LoopbackNetwork::new(1);
        let a = net.endpoint(1);
        let b = net.endpoint(2);
        net.set_connected(2, false);
        assert!(!a.is_connected(2));
        a.send(b"x", 2).unwrap();
        net.set_connected(2, true);
        net.advance();
        assert!(b.recv().unwrap().is_none());
    }

    #[test]
    fn test_lossy_network_loses_some() {
        let net = LoopbackNetwork::with_conditions(9, 50, 4);
        let a = net.endpoint(1);
        let b = net.endpoint(2);
        for i in 0..200u8 {
            a.send(&[i], 2).unwrap();
        }
        for _ in 0..4 {
            net.advance();
        }
        let mut got = 0;
        while b.recv().unwrap().is_some() {
            got += 1;
        }
        let stats = net.stats();
        assert_eq!(got as u64 + stats.dropped, 200);
        assert!(got > 50 && got < 150);
    }
}
