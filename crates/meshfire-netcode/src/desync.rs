//! Divergence detection
//!
//! Each simulated tick leaves a [`Fingerprint`] (and optionally a full state
//! copy) in a bounded history. Peers attach their latest fingerprint to
//! packets; when one arrives for a tick we have simulated, every field is
//! compared and each mismatch is logged. Any mismatch is fatal: there is
//! no repair path.

use crate::error::{Error, Result};
use meshfire_codec::FingerprintBlock;
use meshfire_core::{Actor, ClientId, Fingerprint, StateData, Tick};
use meshfire_rollback_buffer::TickBuffer;
use tracing::error;

/// Remote fingerprints kept for ticks we have not reached yet
const MAX_PENDING: usize = 64;

/// Per-tick fingerprint history and comparison
#[derive(Debug, Clone)]
pub struct DesyncDetector {
    fingerprints: TickBuffer<Fingerprint>,
    states: Option<TickBuffer<StateData>>,
    pending: Vec<(ClientId, FingerprintBlock)>,
    checked: u64,
}

impl DesyncDetector {
    /// Keep `history` ticks; `keep_states` also stores full state copies
    pub fn new(history: usize, keep_states: bool) -> Self {
        Self {
            fingerprints: TickBuffer::new(history),
            states: keep_states.then(|| TickBuffer::new(history)),
            pending: Vec::new(),
            checked: 0,
        }
    }

    /// Record the state reached after a tick, then check anything that was
    /// waiting for it
    pub fn record(&mut self, state: &StateData) -> Result<()> {
        self.fingerprints.insert(state.tick, state.fingerprint());
        if let Some(states) = &mut self.states {
            states.insert(state.tick, state.clone());
        }
        let (ready, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|(_, block)| block.fingerprint.tick <= state.tick);
        self.pending = waiting;
        for (peer, block) in ready {
            self.check(peer, block)?;
        }
        Ok(())
    }

    /// Latest recorded fingerprint and its state copy, if kept
    pub fn latest(&self) -> Option<FingerprintBlock> {
        let (_, newest) = self.fingerprints.tick_range()?;
        let fingerprint = *self.fingerprints.get(newest)?;
        let state = self
            .states
            .as_ref()
            .and_then(|s| s.get(newest))
            .cloned();
        Some(FingerprintBlock { fingerprint, state })
    }

    /// Number of remote fingerprints compared so far
    pub fn checked(&self) -> u64 {
        self.checked
    }

    /// Compare a peer's fingerprint against our own for the same tick
    ///
    /// Fingerprints for ticks we have not simulated yet are held until
    /// [`record`](Self::record) reaches them; ones older than the history
    /// are ignored.
    pub fn check(&mut self, peer: ClientId, block: FingerprintBlock) -> Result<()> {
        let tick = block.fingerprint.tick;
        let Some(ours) = self.fingerprints.get(tick).copied() else {
            let newest = self.fingerprints.tick_range().map_or(0, |(_, n)| n);
            if tick > newest {
                if self.pending.len() >= MAX_PENDING {
                    self.pending.remove(0);
                }
                self.pending.push((peer, block));
            }
            return Ok(());
        };
        self.checked += 1;

        let our_state = self.states.as_ref().and_then(|s| s.get(tick));
        let fields = compare(&ours, our_state, &block);
        if fields.is_empty() {
            return Ok(());
        }
        for field in &fields {
            error!(peer, tick, %field, "state mismatch");
        }
        Err(Error::Desync { tick, peer, fields })
    }
}

/// Describe every differing field
pub fn compare(
    ours: &Fingerprint,
    our_state: Option<&StateData>,
    theirs: &FingerprintBlock,
) -> Vec<String> {
    let fp = &theirs.fingerprint;
    let mut fields = Vec::new();
    if ours.seed != fp.seed {
        fields.push(format!("seed: {:#010x} != {:#010x}", ours.seed, fp.seed));
    }
    if ours.next_id != fp.next_id {
        fields.push(format!("next_id: {} != {}", ours.next_id, fp.next_id));
    }
    if ours.digest != fp.digest {
        fields.push(format!("digest: {:#010x} != {:#010x}", ours.digest, fp.digest));
    }
    if let (Some(a), Some(b)) = (our_state, &theirs.state) {
        let names = ["players", "barrels", "bullets", "items"];
        for ((name, ours), theirs) in names.iter().zip(a.lists()).zip(b.lists()) {
            compare_list(name, ours, theirs, &mut fields);
        }
        if a.stats != b.stats {
            fields.push("stats".to_string());
        }
    }
    fields
}

fn compare_list(name: &str, ours: &[Actor], theirs: &[Actor], fields: &mut Vec<String>) {
    if ours.len() != theirs.len() {
        fields.push(format!("{name}.len: {} != {}", ours.len(), theirs.len()));
    }
    for (a, b) in ours.iter().zip(theirs) {
        if a != b {
            fields.push(format!("{name}: {a} at ({}, {}) != {b} at ({}, {})", a.x, a.y, b.x, b.y));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshfire_core::ActorKind;

    fn state(tick: Tick) -> StateData {
        let mut s = StateData::new(5, 1);
        s.tick = tick;
        let id = s.alloc_id();
        s.barrels.push(Actor::new(id, ActorKind::Barrel, 100, 200));
        s
    }

    fn block(s: &StateData, with_state: bool) -> FingerprintBlock {
        FingerprintBlock {
            fingerprint: s.fingerprint(),
            state: with_state.then(|| s.clone()),
        }
    }

    #[test]
    fn test_matching_fingerprint_passes() {
        let mut d = DesyncDetector::new(16, false);
        let s = state(3);
        d.record(&s).unwrap();
        d.check(2, block(&s, false)).unwrap();
        assert_eq!(d.checked(), 1);
    }

    #[test]
    fn test_mismatch_is_fatal() {
        let mut d = DesyncDetector::new(16, true);
        let ours = state(3);
        d.record(&ours).unwrap();
        let mut theirs = ours.clone();
        theirs.barrels[0].x += 1;
        theirs.seed ^= 1;

        let err = d.check(2, block(&theirs, true)).unwrap_err();
        match err {
            Error::Desync { tick, peer, fields } => {
                assert_eq!((tick, peer), (3, 2));
                assert!(fields.iter().any(|f| f.starts_with("seed")));
                assert!(fields.iter().any(|f| f.starts_with("digest")));
                assert!(fields.iter().any(|f| f.starts_with("barrels")));
            }
            other => panic!("unexpected {other}"),
        }
    }

    #[test]
    fn test_future_fingerprint_waits() {
        let mut d = DesyncDetector::new(16, false);
        d.record(&state(1)).unwrap();
        let mut ahead = state(2);
        ahead.next_id = 99;
        d.check(4, block(&ahead, false)).unwrap();
        assert_eq!(d.checked(), 0);
        assert!(matches!(d.record(&state(2)), Err(Error::Desync { tick: 2, .. })));
    }

    #[test]
    fn test_latest_carries_state_copy() {
        let mut d = DesyncDetector::new(16, true);
        d.record(&state(1)).unwrap();
        d.record(&state(2)).unwrap();
        let latest = d.latest().unwrap();
        assert_eq!(latest.fingerprint.tick, 2);
        assert_eq!(latest.state, Some(state(2)));
        assert!(DesyncDetector::new(4, false).latest().is_none());
    }
}
