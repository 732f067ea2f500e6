//! Tick pacing
//!
//! Converts wall-clock time into a tick budget. The pacing clock marks the
//! wall time the next tick is due; every simulated tick moves it forward by
//! one tick length. After each frame the clock is nudged toward keeping
//! `target_lead` ticks between the local tick and the horizon: a horizon
//! far ahead pulls the clock back (more ticks next frame), a horizon behind
//! pushes it forward (fewer ticks).

use meshfire_core::Tick;

/// Wall-clock pacing with drift correction
#[derive(Debug, Clone)]
pub struct TickScheduler {
    tick_ms: f64,
    target_lead: f64,
    drift_gain: f64,
    max_catch_up: u32,
    /// Wall time at which the next tick is due
    clock: Option<f64>,
}

impl TickScheduler {
    pub fn new(tick_ms: f64, target_lead: Tick, drift_gain: f64, max_catch_up: u32) -> Self {
        Self {
            tick_ms,
            target_lead: target_lead as f64,
            drift_gain,
            max_catch_up: max_catch_up.max(1),
            clock: None,
        }
    }

    pub fn tick_ms(&self) -> f64 {
        self.tick_ms
    }

    /// Restart pacing at `now_ms`, e.g. after adopting a snapshot
    pub fn reset(&mut self, now_ms: f64) {
        self.clock = Some(now_ms);
    }

    /// Ticks the clock allows at `now_ms`
    ///
    /// Time owed beyond `max_catch_up` ticks is forgiven so a long stall
    /// does not turn into a burst.
    pub fn budget(&mut self, now_ms: f64) -> u32 {
        let clock = self.clock.get_or_insert(now_ms);
        let floor = now_ms - self.max_catch_up as f64 * self.tick_ms;
        if *clock < floor {
            *clock = floor;
        }
        let owed = ((now_ms - *clock) / self.tick_ms).floor();
        if owed <= 0.0 {
            0
        } else {
            (owed as u32).min(self.max_catch_up)
        }
    }

    /// Ticks owed at `now_ms` without touching the clock
    pub fn pending(&self, now_ms: f64) -> u32 {
        match self.clock {
            Some(clock) if now_ms > clock => ((now_ms - clock) / self.tick_ms) as u32,
            _ => 0,
        }
    }

    /// Account for one simulated tick
    pub fn consume(&mut self) {
        if let Some(clock) = &mut self.clock {
            *clock += self.tick_ms;
        }
    }

    /// Nudge the clock toward the target lead over the horizon
    pub fn correct_drift(&mut self, local_tick: Tick, horizon: Option<Tick>) {
        let (Some(clock), Some(horizon)) = (&mut self.clock, horizon) else {
            return;
        };
        let lead = horizon as f64 - local_tick as f64;
        let error = lead - self.target_lead;
        *clock -= error * self.tick_ms * self.drift_gain;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_follows_wall_clock() {
        let mut s = TickScheduler::new(10.0, 4, 0.1, 30);
        assert_eq!(s.budget(1000.0), 0);
        assert_eq!(s.budget(1035.0), 3);
        for _ in 0..3 {
            s.consume();
        }
        assert_eq!(s.budget(1039.0), 0);
        assert_eq!(s.pending(1055.0), 2);
        assert_eq!(s.budget(1040.0), 1);
    }

    #[test]
    fn test_stall_is_forgiven() {
        let mut s = TickScheduler::new(10.0, 4, 0.1, 5);
        s.reset(0.0);
        assert_eq!(s.budget(10_000.0), 5);
        for _ in 0..5 {
            s.consume();
        }
        assert_eq!(s.budget(10_000.0), 0);
    }

    #[test]
    fn test_drift_speeds_up_when_behind() {
        let mut fast = TickScheduler::new(10.0, 4, 0.5, 30);
        fast.reset(0.0);
        fast.correct_drift(100, Some(124));
        let mut slow = TickScheduler::new(10.0, 4, 0.5, 30);
        slow.reset(0.0);
        slow.correct_drift(100, Some(100));
        assert!(fast.budget(50.0) > slow.budget(50.0));
        assert_eq!(slow.budget(50.0), 3);
    }

    #[test]
    fn test_no_peers_no_drift() {
        let mut s = TickScheduler::new(10.0, 4, 0.5, 30);
        s.reset(0.0);
        s.correct_drift(100, None);
        assert_eq!(s.budget(25.0), 2);
    }
}
