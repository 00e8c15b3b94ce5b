// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! One-shot / auto-reset session timer over a caller-supplied tick source.

/// Monotonic millisecond tick source.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

pub struct SimpleTimer {
    wait_time: u64,
    target_time: u64,
    expired: bool,
    auto_reset: bool,
}

impl SimpleTimer {
    pub fn new(wait_time: u64, auto_reset: bool, now: u64) -> Self {
        Self {
            wait_time,
            target_time: now + wait_time,
            expired: false,
            auto_reset,
        }
    }

    /// Check expiry against `now`. Auto-reset timers re-arm, compensating
    /// for however far past the target the check happened; one-shot timers
    /// latch and report `false` on every later call until reset.
    pub fn has_expired(&mut self, now: u64) -> bool {
        if self.expired {
            return false;
        }

        let has_expired = now >= self.target_time;
        if has_expired {
            if self.auto_reset {
                let drift = now - self.target_time;
                self.target_time = (now + self.wait_time) - drift;
            } else {
                self.expired = true;
            }
        }

        has_expired
    }

    /// Re-arm from `now`, clearing any latched expiry.
    pub fn reset(&mut self, now: u64) {
        self.target_time = now + self.wait_time;
        self.expired = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_expired_before_target() {
        let mut t = SimpleTimer::new(100, false, 0);
        assert!(!t.has_expired(0));
        assert!(!t.has_expired(99));
    }

    #[test]
    fn test_expires_at_target() {
        let mut t = SimpleTimer::new(100, false, 0);
        assert!(t.has_expired(100));
    }

    #[test]
    fn test_one_shot_latches() {
        let mut t = SimpleTimer::new(100, false, 0);
        assert!(t.has_expired(150));
        // Latched: never fires again without a reset.
        assert!(!t.has_expired(1000));
        t.reset(1000);
        assert!(!t.has_expired(1099));
        assert!(t.has_expired(1100));
    }

    #[test]
    fn test_auto_reset_rearms_with_drift_compensation() {
        let mut t = SimpleTimer::new(100, true, 0);
        // Checked 30 ticks late: next target stays on the 100-tick grid.
        assert!(t.has_expired(130));
        assert!(!t.has_expired(199));
        assert!(t.has_expired(200));
    }

    #[test]
    fn test_reset_pushes_target_forward() {
        let mut t = SimpleTimer::new(100, false, 0);
        t.reset(80);
        assert!(!t.has_expired(150));
        assert!(t.has_expired(180));
    }
}
