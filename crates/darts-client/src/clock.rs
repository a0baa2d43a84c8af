/// Local countdown for the current turn.
///
/// The server owns the real deadline; this clock only fills the gaps
/// between snapshots. It is reset from every applied snapshot, counts down
/// one second per tick while running, and stops at zero without ending the
/// turn.
#[derive(Debug, Clone)]
pub struct TurnClock {
    remaining: u32,
    running: bool,
    warning_threshold: u32,
}

impl TurnClock {
    pub fn new(initial: u32, warning_threshold: u32) -> Self {
        Self {
            remaining: initial,
            running: false,
            warning_threshold,
        }
    }

    /// Adopt the authoritative remaining time.
    pub fn resync(&mut self, remaining: u32) {
        if self.running && remaining.abs_diff(self.remaining) > 1 {
            tracing::debug!(local = self.remaining, remaining, "Turn clock drift corrected");
        }
        self.remaining = remaining;
    }

    /// Count down one second. Returns the new remaining time.
    pub fn tick(&mut self) -> u32 {
        if self.running {
            self.remaining = self.remaining.saturating_sub(1);
        }
        self.remaining
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_warning(&self) -> bool {
        self.running && self.remaining <= self.warning_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_only_while_running() {
        let mut clock = TurnClock::new(30, 5);
        assert_eq!(clock.tick(), 30);
        clock.start();
        assert_eq!(clock.tick(), 29);
        clock.stop();
        assert_eq!(clock.tick(), 29);
    }

    #[test]
    fn never_below_zero() {
        let mut clock = TurnClock::new(1, 5);
        clock.start();
        assert_eq!(clock.tick(), 0);
        assert_eq!(clock.tick(), 0);
        assert!(clock.is_running());
    }

    #[test]
    fn resync_overrides_local_count() {
        let mut clock = TurnClock::new(30, 5);
        clock.start();
        for _ in 0..4 {
            clock.tick();
        }
        clock.resync(28);
        assert_eq!(clock.remaining(), 28);
        clock.resync(30);
        assert_eq!(clock.remaining(), 30);
    }

    #[test]
    fn warning_threshold_is_inclusive() {
        let mut clock = TurnClock::new(6, 5);
        clock.start();
        assert!(!clock.is_warning());
        clock.tick();
        assert!(clock.is_warning());
        clock.stop();
        assert!(!clock.is_warning());
    }

    // ================================================================
    // Property tests
    // ================================================================

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn remaining_is_monotonic_between_resyncs(start in 0u32..120, ticks in 0usize..200) {
                let mut clock = TurnClock::new(start, 5);
                clock.start();
                let mut prev = clock.remaining();
                for _ in 0..ticks {
                    let now = clock.tick();
                    prop_assert!(now <= prev);
                    prop_assert!(prev - now <= 1);
                    prev = now;
                }
                prop_assert_eq!(clock.remaining(), start.saturating_sub(ticks as u32));
            }
        }
    }
}
