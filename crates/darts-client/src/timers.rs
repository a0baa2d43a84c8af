use std::collections::BTreeMap;
use std::time::Duration;

/// The controller's timers. Each kind is armed at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimerKind {
    ClockTick,
    StatePoll,
    Heartbeat,
    Reconnect,
}

#[derive(Debug, Clone, Copy)]
struct Timer {
    deadline: Duration,
    /// `None` for one-shot timers.
    period: Option<Duration>,
}

/// Deadline bookkeeping driven by the host's monotonic clock.
///
/// The set never sleeps: the host reports `now` and asks which timers are
/// due. Repeating timers that fall behind fire once and skip the missed
/// periods, like `MissedTickBehavior::Skip`.
#[derive(Debug, Default)]
pub struct TimerSet {
    timers: BTreeMap<TimerKind, Timer>,
}

impl TimerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm (or re-arm) a repeating timer whose first firing is one period out.
    pub fn arm_repeating(&mut self, kind: TimerKind, period: Duration, now: Duration) {
        let period = period.max(Duration::from_millis(1));
        self.timers.insert(
            kind,
            Timer {
                deadline: now + period,
                period: Some(period),
            },
        );
    }

    /// Arm a repeating timer only if it is not already running.
    pub fn ensure_repeating(&mut self, kind: TimerKind, period: Duration, now: Duration) {
        if !self.is_armed(kind) {
            self.arm_repeating(kind, period, now);
        }
    }

    pub fn arm_once(&mut self, kind: TimerKind, delay: Duration, now: Duration) {
        self.timers.insert(
            kind,
            Timer {
                deadline: now + delay,
                period: None,
            },
        );
    }

    pub fn cancel(&mut self, kind: TimerKind) -> bool {
        self.timers.remove(&kind).is_some()
    }

    pub fn cancel_all(&mut self) {
        self.timers.clear();
    }

    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.timers.contains_key(&kind)
    }

    /// Earliest pending deadline, for hosts that sleep until the next event.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.values().map(|t| t.deadline).min()
    }

    /// Collect due timers in deadline order, rescheduling repeating ones.
    pub fn due(&mut self, now: Duration) -> Vec<TimerKind> {
        let mut fired: Vec<(Duration, TimerKind)> = Vec::new();
        self.timers.retain(|kind, timer| {
            if timer.deadline > now {
                return true;
            }
            fired.push((timer.deadline, *kind));
            match timer.period {
                Some(period) => {
                    let behind = (now - timer.deadline).as_nanos() / period.as_nanos();
                    let skipped = u32::try_from(behind).unwrap_or(u32::MAX);
                    timer.deadline += period * skipped.saturating_add(1);
                    true
                },
                None => false,
            }
        });
        fired.sort();
        fired.into_iter().map(|(_, kind)| kind).collect()
    }
}
