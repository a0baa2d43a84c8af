use std::collections::VecDeque;
use std::time::Duration;

use serde::Serialize;

/// Maximum number of simultaneously visible notices.
pub const MAX_VISIBLE_NOTICES: usize = 3;

/// Notices waiting for a visible slot beyond this are dropped, oldest first.
pub const MAX_PENDING_NOTICES: usize = 8;

/// Default lifetime of a transient notice.
pub const DEFAULT_NOTICE_DURATION: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A message for the player. Persistent notices stay until dismissed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
    pub persistent: bool,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            text: text.into(),
            persistent: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
            persistent: false,
        }
    }

    pub fn persistent(mut self) -> Self {
        self.persistent = true;
        self
    }
}

/// A notice on screen, stamped with when it became visible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub notice: Notice,
    pub shown_at: Duration,
}

/// Queue managing notice display.
///
/// Times are offsets on the caller's monotonic clock.
#[derive(Debug)]
pub struct NoticeQueue {
    visible: Vec<Toast>,
    pending: VecDeque<Notice>,
    duration: Duration,
}

impl NoticeQueue {
    pub fn new() -> Self {
        Self::with_duration(DEFAULT_NOTICE_DURATION)
    }

    pub fn with_duration(duration: Duration) -> Self {
        Self {
            visible: Vec::new(),
            pending: VecDeque::new(),
            duration,
        }
    }

    /// Add a notice. Identical persistent notices are not stacked.
    pub fn push(&mut self, notice: Notice, now: Duration) {
        if notice.persistent
            && (self.visible.iter().any(|t| t.notice == notice) || self.pending.contains(&notice))
        {
            return;
        }
        if self.visible.len() < MAX_VISIBLE_NOTICES {
            self.visible.push(Toast {
                notice,
                shown_at: now,
            });
        } else {
            if self.pending.len() >= MAX_PENDING_NOTICES {
                self.drop_oldest_pending();
            }
            self.pending.push_back(notice);
        }
    }

    /// Status banners outlive transient notices when the backlog overflows.
    fn drop_oldest_pending(&mut self) {
        let index = self
            .pending
            .iter()
            .position(|n| !n.persistent)
            .unwrap_or(0);
        self.pending.remove(index);
    }

    /// Get currently visible notices.
    pub fn visible(&self) -> &[Toast] {
        &self.visible
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Expire transient notices and promote pending ones. Returns true if
    /// the visible set changed.
    pub fn prune(&mut self, now: Duration) -> bool {
        let before = self.visible.len();
        let duration = self.duration;
        self.visible
            .retain(|t| t.notice.persistent || now.saturating_sub(t.shown_at) < duration);
        let expired = before != self.visible.len();
        let promoted = self.promote(now);
        expired || promoted
    }

    /// Remove every persistent notice (e.g. once the connection is back).
    pub fn dismiss_persistent(&mut self, now: Duration) -> bool {
        let before = self.visible.len() + self.pending.len();
        self.visible.retain(|t| !t.notice.persistent);
        self.pending.retain(|n| !n.persistent);
        let removed = before != self.visible.len() + self.pending.len();
        self.promote(now) || removed
    }

    fn promote(&mut self, now: Duration) -> bool {
        let mut promoted = false;
        while self.visible.len() < MAX_VISIBLE_NOTICES {
            let Some(notice) = self.pending.pop_front() else {
                break;
            };
            self.visible.push(Toast {
                notice,
                shown_at: now,
            });
            promoted = true;
        }
        promoted
    }
}

impl Default for NoticeQueue {
    fn default() -> Self {
        Self::new()
    }
}
