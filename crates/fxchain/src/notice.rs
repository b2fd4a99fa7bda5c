#![forbid(unsafe_code)]

//! Transient user-visible notices for rejected structural edits.
//!
//! The queue provides:
//! - a maximum visible count, with overflow waiting in FIFO order
//! - per-notice time-to-live counted from when it is shown
//! - content-based deduplication within a configurable window
//!
//! Time is passed in explicitly; call [`NoticeQueue::tick`] from the host's
//! event loop.

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use fxchain_model::StructuralViolation;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use web_time::Instant;

/// Notice queue limits and timings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoticeConfig {
    /// How long a notice stays visible.
    pub ttl_ms: u64,
    /// Maximum notices shown at once.
    pub max_visible: usize,
    /// Maximum notices waiting to be shown. Older ones are dropped first.
    pub max_queued: usize,
    /// Identical notices within this window are collapsed.
    pub dedup_window_ms: u64,
}

impl Default for NoticeConfig {
    fn default() -> Self {
        Self {
            ttl_ms: 3000,
            max_visible: 3,
            max_queued: 10,
            dedup_window_ms: 1000,
        }
    }
}

impl NoticeConfig {
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    #[must_use]
    pub fn dedup_window(&self) -> Duration {
        Duration::from_millis(self.dedup_window_ms)
    }

    /// Returns a list of validation errors. Empty means valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.ttl_ms == 0 {
            errors.push("ttl_ms must be > 0".into());
        }
        if self.max_visible == 0 {
            errors.push("max_visible must be > 0".into());
        }
        errors
    }
}

/// Identifier of one notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoticeId(u64);

impl NoticeId {
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NoticeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "notice#{}", self.0)
    }
}

/// One rejected-edit message.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub id: NoticeId,
    /// Stable violation code, e.g. `nested_group`.
    pub code: &'static str,
    pub message: String,
    /// When the notice became visible.
    pub shown_at: Option<Instant>,
}

impl Notice {
    fn expired(&self, now: Instant, ttl: Duration) -> bool {
        self.shown_at.is_some_and(|shown| now >= shown + ttl)
    }
}

/// Changes the host should reflect.
#[derive(Debug, Clone, PartialEq)]
pub enum NoticeAction {
    /// A waiting notice became visible.
    Show(NoticeId),
    /// A visible notice timed out.
    Expired(Notice),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoticeStats {
    pub total_pushed: u64,
    pub dedup_count: u64,
    pub overflow_count: u64,
    pub auto_expired: u64,
}

/// Bounded, auto-dismissing notice queue.
#[derive(Debug)]
pub struct NoticeQueue {
    config: NoticeConfig,
    pending: VecDeque<Notice>,
    visible: Vec<Notice>,
    recent: FxHashMap<String, Instant>,
    next_id: u64,
    stats: NoticeStats,
}

impl Default for NoticeQueue {
    fn default() -> Self {
        Self::new(NoticeConfig::default())
    }
}

impl NoticeQueue {
    #[must_use]
    pub fn new(config: NoticeConfig) -> Self {
        Self {
            config,
            pending: VecDeque::new(),
            visible: Vec::new(),
            recent: FxHashMap::default(),
            next_id: 0,
            stats: NoticeStats::default(),
        }
    }

    /// Report a rejected edit.
    ///
    /// Returns the new notice id, or `None` if an identical notice was
    /// pushed within the dedup window.
    pub fn push(&mut self, violation: &StructuralViolation, now: Instant) -> Option<NoticeId> {
        self.stats.total_pushed += 1;
        let message = violation.to_string();
        let window = self.config.dedup_window();
        self.recent.retain(|_, seen| now.duration_since(*seen) < window);
        if self.recent.contains_key(&message) {
            self.stats.dedup_count += 1;
            return None;
        }
        self.recent.insert(message.clone(), now);

        self.next_id += 1;
        let id = NoticeId(self.next_id);
        let mut notice = Notice {
            id,
            code: violation.code(),
            message,
            shown_at: None,
        };
        if self.visible.len() < self.config.max_visible {
            notice.shown_at = Some(now);
            self.visible.push(notice);
        } else {
            if self.pending.len() >= self.config.max_queued {
                self.pending.pop_front();
                self.stats.overflow_count += 1;
            }
            self.pending.push_back(notice);
        }
        tracing::debug!(target: "fxchain.session", notice = %id, code = violation.code(), "notice queued");
        Some(id)
    }

    /// Expire timed-out notices and promote waiting ones.
    pub fn tick(&mut self, now: Instant) -> Vec<NoticeAction> {
        let ttl = self.config.ttl();
        let mut actions = Vec::new();
        let (expired, kept): (Vec<Notice>, Vec<Notice>) = std::mem::take(&mut self.visible)
            .into_iter()
            .partition(|notice| notice.expired(now, ttl));
        self.visible = kept;
        self.stats.auto_expired += expired.len() as u64;
        actions.extend(expired.into_iter().map(NoticeAction::Expired));

        while self.visible.len() < self.config.max_visible {
            let Some(mut notice) = self.pending.pop_front() else {
                break;
            };
            notice.shown_at = Some(now);
            actions.push(NoticeAction::Show(notice.id));
            self.visible.push(notice);
        }
        actions
    }

    /// Remove a notice wherever it is.
    pub fn dismiss(&mut self, id: NoticeId) -> bool {
        let before = self.visible.len() + self.pending.len();
        self.visible.retain(|notice| notice.id != id);
        self.pending.retain(|notice| notice.id != id);
        before != self.visible.len() + self.pending.len()
    }

    pub fn dismiss_all(&mut self) {
        self.visible.clear();
        self.pending.clear();
    }

    #[must_use]
    pub fn visible(&self) -> &[Notice] {
        &self.visible
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.visible.is_empty() && self.pending.is_empty()
    }

    #[must_use]
    pub fn stats(&self) -> NoticeStats {
        self.stats
    }

    #[must_use]
    pub fn config(&self) -> &NoticeConfig {
        &self.config
    }
}
