#![forbid(unsafe_code)]

//! Debounced preview scheduling.
//!
//! Only the most recently scheduled candidate can fire; rescheduling or
//! cancelling supersedes whatever was pending. Time is passed in by the
//! caller so behaviour is deterministic.

use std::time::Duration;

use web_time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Pending {
    index: usize,
    due: Instant,
    generation: u64,
}

/// Latest-wins debouncer for preview indices.
#[derive(Debug, Clone)]
pub struct PreviewDebouncer {
    delay: Duration,
    pending: Option<Pending>,
    generation: u64,
}

impl PreviewDebouncer {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
            generation: 0,
        }
    }

    /// Schedule `index` to fire `delay` after `now`, replacing any pending
    /// candidate. Returns the schedule generation.
    pub fn schedule(&mut self, index: usize, now: Instant) -> u64 {
        self.generation += 1;
        self.pending = Some(Pending {
            index,
            due: now + self.delay,
            generation: self.generation,
        });
        self.generation
    }

    /// Drop the pending candidate. Returns whether one was pending.
    pub fn cancel(&mut self) -> bool {
        self.generation += 1;
        self.pending.take().is_some()
    }

    /// Fire the pending candidate if it is due.
    pub fn poll(&mut self, now: Instant) -> Option<usize> {
        let pending = self.pending?;
        if now < pending.due || pending.generation != self.generation {
            return None;
        }
        self.pending = None;
        Some(pending.index)
    }

    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Index waiting to fire.
    #[must_use]
    pub fn pending_index(&self) -> Option<usize> {
        self.pending.map(|pending| pending.index)
    }
}
