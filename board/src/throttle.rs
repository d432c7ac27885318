//! Leading-edge throttle with a coalesced trailing call.
//!
//! DESIGN
//! ======
//! An explicit state machine (`last_fire`, `pending`) instead of timer
//! callbacks: callers pass `Instant`s in, poll [`Throttle::deadline`], and
//! fire the trailing value themselves when it comes due. This keeps the type
//! independent of any runtime and directly testable.
//!
//! Within one window at most two sends happen: the first offer fires
//! immediately, later offers coalesce into a single deferred value carrying
//! the latest arguments.

use std::time::{Duration, Instant};

/// Broadcast window shared by move, typing, and cursor channels.
pub const BROADCAST_WINDOW: Duration = Duration::from_millis(50);

/// Per-channel throttle state.
#[derive(Debug)]
pub struct Throttle<T> {
    window: Duration,
    last_fire: Option<Instant>,
    pending: Option<T>,
}

impl<T> Throttle<T> {
    /// Create a throttle with the given window.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self { window, last_fire: None, pending: None }
    }

    /// Offer a value. Returns `Some` when the value should be sent right now
    /// (leading edge); otherwise the value is parked, replacing any earlier
    /// parked value, until [`Throttle::fire_due`] releases it.
    pub fn offer(&mut self, now: Instant, value: T) -> Option<T> {
        let open = self
            .last_fire
            .is_none_or(|t| now.duration_since(t) >= self.window);
        if open {
            self.pending = None;
            self.last_fire = Some(now);
            Some(value)
        } else {
            self.pending = Some(value);
            None
        }
    }

    /// When the parked value becomes due, if any.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        match (&self.pending, self.last_fire) {
            (Some(_), Some(last)) => Some(last + self.window),
            _ => None,
        }
    }

    /// Release the parked value if its deadline has passed. The release
    /// counts as a fire and opens a fresh window.
    pub fn fire_due(&mut self, now: Instant) -> Option<T> {
        let due = self.deadline().is_some_and(|deadline| now >= deadline);
        if !due {
            return None;
        }
        self.last_fire = Some(now);
        self.pending.take()
    }

    /// Whether a trailing value is parked.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Drop all state, e.g. when the channel is torn down.
    pub fn reset(&mut self) {
        self.last_fire = None;
        self.pending = None;
    }
}

#[cfg(test)]
#[path = "throttle_test.rs"]
mod tests;
