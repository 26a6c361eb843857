//! Trailing-edge debounce with an explicit clock.
//!
//! A [`Debounced`] handle is armed with [`Debounced::trigger`]; every trigger inside the
//! window pushes the deadline out and replaces the payload, so a burst collapses into one
//! trailing [`Debounced::fire`]. The owner polls `fire` from its tick. Nothing runs on
//! its own, which keeps cancellation trivial and tests deterministic.

use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct Debounced<T> {
    name: &'static str,
    window: Duration,
    pending: Option<(Instant, T)>,
}

impl<T> Debounced<T> {
    pub fn new(name: &'static str, window: Duration) -> Self {
        Self {
            name,
            window,
            pending: None,
        }
    }

    /// (Re-)arms the handle; the latest payload wins.
    pub fn trigger(&mut self, now: Instant, value: T) {
        if self.pending.is_some() {
            tracing::trace!("{}: re-armed", self.name);
        }
        self.pending = Some((now + self.window, value));
    }

    /// Returns the payload once the quiet period has elapsed, disarming the handle.
    pub fn fire(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some((deadline, _)) if now >= *deadline => self.pending.take().map(|(_, v)| v),
            _ => None,
        }
    }

    /// Drops a pending invocation. Returns whether one was armed.
    pub fn cancel(&mut self) -> bool {
        let armed = self.pending.take().is_some();
        if armed {
            tracing::debug!("{}: cancelled", self.name);
        }
        armed
    }

    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(d, _)| *d)
    }
}
