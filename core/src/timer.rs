//! Duration arithmetic on top of [`HostClock`].
//!
//! A timer is a pair (start, duration); it owns no running state, so
//! copying it or dropping it never affects anything else.

use crate::{clock::HostClock, types::Millis};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timer {
    started_at: Millis,
    duration:   Millis,
}

impl Timer {
    pub fn start(clock: &HostClock, duration: Millis) -> Self {
        Self { started_at: clock.now(), duration }
    }

    /// A stopwatch with no target; only `elapsed` is meaningful.
    pub fn stopwatch(clock: &HostClock) -> Self {
        Self::start(clock, Millis::MAX)
    }

    pub fn target(&self) -> Millis {
        self.started_at.saturating_add(self.duration)
    }

    pub fn duration(&self) -> Millis {
        self.duration
    }

    pub fn elapsed(&self, clock: &HostClock) -> Millis {
        clock.now().saturating_sub(self.started_at)
    }

    pub fn remaining(&self, clock: &HostClock) -> Millis {
        self.target().saturating_sub(clock.now())
    }

    pub fn is_expired(&self, clock: &HostClock) -> bool {
        clock.now() >= self.target()
    }

    /// Push the target further out without touching the start point.
    pub fn extend(&mut self, by: Millis) {
        self.duration = self.duration.saturating_add(by);
    }

    pub fn restart(&mut self, clock: &HostClock) {
        self.started_at = clock.now();
    }
}
