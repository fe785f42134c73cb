//! Host clock: the only source of time in the framework.
//!
//! RULE: Nothing reads wall-clock time. Every timer is handed the
//! clock value explicitly so runs are reproducible without a live host.

use crate::types::{Millis, Tick};
use serde::{Deserialize, Serialize};

/// Default frame length used by the headless host (~30 fps).
pub const DEFAULT_FRAME_MS: Millis = 33;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HostClock {
    /// Number of host ticks delivered so far.
    pub frame:    Tick,
    /// Game time in milliseconds at the current tick.
    pub now_ms:   Millis,
    /// Game time that elapses per tick.
    pub frame_ms: Millis,
    pub paused:   bool,
}

impl HostClock {
    pub fn new(frame_ms: Millis) -> Self {
        Self {
            frame: 0,
            now_ms: 0,
            frame_ms,
            paused: false,
        }
    }

    /// Advance one tick. Returns the new frame number.
    /// A paused clock still counts frames but game time stands still.
    pub fn advance(&mut self) -> Tick {
        self.frame += 1;
        if !self.paused {
            self.now_ms += self.frame_ms;
        }
        self.frame
    }

    pub fn now(&self) -> Millis {
        self.now_ms
    }

    pub fn pause(&mut self)  { self.paused = true;  }
    pub fn resume(&mut self) { self.paused = false; }
}

impl Default for HostClock {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_MS)
    }
}
