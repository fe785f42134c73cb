//! Race snapshots: standings to/from JSON.
//!
//! A snapshot is taken every SNAPSHOT_INTERVAL frames while racing and
//! stored in the journal. It is a read-only view for tooling; the race
//! is never resumed from it.

use crate::{
    clock::HostClock,
    error::MissionResult,
    types::{RunId, Tick},
};
use serde::{Deserialize, Serialize};

pub const SNAPSHOT_INTERVAL: Tick = 30; // about once a second at 33 ms frames

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandingEntry {
    pub racer:       usize,
    pub name:        String,
    pub position:    usize,
    pub lap:         u32,
    pub next_node:   usize,
    pub speed_sum:   f32,
    pub knocked_out: bool,
    pub finished:    bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceSnapshot {
    pub run_id:    RunId,
    pub tick:      Tick,
    pub clock:     HostClock,
    pub stage:     String,
    pub standings: Vec<StandingEntry>,
}

impl RaceSnapshot {
    pub fn to_json(&self) -> MissionResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> MissionResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// The entry currently in first place, if any.
    pub fn leader(&self) -> Option<&StandingEntry> {
        self.standings.iter().min_by_key(|s| s.position)
    }
}
