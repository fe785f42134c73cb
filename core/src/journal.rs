//! In-memory event journal.
//!
//! RULE: Only journal.rs owns the log. Everything else appends events
//! through `append` and reads them back through the query methods.

use crate::{
    error::MissionResult,
    event::{EventLogEntry, MissionEvent},
    types::{RunId, Tick},
};
use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize)]
pub struct Journal {
    run_id:    RunId,
    entries:   Vec<EventLogEntry>,
    snapshots: Vec<(Tick, String)>,
}

impl Journal {
    pub fn new(run_id: impl Into<RunId>) -> Self {
        Self {
            run_id: run_id.into(),
            entries: Vec::new(),
            snapshots: Vec::new(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    // ── Event log ──────────────────────────────────────────────

    pub fn append(&mut self, tick: Tick, source: &str, event: &MissionEvent) -> MissionResult<()> {
        let entry = EventLogEntry {
            id:         self.entries.len() as u64 + 1,
            run_id:     self.run_id.clone(),
            tick,
            source:     source.to_string(),
            event_type: event.type_name().to_string(),
            payload:    serde_json::to_string(event)?,
        };
        self.entries.push(entry);
        Ok(())
    }

    pub fn entries(&self) -> &[EventLogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn events_for_tick(&self, tick: Tick) -> Vec<&EventLogEntry> {
        self.entries.iter().filter(|e| e.tick == tick).collect()
    }

    pub fn count_of(&self, event_type: &str) -> usize {
        self.entries.iter().filter(|e| e.event_type == event_type).count()
    }

    /// Decode every payload of one event type back into events.
    pub fn events_of(&self, event_type: &str) -> MissionResult<Vec<MissionEvent>> {
        self.entries
            .iter()
            .filter(|e| e.event_type == event_type)
            .map(|e| serde_json::from_str(&e.payload).map_err(Into::into))
            .collect()
    }

    // ── Snapshot ───────────────────────────────────────────────

    pub fn save_snapshot(&mut self, tick: Tick, state_json: String) {
        self.snapshots.push((tick, state_json));
    }

    pub fn latest_snapshot_before(&self, tick: Tick) -> Option<(Tick, &str)> {
        self.snapshots
            .iter()
            .rev()
            .find(|(t, _)| *t <= tick)
            .map(|(t, json)| (*t, json.as_str()))
    }

    pub fn snapshot_count(&self) -> usize {
        self.snapshots.len()
    }

    /// The whole journal as pretty JSON, for tooling.
    pub fn to_json(&self) -> MissionResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write `to_json` output to `path`, replacing any existing file.
    pub fn write_to(&self, path: impl AsRef<std::path::Path>) -> MissionResult<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
