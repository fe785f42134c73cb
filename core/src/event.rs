//! Journal events: every observable state change of a run.
//!
//! RULE: The lifecycle, the race engine and the clip sequencer report
//! what happened ONLY through these events. Tests and tooling read the
//! journal instead of poking at internal state.

use crate::types::{Millis, RunId, Tick};
use serde::{Deserialize, Serialize};

/// Every event emitted while a mission runs.
/// Variants are appended, never removed or reordered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MissionEvent {
    // ── Lifecycle events ───────────────────────────
    PhaseChanged {
        tick: Tick,
        from: String,
        to:   String,
    },
    ForcedFailure {
        tick:   Tick,
        player: String,
    },
    UpdateErrored {
        tick:    Tick,
        message: String,
    },
    SubMissionDelegated {
        tick:  Tick,
        title: String,
    },
    MissionPassed {
        tick:    Tick,
        cash:    i64,
        respect: i64,
    },
    MissionFailed {
        tick:       Tick,
        reason_key: String,
    },

    // ── Race events ────────────────────────────────
    RaceStageChanged {
        tick:  Tick,
        stage: String,
    },
    RacerSpawned {
        tick:      Tick,
        racer:     usize,
        is_player: bool,
    },
    CountdownStep {
        tick:  Tick,
        label: String,
    },
    CheckpointPassed {
        tick:     Tick,
        racer:    usize,
        node:     usize,
        ordinal:  usize,
        speed:    f32,
    },
    LapCompleted {
        tick:  Tick,
        racer: usize,
        lap:   u32,
    },
    RacerKnockedOut {
        tick:  Tick,
        racer: usize,
        lap:   u32,
    },
    /// `node` is `None` when the racer was put back on its grid slot.
    RacerRecovered {
        tick:  Tick,
        racer: usize,
        node:  Option<usize>,
    },
    RecoveryDeferred {
        tick:       Tick,
        racer:      usize,
        node:       Option<usize>,
        blocked_by: usize,
    },
    TimeBudgetExtended {
        tick:         Tick,
        racer:        usize,
        added_ms:     Millis,
        remaining_ms: Millis,
    },

    // ── Scripted clip events ───────────────────────
    ClipStepStarted {
        tick: Tick,
        step: usize,
    },
    ClipFinished {
        tick: Tick,
    },
    ClipSkipped {
        tick: Tick,
        step: usize,
    },
    /// The mission left Update while a clip still held the suspend token.
    SuspendReclaimed {
        tick: Tick,
    },
}

impl MissionEvent {
    /// Stable string name used for the `event_type` journal column.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::PhaseChanged { .. }        => "phase_changed",
            Self::ForcedFailure { .. }       => "forced_failure",
            Self::UpdateErrored { .. }       => "update_errored",
            Self::SubMissionDelegated { .. } => "sub_mission_delegated",
            Self::MissionPassed { .. }       => "mission_passed",
            Self::MissionFailed { .. }       => "mission_failed",
            Self::RaceStageChanged { .. }    => "race_stage_changed",
            Self::RacerSpawned { .. }        => "racer_spawned",
            Self::CountdownStep { .. }       => "countdown_step",
            Self::CheckpointPassed { .. }    => "checkpoint_passed",
            Self::LapCompleted { .. }        => "lap_completed",
            Self::RacerKnockedOut { .. }     => "racer_knocked_out",
            Self::RacerRecovered { .. }      => "racer_recovered",
            Self::RecoveryDeferred { .. }    => "recovery_deferred",
            Self::TimeBudgetExtended { .. }  => "time_budget_extended",
            Self::ClipStepStarted { .. }     => "clip_step_started",
            Self::ClipFinished { .. }        => "clip_finished",
            Self::ClipSkipped { .. }         => "clip_skipped",
            Self::SuspendReclaimed { .. }    => "suspend_reclaimed",
        }
    }
}

/// The event log entry as kept in the journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id:         u64,
    pub run_id:     RunId,
    pub tick:       Tick,
    pub source:     String,
    pub event_type: String,
    pub payload:    String, // JSON-serialized MissionEvent
}
