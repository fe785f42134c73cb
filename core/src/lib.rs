//! mission-core: lifecycle, race and scripted-clip engines for
//! authoring open-world missions against an abstract game host.
//!
//! Everything here is driven one host tick at a time: the host calls
//! `MissionRunner::tick`, the runner dispatches exactly one phase
//! handler, and control returns. Nothing blocks and nothing spawns threads.

pub mod cleanup;
pub mod clock;
pub mod config;
pub mod error;
pub mod event;
pub mod headless_host;
pub mod host;
pub mod journal;
pub mod mission;
pub mod racer;
pub mod ranking;
pub mod rng;
pub mod route;
pub mod scripted_clip;
pub mod snapshot;
pub mod timer;
pub mod types;

pub mod race_engine;
pub mod race_variant;

pub mod circuit_race;
pub mod knockout_race;
pub mod radar_challenge;
pub mod speed_trap_race;
pub mod sprint_race;
pub mod timed_checkpoint_race;
pub mod wanted_challenge;

pub use error::{MissionError, MissionResult};
pub use mission::{FailReason, Mission, MissionContext, MissionRunner, Outcome, Phase};
pub use race_engine::{race_from_config, RaceMission, RaceStage, RaceState};
pub use race_variant::{RaceContext, RaceVariant};
