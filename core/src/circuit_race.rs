//! Circuit: N laps, first to complete them all wins.

use crate::{
    error::{MissionError, MissionResult},
    mission::Outcome,
    race_engine::RaceState,
    race_variant::{first_across_the_line, RaceContext, RaceVariant},
};

pub const MIN_CIRCUIT_LAPS: u32 = 2;

#[derive(Debug)]
pub struct CircuitRace {
    laps: u32,
}

impl CircuitRace {
    pub fn new(laps: u32) -> Self {
        Self { laps }
    }
}

impl RaceVariant for CircuitRace {
    fn name(&self) -> &'static str {
        "circuit"
    }

    fn laps(&self, _racer_count: usize) -> u32 {
        self.laps
    }

    fn validate(&self, _race: &RaceState) -> MissionResult<()> {
        if self.laps < MIN_CIRCUIT_LAPS {
            return Err(MissionError::InvalidConfig {
                reason: format!("a circuit needs at least {MIN_CIRCUIT_LAPS} laps, got {}", self.laps),
            });
        }
        Ok(())
    }

    fn on_lap_passed(&mut self, rc: &mut RaceContext<'_, '_>, racer: usize, lap: u32) -> Outcome {
        if lap < self.laps {
            return Outcome::Continue;
        }
        first_across_the_line(rc, racer, &self.failure_keys())
    }
}
