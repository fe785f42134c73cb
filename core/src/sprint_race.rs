//! Sprint: one pass over the route, first to the final checkpoint wins.

use crate::{
    mission::Outcome,
    race_variant::{first_across_the_line, RaceContext, RaceVariant},
};

#[derive(Debug, Default)]
pub struct SprintRace;

impl SprintRace {
    pub fn new() -> Self {
        Self
    }
}

impl RaceVariant for SprintRace {
    fn name(&self) -> &'static str {
        "sprint"
    }

    fn on_lap_passed(&mut self, rc: &mut RaceContext<'_, '_>, racer: usize, _lap: u32) -> Outcome {
        first_across_the_line(rc, racer, &self.failure_keys())
    }
}
