//! Timed checkpoints: the player races a shared countdown. Every
//! checkpoint taken adds that node's allotment back onto the clock.

use crate::{
    mission::{Outcome, DEFAULT_REASON_MS},
    race_variant::{first_across_the_line, RaceContext, RaceVariant},
    timer::Timer,
    types::Millis,
};

#[derive(Debug)]
pub struct TimedCheckpointRace {
    laps:            u32,
    initial_time_ms: Millis,
}

impl TimedCheckpointRace {
    pub fn new(laps: u32, initial_time_ms: Millis) -> Self {
        Self { laps: laps.max(1), initial_time_ms }
    }
}

impl RaceVariant for TimedCheckpointRace {
    fn name(&self) -> &'static str {
        "timed_checkpoint"
    }

    fn laps(&self, _racer_count: usize) -> u32 {
        self.laps
    }

    fn on_racer_setup(&mut self, rc: &mut RaceContext<'_, '_>, racer: usize) {
        if rc.racer(racer).is_player {
            let budget = Timer::start(rc.clock(), self.initial_time_ms);
            rc.racer_mut(racer).time_budget = Some(budget);
        }
    }

    fn on_lap_passed(&mut self, rc: &mut RaceContext<'_, '_>, racer: usize, lap: u32) -> Outcome {
        if lap < self.laps {
            return Outcome::Continue;
        }
        first_across_the_line(rc, racer, &self.failure_keys())
    }

    fn on_draw_info(&mut self, rc: &mut RaceContext<'_, '_>) -> Outcome {
        let player = rc.race.player_index();
        let Some(remaining) = rc.racer(player).time_remaining(rc.clock()) else {
            return Outcome::Continue;
        };
        if remaining == 0 {
            return Outcome::fail(self.failure_keys().out_of_time, DEFAULT_REASON_MS);
        }
        rc.draw_hud(format!("TIME {}", remaining / 1000));
        Outcome::Continue
    }
}
