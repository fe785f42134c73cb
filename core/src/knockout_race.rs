//! Lap knockout: after every lap but the last, whoever crosses the line
//! behind everyone still racing is parked off the route. The player is
//! never parked; coming last fails the mission instead.

use crate::{
    error::{MissionError, MissionResult},
    mission::{Outcome, DEFAULT_REASON_MS},
    race_engine::RaceState,
    race_variant::{first_across_the_line, RaceContext, RaceVariant},
};

#[derive(Debug, Default)]
pub struct KnockoutRace;

impl KnockoutRace {
    pub fn new() -> Self {
        Self
    }

    /// True when every other active racer already has `lap` or more.
    fn crossed_last(rc: &RaceContext<'_, '_>, racer: usize, lap: u32) -> bool {
        rc.race
            .racers
            .iter()
            .filter(|r| r.index != racer && r.is_active())
            .all(|r| r.lap >= lap)
    }
}

impl RaceVariant for KnockoutRace {
    fn name(&self) -> &'static str {
        "lap_knockout"
    }

    fn laps(&self, racer_count: usize) -> u32 {
        racer_count.saturating_sub(1) as u32
    }

    fn validate(&self, race: &RaceState) -> MissionResult<()> {
        if race.roster.len() < 2 {
            return Err(MissionError::InvalidRoster {
                reason: format!("a knockout needs at least 2 racers, got {}", race.roster.len()),
            });
        }
        Ok(())
    }

    fn on_lap_passed(&mut self, rc: &mut RaceContext<'_, '_>, racer: usize, lap: u32) -> Outcome {
        let keys = self.failure_keys();
        if lap >= rc.race.laps {
            return first_across_the_line(rc, racer, &keys);
        }

        if Self::crossed_last(rc, racer, lap) {
            if rc.racer(racer).is_player {
                return Outcome::fail(keys.lost, DEFAULT_REASON_MS);
            }
            rc.knock_out(racer);
        }

        let mut active = rc.race.racers.iter().filter(|r| r.is_active());
        match (active.next(), active.next()) {
            (Some(last), None) if last.is_player => Outcome::Complete,
            (Some(_), None) => Outcome::fail(keys.lost, DEFAULT_REASON_MS),
            _ => Outcome::Continue,
        }
    }
}
