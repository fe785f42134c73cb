//! Radar challenge: one pass over the route where every checkpoint is a
//! radar. The sum of speeds recorded must reach the sum of posted limits.

use crate::{
    mission::{Outcome, DEFAULT_REASON_MS},
    race_variant::{RaceContext, RaceVariant},
    types::Millis,
};

pub const TOO_SLOW_REASON: &str = "race.radar_too_slow";

#[derive(Debug)]
pub struct RadarChallenge {
    time_limit_ms: Option<Millis>,
}

impl RadarChallenge {
    pub fn new(time_limit_ms: Option<Millis>) -> Self {
        Self { time_limit_ms }
    }
}

impl RaceVariant for RadarChallenge {
    fn name(&self) -> &'static str {
        "radar_challenge"
    }

    fn on_lap_passed(&mut self, rc: &mut RaceContext<'_, '_>, racer: usize, _lap: u32) -> Outcome {
        if !rc.racer(racer).is_player {
            return Outcome::Continue;
        }
        let recorded = rc.racer(racer).speed_sum;
        let posted = rc.race.route.posted_speed_sum();
        log::info!("tick={} radar total {recorded:.1} against limits {posted:.1}", rc.tick());
        if recorded >= posted {
            Outcome::Complete
        } else {
            Outcome::fail(TOO_SLOW_REASON, DEFAULT_REASON_MS)
        }
    }

    fn on_draw_info(&mut self, rc: &mut RaceContext<'_, '_>) -> Outcome {
        if let (Some(limit), Some(timer)) = (self.time_limit_ms, rc.race.race_timer) {
            if timer.elapsed(rc.clock()) >= limit {
                return Outcome::fail(self.failure_keys().out_of_time, DEFAULT_REASON_MS);
            }
        }
        let recorded = rc.racer(rc.race.player_index()).speed_sum;
        let posted = rc.race.route.posted_speed_sum();
        rc.draw_hud(format!("RADAR {recorded:.0}/{posted:.0}"));
        Outcome::Continue
    }
}
