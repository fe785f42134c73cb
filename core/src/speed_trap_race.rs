//! Speed trap: every checkpoint is a speed camera. When the first racer
//! finishes, everyone still out on the route is credited the target
//! speeds of the checkpoints they have left, and the highest total wins.

use crate::{
    mission::{Outcome, DEFAULT_REASON_MS},
    race_variant::{RaceContext, RaceVariant},
};

#[derive(Debug)]
pub struct SpeedTrapRace {
    laps: u32,
}

impl SpeedTrapRace {
    pub fn new(laps: u32) -> Self {
        Self { laps: laps.max(1) }
    }

    fn back_fill(rc: &mut RaceContext<'_, '_>) {
        let laps = rc.race.laps;
        let route = &rc.race.route;
        for racer in rc.race.racers.iter_mut().filter(|r| !r.finished) {
            let next = route.normalized_checkpoint(racer.next_node);
            let ordinal = route.ordinal_of(next).unwrap_or(0);
            let credit = route.remaining_checkpoint_speed(ordinal, racer.lap, laps);
            log::debug!("racer {} back-filled {credit:.1} from ordinal {ordinal}", racer.index);
            racer.speed_sum += credit;
        }
    }
}

impl RaceVariant for SpeedTrapRace {
    fn name(&self) -> &'static str {
        "speed_trap"
    }

    fn laps(&self, _racer_count: usize) -> u32 {
        self.laps
    }

    fn on_lap_passed(&mut self, rc: &mut RaceContext<'_, '_>, _racer: usize, lap: u32) -> Outcome {
        if lap < self.laps {
            return Outcome::Continue;
        }
        Self::back_fill(rc);

        let player = rc.race.player_index();
        let player_sum = rc.racer(player).speed_sum;
        let beaten = rc
            .race
            .racers
            .iter()
            .filter(|r| r.index != player)
            .all(|r| r.speed_sum < player_sum);
        if beaten {
            Outcome::Complete
        } else {
            Outcome::fail(self.failure_keys().lost, DEFAULT_REASON_MS)
        }
    }

    fn on_draw_info(&mut self, rc: &mut RaceContext<'_, '_>) -> Outcome {
        let player = rc.race.player_index();
        let sum = rc.racer(player).speed_sum;
        let position = rc.position_of(player);
        rc.draw_hud(format!("POS {position}/{}  SPEED {sum:.0}", rc.race.racers.len()));
        Outcome::Continue
    }
}
