//! Wanted challenge: no checkpoints. Hold at least `min_level` stars for
//! `hold_ms` in one go, then, if asked, lose them again.

use crate::{
    mission::Outcome,
    race_variant::{RaceContext, RaceVariant},
    timer::Timer,
    types::Millis,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WantedStage {
    Holding { since: Option<Timer> },
    Clearing,
}

#[derive(Debug)]
pub struct WantedChallenge {
    min_level:   u8,
    hold_ms:     Millis,
    clear_after: bool,
    stage:       WantedStage,
}

impl WantedChallenge {
    pub fn new(min_level: u8, hold_ms: Millis, clear_after: bool) -> Self {
        Self {
            min_level,
            hold_ms,
            clear_after,
            stage: WantedStage::Holding { since: None },
        }
    }

    pub fn stage(&self) -> WantedStage {
        self.stage
    }
}

impl RaceVariant for WantedChallenge {
    fn name(&self) -> &'static str {
        "wanted_challenge"
    }

    fn laps(&self, _racer_count: usize) -> u32 {
        0
    }

    fn uses_checkpoints(&self) -> bool {
        false
    }

    fn on_lap_passed(&mut self, _rc: &mut RaceContext<'_, '_>, _racer: usize, _lap: u32) -> Outcome {
        Outcome::Continue
    }

    fn on_draw_info(&mut self, rc: &mut RaceContext<'_, '_>) -> Outcome {
        let level = rc.ctx.host.wanted_level();
        match self.stage {
            WantedStage::Holding { since } => {
                if level < self.min_level {
                    // Dropping below the threshold starts the hold over.
                    self.stage = WantedStage::Holding { since: None };
                    rc.draw_hud(format!("WANTED {level}/{}", self.min_level));
                    return Outcome::Continue;
                }
                let timer = since.unwrap_or_else(|| Timer::start(rc.clock(), self.hold_ms));
                if !timer.is_expired(rc.clock()) {
                    self.stage = WantedStage::Holding { since: Some(timer) };
                    rc.draw_hud(format!("HOLD {}", timer.remaining(rc.clock()) / 1000));
                    return Outcome::Continue;
                }
                if !self.clear_after {
                    return Outcome::Complete;
                }
                log::debug!("tick={} wanted level held, now lose it", rc.tick());
                self.stage = WantedStage::Clearing;
                rc.draw_hud("LOSE THE COPS".to_string());
                Outcome::Continue
            }
            WantedStage::Clearing => {
                if level == 0 {
                    Outcome::Complete
                } else {
                    Outcome::Continue
                }
            }
        }
    }
}
