//! Race variants: policy on top of the race engine.
//!
//! RULE: A variant only decides outcomes from the hooks below. It never
//! runs its own per-tick racer loop; the engine owns movement, arrival
//! detection, recovery and failure checks.

use crate::{
    clock::HostClock,
    error::MissionResult,
    event::MissionEvent,
    host::{BlipStyle, Host, TextMessage, TextStyle},
    mission::{MissionContext, Outcome},
    race_engine::RaceState,
    racer::Racer,
    types::{Millis, Tick},
};

/// HUD lines stay up until replaced.
pub const HUD_TEXT_MS: Millis = 0;

/// Reason keys for the engine's built-in failure checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureKeys {
    pub car_wrecked:       &'static str,
    pub left_vehicle:      &'static str,
    pub opponent_wrecked:  &'static str,
    pub opponent_attacked: &'static str,
    pub lost:              &'static str,
    pub out_of_time:       &'static str,
}

impl Default for FailureKeys {
    fn default() -> Self {
        Self {
            car_wrecked:       "race.car_wrecked",
            left_vehicle:      "race.left_vehicle",
            opponent_wrecked:  "race.opponent_wrecked",
            opponent_attacked: "race.opponent_attacked",
            lost:              "race.lost",
            out_of_time:       "race.out_of_time",
        }
    }
}

/// What a variant hook gets to work with for one call.
pub struct RaceContext<'a, 'm> {
    pub ctx:  &'a mut MissionContext<'m>,
    pub race: &'a mut RaceState,
}

impl<'a, 'm> RaceContext<'a, 'm> {
    pub fn tick(&self) -> Tick {
        self.ctx.tick()
    }

    pub fn clock(&self) -> &HostClock {
        self.ctx.clock()
    }

    pub fn host(&mut self) -> &mut dyn Host {
        &mut *self.ctx.host
    }

    pub fn emit(&mut self, event: MissionEvent) {
        self.ctx.emit(event);
    }

    pub fn racer(&self, index: usize) -> &Racer {
        &self.race.racers[index]
    }

    pub fn racer_mut(&mut self, index: usize) -> &mut Racer {
        &mut self.race.racers[index]
    }

    /// 1-based race position of `index` right now.
    pub fn position_of(&self, index: usize) -> usize {
        self.race.position_of(&*self.ctx.host, index)
    }

    /// Park a racer off the route for good.
    pub fn knock_out(&mut self, index: usize) {
        let z_offset = self.race.tuning.knockout_z_offset;
        let racer = &mut self.race.racers[index];
        racer.knocked_out = true;

        let host = &mut *self.ctx.host;
        let parked = host.position(racer.vehicle).offset(0.0, 0.0, z_offset);
        let heading = host.heading(racer.vehicle);
        host.stop_navigation(racer.actor);
        host.teleport(racer.vehicle, parked, heading, 0.0);
        host.set_blip(racer.vehicle, BlipStyle::Hidden);

        let (racer_index, lap) = (racer.index, racer.lap);
        log::info!("tick={} racer {racer_index} knocked out after lap {lap}", self.tick());
        self.emit(MissionEvent::RacerKnockedOut {
            tick: self.tick(),
            racer: racer_index,
            lap,
        });
    }

    /// Show a HUD line, only when it differs from the one on screen.
    pub fn draw_hud(&mut self, text: String) {
        if self.race.last_hud.as_deref() == Some(text.as_str()) {
            return;
        }
        self.ctx.host.show_text(&TextMessage::raw(text.clone(), HUD_TEXT_MS), TextStyle::Small);
        self.race.last_hud = Some(text);
    }
}

/// Default hook for position-based variants: "POS 1/3  LAP 2/3". Racers
/// knocked out of the race are left out of both numbers.
pub fn draw_position_hud(rc: &mut RaceContext<'_, '_>) {
    let player = rc.race.player_index();
    let (position, total) = rc.race.field_position(&*rc.ctx.host, player);
    let laps = rc.race.laps.max(1);
    let lap = (rc.racer(player).lap + 1).min(laps);
    rc.draw_hud(format!("POS {position}/{total}  LAP {lap}/{laps}"));
}

pub trait RaceVariant: 'static {
    fn name(&self) -> &'static str;

    /// Laps the race runs for, given the roster size.
    fn laps(&self, _racer_count: usize) -> u32 {
        1
    }

    /// False for variants that consume no checkpoints at all.
    fn uses_checkpoints(&self) -> bool {
        true
    }

    /// Construction-time check of the race this variant is attached to.
    fn validate(&self, _race: &RaceState) -> MissionResult<()> {
        Ok(())
    }

    fn failure_keys(&self) -> FailureKeys {
        FailureKeys::default()
    }

    /// Camera work and traffic configuration before anything spawns.
    fn before_race(&mut self, _rc: &mut RaceContext<'_, '_>) -> MissionResult<()> {
        Ok(())
    }

    fn on_racer_setup(&mut self, _rc: &mut RaceContext<'_, '_>, _racer: usize) {}

    /// Called on GO, once player control is back.
    fn on_race_started(&mut self, _rc: &mut RaceContext<'_, '_>) {}

    fn on_node_passed(&mut self, _rc: &mut RaceContext<'_, '_>, _racer: usize, _node: usize) -> Outcome {
        Outcome::Continue
    }

    fn on_lap_passed(&mut self, rc: &mut RaceContext<'_, '_>, racer: usize, lap: u32) -> Outcome;

    /// HUD and any per-tick win/lose check.
    fn on_draw_info(&mut self, rc: &mut RaceContext<'_, '_>) -> Outcome {
        draw_position_hud(rc);
        Outcome::Continue
    }
}

/// First finisher decides: the player wins, anyone else means a loss.
pub(crate) fn first_across_the_line(rc: &RaceContext<'_, '_>, racer: usize, keys: &FailureKeys) -> Outcome {
    if rc.racer(racer).is_player {
        Outcome::Complete
    } else {
        Outcome::fail(keys.lost, crate::mission::DEFAULT_REASON_MS)
    }
}
