//! The race engine: a mission whose Update phase runs a race.
//!
//! STAGES (fixed, never reordered):
//!   0. PreRace  variant `before_race`, player control off
//!   1. Setup    batch model load, spawn racers, 3-2-1-GO countdown
//!   2. Racing   player checks, per-NPC checks, variant `on_draw_info`
//!
//! RULES:
//!   - Arrival is only ever tested against a racer's next target node,
//!     so a racer advances at most one node per tick.
//!   - Laps never decrease.
//!   - The first non-Continue outcome of a tick ends that tick.

use crate::{
    cleanup::Ownership,
    config::{MissionSettings, RaceConfig, RaceTuning, RacerConfig, VariantConfig},
    error::{MissionError, MissionResult},
    event::MissionEvent,
    host::{BlipStyle, CheckpointStyle, EntityKind, Host, ModelId, TextMessage, TextStyle},
    mission::{Mission, MissionContext, Outcome, DEFAULT_REASON_MS},
    race_variant::{RaceContext, RaceVariant},
    racer::Racer,
    ranking::{is_ahead, rank_of, RankKey},
    route::Route,
    snapshot::{RaceSnapshot, StandingEntry, SNAPSHOT_INTERVAL},
    timer::Timer,
    types::Millis,
    circuit_race::CircuitRace,
    knockout_race::KnockoutRace,
    radar_challenge::RadarChallenge,
    speed_trap_race::SpeedTrapRace,
    sprint_race::SprintRace,
    timed_checkpoint_race::TimedCheckpointRace,
    wanted_challenge::WantedChallenge,
};
use serde::{Deserialize, Serialize};
use std::any::Any;

const COUNTDOWN_LABELS: [&str; 4] = ["3", "2", "1", "GO"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RaceStage {
    PreRace = 0,
    Setup   = 1,
    Racing  = 2,
}

impl RaceStage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::PreRace => "pre_race",
            Self::Setup   => "setup",
            Self::Racing  => "racing",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SetupStep {
    Loading,
    Countdown { step: usize, timer: Timer },
}

/// Everything the engine and the variant hooks share about one race.
#[derive(Debug)]
pub struct RaceState {
    pub route:          Route,
    pub roster:         Vec<RacerConfig>,
    /// Empty until Setup has spawned the field.
    pub racers:         Vec<Racer>,
    pub tuning:         RaceTuning,
    pub stage:          RaceStage,
    pub laps:           u32,
    /// All checkpoint markers drawn as finish markers (fewer than two checkpoints).
    pub finish_markers: bool,
    /// Started at GO.
    pub race_timer:     Option<Timer>,
    pub(crate) last_hud: Option<String>,
    player_index:       usize,
    setup:              SetupStep,
    models:             Vec<ModelId>,
}

impl RaceState {
    pub fn new(route: Route, roster: Vec<RacerConfig>, tuning: RaceTuning) -> MissionResult<Self> {
        let players: Vec<usize> = roster
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_player)
            .map(|(i, _)| i)
            .collect();
        let &[player_index] = players.as_slice() else {
            return Err(MissionError::InvalidRoster {
                reason: format!("expected exactly one player racer, found {}", players.len()),
            });
        };

        let mut models: Vec<ModelId> = Vec::new();
        for racer in &roster {
            for model in [racer.vehicle_model, racer.driver_model] {
                if !models.contains(&model) {
                    models.push(model);
                }
            }
        }

        Ok(Self {
            route,
            roster,
            racers: Vec::new(),
            tuning,
            stage: RaceStage::PreRace,
            laps: 1,
            finish_markers: false,
            race_timer: None,
            last_hud: None,
            player_index,
            setup: SetupStep::Loading,
            models,
        })
    }

    pub fn player_index(&self) -> usize {
        self.player_index
    }

    pub fn player(&self) -> Option<&Racer> {
        self.racers.get(self.player_index)
    }

    pub fn racer(&self, index: usize) -> MissionResult<&Racer> {
        self.racers.get(index).ok_or(MissionError::RacerNotFound { index })
    }

    pub fn active_count(&self) -> usize {
        self.racers.iter().filter(|r| r.is_active()).count()
    }

    pub fn rank_keys(&self, host: &dyn Host) -> Vec<RankKey> {
        self.racers
            .iter()
            .map(|r| RankKey::for_racer(&self.route, r, host.position(r.vehicle)))
            .collect()
    }

    pub fn position_of(&self, host: &dyn Host, index: usize) -> usize {
        rank_of(index, &self.rank_keys(host))
    }

    /// Position of `index` and the size of the field, both counting only
    /// racers that have not been knocked out.
    pub fn field_position(&self, host: &dyn Host, index: usize) -> (usize, usize) {
        let keys = self.rank_keys(host);
        let me = &keys[index];
        let mut position = 1;
        let mut total = 0;
        for (j, racer) in self.racers.iter().enumerate() {
            if racer.knocked_out {
                continue;
            }
            total += 1;
            if j != index && is_ahead(&keys[j], me) {
                position += 1;
            }
        }
        (position, total)
    }

    pub fn snapshot(&self, run_id: &str, host: &dyn Host) -> RaceSnapshot {
        let keys = self.rank_keys(host);
        let standings = self
            .racers
            .iter()
            .map(|r| StandingEntry {
                racer:       r.index,
                name:        r.name.clone(),
                position:    rank_of(r.index, &keys),
                lap:         r.lap,
                next_node:   r.next_node,
                speed_sum:   r.speed_sum,
                knocked_out: r.knocked_out,
                finished:    r.finished,
            })
            .collect();
        RaceSnapshot {
            run_id: run_id.to_string(),
            tick: host.clock().frame,
            clock: host.clock().clone(),
            stage: self.stage.name().to_string(),
            standings,
        }
    }

    fn enter_stage(&mut self, ctx: &mut MissionContext<'_>, stage: RaceStage) {
        log::debug!("tick={} race stage {} -> {}", ctx.tick(), self.stage.name(), stage.name());
        self.stage = stage;
        ctx.emit(MissionEvent::RaceStageChanged {
            tick:  ctx.tick(),
            stage: stage.name().to_string(),
        });
    }
}

/// A race run as a mission, with `V` deciding who wins.
pub struct RaceMission<V: RaceVariant> {
    settings: MissionSettings,
    variant:  V,
    race:     RaceState,
}

impl<V: RaceVariant> RaceMission<V> {
    pub fn new(
        settings: MissionSettings,
        route: Route,
        roster: Vec<RacerConfig>,
        tuning: RaceTuning,
        variant: V,
    ) -> MissionResult<Self> {
        let mut race = RaceState::new(route, roster, tuning)?;
        race.laps = variant.laps(race.roster.len());
        variant.validate(&race)?;
        Ok(Self { settings, variant, race })
    }

    pub fn from_config(config: &RaceConfig, variant: V) -> MissionResult<Self> {
        Self::new(
            config.settings.clone(),
            config.build_route()?,
            config.racers.clone(),
            config.tuning.clone(),
            variant,
        )
    }

    pub fn race(&self) -> &RaceState {
        &self.race
    }

    pub fn variant(&self) -> &V {
        &self.variant
    }
}

/// Build the race mission a config describes.
pub fn race_from_config(config: &RaceConfig) -> MissionResult<Box<dyn Mission>> {
    let mission: Box<dyn Mission> = match config.variant {
        VariantConfig::Sprint => {
            Box::new(RaceMission::from_config(config, SprintRace::new())?)
        }
        VariantConfig::Circuit { laps } => {
            Box::new(RaceMission::from_config(config, CircuitRace::new(laps))?)
        }
        VariantConfig::LapKnockout => {
            Box::new(RaceMission::from_config(config, KnockoutRace::new())?)
        }
        VariantConfig::SpeedTrap { laps } => {
            Box::new(RaceMission::from_config(config, SpeedTrapRace::new(laps))?)
        }
        VariantConfig::RadarChallenge { time_limit_ms } => {
            Box::new(RaceMission::from_config(config, RadarChallenge::new(time_limit_ms))?)
        }
        VariantConfig::TimedCheckpoint { laps, initial_time_ms } => {
            Box::new(RaceMission::from_config(config, TimedCheckpointRace::new(laps, initial_time_ms))?)
        }
        VariantConfig::WantedChallenge { min_level, hold_ms, clear_after } => {
            Box::new(RaceMission::from_config(config, WantedChallenge::new(min_level, hold_ms, clear_after))?)
        }
    };
    Ok(mission)
}

impl<V: RaceVariant> Mission for RaceMission<V> {
    fn settings(&self) -> &MissionSettings {
        &self.settings
    }

    fn on_start(&mut self, ctx: &mut MissionContext<'_>) -> MissionResult<()> {
        let tuning = &self.race.tuning;
        ctx.host.set_traffic_density(tuning.traffic_density, tuning.ped_density);
        ctx.host.set_police_behavior(tuning.police);
        log::info!(
            "tick={} {} race '{}': {} racers, {} laps",
            ctx.tick(),
            self.variant.name(),
            self.settings.title,
            self.race.roster.len(),
            self.race.laps
        );
        Ok(())
    }

    fn on_update(&mut self, ctx: &mut MissionContext<'_>) -> MissionResult<Outcome> {
        let RaceMission { variant, race, .. } = self;
        let mut rc = RaceContext { ctx, race };
        match rc.race.stage {
            RaceStage::PreRace => {
                rc.ctx.host.set_player_control(false);
                variant.before_race(&mut rc)?;
                let models = rc.race.models.clone();
                rc.ctx.host.request_models(&models);
                rc.race.setup = SetupStep::Loading;
                rc.race.enter_stage(rc.ctx, RaceStage::Setup);
                Ok(Outcome::Continue)
            }
            RaceStage::Setup => Ok(setup_tick(variant, &mut rc)),
            RaceStage::Racing => Ok(racing_tick(variant, &mut rc)),
        }
    }

    fn on_cleanup(&mut self, ctx: &mut MissionContext<'_>) {
        ctx.host.hide_checkpoint();
        ctx.host.set_player_control(true);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ── Setup ─────────────────────────────────────────────────────────

fn setup_tick<V: RaceVariant>(variant: &mut V, rc: &mut RaceContext<'_, '_>) -> Outcome {
    match rc.race.setup {
        SetupStep::Loading => {
            if !rc.ctx.host.models_loaded(&rc.race.models) {
                return Outcome::Continue;
            }
            spawn_field(variant, rc);
            start_countdown_step(rc, 0);
            Outcome::Continue
        }
        SetupStep::Countdown { step, timer } => {
            if !timer.is_expired(rc.clock()) {
                return Outcome::Continue;
            }
            let next = step + 1;
            start_countdown_step(rc, next);
            if next == COUNTDOWN_LABELS.len() - 1 {
                go(variant, rc);
            }
            Outcome::Continue
        }
    }
}

fn spawn_field<V: RaceVariant>(variant: &mut V, rc: &mut RaceContext<'_, '_>) {
    let uses_checkpoints = variant.uses_checkpoints();
    let first_checkpoint = rc.race.route.first_checkpoint_id();
    let roster = rc.race.roster.clone();

    for (index, cfg) in roster.iter().enumerate() {
        let ctx = &mut *rc.ctx;
        let vehicle_ownership = if cfg.is_player { Ownership::Released } else { Ownership::Owned };
        let vehicle = ctx.spawn(EntityKind::Vehicle, cfg.vehicle_model, cfg.grid, cfg.heading, vehicle_ownership);
        let actor = if cfg.is_player {
            ctx.host.player_actor()
        } else {
            ctx.spawn(EntityKind::Actor, cfg.driver_model, cfg.grid, cfg.heading, Ownership::Owned)
        };
        ctx.host.put_in_vehicle(actor, vehicle);
        ctx.host.set_blip(vehicle, if cfg.is_player { BlipStyle::Player } else { BlipStyle::Opponent });

        let mut racer = Racer::new(index, cfg.name.clone(), actor, vehicle, cfg.is_player);
        racer.pace = cfg.pace;
        racer.grid = cfg.grid;
        racer.grid_heading = cfg.heading;
        racer.next_node = if cfg.is_player && uses_checkpoints { first_checkpoint } else { 0 };
        racer.mark_progress(ctx.clock(), cfg.grid);
        match cfg.recorded_path {
            Some(path_id) if !cfg.is_player => {
                ctx.host.follow_recorded_path(vehicle, path_id);
                racer.on_recorded_path = true;
            }
            _ => {}
        }
        rc.race.racers.push(racer);

        rc.emit(MissionEvent::RacerSpawned {
            tick: rc.tick(),
            racer: index,
            is_player: cfg.is_player,
        });
        variant.on_racer_setup(rc, index);
    }

    rc.race.finish_markers = rc.race.route.checkpoint_count() < 2;
    log::debug!(
        "tick={} spawned {} racers, last checkpoint ordinal {}",
        rc.tick(),
        rc.race.racers.len(),
        rc.race.route.last_checkpoint_ordinal()
    );
}

fn start_countdown_step(rc: &mut RaceContext<'_, '_>, step: usize) {
    let label = COUNTDOWN_LABELS[step];
    let is_go = step == COUNTDOWN_LABELS.len() - 1;
    let tuning = &rc.race.tuning;
    let sound = if is_go { tuning.go_sound_id } else { tuning.countdown_sound_id };
    let step_ms = tuning.countdown_step_ms;

    let host = &mut *rc.ctx.host;
    let at = host.position(host.player_actor());
    host.report_audio_event(at, sound);
    host.show_text(&TextMessage::raw(label, step_ms), TextStyle::Banner);

    rc.race.setup = SetupStep::Countdown { step, timer: Timer::start(rc.ctx.clock(), step_ms) };
    rc.emit(MissionEvent::CountdownStep { tick: rc.tick(), label: label.to_string() });
}

fn go<V: RaceVariant>(variant: &mut V, rc: &mut RaceContext<'_, '_>) {
    rc.ctx.host.set_player_control(true);
    for racer in rc.race.racers.iter_mut() {
        if let Some(budget) = racer.time_budget.as_mut() {
            budget.restart(rc.ctx.host.clock());
        }
        racer.mark_progress(rc.ctx.host.clock(), racer.grid);
    }
    rc.race.race_timer = Some(Timer::stopwatch(rc.ctx.clock()));
    rc.race.enter_stage(rc.ctx, RaceStage::Racing);
    if variant.uses_checkpoints() {
        show_player_marker(rc);
    }
    variant.on_race_started(rc);
}

fn show_player_marker(rc: &mut RaceContext<'_, '_>) {
    let Some(player) = rc.race.player() else {
        return;
    };
    if !player.is_active() {
        rc.ctx.host.hide_checkpoint();
        return;
    }
    let node = rc.race.route.node(player.next_node);
    let final_lap = player.lap + 1 >= rc.race.laps;
    let is_finish = rc.race.finish_markers
        || (final_lap && node.ordinal == Some(rc.race.route.last_checkpoint_ordinal()));
    let style = if is_finish { CheckpointStyle::Finish } else { CheckpointStyle::Normal };
    let position = node.position;
    rc.ctx.host.show_checkpoint(position, style);
}

// ── Racing ────────────────────────────────────────────────────────

fn racing_tick<V: RaceVariant>(variant: &mut V, rc: &mut RaceContext<'_, '_>) -> Outcome {
    let player = rc.race.player_index();
    let outcome = player_tick(variant, rc, player);
    if !outcome.is_continue() {
        return outcome;
    }

    for index in 0..rc.race.racers.len() {
        if index == player {
            continue;
        }
        let outcome = npc_tick(variant, rc, index);
        if !outcome.is_continue() {
            return outcome;
        }
    }

    let outcome = variant.on_draw_info(rc);
    if !outcome.is_continue() {
        return outcome;
    }

    if rc.tick() % SNAPSHOT_INTERVAL == 0 {
        let snapshot = rc.race.snapshot(rc.ctx.journal().run_id(), &*rc.ctx.host);
        match snapshot.to_json() {
            Ok(json) => rc.ctx.save_snapshot(json),
            Err(err) => log::warn!("tick={} snapshot skipped: {err}", rc.tick()),
        }
    }
    Outcome::Continue
}

fn player_tick<V: RaceVariant>(variant: &mut V, rc: &mut RaceContext<'_, '_>, index: usize) -> Outcome {
    let keys = variant.failure_keys();
    let (actor, vehicle) = {
        let racer = rc.racer(index);
        (racer.actor, racer.vehicle)
    };
    let host = &*rc.ctx.host;
    if host.vehicle_condition(vehicle).is_wrecked() {
        return Outcome::fail(keys.car_wrecked, DEFAULT_REASON_MS);
    }
    if !host.is_in_vehicle(actor, vehicle) {
        return Outcome::fail(keys.left_vehicle, DEFAULT_REASON_MS);
    }
    if !variant.uses_checkpoints() || !rc.racer(index).is_active() {
        return Outcome::Continue;
    }
    advance_racer(variant, rc, index)
}

fn npc_tick<V: RaceVariant>(variant: &mut V, rc: &mut RaceContext<'_, '_>, index: usize) -> Outcome {
    let keys = variant.failure_keys();
    let racer = rc.racer(index);
    if !racer.is_active() {
        return Outcome::Continue;
    }
    let (actor, vehicle) = (racer.actor, racer.vehicle);
    let host = &*rc.ctx.host;
    if !host.is_alive(actor) || host.vehicle_condition(vehicle).destroyed {
        return Outcome::fail(keys.opponent_wrecked, DEFAULT_REASON_MS);
    }
    if host.damaged_by_player(vehicle) || host.damaged_by_player(actor) {
        return Outcome::fail(keys.opponent_attacked, DEFAULT_REASON_MS);
    }

    let outcome = advance_racer(variant, rc, index);
    if !outcome.is_continue() {
        return outcome;
    }

    let racer = rc.racer(index);
    if racer.is_active() && !racer.on_recorded_path && !check_stuck(rc, index) {
        navigate(rc, index);
    }
    Outcome::Continue
}

/// Test the racer against its next target and handle an arrival.
fn advance_racer<V: RaceVariant>(variant: &mut V, rc: &mut RaceContext<'_, '_>, index: usize) -> Outcome {
    let racer = rc.racer(index);
    let target = racer.next_node;
    let node = rc.race.route.node(target).clone();
    let radii = if racer.is_player { rc.race.tuning.checkpoint_radius } else { rc.race.tuning.node_radius };
    let inside = rc.ctx.host.locate_near(racer.vehicle, node.position, radii);

    if racer.must_leave == Some(target) {
        if !inside {
            rc.racer_mut(index).must_leave = None;
        }
        return Outcome::Continue;
    }
    if !inside {
        return Outcome::Continue;
    }

    let speed = rc.ctx.host.speed(racer.vehicle);
    let next = if racer.is_player {
        rc.race.route.find_next_checkpoint_id(target)
    } else {
        (target + 1) % rc.race.route.len()
    };
    {
        let clock = rc.ctx.host.clock();
        let racer = &mut rc.race.racers[index];
        racer.last_node = Some(target);
        racer.next_node = next;
        if next == target {
            racer.must_leave = Some(target);
        }
        racer.mark_progress(clock, node.position);
    }

    // Without checkpoints, opponents just loop the route unscored.
    if !variant.uses_checkpoints() {
        return Outcome::Continue;
    }
    let Some(ordinal) = node.ordinal else {
        return Outcome::Continue;
    };

    log::debug!("tick={} racer {index} took checkpoint {ordinal} (node {target}) at {speed:.1}", rc.tick());
    rc.racer_mut(index).speed_sum += speed;
    rc.emit(MissionEvent::CheckpointPassed {
        tick: rc.tick(),
        racer: index,
        node: target,
        ordinal,
        speed,
    });

    if let Some(allotment) = node.time_budget_ms {
        extend_budget(rc, index, allotment);
    }

    let outcome = variant.on_node_passed(rc, index, target);
    if !outcome.is_continue() {
        return outcome;
    }

    if ordinal == rc.race.route.last_checkpoint_ordinal() {
        let laps = rc.race.laps;
        let racer = rc.racer_mut(index);
        racer.lap += 1;
        let lap = racer.lap;
        let finished = lap >= laps;
        if finished {
            racer.finished = true;
        }
        let (actor, is_player) = (racer.actor, racer.is_player);
        if finished && !is_player {
            rc.ctx.host.stop_navigation(actor);
        }
        log::debug!("tick={} racer {index} completed lap {lap}/{laps}", rc.tick());
        rc.emit(MissionEvent::LapCompleted { tick: rc.tick(), racer: index, lap });

        let outcome = variant.on_lap_passed(rc, index, lap);
        if !outcome.is_continue() {
            return outcome;
        }
    }

    if rc.racer(index).is_player {
        show_player_marker(rc);
    }
    Outcome::Continue
}

fn extend_budget(rc: &mut RaceContext<'_, '_>, index: usize, allotment: Millis) {
    let clock = rc.ctx.host.clock();
    let racer = &mut rc.race.racers[index];
    racer.extend_time(clock, allotment);
    let remaining_ms = racer.time_remaining(clock).unwrap_or(0);
    rc.emit(MissionEvent::TimeBudgetExtended {
        tick: rc.tick(),
        racer: index,
        added_ms: allotment,
        remaining_ms,
    });
}

/// Returns true when the racer was recovered or is waiting for a recovery.
fn check_stuck(rc: &mut RaceContext<'_, '_>, index: usize) -> bool {
    let tuning = rc.race.tuning.clone();
    let racer = rc.racer(index);
    let (actor, vehicle) = (racer.actor, racer.vehicle);
    let position = rc.ctx.host.position(vehicle);

    if position.distance(&racer.progress_anchor) >= tuning.stuck_distance {
        let clock = rc.ctx.host.clock();
        rc.race.racers[index].mark_progress(clock, position);
        return false;
    }
    if racer.stalled_for(rc.clock()) < tuning.stuck_window_ms || rc.ctx.host.is_on_screen(vehicle) {
        return false;
    }

    let (node, target, heading, speed) = match racer.last_node {
        Some(id) => {
            let n = rc.race.route.node(id);
            (Some(id), n.position, n.heading, n.target_speed * racer.pace)
        }
        None => (None, racer.grid, racer.grid_heading, 0.0),
    };

    let blocker = rc
        .race
        .racers
        .iter()
        .filter(|other| other.index != index && !other.knocked_out)
        .find(|other| rc.ctx.host.position(other.vehicle).distance(&target) < tuning.recovery_clearance)
        .map(|other| other.index);
    if let Some(blocked_by) = blocker {
        log::debug!("tick={} recovery of racer {index} deferred, racer {blocked_by} in the way", rc.tick());
        rc.emit(MissionEvent::RecoveryDeferred {
            tick: rc.tick(),
            racer: index,
            node,
            blocked_by,
        });
        return true;
    }

    let host = &mut *rc.ctx.host;
    host.clear_area(target, tuning.recovery_clearance);
    host.teleport(vehicle, target, heading, speed);
    host.stop_navigation(actor);
    let clock = rc.ctx.host.clock();
    let racer = &mut rc.race.racers[index];
    racer.mark_progress(clock, target);
    racer.must_leave = None;

    log::debug!("tick={} racer {index} recovered to {node:?}", rc.tick());
    rc.emit(MissionEvent::RacerRecovered { tick: rc.tick(), racer: index, node });
    true
}

/// Re-issue the drive task only once the previous one has completed.
fn navigate(rc: &mut RaceContext<'_, '_>, index: usize) {
    let racer = rc.racer(index);
    if !rc.ctx.host.navigation_idle(racer.actor) {
        return;
    }
    let node = rc.race.route.node(racer.next_node);
    let (actor, vehicle, target, speed) = (racer.actor, racer.vehicle, node.position, node.target_speed * racer.pace);
    rc.ctx.host.drive_to(actor, vehicle, target, speed);
}
