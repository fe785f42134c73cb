//! A deterministic, in-memory `Host` for tests and the runner.
//!
//! RULE: Given the same seed and the same calls, the headless host
//! produces the same world every time. Entities live in ordered maps and
//! the only randomness is drawn from `RngBank` streams.
//!
//! Movement model: a vehicle with a drive task moves straight towards
//! its target at the requested speed and snaps onto it when the next
//! step would overshoot; the task is then complete. Path followers do
//! the same along a list of points.

use crate::{
    clock::{HostClock, DEFAULT_FRAME_MS},
    host::{
        AmbientEvents, BlipStyle, CheckpointStyle, EntityKind, FadeDirection, FadeStatus, Host, ModelId,
        PlayerState, PoliceBehavior, TextMessage, TextStyle, VehicleCondition, WorldToggles,
    },
    rng::{RngBank, RngSlot, StreamRng},
    types::{Handle, Millis, Tick, Vec3},
};
use std::collections::{BTreeMap, BTreeSet};

/// Distance from the player within which things count as on screen.
pub const DEFAULT_VIEW_RADIUS: f32 = 80.0;

#[derive(Debug, Clone)]
pub struct HeadlessEntity {
    pub kind:              EntityKind,
    pub model:             ModelId,
    pub position:          Vec3,
    pub heading:           f32,
    pub speed:             f32,
    pub alive:             bool,
    pub condition:         VehicleCondition,
    /// For actors: the vehicle they sit in.
    pub vehicle:           Option<Handle>,
    pub damaged_by_player: bool,
    pub blip:              Option<BlipStyle>,
    pub released:          bool,
}

impl HeadlessEntity {
    fn new(kind: EntityKind, model: ModelId, position: Vec3, heading: f32) -> Self {
        Self {
            kind,
            model,
            position,
            heading,
            speed: 0.0,
            alive: true,
            condition: VehicleCondition::default(),
            vehicle: None,
            damaged_by_player: false,
            blip: None,
            released: false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct DriveTask {
    vehicle: Handle,
    target:  Vec3,
    speed:   f32,
}

#[derive(Debug, Clone)]
struct PathFollow {
    points: Vec<Vec3>,
    cursor: usize,
    speed:  f32,
    looped: bool,
}

#[derive(Debug, Clone, Copy)]
struct Fade {
    direction: FadeDirection,
    until_ms:  Millis,
}

pub struct HeadlessHost {
    clock:            HostClock,
    next_handle:      u32,
    entities:         BTreeMap<Handle, HeadlessEntity>,
    player:           Handle,
    player_state:     PlayerState,
    player_control:   bool,
    wanted_level:     u8,
    skip:             bool,
    world:            WorldToggles,
    drive_tasks:      BTreeMap<Handle, DriveTask>,
    followers:        BTreeMap<Handle, PathFollow>,
    autopilot:        Option<PathFollow>,
    recorded_paths:   BTreeMap<u32, (Vec<Vec3>, f32)>,
    stalled:          BTreeSet<Handle>,
    requested_models: BTreeMap<ModelId, Tick>,
    model_load_ticks: Tick,
    fade:             Option<Fade>,
    view_radius:      f32,
    on_screen:        BTreeMap<Handle, bool>,
    pace_rng:         StreamRng,
    pace_jitter:      f32,
    stall_rng:        StreamRng,
    stall_chance:     f64,
    checkpoint:       Option<(Vec3, CheckpointStyle)>,
    texts:            Vec<(TextMessage, TextStyle)>,
    audio_events:     Vec<(Vec3, u32)>,
    rewards:          Vec<(i64, i64)>,
    jingles:          u32,
    saves:            Vec<String>,
    missions_given:   Vec<String>,
    cleared_areas:    Vec<(Vec3, f32)>,
    destroyed:        Vec<Handle>,
    mission_audio_unloads: u32,
}

impl HeadlessHost {
    pub fn new(seed: u64) -> Self {
        Self::with_frame_ms(seed, DEFAULT_FRAME_MS)
    }

    pub fn with_frame_ms(seed: u64, frame_ms: Millis) -> Self {
        let bank = RngBank::new(seed);
        let player = Handle(1);
        let mut entities = BTreeMap::new();
        entities.insert(player, HeadlessEntity::new(EntityKind::Actor, ModelId(0), Vec3::ZERO, 0.0));
        Self {
            clock:            HostClock::new(frame_ms),
            next_handle:      2,
            entities,
            player,
            player_state:     PlayerState::Playing,
            player_control:   true,
            wanted_level:     0,
            skip:             false,
            world:            WorldToggles::default(),
            drive_tasks:      BTreeMap::new(),
            followers:        BTreeMap::new(),
            autopilot:        None,
            recorded_paths:   BTreeMap::new(),
            stalled:          BTreeSet::new(),
            requested_models: BTreeMap::new(),
            model_load_ticks: 1,
            fade:             None,
            view_radius:      DEFAULT_VIEW_RADIUS,
            on_screen:        BTreeMap::new(),
            pace_rng:         bank.stream(RngSlot::NpcPace),
            pace_jitter:      0.0,
            stall_rng:        bank.stream(RngSlot::Stall),
            stall_chance:     0.0,
            checkpoint:       None,
            texts:            Vec::new(),
            audio_events:     Vec::new(),
            rewards:          Vec::new(),
            jingles:          0,
            saves:            Vec::new(),
            missions_given:   Vec::new(),
            cleared_areas:    Vec::new(),
            destroyed:        Vec::new(),
            mission_audio_unloads: 0,
        }
    }

    // ── Knobs ──────────────────────────────────────────────────

    /// Speeds handed to `drive_to` are scaled by a random factor in
    /// `1 ± jitter`.
    pub fn set_pace_jitter(&mut self, jitter: f32) {
        self.pace_jitter = jitter;
    }

    /// Per-tick chance that a driven vehicle stalls until it is teleported.
    pub fn set_stall_chance(&mut self, chance: f64) {
        self.stall_chance = chance;
    }

    pub fn set_model_load_ticks(&mut self, ticks: Tick) {
        self.model_load_ticks = ticks;
    }

    pub fn set_view_radius(&mut self, radius: f32) {
        self.view_radius = radius;
    }

    /// Force `is_on_screen` for one handle.
    pub fn set_on_screen(&mut self, handle: Handle, on_screen: bool) {
        self.on_screen.insert(handle, on_screen);
    }

    pub fn set_player_state(&mut self, state: PlayerState) {
        self.player_state = state;
    }

    pub fn set_wanted_level(&mut self, level: u8) {
        self.wanted_level = level;
    }

    pub fn set_skip(&mut self, pressed: bool) {
        self.skip = pressed;
    }

    pub fn set_position(&mut self, handle: Handle, pos: Vec3) {
        if let Some(entity) = self.entities.get_mut(&handle) {
            entity.position = pos;
        }
    }

    pub fn set_speed(&mut self, handle: Handle, speed: f32) {
        if let Some(entity) = self.entities.get_mut(&handle) {
            entity.speed = speed;
        }
    }

    pub fn wreck(&mut self, vehicle: Handle) {
        if let Some(entity) = self.entities.get_mut(&vehicle) {
            entity.condition.destroyed = true;
            entity.speed = 0.0;
        }
        self.followers.remove(&vehicle);
    }

    pub fn kill(&mut self, actor: Handle) {
        if let Some(entity) = self.entities.get_mut(&actor) {
            entity.alive = false;
        }
    }

    pub fn damage_by_player(&mut self, handle: Handle) {
        if let Some(entity) = self.entities.get_mut(&handle) {
            entity.damaged_by_player = true;
        }
    }

    /// Pull an actor out of whatever vehicle it sits in.
    pub fn eject(&mut self, actor: Handle) {
        if let Some(entity) = self.entities.get_mut(&actor) {
            entity.vehicle = None;
        }
    }

    /// Drive the player's vehicle round `points` at `speed`, looping.
    /// Takes effect on the first frame the player sits in a vehicle with
    /// control enabled.
    pub fn set_autopilot(&mut self, points: Vec<Vec3>, speed: f32) {
        self.autopilot = Some(PathFollow { points, cursor: 0, speed, looped: true });
    }

    pub fn stop_autopilot(&mut self) {
        self.autopilot = None;
        if let Some(vehicle) = self.vehicle_of(self.player) {
            self.followers.remove(&vehicle);
            self.set_speed(vehicle, 0.0);
        }
    }

    pub fn register_recorded_path(&mut self, path_id: u32, points: Vec<Vec3>, speed: f32) {
        self.recorded_paths.insert(path_id, (points, speed));
    }

    // ── Observations ───────────────────────────────────────────

    pub fn entity(&self, handle: Handle) -> Option<&HeadlessEntity> {
        self.entities.get(&handle)
    }

    pub fn live_count(&self, kind: EntityKind) -> usize {
        self.entities.values().filter(|e| e.kind == kind && !e.released).count()
    }

    pub fn vehicle_of(&self, actor: Handle) -> Option<Handle> {
        self.entities.get(&actor).and_then(|e| e.vehicle)
    }

    pub fn blip(&self, handle: Handle) -> Option<BlipStyle> {
        self.entities.get(&handle).and_then(|e| e.blip)
    }

    pub fn texts(&self) -> &[(TextMessage, TextStyle)] {
        &self.texts
    }

    pub fn shown_keys(&self) -> Vec<&str> {
        self.texts.iter().map(|(m, _)| m.key.as_str()).collect()
    }

    pub fn has_shown(&self, key: &str) -> bool {
        self.texts.iter().any(|(m, _)| m.key == key)
    }

    pub fn audio_events(&self) -> &[(Vec3, u32)] {
        &self.audio_events
    }

    pub fn rewards(&self) -> &[(i64, i64)] {
        &self.rewards
    }

    pub fn jingles(&self) -> u32 {
        self.jingles
    }

    pub fn saves(&self) -> &[String] {
        &self.saves
    }

    pub fn missions_given(&self) -> &[String] {
        &self.missions_given
    }

    pub fn cleared_areas(&self) -> &[(Vec3, f32)] {
        &self.cleared_areas
    }

    pub fn destroyed(&self) -> &[Handle] {
        &self.destroyed
    }

    pub fn mission_audio_unloads(&self) -> u32 {
        self.mission_audio_unloads
    }

    pub fn checkpoint(&self) -> Option<(Vec3, CheckpointStyle)> {
        self.checkpoint
    }

    pub fn player_control(&self) -> bool {
        self.player_control
    }

    pub fn world(&self) -> &WorldToggles {
        &self.world
    }

    // ── Simulation ─────────────────────────────────────────────

    fn step_distance(&self, speed: f32) -> f32 {
        speed * self.clock.frame_ms as f32 / 1000.0
    }

    /// Move `vehicle` towards `target`. Returns true once it is there.
    fn move_towards(&mut self, vehicle: Handle, target: Vec3, speed: f32) -> bool {
        let step = self.step_distance(speed);
        let Some(entity) = self.entities.get_mut(&vehicle) else {
            return true;
        };
        if entity.condition.is_wrecked() {
            entity.speed = 0.0;
            return false;
        }
        let distance = entity.position.distance(&target);
        entity.heading = entity.position.heading_to(&target);
        entity.speed = speed;
        if distance <= step || distance == 0.0 {
            entity.position = target;
            return true;
        }
        let f = step / distance;
        let p = entity.position;
        entity.position = Vec3::new(
            p.x + (target.x - p.x) * f,
            p.y + (target.y - p.y) * f,
            p.z + (target.z - p.z) * f,
        );
        false
    }

    fn simulate(&mut self) {
        if self.player_control {
            if let Some(vehicle) = self.vehicle_of(self.player) {
                if let Some(follow) = self.autopilot.take() {
                    log::debug!("headless: autopilot engaged on {vehicle:?}");
                    self.followers.insert(vehicle, follow);
                }
            }
        }

        let drivers: Vec<Handle> = self.drive_tasks.keys().copied().collect();
        for driver in drivers {
            let Some(task) = self.drive_tasks.get(&driver).copied() else {
                continue;
            };
            if self.stalled.contains(&task.vehicle) {
                self.set_speed(task.vehicle, 0.0);
                continue;
            }
            if self.stall_chance > 0.0 && self.stall_rng.chance(self.stall_chance) {
                log::debug!("headless: vehicle {:?} stalled", task.vehicle);
                self.stalled.insert(task.vehicle);
                self.set_speed(task.vehicle, 0.0);
                continue;
            }
            if self.move_towards(task.vehicle, task.target, task.speed) {
                self.drive_tasks.remove(&driver);
            }
        }

        let vehicles: Vec<Handle> = self.followers.keys().copied().collect();
        for vehicle in vehicles {
            let Some(follow) = self.followers.get(&vehicle).cloned() else {
                continue;
            };
            let Some(&target) = follow.points.get(follow.cursor) else {
                self.followers.remove(&vehicle);
                self.set_speed(vehicle, 0.0);
                continue;
            };
            if !self.move_towards(vehicle, target, follow.speed) {
                continue;
            }
            let mut next = follow.cursor + 1;
            if next >= follow.points.len() && follow.looped {
                next = 0;
            }
            if let Some(f) = self.followers.get_mut(&vehicle) {
                f.cursor = next;
            }
        }

        // Occupants ride along.
        let riders: Vec<(Handle, Handle)> = self
            .entities
            .iter()
            .filter_map(|(h, e)| e.vehicle.map(|v| (*h, v)))
            .collect();
        for (actor, vehicle) in riders {
            if let Some(v) = self.entities.get(&vehicle).cloned() {
                if let Some(a) = self.entities.get_mut(&actor) {
                    a.position = v.position;
                    a.heading = v.heading;
                    a.speed = v.speed;
                }
            }
        }
    }
}

impl Host for HeadlessHost {
    fn clock(&self) -> &HostClock {
        &self.clock
    }

    fn yield_frame(&mut self) {
        self.clock.advance();
        self.simulate();
    }

    fn spawn(&mut self, kind: EntityKind, model: ModelId, pos: Vec3, heading: f32) -> Handle {
        let handle = Handle(self.next_handle);
        self.next_handle += 1;
        self.entities.insert(handle, HeadlessEntity::new(kind, model, pos, heading));
        handle
    }

    fn destroy(&mut self, handle: Handle) {
        if handle == self.player {
            log::warn!("headless: refusing to destroy the player actor");
            return;
        }
        if self.entities.remove(&handle).is_some() {
            self.destroyed.push(handle);
        }
        self.drive_tasks.remove(&handle);
        self.followers.remove(&handle);
        for entity in self.entities.values_mut() {
            if entity.vehicle == Some(handle) {
                entity.vehicle = None;
            }
        }
    }

    fn release(&mut self, handle: Handle) {
        if let Some(entity) = self.entities.get_mut(&handle) {
            entity.released = true;
            entity.blip = None;
        }
    }

    fn exists(&self, handle: Handle) -> bool {
        self.entities.contains_key(&handle)
    }

    fn request_models(&mut self, models: &[ModelId]) {
        let ready_at = self.clock.frame + self.model_load_ticks;
        for model in models {
            self.requested_models.entry(*model).or_insert(ready_at);
        }
    }

    fn models_loaded(&self, models: &[ModelId]) -> bool {
        models.iter().all(|m| {
            self.requested_models
                .get(m)
                .is_some_and(|ready_at| self.clock.frame >= *ready_at)
        })
    }

    fn show_text(&mut self, message: &TextMessage, style: TextStyle) {
        self.texts.push((message.clone(), style));
    }

    fn clear_text(&mut self) {
        log::trace!("headless: clear_text");
    }

    fn fade(&mut self, duration_ms: Millis, direction: FadeDirection) {
        self.fade = Some(Fade { direction, until_ms: self.clock.now() + duration_ms });
    }

    fn fade_status(&self) -> FadeStatus {
        match self.fade {
            None => FadeStatus::Transparent,
            Some(f) if self.clock.now() < f.until_ms => FadeStatus::Fading,
            Some(Fade { direction: FadeDirection::Out, .. }) => FadeStatus::Opaque,
            Some(Fade { direction: FadeDirection::In, .. }) => FadeStatus::Transparent,
        }
    }

    fn world_toggles(&self) -> WorldToggles {
        self.world
    }

    fn apply_world_toggles(&mut self, toggles: &WorldToggles) {
        self.world = *toggles;
    }

    fn set_traffic_density(&mut self, cars: f32, peds: f32) {
        self.world.traffic_cars = cars;
        self.world.traffic_peds = peds;
    }

    fn set_police_behavior(&mut self, behavior: PoliceBehavior) {
        self.world.police = behavior;
    }

    fn set_ambient_events(&mut self, ambient: AmbientEvents) {
        self.world.ambient = ambient;
    }

    fn player_actor(&self) -> Handle {
        self.player
    }

    fn player_state(&self) -> PlayerState {
        self.player_state
    }

    fn set_player_control(&mut self, enabled: bool) {
        self.player_control = enabled;
    }

    fn wanted_level(&self) -> u8 {
        self.wanted_level
    }

    fn skip_pressed(&self) -> bool {
        self.skip
    }

    fn position(&self, handle: Handle) -> Vec3 {
        self.entities.get(&handle).map(|e| e.position).unwrap_or(Vec3::ZERO)
    }

    fn heading(&self, handle: Handle) -> f32 {
        self.entities.get(&handle).map(|e| e.heading).unwrap_or(0.0)
    }

    fn speed(&self, handle: Handle) -> f32 {
        self.entities.get(&handle).map(|e| e.speed).unwrap_or(0.0)
    }

    fn is_alive(&self, actor: Handle) -> bool {
        self.entities.get(&actor).is_some_and(|e| e.alive)
    }

    fn vehicle_condition(&self, vehicle: Handle) -> VehicleCondition {
        self.entities
            .get(&vehicle)
            .map(|e| e.condition)
            .unwrap_or(VehicleCondition { destroyed: true, ..Default::default() })
    }

    fn is_in_vehicle(&self, actor: Handle, vehicle: Handle) -> bool {
        self.vehicle_of(actor) == Some(vehicle)
    }

    fn damaged_by_player(&self, handle: Handle) -> bool {
        self.entities.get(&handle).is_some_and(|e| e.damaged_by_player)
    }

    fn is_on_screen(&self, handle: Handle) -> bool {
        if let Some(forced) = self.on_screen.get(&handle) {
            return *forced;
        }
        self.position(handle).distance(&self.position(self.player)) <= self.view_radius
    }

    fn put_in_vehicle(&mut self, actor: Handle, vehicle: Handle) {
        let Some(v) = self.entities.get(&vehicle).cloned() else {
            return;
        };
        if let Some(a) = self.entities.get_mut(&actor) {
            a.vehicle = Some(vehicle);
            a.position = v.position;
            a.heading = v.heading;
        }
    }

    fn teleport(&mut self, vehicle: Handle, pos: Vec3, heading: f32, speed: f32) {
        if let Some(entity) = self.entities.get_mut(&vehicle) {
            entity.position = pos;
            entity.heading = heading;
            entity.speed = speed;
        }
        self.stalled.remove(&vehicle);
        for entity in self.entities.values_mut() {
            if entity.vehicle == Some(vehicle) {
                entity.position = pos;
                entity.heading = heading;
            }
        }
    }

    fn clear_area(&mut self, pos: Vec3, radius: f32) {
        self.cleared_areas.push((pos, radius));
    }

    fn drive_to(&mut self, driver: Handle, vehicle: Handle, target: Vec3, speed: f32) {
        let jitter = self.pace_rng.range_f32(-self.pace_jitter, self.pace_jitter);
        self.drive_tasks.insert(driver, DriveTask { vehicle, target, speed: speed * (1.0 + jitter) });
    }

    fn navigation_idle(&self, driver: Handle) -> bool {
        !self.drive_tasks.contains_key(&driver)
    }

    fn stop_navigation(&mut self, driver: Handle) {
        if let Some(task) = self.drive_tasks.remove(&driver) {
            self.set_speed(task.vehicle, 0.0);
        }
        if let Some(vehicle) = self.vehicle_of(driver) {
            self.followers.remove(&vehicle);
        }
    }

    fn follow_recorded_path(&mut self, vehicle: Handle, path_id: u32) {
        match self.recorded_paths.get(&path_id) {
            Some((points, speed)) => {
                let follow = PathFollow { points: points.clone(), cursor: 0, speed: *speed, looped: true };
                self.followers.insert(vehicle, follow);
            }
            None => log::warn!("headless: no recorded path {path_id}"),
        }
    }

    fn set_blip(&mut self, handle: Handle, style: BlipStyle) {
        if let Some(entity) = self.entities.get_mut(&handle) {
            entity.blip = Some(style);
        }
    }

    fn show_checkpoint(&mut self, pos: Vec3, style: CheckpointStyle) {
        self.checkpoint = Some((pos, style));
    }

    fn hide_checkpoint(&mut self) {
        self.checkpoint = None;
    }

    fn report_audio_event(&mut self, pos: Vec3, sound_id: u32) {
        self.audio_events.push((pos, sound_id));
    }

    fn unload_mission_audio(&mut self) {
        self.mission_audio_unloads += 1;
    }

    fn play_jingle(&mut self) {
        self.jingles += 1;
    }

    fn register_mission_given(&mut self, title: &str) {
        self.missions_given.push(title.to_string());
    }

    fn add_reward(&mut self, cash: i64, respect: i64) {
        self.rewards.push((cash, respect));
    }

    fn request_progress_save(&mut self, title: &str) {
        self.saves.push(title.to_string());
    }
}
