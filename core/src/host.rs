//! The host boundary.
//!
//! RULE: Every game-native call goes through `Host`. The lifecycle, the
//! race engine and the clip sequencer never hold entity state of their
//! own beyond handles; positions, health and camera state are always
//! asked of the host at the tick they are needed.

use crate::{
    clock::HostClock,
    types::{Handle, Millis, Vec3},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Actor,
    Vehicle,
    Prop,
    Blip,
    Pickup,
}

/// Host model identifier for vehicles and actors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModelId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerState {
    Playing,
    Dead,
    Arrested,
    Disconnected,
}

impl PlayerState {
    pub fn is_active(&self) -> bool {
        matches!(self, PlayerState::Playing)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Playing      => "playing",
            Self::Dead         => "dead",
            Self::Arrested     => "arrested",
            Self::Disconnected => "disconnected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeDirection {
    In,
    Out,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeStatus {
    Transparent,
    Fading,
    Opaque,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoliceBehavior {
    Normal,
    IgnorePlayer,
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmbientEvents {
    pub gangs:   bool,
    pub cops:    bool,
    pub traffic: bool,
}

impl AmbientEvents {
    pub const ALL: AmbientEvents = AmbientEvents { gangs: true, cops: true, traffic: true };
    pub const NONE: AmbientEvents = AmbientEvents { gangs: false, cops: false, traffic: false };
}

/// World-simulation toggles a mission may change and must restore.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldToggles {
    pub traffic_cars: f32,
    pub traffic_peds: f32,
    pub police:       PoliceBehavior,
    pub ambient:      AmbientEvents,
}

impl Default for WorldToggles {
    fn default() -> Self {
        Self {
            traffic_cars: 1.0,
            traffic_peds: 1.0,
            police:       PoliceBehavior::Normal,
            ambient:      AmbientEvents::ALL,
        }
    }
}

/// A piece of on-screen text: a text-table key, or a pre-formatted
/// string when `raw` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextMessage {
    pub key:         String,
    pub duration_ms: Millis,
    #[serde(default)]
    pub raw:         bool,
}

impl TextMessage {
    pub fn key(key: impl Into<String>, duration_ms: Millis) -> Self {
        Self { key: key.into(), duration_ms, raw: false }
    }

    pub fn raw(text: impl Into<String>, duration_ms: Millis) -> Self {
        Self { key: text.into(), duration_ms, raw: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextStyle {
    /// Small subtitle-style line (reasons, hints, countdown).
    Small,
    /// Large centred banner (mission title, passed/failed).
    Banner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VehicleCondition {
    pub destroyed: bool,
    pub submerged: bool,
    pub on_fire:   bool,
}

impl VehicleCondition {
    pub fn is_wrecked(&self) -> bool {
        self.destroyed || self.submerged || self.on_fire
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlipStyle {
    Player,
    Opponent,
    Hidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointStyle {
    Normal,
    Finish,
}

/// Calls the framework makes into the game engine.
pub trait Host {
    // ── Clock ──────────────────────────────────────────────────
    fn clock(&self) -> &HostClock;
    /// Hand control back to the host until its next frame.
    fn yield_frame(&mut self);

    // ── Entities ───────────────────────────────────────────────
    fn spawn(&mut self, kind: EntityKind, model: ModelId, pos: Vec3, heading: f32) -> Handle;
    fn destroy(&mut self, handle: Handle);
    /// Hand an entity back to the world without deleting it.
    fn release(&mut self, handle: Handle);
    fn exists(&self, handle: Handle) -> bool;
    fn request_models(&mut self, models: &[ModelId]);
    fn models_loaded(&self, models: &[ModelId]) -> bool;

    // ── Text and camera ────────────────────────────────────────
    fn show_text(&mut self, message: &TextMessage, style: TextStyle);
    fn clear_text(&mut self);
    fn fade(&mut self, duration_ms: Millis, direction: FadeDirection);
    fn fade_status(&self) -> FadeStatus;

    // ── World simulation ───────────────────────────────────────
    fn world_toggles(&self) -> WorldToggles;
    fn apply_world_toggles(&mut self, toggles: &WorldToggles);
    fn set_traffic_density(&mut self, cars: f32, peds: f32);
    fn set_police_behavior(&mut self, behavior: PoliceBehavior);
    fn set_ambient_events(&mut self, ambient: AmbientEvents);

    // ── Player ─────────────────────────────────────────────────
    fn player_actor(&self) -> Handle;
    fn player_state(&self) -> PlayerState;
    fn set_player_control(&mut self, enabled: bool);
    fn wanted_level(&self) -> u8;
    fn skip_pressed(&self) -> bool;

    // ── Actor and vehicle queries ──────────────────────────────
    fn position(&self, handle: Handle) -> Vec3;
    fn heading(&self, handle: Handle) -> f32;
    fn speed(&self, handle: Handle) -> f32;
    fn is_alive(&self, actor: Handle) -> bool;
    fn vehicle_condition(&self, vehicle: Handle) -> VehicleCondition;
    fn is_in_vehicle(&self, actor: Handle, vehicle: Handle) -> bool;
    fn damaged_by_player(&self, handle: Handle) -> bool;
    fn is_on_screen(&self, handle: Handle) -> bool;

    fn locate_near(&self, handle: Handle, pos: Vec3, radii: Vec3) -> bool {
        self.position(handle).within(&pos, &radii)
    }

    // ── Movement ───────────────────────────────────────────────
    fn put_in_vehicle(&mut self, actor: Handle, vehicle: Handle);
    fn teleport(&mut self, vehicle: Handle, pos: Vec3, heading: f32, speed: f32);
    fn clear_area(&mut self, pos: Vec3, radius: f32);
    fn drive_to(&mut self, driver: Handle, vehicle: Handle, target: Vec3, speed: f32);
    fn navigation_idle(&self, driver: Handle) -> bool;
    fn stop_navigation(&mut self, driver: Handle);
    fn follow_recorded_path(&mut self, vehicle: Handle, path_id: u32);

    // ── Markers ────────────────────────────────────────────────
    fn set_blip(&mut self, handle: Handle, style: BlipStyle);
    fn show_checkpoint(&mut self, pos: Vec3, style: CheckpointStyle);
    fn hide_checkpoint(&mut self);

    // ── Audio ──────────────────────────────────────────────────
    fn report_audio_event(&mut self, pos: Vec3, sound_id: u32);
    fn unload_mission_audio(&mut self);
    fn play_jingle(&mut self);

    // ── Bookkeeping ────────────────────────────────────────────
    fn register_mission_given(&mut self, title: &str);
    fn add_reward(&mut self, cash: i64, respect: i64);
    fn request_progress_save(&mut self, title: &str);
}
