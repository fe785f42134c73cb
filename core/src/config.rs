use crate::{
    error::{MissionError, MissionResult},
    host::{ModelId, PoliceBehavior, TextMessage},
    route::{Route, RouteNode},
    types::{Millis, Vec3},
};
use serde::{Deserialize, Serialize};

// ── Mission settings ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reward {
    pub cash:    i64,
    pub respect: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionFlags {
    #[serde(default)]
    pub save_progress_on_success: bool,
    #[serde(default = "default_true")]
    pub show_title:               bool,
    #[serde(default = "default_true")]
    pub play_success_jingle:      bool,
}

impl Default for MissionFlags {
    fn default() -> Self {
        Self {
            save_progress_on_success: false,
            show_title:               true,
            play_success_jingle:      true,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionSettings {
    pub title:           String,
    #[serde(default)]
    pub reward:          Reward,
    #[serde(default = "default_success_message")]
    pub success_message: TextMessage,
    #[serde(default = "default_failure_message")]
    pub failure_message: TextMessage,
    #[serde(default)]
    pub flags:           MissionFlags,
}

fn default_success_message() -> TextMessage {
    TextMessage::key("M_PASS", 5000)
}

fn default_failure_message() -> TextMessage {
    TextMessage::key("M_FAIL", 5000)
}

impl MissionSettings {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title:           title.into(),
            reward:          Reward::default(),
            success_message: default_success_message(),
            failure_message: default_failure_message(),
            flags:           MissionFlags::default(),
        }
    }

    pub fn with_reward(mut self, cash: i64, respect: i64) -> Self {
        self.reward = Reward { cash, respect };
        self
    }
}

// ── Race configuration ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RacerConfig {
    pub name:          String,
    pub vehicle_model: ModelId,
    pub driver_model:  ModelId,
    pub grid:          Vec3,
    #[serde(default)]
    pub heading:       f32,
    #[serde(default)]
    pub is_player:     bool,
    /// Multiplier on each node's target speed when this racer drives itself.
    #[serde(default = "default_pace")]
    pub pace:          f32,
    /// Pre-recorded path for a scripted "boss" vehicle.
    #[serde(default)]
    pub recorded_path: Option<u32>,
}

fn default_pace() -> f32 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VariantConfig {
    Sprint,
    Circuit {
        laps: u32,
    },
    LapKnockout,
    SpeedTrap {
        laps: u32,
    },
    RadarChallenge {
        #[serde(default)]
        time_limit_ms: Option<Millis>,
    },
    TimedCheckpoint {
        laps:            u32,
        initial_time_ms: Millis,
    },
    WantedChallenge {
        min_level:   u8,
        hold_ms:     Millis,
        #[serde(default)]
        clear_after: bool,
    },
}

/// Radii, windows and offsets the race engine works with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceTuning {
    /// Half-extents of the box the player must enter to take a checkpoint.
    pub checkpoint_radius:  Vec3,
    /// Half-extents used for non-player racers reaching any node.
    pub node_radius:        Vec3,
    /// How long a non-player racer may make no progress before recovery.
    pub stuck_window_ms:    Millis,
    /// Distance that counts as progress within the stuck window.
    pub stuck_distance:     f32,
    /// Radius cleared (and required free of other racers) before a recovery.
    pub recovery_clearance: f32,
    /// Vertical offset knocked-out racers are parked at.
    pub knockout_z_offset:  f32,
    pub countdown_step_ms:  Millis,
    pub countdown_sound_id: u32,
    pub go_sound_id:        u32,
    pub traffic_density:    f32,
    pub ped_density:        f32,
    pub police:             PoliceBehavior,
}

impl Default for RaceTuning {
    fn default() -> Self {
        Self {
            checkpoint_radius:  Vec3::new(8.0, 8.0, 6.0),
            node_radius:        Vec3::new(10.0, 10.0, 8.0),
            stuck_window_ms:    6000,
            stuck_distance:     4.0,
            recovery_clearance: 6.0,
            knockout_z_offset:  -250.0,
            countdown_step_ms:  1000,
            countdown_sound_id: 1056,
            go_sound_id:        1057,
            traffic_density:    0.0,
            ped_density:        0.5,
            police:             PoliceBehavior::IgnorePlayer,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceConfig {
    pub settings: MissionSettings,
    pub route:    Vec<RouteNode>,
    pub racers:   Vec<RacerConfig>,
    pub variant:  VariantConfig,
    #[serde(default)]
    pub tuning:   RaceTuning,
}

impl RaceConfig {
    /// Load a race definition from a JSON file.
    /// In tests, use RaceConfig::default_test().
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: RaceConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Build the route, assigning checkpoint ordinals.
    pub fn build_route(&self) -> MissionResult<Route> {
        Route::new(self.route.clone())
    }

    pub fn validate(&self) -> MissionResult<()> {
        self.build_route()?;
        let players = self.racers.iter().filter(|r| r.is_player).count();
        if players != 1 {
            return Err(MissionError::InvalidRoster {
                reason: format!("expected exactly one player racer, found {players}"),
            });
        }
        Ok(())
    }

    /// Config with hardcoded defaults for use in tests: a square
    /// four-node circuit, every node a checkpoint, player + one opponent.
    pub fn default_test() -> Self {
        let route = vec![
            RouteNode::checkpoint(Vec3::new(0.0, 100.0, 0.0), 0.0, 20.0),
            RouteNode::checkpoint(Vec3::new(-100.0, 100.0, 0.0), 90.0, 20.0),
            RouteNode::checkpoint(Vec3::new(-100.0, 0.0, 0.0), 180.0, 20.0),
            RouteNode::checkpoint(Vec3::new(0.0, 0.0, 0.0), 270.0, 20.0),
        ];
        let racers = vec![
            RacerConfig::player(Vec3::new(4.0, 0.0, 0.0)),
            RacerConfig::opponent("rival", Vec3::new(-4.0, 0.0, 0.0)),
        ];
        Self {
            settings: MissionSettings::titled("TEST_RACE").with_reward(1000, 5),
            route,
            racers,
            variant: VariantConfig::Circuit { laps: 2 },
            tuning: RaceTuning::default(),
        }
    }
}

impl RacerConfig {
    pub fn player(grid: Vec3) -> Self {
        Self {
            name:          "player".into(),
            vehicle_model: ModelId(411),
            driver_model:  ModelId(0),
            grid,
            heading:       0.0,
            is_player:     true,
            pace:          1.0,
            recorded_path: None,
        }
    }

    pub fn opponent(name: &str, grid: Vec3) -> Self {
        Self {
            name:          name.into(),
            vehicle_model: ModelId(415),
            driver_model:  ModelId(102),
            grid,
            heading:       0.0,
            is_player:     false,
            pace:          1.0,
            recorded_path: None,
        }
    }

    pub fn with_pace(mut self, pace: f32) -> Self {
        self.pace = pace;
        self
    }
}
