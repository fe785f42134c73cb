//! Shared helpers for the race integration tests.

#![allow(dead_code)]

use mission_core::{
    config::{MissionSettings, RaceConfig, RaceTuning, RacerConfig, VariantConfig},
    event::MissionEvent,
    headless_host::HeadlessHost,
    host::Host,
    mission::MissionRunner,
    race_engine::{RaceMission, RaceStage, RaceState},
    race_from_config,
    race_variant::RaceVariant,
    route::RouteNode,
    types::Vec3,
};

pub fn checkpoint(x: f32, y: f32, speed: f32) -> RouteNode {
    RouteNode::checkpoint(Vec3::new(x, y, 0.0), 0.0, speed)
}

pub fn waypoint(x: f32, y: f32, speed: f32) -> RouteNode {
    RouteNode::waypoint(Vec3::new(x, y, 0.0), 0.0, speed)
}

/// The 100 m square used by most scenarios, every corner a checkpoint.
pub fn square(speed: f32) -> Vec<RouteNode> {
    vec![
        checkpoint(0.0, 100.0, speed),
        checkpoint(-100.0, 100.0, speed),
        checkpoint(-100.0, 0.0, speed),
        checkpoint(0.0, 0.0, speed),
    ]
}

pub fn player_at(x: f32, y: f32) -> RacerConfig {
    RacerConfig::player(Vec3::new(x, y, 0.0))
}

pub fn rival_at(name: &str, x: f32, y: f32, pace: f32) -> RacerConfig {
    RacerConfig::opponent(name, Vec3::new(x, y, 0.0)).with_pace(pace)
}

pub fn race_config(route: Vec<RouteNode>, racers: Vec<RacerConfig>, variant: VariantConfig) -> RaceConfig {
    RaceConfig {
        settings: MissionSettings::titled("RACE").with_reward(1000, 4),
        route,
        racers,
        variant,
        tuning: RaceTuning::default(),
    }
}

/// A runner for `config` and a headless host whose autopilot drives the
/// player round the route's nodes at `player_speed` (no autopilot if 0).
pub fn start(config: &RaceConfig, seed: u64, player_speed: f32) -> (MissionRunner, HeadlessHost) {
    let mission = race_from_config(config).unwrap();
    let runner = MissionRunner::from_boxed(format!("test-{seed}"), mission);
    let mut host = HeadlessHost::new(seed);
    if player_speed > 0.0 {
        let lap: Vec<Vec3> = config.route.iter().map(|n| n.position).collect();
        host.set_autopilot(lap, player_speed);
    }
    (runner, host)
}

/// Tick until `done` holds or the runner terminates. Returns whether `done` held.
pub fn run_until(
    runner: &mut MissionRunner,
    host: &mut HeadlessHost,
    max_ticks: u64,
    mut done: impl FnMut(&MissionRunner, &HeadlessHost) -> bool,
) -> bool {
    for _ in 0..max_ticks {
        if done(runner, host) {
            return true;
        }
        if runner.is_terminated() {
            return false;
        }
        runner.tick(host);
        host.yield_frame();
    }
    done(runner, host)
}

pub fn race_of<V: RaceVariant>(runner: &MissionRunner) -> &RaceState {
    runner.mission_as::<RaceMission<V>>().expect("race mission of that variant").race()
}

/// Tick until the countdown is over and the race is live.
pub fn run_to_green<V: RaceVariant>(runner: &mut MissionRunner, host: &mut HeadlessHost) {
    let racing = run_until(runner, host, 200, |r, _| race_of::<V>(r).stage == RaceStage::Racing);
    assert!(racing, "race never left the countdown");
}

pub fn laps_completed(runner: &MissionRunner) -> Vec<(usize, u32)> {
    runner
        .journal()
        .events_of("lap_completed")
        .unwrap()
        .into_iter()
        .filter_map(|e| match e {
            MissionEvent::LapCompleted { racer, lap, .. } => Some((racer, lap)),
            _ => None,
        })
        .collect()
}

pub fn fail_key(runner: &MissionRunner) -> Option<&str> {
    runner.fail_reason().map(|r| r.key.as_str())
}

pub fn player_vehicle(state: &RaceState) -> mission_core::types::Handle {
    state.player().expect("field spawned").vehicle
}

pub fn frame(host: &HeadlessHost) -> u64 {
    host.clock().frame
}
