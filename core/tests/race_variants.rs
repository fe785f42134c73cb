//! One scenario per race variant, each won and lost on the headless host.

mod common;

use common::*;
use mission_core::{
    config::VariantConfig,
    event::MissionEvent,
    host::{BlipStyle, Host},
    knockout_race::KnockoutRace,
    radar_challenge::RadarChallenge,
    speed_trap_race::SpeedTrapRace,
    timed_checkpoint_race::TimedCheckpointRace,
    wanted_challenge::{WantedChallenge, WantedStage},
    RaceMission,
};

fn straight(speed: f32) -> Vec<mission_core::route::RouteNode> {
    vec![
        checkpoint(0.0, 100.0, speed),
        checkpoint(0.0, 200.0, speed),
        checkpoint(0.0, 300.0, speed),
    ]
}

// ── Sprint ─────────────────────────────────────────────────────────

#[test]
fn sprint_won_by_the_faster_player() {
    let config = race_config(
        straight(30.0),
        vec![player_at(4.0, 0.0), rival_at("kendl", -4.0, 0.0, 0.5)],
        VariantConfig::Sprint,
    );
    let (mut runner, mut host) = start(&config, 1, 30.0);

    assert_eq!(runner.run_to_end(&mut host, 2000), Some(true));
    assert_eq!(laps_completed(&runner), [(0, 1)]);
    assert_eq!(host.rewards(), &[(1000, 4)]);
    assert!(host.has_shown("M_PASS"));
}

#[test]
fn sprint_lost_when_a_rival_finishes_first() {
    let config = race_config(
        straight(30.0),
        vec![player_at(4.0, 0.0), rival_at("kendl", -4.0, 0.0, 1.0)],
        VariantConfig::Sprint,
    );
    let (mut runner, mut host) = start(&config, 1, 10.0);

    assert_eq!(runner.run_to_end(&mut host, 2000), Some(false));
    assert_eq!(fail_key(&runner), Some("race.lost"));
    assert_eq!(laps_completed(&runner), [(1, 1)]);
    assert!(host.rewards().is_empty());
}

// ── Lap knockout ───────────────────────────────────────────────────

fn knockout_field() -> Vec<mission_core::config::RacerConfig> {
    vec![
        player_at(6.0, 0.0),
        rival_at("ryder", -6.0, 0.0, 1.0),
        rival_at("smoke", 0.0, -8.0, 0.8),
    ]
}

/// Three racers, two laps: the slowest rival is parked after lap one and
/// the player takes the final lap.
#[test]
fn knockout_parks_the_last_racer_each_lap() {
    let config = race_config(square(25.0), knockout_field(), VariantConfig::LapKnockout);
    let (mut runner, mut host) = start(&config, 1, 30.0);
    assert_eq!(race_of::<KnockoutRace>(&runner).laps, 2);

    let knocked = run_until(&mut runner, &mut host, 3000, |r, _| r.journal().count_of("racer_knocked_out") > 0);
    assert!(knocked, "nobody was knocked out");
    let race = race_of::<KnockoutRace>(&runner);
    let smoke = &race.racers[2];
    assert!(smoke.knocked_out);
    assert!(!race.racers[0].knocked_out && !race.racers[1].knocked_out);
    assert_eq!(host.blip(smoke.vehicle), Some(BlipStyle::Hidden));
    assert!(host.entity(smoke.vehicle).unwrap().position.z < -200.0, "parked below the route");
    assert!(host.navigation_idle(smoke.actor));

    let events = runner.journal().events_of("racer_knocked_out").unwrap();
    assert!(matches!(events[..], [MissionEvent::RacerKnockedOut { racer: 2, lap: 1, .. }]));

    // The parked racer no longer counts towards the field on the HUD.
    runner.run_ticks(&mut host, 1);
    let hud = host
        .texts()
        .iter()
        .rev()
        .find(|(m, _)| m.raw && m.key.starts_with("POS "))
        .map(|(m, _)| m.key.clone());
    let hud = hud.expect("no position HUD drawn");
    assert!(hud.ends_with("/2  LAP 2/2"), "HUD after the knockout reads {hud:?}");

    assert_eq!(runner.run_to_end(&mut host, 3000), Some(true));
    assert!(laps_completed(&runner).contains(&(0, 2)));
    assert_eq!(runner.journal().count_of("racer_knocked_out"), 1);
}

#[test]
fn knockout_player_last_over_the_line_loses() {
    let config = race_config(square(25.0), knockout_field(), VariantConfig::LapKnockout);
    let (mut runner, mut host) = start(&config, 1, 15.0);

    assert_eq!(runner.run_to_end(&mut host, 5000), Some(false));
    assert_eq!(fail_key(&runner), Some("race.lost"));
    assert_eq!(runner.journal().count_of("racer_knocked_out"), 0);
    assert!(!race_of::<KnockoutRace>(&runner).racers[0].knocked_out);
}

// ── Speed trap ─────────────────────────────────────────────────────

#[test]
fn speed_trap_won_on_the_highest_total() {
    let config = race_config(
        square(25.0),
        vec![player_at(4.0, 0.0), rival_at("rival", -4.0, 0.0, 1.0)],
        VariantConfig::SpeedTrap { laps: 2 },
    );
    let (mut runner, mut host) = start(&config, 1, 40.0);

    assert_eq!(runner.run_to_end(&mut host, 3000), Some(true));
    let race = race_of::<SpeedTrapRace>(&runner);
    assert_eq!(race.racers[0].speed_sum, 320.0);
    // The rival is credited the posted speed of every checkpoint it missed.
    assert_eq!(race.racers[1].speed_sum, 200.0);
}

#[test]
fn speed_trap_lost_when_rival_total_is_higher() {
    let config = race_config(
        square(25.0),
        vec![player_at(4.0, 0.0), rival_at("rival", -4.0, 0.0, 1.0)],
        VariantConfig::SpeedTrap { laps: 2 },
    );
    let (mut runner, mut host) = start(&config, 1, 20.0);

    assert_eq!(runner.run_to_end(&mut host, 3000), Some(false));
    assert_eq!(fail_key(&runner), Some("race.lost"));
    let race = race_of::<SpeedTrapRace>(&runner);
    assert!(race.racers[1].finished);
    assert!(race.racers[0].speed_sum < race.racers[1].speed_sum);
}

// ── Radar challenge ────────────────────────────────────────────────

/// Three radars posted at 60: passing each at 50 totals 150 of 180.
#[test]
fn radar_too_slow_fails() {
    let config = race_config(straight(60.0), vec![player_at(0.0, 0.0)], VariantConfig::RadarChallenge {
        time_limit_ms: None,
    });
    let (mut runner, mut host) = start(&config, 1, 50.0);

    assert_eq!(runner.run_to_end(&mut host, 2000), Some(false));
    assert_eq!(fail_key(&runner), Some("race.radar_too_slow"));
    assert_eq!(runner.journal().count_of("checkpoint_passed"), 3);
    assert_eq!(race_of::<RadarChallenge>(&runner).racers[0].speed_sum, 150.0);
}

#[test]
fn radar_fast_enough_passes() {
    let config = race_config(straight(60.0), vec![player_at(0.0, 0.0)], VariantConfig::RadarChallenge {
        time_limit_ms: None,
    });
    let (mut runner, mut host) = start(&config, 1, 70.0);

    assert_eq!(runner.run_to_end(&mut host, 2000), Some(true));
    assert_eq!(race_of::<RadarChallenge>(&runner).racers[0].speed_sum, 210.0);
    assert!(host.texts().iter().any(|(m, _)| m.raw && m.key.starts_with("RADAR ")));
}

#[test]
fn radar_time_limit_runs_out() {
    let config = race_config(straight(60.0), vec![player_at(0.0, 0.0)], VariantConfig::RadarChallenge {
        time_limit_ms: Some(5000),
    });
    let (mut runner, mut host) = start(&config, 1, 10.0);

    assert_eq!(runner.run_to_end(&mut host, 2000), Some(false));
    assert_eq!(fail_key(&runner), Some("race.out_of_time"));
}

// ── Timed checkpoints ──────────────────────────────────────────────

fn timed_square() -> Vec<mission_core::route::RouteNode> {
    square(30.0).into_iter().map(|n| n.with_time_budget(5000)).collect()
}

#[test]
fn timed_checkpoints_extend_the_clock() {
    let config = race_config(timed_square(), vec![player_at(4.0, -10.0)], VariantConfig::TimedCheckpoint {
        laps:            2,
        initial_time_ms: 8000,
    });
    let (mut runner, mut host) = start(&config, 1, 30.0);

    assert_eq!(runner.run_to_end(&mut host, 3000), Some(true));
    let extensions = runner.journal().events_of("time_budget_extended").unwrap();
    assert_eq!(extensions.len(), 8);
    for event in &extensions {
        let MissionEvent::TimeBudgetExtended { added_ms, remaining_ms, .. } = event else {
            panic!("unexpected event {event:?}");
        };
        assert_eq!(*added_ms, 5000);
        assert!(*remaining_ms > 5000, "only {remaining_ms}ms left after an extension");
    }
}

#[test]
fn timed_checkpoints_run_out() {
    let config = race_config(timed_square(), vec![player_at(4.0, -10.0)], VariantConfig::TimedCheckpoint {
        laps:            2,
        initial_time_ms: 8000,
    });
    let (mut runner, mut host) = start(&config, 1, 5.0);
    run_to_green::<TimedCheckpointRace>(&mut runner, &mut host);
    let green = frame(&host);

    assert_eq!(runner.run_to_end(&mut host, 3000), Some(false));
    assert_eq!(fail_key(&runner), Some("race.out_of_time"));
    assert_eq!(runner.journal().count_of("checkpoint_passed"), 0);
    let failed_after_ms = (frame(&host) - green) * host.clock().frame_ms;
    assert!(failed_after_ms >= 8000, "ran out after {failed_after_ms}ms");
}

// ── Wanted challenge ───────────────────────────────────────────────

fn wanted_stage(runner: &mission_core::MissionRunner) -> WantedStage {
    runner
        .mission_as::<RaceMission<WantedChallenge>>()
        .unwrap()
        .variant()
        .stage()
}

/// Hold two stars for two seconds in one go, then lose them.
#[test]
fn wanted_level_held_then_cleared() {
    let config = race_config(
        vec![checkpoint(0.0, 100.0, 20.0)],
        vec![player_at(0.0, 0.0)],
        VariantConfig::WantedChallenge { min_level: 2, hold_ms: 2000, clear_after: true },
    );
    let (mut runner, mut host) = start(&config, 1, 0.0);
    run_to_green::<WantedChallenge>(&mut runner, &mut host);
    assert!(host.checkpoint().is_none(), "no checkpoint marker without checkpoints");

    host.set_wanted_level(3);
    runner.run_ticks(&mut host, 30);
    assert!(matches!(wanted_stage(&runner), WantedStage::Holding { since: Some(_) }));

    // Dropping below the threshold starts the hold over.
    host.set_wanted_level(1);
    runner.run_ticks(&mut host, 1);
    assert_eq!(wanted_stage(&runner), WantedStage::Holding { since: None });

    host.set_wanted_level(2);
    runner.run_ticks(&mut host, 30);
    assert!(matches!(wanted_stage(&runner), WantedStage::Holding { since: Some(_) }));
    runner.run_ticks(&mut host, 40);
    assert_eq!(wanted_stage(&runner), WantedStage::Clearing);
    assert_eq!(runner.outcome(), None);

    runner.run_ticks(&mut host, 30);
    assert_eq!(runner.outcome(), None, "must lose the stars before passing");

    host.set_wanted_level(0);
    assert_eq!(runner.run_to_end(&mut host, 10), Some(true));
    assert_eq!(runner.journal().count_of("checkpoint_passed"), 0);
}

#[test]
fn wanted_level_hold_without_clearing_passes_immediately() {
    let config = race_config(
        vec![checkpoint(0.0, 100.0, 20.0)],
        vec![player_at(0.0, 0.0)],
        VariantConfig::WantedChallenge { min_level: 1, hold_ms: 1000, clear_after: false },
    );
    let (mut runner, mut host) = start(&config, 1, 0.0);
    run_to_green::<WantedChallenge>(&mut runner, &mut host);

    host.set_wanted_level(4);
    assert_eq!(runner.run_to_end(&mut host, 60), Some(true));
}

/// Opponents in a wanted challenge drive the route but never score it.
#[test]
fn wanted_challenge_opponents_loop_without_scoring() {
    let config = race_config(
        square(20.0),
        vec![player_at(4.0, 0.0), rival_at("tail", -4.0, 0.0, 1.0)],
        VariantConfig::WantedChallenge { min_level: 2, hold_ms: 2000, clear_after: false },
    );
    let (mut runner, mut host) = start(&config, 1, 0.0);
    run_to_green::<WantedChallenge>(&mut runner, &mut host);

    runner.run_ticks(&mut host, 600);
    assert_eq!(runner.outcome(), None);
    assert_eq!(runner.journal().count_of("checkpoint_passed"), 0);
    assert_eq!(runner.journal().count_of("lap_completed"), 0);

    let rival = &race_of::<WantedChallenge>(&runner).racers[1];
    assert!(rival.last_node.is_some(), "rival never reached a node");
    assert_eq!(rival.lap, 0);
    assert_eq!(rival.speed_sum, 0.0);
    assert!(!rival.finished);
}
