//! mission-runner: runs one race definition against the headless host.
//!
//! Usage:
//!   mission-runner --route data/routes/circuit.json --seed 12345 --ticks 20000
//!   mission-runner --route data/routes/sprint.json --journal run.json
//!   mission-runner --seed 12345 --ipc-mode

use anyhow::{Context, Result};
use mission_core::{
    config::RaceConfig,
    headless_host::HeadlessHost,
    host::{Host, PlayerState},
    mission::MissionRunner,
    race_from_config,
    snapshot::RaceSnapshot,
    types::{Tick, Vec3},
};
use std::env;
use std::io::{self, BufRead, Write};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetState,
    Tick {
        count: u64,
    },
    Command {
        cmd: String,
        payload: serde_json::Value,
    },
    Quit,
}

#[derive(serde::Serialize)]
struct UiState {
    tick:          Tick,
    phase:         &'static str,
    outcome:       Option<bool>,
    fail_reason:   Option<String>,
    journal_len:   usize,
    wanted_level:  u8,
    standings:     Vec<mission_core::snapshot::StandingEntry>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let ticks = parse_arg(&args, "--ticks", 20_000u64);
    let player_speed = parse_arg(&args, "--player-speed", 30.0f32);
    let jitter = parse_arg(&args, "--pace-jitter", 0.1f32);
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let route = string_arg(&args, "--route");
    let journal_out = string_arg(&args, "--journal");

    let config = match route {
        Some(path) => RaceConfig::load(path)?,
        None => RaceConfig::default_test(),
    };
    let run_id = format!("race-{seed}-{}", uuid::Uuid::new_v4());

    if !ipc_mode {
        println!("mission-runner");
        println!("  started:   {}", chrono::Utc::now().to_rfc3339());
        println!("  run_id:    {run_id}");
        println!("  route:     {}", route.unwrap_or("(built-in test circuit)"));
        println!("  mission:   {}", config.settings.title);
        println!("  seed:      {seed}");
        println!("  max ticks: {ticks}");
        println!();
    }

    let mission = race_from_config(&config).context("building race mission")?;
    let mut runner = MissionRunner::from_boxed(run_id.clone(), mission);

    let mut host = HeadlessHost::new(seed);
    host.set_pace_jitter(jitter);
    let lap: Vec<Vec3> = config.route.iter().map(|n| n.position).collect();
    host.set_autopilot(lap, player_speed);

    if ipc_mode {
        run_ipc_loop(&mut runner, &mut host)?;
    } else {
        runner.run_to_end(&mut host, ticks);
        print_summary(&runner, &host)?;
    }

    if let Some(path) = journal_out {
        runner
            .journal()
            .write_to(path)
            .with_context(|| format!("writing journal to {path}"))?;
        if !ipc_mode {
            println!("  journal:   {path}");
        }
    }

    Ok(())
}

fn run_ipc_loop(runner: &mut MissionRunner, host: &mut HeadlessHost) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                let err_json = serde_json::json!({ "error": e.to_string() });
                writeln!(stdout, "{}", err_json)?;
                stdout.flush()?;
                continue;
            }
        };

        match cmd {
            IpcCommand::Quit => break,
            IpcCommand::Tick { count } => {
                runner.run_ticks(host, count);
            }
            IpcCommand::GetState => {}
            IpcCommand::Command { cmd, payload } => handle_command(host, &cmd, payload),
        }
        let state = build_ui_state(runner, host)?;
        writeln!(stdout, "{}", serde_json::to_string(&state)?)?;
        stdout.flush()?;
    }
    Ok(())
}

fn handle_command(host: &mut HeadlessHost, cmd: &str, payload: serde_json::Value) {
    match cmd {
        "skip" => host.set_skip(payload["pressed"].as_bool().unwrap_or(true)),
        "set_wanted" => {
            let level = payload["level"].as_u64().unwrap_or(0).min(u8::MAX as u64) as u8;
            host.set_wanted_level(level);
        }
        "player_state" => {
            let state = match payload["state"].as_str().unwrap_or("playing") {
                "dead" => PlayerState::Dead,
                "arrested" => PlayerState::Arrested,
                "disconnected" => PlayerState::Disconnected,
                _ => PlayerState::Playing,
            };
            host.set_player_state(state);
        }
        "stop_autopilot" => host.stop_autopilot(),
        _ => log::warn!("Unknown command: {}", cmd),
    }
}

fn build_ui_state(runner: &MissionRunner, host: &HeadlessHost) -> Result<UiState> {
    let tick = host.clock().frame;
    let standings = match runner.journal().latest_snapshot_before(tick) {
        Some((_, json)) => RaceSnapshot::from_json(json)?.standings,
        None => Vec::new(),
    };
    Ok(UiState {
        tick,
        phase: runner.phase().name(),
        outcome: runner.outcome(),
        fail_reason: runner.fail_reason().map(|r| r.key.clone()),
        journal_len: runner.journal().len(),
        wanted_level: host.wanted_level(),
        standings,
    })
}

fn print_summary(runner: &MissionRunner, host: &HeadlessHost) -> Result<()> {
    let journal = runner.journal();
    let outcome = match runner.outcome() {
        Some(true) => "PASSED",
        Some(false) => "FAILED",
        None => "UNFINISHED",
    };

    println!("=== RUN SUMMARY ===");
    println!("  run_id:       {}", journal.run_id());
    println!("  final tick:   {}", host.clock().frame);
    println!("  game time:    {:.1}s", host.clock().now() as f64 / 1000.0);
    println!("  phase:        {}", runner.phase().name());
    println!("  outcome:      {outcome}");
    if let Some(reason) = runner.fail_reason() {
        println!("  reason:       {}", reason.key);
    }
    println!("  events:       {}", journal.len());
    println!("  checkpoints:  {}", journal.count_of("checkpoint_passed"));
    println!("  laps:         {}", journal.count_of("lap_completed"));
    println!("  knockouts:    {}", journal.count_of("racer_knocked_out"));
    println!("  recoveries:   {}", journal.count_of("racer_recovered"));
    println!("  snapshots:    {}", journal.snapshot_count());

    if let Some((tick, json)) = journal.latest_snapshot_before(host.clock().frame) {
        let snapshot = RaceSnapshot::from_json(json)?;
        println!();
        println!("=== STANDINGS (tick {tick}) ===");
        let mut standings = snapshot.standings;
        standings.sort_by_key(|s| s.position);
        for s in &standings {
            println!(
                "  {}. {:<12} lap {} | speed sum {:.0}{}",
                s.position,
                s.name,
                s.lap,
                s.speed_sum,
                if s.knocked_out { " | OUT" } else { "" }
            );
        }
    }
    Ok(())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn string_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}
