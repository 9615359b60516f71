use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use robot_arena_server::constants::MAX_TIMER_SECONDS;
use robot_arena_server::engine::{ArenaEngine, EngineOptions};
use robot_arena_server::rng::Rng;
use robot_arena_server::server_protocol::ArenaCommand;
use robot_arena_server::timer::{ManualTickDriver, TimerKind};
use robot_arena_server::types::{ArenaState, MainStatus, NewRobot, RankingItem, Robot};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Plays a whole bracket offline with manual ticks and random scores.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[arg(long, default_value_t = 6)]
    robots: usize,
    #[arg(long)]
    seed: Option<u32>,
    #[arg(long, default_value_t = 30)]
    match_seconds: u32,
    #[arg(long, default_value_t = 5)]
    recovery_seconds: u32,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize)]
struct MatchLine {
    #[serde(rename = "matchId")]
    match_id: String,
    round: String,
    #[serde(rename = "robotA")]
    robot_a: Option<String>,
    #[serde(rename = "robotB")]
    robot_b: Option<String>,
    #[serde(rename = "scoreA")]
    score_a: u32,
    #[serde(rename = "scoreB")]
    score_b: u32,
    winner: Option<String>,
    #[serde(rename = "secondsFought")]
    seconds_fought: u32,
    recoveries: u32,
}

#[derive(Clone, Debug, Serialize)]
struct Summary {
    seed: u32,
    robots: usize,
    rounds: usize,
    matches: usize,
    champion: Option<String>,
    ranking: Vec<RankingItem>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let seed = cli.seed.unwrap_or_else(rand::random);
    let options = EngineOptions {
        default_match_seconds: cli.match_seconds.min(MAX_TIMER_SECONDS),
        default_recovery_seconds: cli.recovery_seconds.min(MAX_TIMER_SECONDS),
        ..EngineOptions::default()
    };
    let mut engine = ArenaEngine::new(options, seed, Box::new(ManualTickDriver));
    let mut script = Rng::new(seed ^ 0x5eed_5eed);

    register_roster(&mut engine, cli.robots);
    engine.generate_tournament();
    info!(seed, robots = cli.robots, "simulation started");

    let lines = run_tournament(&mut engine, &mut script, match_budget(cli.robots))?;
    for line in &lines {
        println!("{}", serde_json::to_string(line)?);
    }

    let summary = build_summary(seed, engine.state());
    let encoded = serde_json::to_string_pretty(&summary)?;
    println!("{encoded}");
    if let Some(path) = cli.summary_out.as_ref() {
        write_summary(path, &encoded)?;
    }
    Ok(())
}

fn register_roster(engine: &mut ArenaEngine, count: usize) {
    for idx in 0..count {
        engine.register_robot(NewRobot {
            name: format!("Bot-{:02}", idx + 1),
            team: Some(format!("Team {}", (b'A' + (idx % 4) as u8) as char)),
            image: None,
        });
    }
}

/// Upper bound on matches a bracket of `robots` can schedule, byes included.
fn match_budget(robots: usize) -> usize {
    robots.max(2).next_power_of_two() * 2
}

fn run_tournament(
    engine: &mut ArenaEngine,
    script: &mut Rng,
    budget: usize,
) -> anyhow::Result<Vec<MatchLine>> {
    let mut lines = Vec::new();
    while let Some(match_id) = engine.state().current_match_id.clone() {
        if lines.len() >= budget {
            anyhow::bail!("tournament did not terminate after {} matches", lines.len());
        }
        lines.push(play_match(engine, script, &match_id));
    }
    Ok(lines)
}

fn build_summary(seed: u32, state: &ArenaState) -> Summary {
    let mut rounds: Vec<String> = state.matches.iter().map(|entry| entry.round.label()).collect();
    rounds.dedup();
    Summary {
        seed,
        robots: state.robots.len(),
        rounds: rounds.len(),
        matches: state.matches.len(),
        champion: state.winner.as_ref().map(|robot| robot.name.clone()),
        ranking: state.ranking.clone(),
    }
}

fn write_summary(path: &Path, encoded: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, encoded).with_context(|| format!("failed to write {}", path.display()))
}

fn play_match(engine: &mut ArenaEngine, script: &mut Rng, match_id: &str) -> MatchLine {
    let seconds = engine.options().default_match_seconds.min(MAX_TIMER_SECONDS);
    engine.apply(ArenaCommand::StartMatch {
        duration: Some(seconds),
    });
    let stop_after = script.int(seconds.min(3) as i32, seconds as i32) as u32;
    let mut fought = 0;
    let mut recoveries = 0;

    while engine.state().main_status != MainStatus::Finished && fought < stop_after {
        if !engine.state().recovery_active && script.bool(0.05) {
            engine.apply(ArenaCommand::StartRecovery { seconds: None });
            recoveries += 1;
        }
        let main = engine.armed_token(TimerKind::Main);
        let recovery = engine.armed_token(TimerKind::Recovery);
        if let Some(token) = main {
            if engine.handle_tick(token) {
                fought += 1;
            }
        }
        if let Some(token) = recovery {
            engine.handle_tick(token);
        }
    }
    if engine.state().main_status != MainStatus::Finished {
        engine.apply(ArenaCommand::EndMatch {
            match_id: Some(match_id.to_string()),
        });
    }

    let score_a = script.int(0, 5) as u32;
    let score_b = script.int(0, 5) as u32;
    engine.finalize_match(match_id, score_a, score_b);

    let entry = engine.state().find_match(match_id);
    let name_of = |robot: &Option<Robot>| robot.as_ref().map(|robot| robot.name.clone());
    MatchLine {
        match_id: match_id.to_string(),
        round: entry.map(|entry| entry.round.label()).unwrap_or_default(),
        robot_a: entry.and_then(|entry| name_of(&entry.robot_a)),
        robot_b: entry.and_then(|entry| name_of(&entry.robot_b)),
        score_a,
        score_b,
        winner: entry.and_then(|entry| name_of(&entry.winner)),
        seconds_fought: fought,
        recoveries,
    }
}
