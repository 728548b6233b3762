#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that drives an adaptive session headlessly.
//!
//! `simulate` plays a scripted player against a session and prints every
//! emitted event as one JSON object per line. `check-config` validates a TOML
//! session configuration and prints the effective values.

use std::{
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    time::Duration,
};

use adaptive_play_core::{
    BossAttackState, Command, DirectorOutput, Event, Outcome, Phase, PhaseSignal, SessionMode,
    Stats, TargetKind,
};
use adaptive_play_session::{apply, query, Session, SessionConfig};
use adaptive_play_system_difficulty::{IntensityBand, SpawnMix};
use adaptive_play_system_fatigue::FatigueFocusSnapshot;
use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod player;

use player::{Encounter, ScriptedPlayer};

/// Adaptive gameplay control core, driven from the terminal.
#[derive(Parser, Debug)]
#[command(name = "adaptive-play", version)]
struct Cli {
    /// Log filter used when `RUST_LOG` is unset.
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Plays a scripted player against a session and prints events as JSON lines.
    Simulate(SimulateArgs),
    /// Validates a session configuration file and prints the effective values.
    CheckConfig {
        /// TOML file to validate.
        path: PathBuf,
    },
}

#[derive(Args, Debug)]
struct SimulateArgs {
    /// TOML session configuration; defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides the session seed.
    #[arg(long)]
    seed: Option<String>,

    /// Overrides the session mode.
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Simulated session length in seconds.
    #[arg(long, default_value_t = 120)]
    duration_s: u64,

    /// Simulated frame length in milliseconds.
    #[arg(long, default_value_t = 100)]
    tick_ms: u64,

    /// Skill of the scripted player in [0, 1].
    #[arg(long, default_value_t = 0.7)]
    player_skill: f64,

    /// Seed of the scripted player.
    #[arg(long, default_value_t = 7)]
    player_seed: u64,

    /// Prints only the final summary instead of every event.
    #[arg(long)]
    summary_only: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeArg {
    Play,
    Practice,
    Research,
}

impl From<ModeArg> for SessionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Play => Self::Play,
            ModeArg::Practice => Self::Practice,
            ModeArg::Research => Self::Research,
        }
    }
}

/// Final state printed after a simulation.
#[derive(Serialize)]
struct Summary {
    seed: String,
    mode: SessionMode,
    spawns: u64,
    player_hp: f64,
    stats: Stats,
    fatigue: FatigueFocusSnapshot,
    output: DirectorOutput,
    band: IntensityBand,
    mix: SpawnMix,
    confidence: f64,
    last_probability: f64,
    skill_score: f64,
    boss_attack: BossAttackState,
}

/// Entry point for the adaptive play command-line interface.
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level)?;

    match cli.command {
        CliCommand::Simulate(args) => simulate(&args),
        CliCommand::CheckConfig { path } => check_config(&path),
    }
}

fn init_tracing(level: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .with_context(|| format!("invalid log filter `{level}`"))?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init()
        .map_err(|err| anyhow!("failed to install log subscriber: {err}"))
}

fn load_config(path: Option<&Path>) -> Result<SessionConfig> {
    match path {
        Some(path) => SessionConfig::from_toml_path(path)
            .with_context(|| format!("loading session config {}", path.display())),
        None => Ok(SessionConfig::default()),
    }
}

fn check_config(path: &Path) -> Result<()> {
    let config = load_config(Some(path))?;
    let _ = Session::new(config.clone()).context("building session")?;
    let rendered = serde_json::to_string_pretty(&config).context("rendering config")?;
    println!("{rendered}");
    Ok(())
}

fn phase_at(now_ms: u64, total_ms: u64) -> Phase {
    let third = total_ms / 3;
    if now_ms < third {
        Phase::Early
    } else if now_ms < 2 * third {
        Phase::Mid
    } else {
        Phase::Late
    }
}

fn simulate(args: &SimulateArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(seed) = &args.seed {
        config.seed = seed.clone();
    }
    if let Some(mode) = args.mode {
        config.mode = mode.into();
    }
    if args.tick_ms == 0 {
        return Err(anyhow!("--tick-ms must be positive"));
    }

    let mut session = Session::new(config.clone()).context("building session")?;
    let mut player = ScriptedPlayer::new(args.player_seed, args.player_skill);
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    let total_ms = args.duration_s.saturating_mul(1_000);
    let boss_from_ms = total_ms / 5 * 4;
    let dt = Duration::from_millis(args.tick_ms);
    let mut events = Vec::new();
    let mut next_spawn_at = 0_u64;
    let mut now_ms = 0_u64;

    info!(seed = %config.seed, mode = ?config.mode, total_ms, "simulation started");
    while now_ms < total_ms {
        now_ms = now_ms.saturating_add(args.tick_ms);
        let phase = phase_at(now_ms, total_ms);
        apply(
            &mut session,
            Command::Tick {
                now_ms,
                dt,
                signal: PhaseSignal {
                    phase,
                    boss_active: now_ms >= boss_from_ms,
                },
            },
            &mut events,
        );

        if now_ms >= next_spawn_at {
            let first_new = events.len();
            apply(&mut session, Command::PlanSpawn, &mut events);
            let planned = events[first_new..].iter().find_map(|event| match event {
                Event::SpawnPlanned { directive, kind } => Some((*directive, *kind)),
                _ => None,
            });

            if let Some((directive, target)) = planned {
                let output = query::director_output(&session);
                let timing = query::spawn_timing(&session);
                let event = player.resolve(
                    &Encounter {
                        now_ms,
                        target,
                        x: directive.x,
                        lifetime_ms: timing.target_lifetime_ms,
                        phase,
                    },
                    &output,
                    query::fatigue(&session).fatigue,
                );
                let outcome = event.outcome();
                apply(&mut session, Command::RecordOutcome { event }, &mut events);

                if query::boss_attack(&session).active().is_some() {
                    match outcome {
                        Outcome::Hit => apply(&mut session, Command::PlayerSuccess, &mut events),
                        Outcome::Bomb => apply(&mut session, Command::WrongAction, &mut events),
                        Outcome::Miss | Outcome::Timeout => {}
                    }
                }
                if outcome.is_hit() && target == TargetKind::Heal {
                    apply(&mut session, Command::Stabilize, &mut events);
                }
                next_spawn_at = now_ms
                    .saturating_add(player.next_gap(timing.interval_min_ms, timing.interval_max_ms));
            }
        }

        if !args.summary_only {
            for event in &events {
                serde_json::to_writer(&mut out, event).context("encoding event")?;
                writeln!(out).context("writing event")?;
            }
        }
        events.clear();
    }

    let summary = Summary {
        seed: config.seed.clone(),
        mode: config.mode,
        spawns: query::spawn_step(&session),
        player_hp: player.hp(),
        stats: query::stats(&session),
        fatigue: query::fatigue(&session),
        output: query::director_output(&session),
        band: query::intensity_band(&session),
        mix: query::spawn_mix(&session),
        confidence: query::confidence(&session),
        last_probability: query::last_probability(&session),
        skill_score: query::skill_score(&session),
        boss_attack: *query::boss_attack(&session),
    };
    info!(spawns = summary.spawns, band = ?summary.band, "simulation finished");
    serde_json::to_writer(&mut out, &summary).context("encoding summary")?;
    writeln!(out).context("writing summary")?;
    out.flush().context("flushing output")
}
