#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative session that owns every adaptive component of one run.
//!
//! The session is the only place where state changes. The game loop feeds it
//! [`Command`] values through [`apply`], the session threads snapshots between
//! the telemetry window, the fatigue estimator, the skill model and the two
//! directors in a fixed order, and every decision it takes is reported as an
//! [`Event`]. All randomness comes from one [`SeededRng`] so a seed and a
//! command script fully determine the event log.
//!
//! Draws happen in one order: the skill model takes its initial weights at
//! construction, every `Tick` lets the boss attack script draw, and every
//! `PlanSpawn` spends its placement draws before the single kind draw.

use std::{fs, io, path::Path, path::PathBuf};

use adaptive_play_core::{
    Command, ConfigError, DifficultyPreset, DirectorOutput, Event, Outcome, OutcomeEvent,
    PhaseSignal, SeededRng, SessionMode,
};
use adaptive_play_system_difficulty::{
    DifficultyDirector, DirectorConfig, DirectorInputs, KindPicker, KindPickerConfig, SpawnMix,
    SpawnTiming,
};
use adaptive_play_system_fatigue::{
    FatigueConfig, FatigueFocusEstimator, FatigueFocusSnapshot, MissKind, StepContext,
};
use adaptive_play_system_patterns::{
    PatternConfig, PatternDirector, SpacingConfig, SpawnContext, SpawnSpacing,
};
use adaptive_play_system_skill::{SkillConfig, SkillContext, SkillModel, SkillPredictor};
use adaptive_play_system_telemetry::{AggregatorConfig, TelemetryAggregator};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Seed used when a configuration does not name one.
pub const DEFAULT_SESSION_SEED: &str = "adaptive-play";

/// Failures raised while loading or building a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A component rejected its configuration.
    #[error("invalid session configuration: {0}")]
    Config(#[from] ConfigError),
    /// The configuration text is not valid TOML for [`SessionConfig`].
    #[error("failed to parse session configuration: {0}")]
    Parse(#[from] toml::de::Error),
    /// The configuration file could not be read.
    #[error("failed to read session configuration from {path}")]
    Io {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
}

/// Everything needed to open a session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Seed string hashed into the session RNG.
    pub seed: String,
    /// Whether the session may adapt.
    pub mode: SessionMode,
    /// Baseline difficulty chosen by the player.
    pub base_difficulty: DifficultyPreset,
    /// Rolling telemetry window.
    pub telemetry: AggregatorConfig,
    /// Fatigue and focus estimator.
    pub fatigue: FatigueConfig,
    /// Online skill model.
    pub skill: SkillConfig,
    /// Difficulty director, including the output bounds.
    pub director: DirectorConfig,
    /// Boss attack script.
    pub patterns: PatternConfig,
    /// Spacing of free spawn positions.
    pub spacing: SpacingConfig,
    /// Memory and streak caps of the spawn kind draw.
    pub kinds: KindPickerConfig,
    /// Spawn timings the director output is applied to.
    pub spawn_timing: SpawnTiming,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SESSION_SEED.to_owned(),
            mode: SessionMode::default(),
            base_difficulty: DifficultyPreset::default(),
            telemetry: AggregatorConfig::default(),
            fatigue: FatigueConfig::default(),
            skill: SkillConfig::default(),
            director: DirectorConfig::default(),
            patterns: PatternConfig::default(),
            spacing: SpacingConfig::default(),
            kinds: KindPickerConfig::default(),
            spawn_timing: SpawnTiming::default(),
        }
    }
}

impl SessionConfig {
    /// Parses a configuration from TOML text and validates it.
    pub fn from_toml_str(text: &str) -> Result<Self, SessionError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML configuration file.
    pub fn from_toml_path(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| SessionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Validates the configuration of every component.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.telemetry.validate()?;
        self.fatigue.validate()?;
        self.skill.validate()?;
        self.director.validate()?;
        self.patterns.validate()?;
        self.spacing.validate()?;
        self.kinds.validate()
    }
}

/// One adaptive run.
#[derive(Clone, Debug)]
pub struct Session {
    config: SessionConfig,
    rng: SeededRng,
    rng_after_build: SeededRng,
    skill: SkillModel,
    telemetry: TelemetryAggregator,
    fatigue: FatigueFocusEstimator,
    director: DifficultyDirector,
    patterns: PatternDirector,
    spacing: SpawnSpacing,
    kinds: KindPicker,
    now_ms: u64,
    signal: PhaseSignal,
    fever_on: bool,
    spawn_step: u64,
}

impl Session {
    /// Builds every component in draw order: the RNG, the skill model, the
    /// telemetry window, the estimator, both directors and the spawn planners.
    pub fn new(config: SessionConfig) -> Result<Self, SessionError> {
        let mut rng = SeededRng::seed(&config.seed);
        let skill = SkillModel::new(config.skill, &mut rng)?;
        let rng_after_build = rng.clone();
        let telemetry = TelemetryAggregator::new(config.telemetry)?;
        let fatigue = FatigueFocusEstimator::new(config.fatigue)?;
        let director = DifficultyDirector::new(config.director)?;
        let patterns = PatternDirector::new(config.patterns)?;
        let spacing = SpawnSpacing::new(config.spacing)?;
        let kinds = KindPicker::new(config.kinds)?;

        debug!(
            seed = %config.seed,
            mode = ?config.mode,
            model = ?skill.kind(),
            "session opened"
        );

        Ok(Self {
            config,
            rng,
            rng_after_build,
            skill,
            telemetry,
            fatigue,
            director,
            patterns,
            spacing,
            kinds,
            now_ms: 0,
            signal: PhaseSignal::default(),
            fever_on: false,
            spawn_step: 0,
        })
    }

    /// Configuration the session was opened with.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn fatigue_event(&self) -> Event {
        let FatigueFocusSnapshot { fatigue, focus } = self.fatigue.snapshot();
        Event::FatigueChanged { fatigue, focus }
    }

    fn record_outcome(&mut self, event: OutcomeEvent, out_events: &mut Vec<Event>) {
        let outcome = event.outcome();
        let target = event.target_kind();
        let mut ctx = SkillContext::from_event(&event, self.config.base_difficulty);
        ctx.boss_active |= self.signal.boss_active;
        self.fever_on = event.fever_active();

        self.telemetry.push(event);
        match outcome {
            Outcome::Hit => self.fatigue.on_hit(ctx.reaction_time_ms),
            Outcome::Timeout => self.fatigue.on_miss(MissKind::Timeout),
            Outcome::Miss | Outcome::Bomb => self.fatigue.on_miss(MissKind::Other),
        }
        let probability = self.skill.train(&ctx, outcome.is_hit());
        self.kinds
            .observe(target, outcome, self.director.previous().bias_lr);

        out_events.push(Event::OutcomeRecorded {
            outcome,
            probability,
            confidence: self.skill.confidence(),
        });
        out_events.push(self.fatigue_event());
    }

    fn tick(&mut self, now_ms: u64, dt_s: f64, signal: PhaseSignal, out_events: &mut Vec<Event>) {
        self.now_ms = now_ms;
        self.signal = signal;

        let stats = self.telemetry.snapshot();
        let before = self.fatigue.snapshot();
        self.fatigue.step(
            dt_s,
            StepContext {
                low_hp: stats.low_hp,
                fever_on: self.fever_on,
            },
        );
        if self.fatigue.snapshot() != before {
            out_events.push(self.fatigue_event());
        }

        let output = self.director.update(DirectorInputs {
            now_ms,
            skill: self.skill.last_probability(),
            confidence: self.skill.confidence(),
            telemetry: &stats,
            fatigue: self.fatigue.state().fatigue,
            base_difficulty: self.config.base_difficulty,
            mode: self.config.mode,
        });
        out_events.push(Event::DirectorUpdated {
            output,
            refreshed: self.director.refreshed(),
        });

        let tick = self.patterns.tick(now_ms, signal, &mut self.rng);
        out_events.extend(
            tick.lifecycle_events()
                .into_iter()
                .map(|event| Event::BossAttack { event }),
        );
    }

    /// Placement draws come first, then the single kind draw.
    fn plan_spawn(&mut self, out_events: &mut Vec<Event>) {
        let output = self.director.previous();
        let ctx = SpawnContext {
            boss_active: self.signal.boss_active,
            storm_active: self.patterns.storm_active(),
            research: self.config.mode.is_research(),
            remix: output.remix,
        };
        let directive = self.spacing.place(&mut self.rng, self.spawn_step, ctx);
        let kind = self
            .kinds
            .choose(&mut self.rng, &SpawnMix::from_output(&output));
        self.spawn_step += 1;
        out_events.push(Event::SpawnPlanned { directive, kind });
    }

    fn reset(&mut self, out_events: &mut Vec<Event>) {
        self.rng = self.rng_after_build.clone();
        self.skill.reset();
        self.telemetry.reset();
        self.fatigue.reset();
        self.director.reset();
        self.patterns.reset();
        self.spacing.reset();
        self.kinds.reset();
        self.now_ms = 0;
        self.signal = PhaseSignal::default();
        self.fever_on = false;
        self.spawn_step = 0;

        info!(seed = %self.config.seed, "session reset");
        out_events.push(Event::SessionReset);
    }
}

/// Applies the provided command to the session, mutating state deterministically.
pub fn apply(session: &mut Session, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::RecordOutcome { event } => session.record_outcome(event, out_events),
        Command::Stabilize => {
            session.fatigue.on_stabilize();
            out_events.push(session.fatigue_event());
        }
        Command::Tick {
            now_ms,
            dt,
            signal,
        } => {
            out_events.push(Event::TimeAdvanced { now_ms, dt });
            session.tick(now_ms, dt.as_secs_f64(), signal, out_events);
        }
        Command::PlanSpawn => session.plan_spawn(out_events),
        Command::PlayerSuccess => {
            let mut lifecycle = Vec::new();
            session
                .patterns
                .on_player_success(session.now_ms, &mut lifecycle);
            out_events.extend(lifecycle.into_iter().map(|event| Event::BossAttack { event }));
        }
        Command::WrongAction => {
            let mut lifecycle = Vec::new();
            session
                .patterns
                .on_wrong_action(session.now_ms, &mut lifecycle);
            out_events.extend(lifecycle.into_iter().map(|event| Event::BossAttack { event }));
        }
        Command::Reset => session.reset(out_events),
    }
}

/// Query functions that provide read-only access to the session state.
pub mod query {
    use super::Session;
    use adaptive_play_core::{BossAttackState, DirectorOutput, SessionMode, Stats};
    use adaptive_play_system_difficulty::{IntensityBand, KindPicker, SpawnMix, SpawnTiming};
    use adaptive_play_system_fatigue::{FatigueFocusSnapshot, FatigueFocusState};
    use adaptive_play_system_skill::SkillPredictor;

    /// Rolling statistics over the current telemetry window.
    #[must_use]
    pub fn stats(session: &Session) -> Stats {
        session.telemetry.snapshot()
    }

    /// Number of events held by the telemetry window.
    #[must_use]
    pub fn window_len(session: &Session) -> usize {
        session.telemetry.len()
    }

    /// Current fatigue and focus.
    #[must_use]
    pub const fn fatigue(session: &Session) -> FatigueFocusSnapshot {
        session.fatigue.snapshot()
    }

    /// Full estimator state including streaks.
    #[must_use]
    pub const fn fatigue_state(session: &Session) -> &FatigueFocusState {
        session.fatigue.state()
    }

    /// Most recent difficulty director output.
    #[must_use]
    pub const fn director_output(session: &Session) -> DirectorOutput {
        session.director.previous()
    }

    /// Target-kind weights derived from the current director output.
    #[must_use]
    pub fn spawn_mix(session: &Session) -> SpawnMix {
        SpawnMix::from_output(&session.director.previous())
    }

    /// Configured spawn timings adjusted by the current director output.
    #[must_use]
    pub fn spawn_timing(session: &Session) -> SpawnTiming {
        session
            .config
            .spawn_timing
            .adjusted(&session.director.previous())
    }

    /// Coarse label of the current director output.
    #[must_use]
    pub fn intensity_band(session: &Session) -> IntensityBand {
        IntensityBand::from_output(&session.director.previous())
    }

    /// Skill model confidence in `[0, 1]`.
    #[must_use]
    pub fn confidence(session: &Session) -> f64 {
        session.skill.confidence()
    }

    /// Hit probability reported by the last skill model step.
    #[must_use]
    pub fn last_probability(session: &Session) -> f64 {
        session.skill.last_probability()
    }

    /// Blend of rolling accuracy and reaction speed.
    #[must_use]
    pub fn skill_score(session: &Session) -> f64 {
        session.skill.skill_score()
    }

    /// Number of training steps taken by the skill model.
    #[must_use]
    pub fn training_steps(session: &Session) -> u64 {
        session.skill.learner().steps()
    }

    /// State of the boss attack script.
    #[must_use]
    pub const fn boss_attack(session: &Session) -> &BossAttackState {
        session.patterns.state()
    }

    /// Memory and learned biases of the spawn kind draw.
    #[must_use]
    pub const fn kind_picker(session: &Session) -> &KindPicker {
        &session.kinds
    }

    /// Step index the next planned spawn will use.
    #[must_use]
    pub const fn spawn_step(session: &Session) -> u64 {
        session.spawn_step
    }

    /// Session time of the last tick.
    #[must_use]
    pub const fn now_ms(session: &Session) -> u64 {
        session.now_ms
    }

    /// Mode the session runs in.
    #[must_use]
    pub const fn mode(session: &Session) -> SessionMode {
        session.config.mode
    }

    /// Internal state of the session RNG.
    #[must_use]
    pub const fn rng_state(session: &Session) -> u32 {
        session.rng.state()
    }
}

impl Session {
    /// Convenience wrapper around [`apply`] that returns the emitted events.
    pub fn apply(&mut self, command: Command) -> Vec<Event> {
        let mut out_events = Vec::new();
        apply(self, command, &mut out_events);
        out_events
    }

    /// Most recent difficulty director output.
    #[must_use]
    pub const fn output(&self) -> DirectorOutput {
        self.director.previous()
    }
}
