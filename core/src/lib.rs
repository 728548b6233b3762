#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the adaptive gameplay engine.
//!
//! This crate defines the message surface that connects the game loop, the
//! authoritative session, and pure systems. The game loop submits [`Command`]
//! values describing resolved player actions and clock ticks, the session
//! executes those commands via its `apply` entry point, and then broadcasts
//! [`Event`] values describing every decision it took. Systems never talk to
//! each other directly; the session threads immutable snapshots between them
//! in a fixed order.

use std::time::Duration;

use serde::{Deserialize, Serialize};

mod director;
mod error;
mod patterns;
mod rng;
mod telemetry;

pub use director::{DifficultyPreset, DirectorOutput, FieldBounds, OutputBounds, SessionMode};
pub use error::ConfigError;
pub use patterns::{
    ActiveAttack, BossAttackKind, BossAttackLifecycleEvent, BossAttackState, PhaseSignal,
    SpawnDirective, SpawnPattern,
};
pub use rng::{fnv1a32, DeterministicRng, SeededRng, DEFAULT_SEED};
pub use telemetry::{Outcome, OutcomeEvent, ParsePhaseError, Phase, Stats, TargetKind};

/// Commands that express every input the session accepts from the game loop.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Records the resolution of one player action.
    RecordOutcome {
        /// Telemetry describing the resolved action.
        event: OutcomeEvent,
    },
    /// Reports that the player recovered, for example by picking up a heal.
    Stabilize,
    /// Advances the session clock and lets the directors react.
    Tick {
        /// Session time after the tick, in milliseconds.
        now_ms: u64,
        /// Simulated time that elapsed since the previous tick.
        dt: Duration,
        /// Phase and boss context for this tick.
        signal: PhaseSignal,
    },
    /// Requests a placement and a target kind for the next spawn.
    PlanSpawn,
    /// Reports a successful action that counts toward a progress attack.
    PlayerSuccess,
    /// Reports a wrong action taken during a boss attack.
    WrongAction,
    /// Restores every component to its session-open state.
    Reset,
}

/// Events broadcast by the session after processing commands.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Event {
    /// Indicates that the session clock advanced.
    TimeAdvanced {
        /// Session time after the tick, in milliseconds.
        now_ms: u64,
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that an outcome was aggregated and used for training.
    OutcomeRecorded {
        /// Resolution that was recorded.
        outcome: Outcome,
        /// Hit probability predicted after the training step.
        probability: f64,
        /// Skill model confidence after the training step.
        confidence: f64,
    },
    /// Reports the fatigue and focus estimate after it changed.
    FatigueChanged {
        /// Fatigue estimate in `[0, 1]`.
        fatigue: f64,
        /// Focus estimate in `[0, 1]`.
        focus: f64,
    },
    /// Publishes the difficulty director output for this tick.
    DirectorUpdated {
        /// Bounded multipliers for the spawner.
        output: DirectorOutput,
        /// `false` when the director was rate limited and repeated its previous output.
        refreshed: bool,
    },
    /// Reports a boss attack lifecycle transition.
    BossAttack {
        /// Transition that occurred.
        event: BossAttackLifecycleEvent,
    },
    /// Provides the placement and kind for a requested spawn.
    SpawnPlanned {
        /// Placement instruction.
        directive: SpawnDirective,
        /// Kind of target to spawn there.
        kind: TargetKind,
    },
    /// Confirms that the session returned to its session-open state.
    SessionReset,
}
