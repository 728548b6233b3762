use serde::{Deserialize, Serialize};

use crate::Phase;

/// Scripted boss attack selectable by the pattern director.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BossAttackKind {
    /// Burst of rapid spawns swirling around the arena.
    Storm,
    /// Misleading telegraph the player must not react to.
    Feint,
    /// Shield that breaks after a number of consecutive successes.
    ShieldBreak,
}

impl BossAttackKind {
    /// Reports whether the attack completes through player successes.
    #[must_use]
    pub const fn is_progress(self) -> bool {
        matches!(self, Self::ShieldBreak)
    }
}

/// Snapshot of an attack that is currently running.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveAttack {
    /// Attack being executed.
    pub kind: BossAttackKind,
    /// Session time at which the attack started.
    pub started_at: u64,
    /// Session time at which the attack expires.
    pub ends_at: u64,
    /// Successes collected so far.
    pub progress: u32,
    /// Successes needed to complete; zero for timed attacks.
    pub needed: u32,
}

/// State machine describing the boss attack script.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BossAttackState {
    /// No attack is running.
    #[default]
    Idle,
    /// An attack is running.
    Active(ActiveAttack),
}

impl BossAttackState {
    /// Returns the running attack, if any.
    #[must_use]
    pub const fn active(&self) -> Option<&ActiveAttack> {
        match self {
            Self::Idle => None,
            Self::Active(attack) => Some(attack),
        }
    }
}

/// Lifecycle notifications emitted by the boss attack script.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BossAttackLifecycleEvent {
    /// An attack began.
    Started {
        /// Attack that began.
        kind: BossAttackKind,
    },
    /// A progress attack collected another success or was reset to zero.
    Progress {
        /// Successes collected so far.
        got: u32,
        /// Successes required.
        need: u32,
    },
    /// A progress attack collected every required success.
    Completed {
        /// Attack that completed.
        kind: BossAttackKind,
    },
    /// An attack ran out of time.
    Expired {
        /// Attack that expired.
        kind: BossAttackKind,
    },
    /// An attack was aborted by a wrong player action.
    Reset {
        /// Attack that was aborted.
        kind: BossAttackKind,
    },
}

/// Phase and boss context supplied by the game loop every tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseSignal {
    /// Current session phase.
    pub phase: Phase,
    /// Whether the boss is on screen.
    pub boss_active: bool,
}

/// Spatial arrangement used to place the next spawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpawnPattern {
    /// Anywhere inside the safe area.
    Uniform,
    /// One of nine fixed grid slots.
    Grid9,
    /// Evenly spaced points on a ring.
    Ring,
    /// Spiral sweep used during storms.
    StormSwirl,
    /// Tight cluster around the boss.
    BossBurst,
}

/// Placement instruction for the external spawner in normalised arena coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpawnDirective {
    /// Pattern the position was derived from.
    pub pattern: SpawnPattern,
    /// Spawn step this directive belongs to.
    pub step: u64,
    /// Horizontal position in `[0, 1]`.
    pub x: f64,
    /// Vertical position in `[0, 1]`.
    pub y: f64,
}
