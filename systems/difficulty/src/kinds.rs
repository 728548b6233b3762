use std::collections::VecDeque;

use adaptive_play_core::{ConfigError, DeterministicRng, Outcome, TargetKind};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::SpawnMix;

const MAX_MEMORY: usize = 32;

/// Kinds the external spawner may be asked for, in draw order.
pub const SPAWNABLE_KINDS: [TargetKind; 5] = [
    TargetKind::Normal,
    TargetKind::Decoy,
    TargetKind::Bomb,
    TargetKind::Heal,
    TargetKind::Shield,
];

/// Tunables for [`KindPicker`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KindPickerConfig {
    /// Number of recent picks remembered.
    pub memory: usize,
    /// Weight factor applied once for every remembered pick of the same kind.
    pub repeat_penalty: f64,
    /// Consecutive bombs after which bombs are damped.
    pub max_bomb_streak: u32,
    /// Bomb weight factor once the bomb streak cap is reached.
    pub bomb_streak_damp: f64,
    /// Consecutive decoys after which decoys are damped.
    pub max_decoy_streak: u32,
    /// Decoy weight factor once the decoy streak cap is reached.
    pub decoy_streak_damp: f64,
    /// Natural log of the largest weight factor a learned bias can apply.
    pub bias_span: f64,
}

impl Default for KindPickerConfig {
    fn default() -> Self {
        Self {
            memory: 7,
            repeat_penalty: 0.55,
            max_bomb_streak: 1,
            bomb_streak_damp: 0.15,
            max_decoy_streak: 2,
            decoy_streak_damp: 0.20,
            bias_span: 0.5,
        }
    }
}

impl KindPickerConfig {
    /// Checks the memory size, the streak caps and every factor.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.memory > MAX_MEMORY {
            return Err(ConfigError::CountOutOfRange {
                name: "memory",
                value: self.memory,
                min: 0,
                max: MAX_MEMORY,
            });
        }
        for (name, value) in [
            ("max_bomb_streak", self.max_bomb_streak),
            ("max_decoy_streak", self.max_decoy_streak),
        ] {
            if value == 0 {
                return Err(ConfigError::CountOutOfRange {
                    name,
                    value: 0,
                    min: 1,
                    max: u32::MAX as usize,
                });
            }
        }
        for (name, value) in [
            ("repeat_penalty", self.repeat_penalty),
            ("bomb_streak_damp", self.bomb_streak_damp),
            ("decoy_streak_damp", self.decoy_streak_damp),
            ("bias_span", self.bias_span),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::FractionOutOfRange { name, value });
            }
        }
        Ok(())
    }
}

/// Chooses the kind of each spawn from a [`SpawnMix`], keeping kinds from
/// clumping together.
///
/// Every remembered pick of a kind multiplies its weight by
/// `repeat_penalty`, and bombs or decoys that reached their streak cap are
/// damped hard. On top of that each kind carries a bias in `[-1, 1]` that
/// drifts toward `+1` while the player handles that kind well and toward `-1`
/// while they fail it, at the director's `bias_lr`. A bias `b` scales the
/// weight by `exp(bias_span * b)`.
#[derive(Clone, Debug)]
pub struct KindPicker {
    config: KindPickerConfig,
    recent: VecDeque<TargetKind>,
    bomb_streak: u32,
    decoy_streak: u32,
    bias: [f64; SPAWNABLE_KINDS.len()],
}

impl KindPicker {
    /// Creates a picker with no memory and neutral biases.
    pub fn new(config: KindPickerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            recent: VecDeque::with_capacity(config.memory),
            bomb_streak: 0,
            decoy_streak: 0,
            bias: [0.0; SPAWNABLE_KINDS.len()],
        })
    }

    /// Configuration the picker was built with.
    #[must_use]
    pub const fn config(&self) -> &KindPickerConfig {
        &self.config
    }

    /// Recent picks, oldest first.
    pub fn recent(&self) -> impl Iterator<Item = TargetKind> + '_ {
        self.recent.iter().copied()
    }

    /// Consecutive bombs picked most recently.
    #[must_use]
    pub const fn bomb_streak(&self) -> u32 {
        self.bomb_streak
    }

    /// Consecutive decoys picked most recently.
    #[must_use]
    pub const fn decoy_streak(&self) -> u32 {
        self.decoy_streak
    }

    /// Learned bias of `kind`; bosses are never picked and report zero.
    #[must_use]
    pub fn bias(&self, kind: TargetKind) -> f64 {
        slot(kind).map_or(0.0, |index| self.bias[index])
    }

    /// Effective weight of every spawnable kind for the next pick.
    #[must_use]
    pub fn weights(&self, mix: &SpawnMix) -> [(TargetKind, f64); SPAWNABLE_KINDS.len()] {
        let mut weights = [(TargetKind::Normal, 0.0); SPAWNABLE_KINDS.len()];
        for (index, kind) in SPAWNABLE_KINDS.into_iter().enumerate() {
            weights[index] = (kind, self.weight(index, kind, mix));
        }
        weights
    }

    /// Picks the next kind with a single draw from `rng` and remembers it.
    ///
    /// Falls back to [`TargetKind::Normal`] without drawing when every weight
    /// is zero.
    pub fn choose<R>(&mut self, rng: &mut R, mix: &SpawnMix) -> TargetKind
    where
        R: DeterministicRng,
    {
        let kind = rng
            .pick_weighted(&self.weights(mix))
            .unwrap_or(TargetKind::Normal);
        self.remember(kind);
        kind
    }

    /// Moves the bias of `kind` toward the result of the player's attempt.
    ///
    /// `rate` is the director's `bias_lr`; a zero rate leaves the bias alone.
    pub fn observe(&mut self, kind: TargetKind, outcome: Outcome, rate: f64) {
        let Some(index) = slot(kind) else {
            return;
        };
        let rate = if rate.is_finite() {
            rate.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let target = if outcome.is_hit() { 1.0 } else { -1.0 };
        let bias = &mut self.bias[index];
        *bias += (target - *bias) * rate;
        trace!(?kind, ?outcome, rate, bias = *bias, "kind bias adapted");
    }

    /// Forgets every pick and restores neutral biases.
    pub fn reset(&mut self) {
        self.recent.clear();
        self.bomb_streak = 0;
        self.decoy_streak = 0;
        self.bias = [0.0; SPAWNABLE_KINDS.len()];
    }

    fn weight(&self, index: usize, kind: TargetKind, mix: &SpawnMix) -> f64 {
        let repeats = self.recent.iter().filter(|recent| **recent == kind).count();
        let mut weight = f64::from(mix.weight(kind))
            * self.config.repeat_penalty.powi(repeats as i32)
            * (self.config.bias_span * self.bias[index]).exp();
        if kind == TargetKind::Bomb && self.bomb_streak >= self.config.max_bomb_streak {
            weight *= self.config.bomb_streak_damp;
        }
        if kind == TargetKind::Decoy && self.decoy_streak >= self.config.max_decoy_streak {
            weight *= self.config.decoy_streak_damp;
        }
        weight
    }

    fn remember(&mut self, kind: TargetKind) {
        self.bomb_streak = if kind == TargetKind::Bomb {
            self.bomb_streak.saturating_add(1)
        } else {
            0
        };
        self.decoy_streak = if kind == TargetKind::Decoy {
            self.decoy_streak.saturating_add(1)
        } else {
            0
        };
        if self.config.memory == 0 {
            return;
        }
        if self.recent.len() == self.config.memory {
            let _ = self.recent.pop_front();
        }
        self.recent.push_back(kind);
    }
}

fn slot(kind: TargetKind) -> Option<usize> {
    SPAWNABLE_KINDS.iter().position(|spawnable| *spawnable == kind)
}
