use std::collections::VecDeque;

use adaptive_play_core::{ConfigError, DeterministicRng, SpawnDirective, SpawnPattern};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::spawn::{
    directive, free_pattern, next_spawn, place as place_shape, SpawnContext, CENTER, UNIFORM_MARGIN,
    UNIFORM_SPAN,
};

const MAX_MEMORY: usize = 32;
const CROWDED_SCORE: f64 = 0.35;

/// Tunables for [`SpawnSpacing`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpacingConfig {
    /// Candidates tried before the least crowded one is accepted.
    pub attempts: u32,
    /// Distance from every remembered spawn a candidate needs to be accepted at once.
    pub min_distance: f64,
    /// Chance that a candidate is drawn from the half opposite the last one.
    pub zone_bias: f64,
    /// Number of recent spawn positions remembered.
    pub memory: usize,
}

impl Default for SpacingConfig {
    fn default() -> Self {
        Self {
            attempts: 12,
            min_distance: 0.12,
            zone_bias: 0.55,
            memory: 6,
        }
    }
}

impl SpacingConfig {
    /// Checks the attempt count, the memory size and both fractions.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.attempts == 0 {
            return Err(ConfigError::CountOutOfRange {
                name: "attempts",
                value: 0,
                min: 1,
                max: u32::MAX as usize,
            });
        }
        if self.memory > MAX_MEMORY {
            return Err(ConfigError::CountOutOfRange {
                name: "memory",
                value: self.memory,
                min: 0,
                max: MAX_MEMORY,
            });
        }
        for (name, value) in [
            ("min_distance", self.min_distance),
            ("zone_bias", self.zone_bias),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::FractionOutOfRange { name, value });
            }
        }
        Ok(())
    }
}

/// Half of the arena a free spawn was placed in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Zone {
    /// `x` below the centre line.
    #[default]
    Left,
    /// `x` at or above the centre line.
    Right,
}

impl Zone {
    const fn other(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    const fn span(self) -> (f64, f64) {
        match self {
            Self::Left => (UNIFORM_MARGIN, CENTER),
            Self::Right => (CENTER, UNIFORM_MARGIN + UNIFORM_SPAN),
        }
    }
}

/// Placement memory that keeps free spawns from piling up in one spot.
///
/// Scripted shapes are placed exactly as [`next_spawn`] places them. Uniform
/// spawns are re-drawn instead: each candidate spends one draw on its half of
/// the arena, preferring the half opposite the previous free spawn, and two on
/// its position. The first candidate far enough from every remembered spawn
/// wins; otherwise the one farthest from its nearest neighbour does.
#[derive(Clone, Debug)]
pub struct SpawnSpacing {
    config: SpacingConfig,
    recent: VecDeque<(f64, f64)>,
    last_zone: Zone,
}

impl SpawnSpacing {
    /// Creates an empty placement memory.
    pub fn new(config: SpacingConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            recent: VecDeque::with_capacity(config.memory),
            last_zone: Zone::default(),
        })
    }

    /// Configuration the memory was built with.
    #[must_use]
    pub const fn config(&self) -> &SpacingConfig {
        &self.config
    }

    /// Half the last free spawn landed in.
    #[must_use]
    pub const fn last_zone(&self) -> Zone {
        self.last_zone
    }

    /// Remembered spawn positions, oldest first.
    pub fn recent(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.recent.iter().copied()
    }

    /// Places the spawn for `step` and remembers where it went.
    pub fn place<R>(&mut self, rng: &mut R, step: u64, ctx: SpawnContext) -> SpawnDirective
    where
        R: DeterministicRng,
    {
        let directive = if ctx.boss_active || ctx.storm_active || ctx.research {
            next_spawn(rng, step, ctx)
        } else {
            match free_pattern(rng, ctx.remix) {
                SpawnPattern::Uniform => self.scatter(rng, step),
                pattern => place_shape(rng, step, pattern),
            }
        };
        self.remember(directive.x, directive.y);
        directive
    }

    /// Forgets every position and returns to the left half.
    pub fn reset(&mut self) {
        self.recent.clear();
        self.last_zone = Zone::default();
    }

    fn nearest(&self, x: f64, y: f64) -> f64 {
        self.recent
            .iter()
            .map(|(rx, ry)| (x - rx).hypot(y - ry))
            .fold(f64::INFINITY, f64::min)
    }

    fn scatter<R>(&mut self, rng: &mut R, step: u64) -> SpawnDirective
    where
        R: DeterministicRng,
    {
        let prefer = self.last_zone.other();
        let mut best: Option<(f64, f64, f64, Zone)> = None;

        for attempt in 0..self.config.attempts {
            let zone = if rng.chance(self.config.zone_bias) {
                prefer
            } else {
                self.last_zone
            };
            let (low, high) = zone.span();
            let x = rng.next_range(low, high);
            let y = UNIFORM_MARGIN + rng.next_f64() * UNIFORM_SPAN;

            let nearest = self.nearest(x, y);
            let clear = nearest >= self.config.min_distance;
            let score = if clear {
                nearest
            } else {
                nearest * CROWDED_SCORE
            };
            if best.map_or(true, |(best_score, ..)| score > best_score) {
                best = Some((score, x, y, zone));
            }
            if clear {
                trace!(step, attempt, ?zone, "free spawn placed");
                break;
            }
        }

        let (_, x, y, zone) = best.unwrap_or((0.0, CENTER, CENTER, prefer));
        self.last_zone = zone;
        directive(SpawnPattern::Uniform, step, x, y)
    }

    fn remember(&mut self, x: f64, y: f64) {
        if self.config.memory == 0 {
            return;
        }
        if self.recent.len() == self.config.memory {
            let _ = self.recent.pop_front();
        }
        self.recent.push_back((x, y));
    }
}
