use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Describes whether and how a session may adapt to the player.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    /// Regular play; adaptation enabled.
    #[default]
    Play,
    /// Practice run; adaptation enabled.
    Practice,
    /// Experimental session; every adaptive output stays neutral.
    Research,
}

impl SessionMode {
    /// Reports whether adaptive behaviour must be suppressed.
    #[must_use]
    pub const fn is_research(self) -> bool {
        matches!(self, Self::Research)
    }
}

/// Base difficulty selected by the player before the session starts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyPreset {
    /// Gentle baseline.
    Easy,
    /// Default baseline.
    #[default]
    Normal,
    /// Demanding baseline.
    Hard,
}

impl DifficultyPreset {
    /// Baseline intensity the director blends the predicted skill against.
    #[must_use]
    pub const fn bias(self) -> f64 {
        match self {
            Self::Easy => 0.35,
            Self::Normal => 0.5,
            Self::Hard => 0.65,
        }
    }
}

/// Inclusive `[min, max]` range applied to one director output field.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldBounds {
    /// Smallest permitted value.
    pub min: f64,
    /// Largest permitted value.
    pub max: f64,
}

impl FieldBounds {
    /// Creates a new range without validating it.
    #[must_use]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Clamps `value` into the range. NaN collapses to the minimum.
    #[must_use]
    pub fn clamp(&self, value: f64) -> f64 {
        if value.is_nan() {
            return self.min;
        }
        value.max(self.min).min(self.max)
    }

    /// Reports whether `value` lies inside the range.
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    fn validate(&self, field: &'static str, neutral: f64) -> Result<(), ConfigError> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(ConfigError::NonFiniteBounds { field });
        }
        if self.min > self.max {
            return Err(ConfigError::InvertedBounds {
                field,
                min: self.min,
                max: self.max,
            });
        }
        if !self.contains(neutral) {
            return Err(ConfigError::NeutralOutsideBounds {
                field,
                neutral,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

/// Per-field bounds for every [`DirectorOutput`] value.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputBounds {
    /// Bounds for the spawn rate multiplier.
    pub spawn_rate_mul: FieldBounds,
    /// Bounds for the target size multiplier.
    pub target_size_mul: FieldBounds,
    /// Bounds for the hazard weight multiplier.
    pub hazard_mul: FieldBounds,
    /// Bounds for the spawn-bias learning rate.
    pub bias_lr: FieldBounds,
    /// Bounds for the pattern remix amount.
    pub remix: FieldBounds,
}

impl Default for OutputBounds {
    fn default() -> Self {
        Self {
            spawn_rate_mul: FieldBounds::new(0.75, 1.35),
            target_size_mul: FieldBounds::new(0.80, 1.20),
            hazard_mul: FieldBounds::new(0.70, 1.40),
            bias_lr: FieldBounds::new(0.0, 0.20),
            remix: FieldBounds::new(0.0, 1.0),
        }
    }
}

impl OutputBounds {
    /// Checks that each range is finite, ordered and admits the neutral output.
    ///
    /// The multiplier ranges must also stay strictly positive since spawn
    /// timings divide by and scale with them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let neutral = DirectorOutput::neutral();
        for (name, min) in [
            ("spawn_rate_mul.min", self.spawn_rate_mul.min),
            ("target_size_mul.min", self.target_size_mul.min),
            ("hazard_mul.min", self.hazard_mul.min),
        ] {
            if min <= 0.0 {
                return Err(ConfigError::NonPositive { name, value: min });
            }
        }
        self.spawn_rate_mul
            .validate("spawn_rate_mul", neutral.spawn_rate_mul)?;
        self.target_size_mul
            .validate("target_size_mul", neutral.target_size_mul)?;
        self.hazard_mul.validate("hazard_mul", neutral.hazard_mul)?;
        self.bias_lr.validate("bias_lr", neutral.bias_lr)?;
        self.remix.validate("remix", neutral.remix)?;
        Ok(())
    }

    /// Clamps every field of `output` into its range.
    #[must_use]
    pub fn clamp(&self, output: DirectorOutput) -> DirectorOutput {
        DirectorOutput {
            spawn_rate_mul: self.spawn_rate_mul.clamp(output.spawn_rate_mul),
            target_size_mul: self.target_size_mul.clamp(output.target_size_mul),
            hazard_mul: self.hazard_mul.clamp(output.hazard_mul),
            bias_lr: self.bias_lr.clamp(output.bias_lr),
            remix: self.remix.clamp(output.remix),
        }
    }

    /// Reports whether every field of `output` lies inside its range.
    #[must_use]
    pub fn contains(&self, output: &DirectorOutput) -> bool {
        self.spawn_rate_mul.contains(output.spawn_rate_mul)
            && self.target_size_mul.contains(output.target_size_mul)
            && self.hazard_mul.contains(output.hazard_mul)
            && self.bias_lr.contains(output.bias_lr)
            && self.remix.contains(output.remix)
    }
}

/// Gameplay adjustments consumed by the external spawner.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DirectorOutput {
    /// Multiplier applied to the spawn rate; above one spawns faster.
    pub spawn_rate_mul: f64,
    /// Multiplier applied to target size; below one shrinks targets.
    pub target_size_mul: f64,
    /// Multiplier applied to hazard spawn weights.
    pub hazard_mul: f64,
    /// Learning rate the spawner uses to bias target kinds.
    pub bias_lr: f64,
    /// Amount of pattern variety to mix in, in `[0, 1]`.
    pub remix: f64,
}

impl DirectorOutput {
    /// Identity adjustments: the game runs exactly as authored.
    #[must_use]
    pub const fn neutral() -> Self {
        Self {
            spawn_rate_mul: 1.0,
            target_size_mul: 1.0,
            hazard_mul: 1.0,
            bias_lr: 0.0,
            remix: 0.0,
        }
    }
}

impl Default for DirectorOutput {
    fn default() -> Self {
        Self::neutral()
    }
}
