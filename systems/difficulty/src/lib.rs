#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Difficulty director that turns skill and telemetry into bounded gameplay multipliers.
//!
//! Every update walks the same pipeline: research sessions short-circuit to the
//! neutral output, calls inside the debounce interval repeat the previous
//! output, and everything else blends the predicted skill with the base preset,
//! softens for fatigue, interpolates each field between calm and intense
//! endpoints, applies the hazard fairness cap, smooths toward the result by the
//! model confidence and finally clamps every field into its bounds.

use adaptive_play_core::{
    ConfigError, DifficultyPreset, DirectorOutput, FieldBounds, OutputBounds, SessionMode, Stats,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

mod kinds;
mod mix;

pub use kinds::{KindPicker, KindPickerConfig, SPAWNABLE_KINDS};
pub use mix::{IntensityBand, SpawnMix, SpawnTiming};

/// Values a field takes at zero and at full intensity.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Endpoints {
    /// Value at zero intensity.
    pub calm: f64,
    /// Value at full intensity.
    pub intense: f64,
}

impl Endpoints {
    /// Creates a pair of endpoints.
    #[must_use]
    pub const fn new(calm: f64, intense: f64) -> Self {
        Self { calm, intense }
    }

    /// Interpolates between the endpoints.
    #[must_use]
    pub fn at(&self, intensity: f64) -> f64 {
        lerp(self.calm, self.intense, intensity)
    }

    fn validate(&self, field: &'static str) -> Result<(), ConfigError> {
        if self.calm.is_finite() && self.intense.is_finite() {
            Ok(())
        } else {
            Err(ConfigError::NonFiniteBounds { field })
        }
    }
}

/// Recent failure rates above which hazards may no longer grow.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FairnessThresholds {
    /// Share of non-hit outcomes.
    pub miss_rate: f64,
    /// Share of bomb strikes.
    pub bomb_rate: f64,
    /// Share of failed decoys.
    pub decoy_rate: f64,
}

impl Default for FairnessThresholds {
    fn default() -> Self {
        Self {
            miss_rate: 0.35,
            bomb_rate: 0.15,
            decoy_rate: 0.15,
        }
    }
}

impl FairnessThresholds {
    /// Reports whether any rate in `stats` exceeds its threshold.
    ///
    /// A NaN rate counts as exceeded.
    #[must_use]
    pub fn exceeded(&self, stats: &Stats) -> bool {
        let over = |rate: f64, threshold: f64| !(rate <= threshold);
        over(stats.miss_rate, self.miss_rate)
            || over(stats.bomb_rate, self.bomb_rate)
            || over(stats.decoy_rate, self.decoy_rate)
    }
}

/// Tunables for [`DifficultyDirector`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectorConfig {
    /// Per-field output bounds.
    pub bounds: OutputBounds,
    /// Weight of the predicted skill against the preset bias.
    pub blend_weight: f64,
    /// Fraction of the gap to the desired output closed per update at full confidence.
    pub smoothing: f64,
    /// Range the target intensity is confined to.
    pub safety_band: FieldBounds,
    /// Share of intensity removed at full fatigue.
    pub fatigue_softening: f64,
    /// Minimum time between two real updates.
    pub min_interval_ms: u64,
    /// Spawn rate multiplier endpoints.
    pub spawn_rate: Endpoints,
    /// Target size multiplier endpoints.
    pub target_size: Endpoints,
    /// Hazard weight multiplier endpoints.
    pub hazard: Endpoints,
    /// Spawn-bias learning rate endpoints.
    pub bias_lr: Endpoints,
    /// Pattern remix endpoints.
    pub remix: Endpoints,
    /// Hazard fairness thresholds.
    pub fairness: FairnessThresholds,
}

impl Default for DirectorConfig {
    fn default() -> Self {
        Self {
            bounds: OutputBounds::default(),
            blend_weight: 0.6,
            smoothing: 0.35,
            safety_band: FieldBounds::new(0.05, 0.95),
            fatigue_softening: 0.35,
            min_interval_ms: 1_500,
            spawn_rate: Endpoints::new(0.8, 1.3),
            target_size: Endpoints::new(1.15, 0.85),
            hazard: Endpoints::new(0.8, 1.3),
            bias_lr: Endpoints::new(0.02, 0.08),
            remix: Endpoints::new(0.1, 0.6),
            fairness: FairnessThresholds::default(),
        }
    }
}

impl DirectorConfig {
    /// Validates bounds, factors, band and endpoints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bounds.validate()?;
        for (name, value) in [
            ("blend_weight", self.blend_weight),
            ("smoothing", self.smoothing),
            ("fatigue_softening", self.fatigue_softening),
            ("fairness.miss_rate", self.fairness.miss_rate),
            ("fairness.bomb_rate", self.fairness.bomb_rate),
            ("fairness.decoy_rate", self.fairness.decoy_rate),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::FractionOutOfRange { name, value });
            }
        }

        let band = self.safety_band;
        if band.min > band.max {
            return Err(ConfigError::InvertedBounds {
                field: "safety_band",
                min: band.min,
                max: band.max,
            });
        }
        for (name, value) in [("safety_band.min", band.min), ("safety_band.max", band.max)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::FractionOutOfRange { name, value });
            }
        }

        self.spawn_rate.validate("spawn_rate")?;
        self.target_size.validate("target_size")?;
        self.hazard.validate("hazard")?;
        self.bias_lr.validate("bias_lr")?;
        self.remix.validate("remix")?;
        Ok(())
    }
}

/// Everything the director reads during one update.
#[derive(Clone, Copy, Debug)]
pub struct DirectorInputs<'a> {
    /// Session time of the update.
    pub now_ms: u64,
    /// Predicted skill in `[0, 1]`.
    pub skill: f64,
    /// Model confidence in `[0, 1]`.
    pub confidence: f64,
    /// Rolling telemetry statistics.
    pub telemetry: &'a Stats,
    /// Estimated fatigue in `[0, 1]`.
    pub fatigue: f64,
    /// Base difficulty of the session.
    pub base_difficulty: DifficultyPreset,
    /// Session mode.
    pub mode: SessionMode,
}

/// Parameterised difficulty director.
#[derive(Clone, Debug)]
pub struct DifficultyDirector {
    config: DirectorConfig,
    previous: DirectorOutput,
    last_update_ms: Option<u64>,
    intensity: Option<f64>,
    refreshed: bool,
}

impl DifficultyDirector {
    /// Creates a director whose previous output is neutral.
    pub fn new(config: DirectorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            previous: DirectorOutput::neutral(),
            last_update_ms: None,
            intensity: None,
            refreshed: false,
        })
    }

    /// Configuration the director was built with.
    #[must_use]
    pub const fn config(&self) -> &DirectorConfig {
        &self.config
    }

    /// Most recently produced output.
    #[must_use]
    pub const fn previous(&self) -> DirectorOutput {
        self.previous
    }

    /// Session time of the last real update, if any.
    #[must_use]
    pub const fn last_update_ms(&self) -> Option<u64> {
        self.last_update_ms
    }

    /// Reports whether the last call produced a new output instead of repeating one.
    #[must_use]
    pub const fn refreshed(&self) -> bool {
        self.refreshed
    }

    /// Target intensity computed by the last real update.
    #[must_use]
    pub const fn intensity(&self) -> Option<f64> {
        self.intensity
    }

    /// Produces the next output.
    pub fn update(&mut self, inputs: DirectorInputs<'_>) -> DirectorOutput {
        if inputs.mode.is_research() {
            self.previous = DirectorOutput::neutral();
            self.refreshed = true;
            return self.previous;
        }

        if let Some(last) = self.last_update_ms {
            if inputs.now_ms.saturating_sub(last) < self.config.min_interval_ms {
                trace!(now_ms = inputs.now_ms, last, "director update rate limited");
                self.refreshed = false;
                return self.previous;
            }
        }

        let skill = finite_or(inputs.skill, 0.5).clamp(0.0, 1.0);
        let fatigue = finite_or(inputs.fatigue, 0.0).clamp(0.0, 1.0);
        let confidence = finite_or(inputs.confidence, 0.0).clamp(0.0, 1.0);

        let band = self.config.safety_band;
        let blended = band.clamp(lerp(
            inputs.base_difficulty.bias(),
            skill,
            self.config.blend_weight,
        ));
        let intensity = band.clamp(blended * (1.0 - self.config.fatigue_softening * fatigue));

        let previous = self.previous;
        let unfair = self.config.fairness.exceeded(inputs.telemetry);
        let mut desired_hazard = self.config.hazard.at(intensity);
        if unfair {
            desired_hazard = desired_hazard.min(previous.hazard_mul);
        }

        let step = self.config.smoothing * confidence;
        let mut hazard_mul = lerp(previous.hazard_mul, desired_hazard, step);
        if unfair {
            hazard_mul = hazard_mul.min(previous.hazard_mul);
        }

        let output = self.config.bounds.clamp(DirectorOutput {
            spawn_rate_mul: lerp(
                previous.spawn_rate_mul,
                self.config.spawn_rate.at(intensity),
                step,
            ),
            target_size_mul: lerp(
                previous.target_size_mul,
                self.config.target_size.at(intensity),
                step,
            ),
            hazard_mul,
            bias_lr: lerp(previous.bias_lr, self.config.bias_lr.at(intensity), step),
            remix: lerp(previous.remix, self.config.remix.at(intensity), step),
        });

        debug!(
            now_ms = inputs.now_ms,
            intensity,
            confidence,
            unfair,
            spawn_rate_mul = output.spawn_rate_mul,
            target_size_mul = output.target_size_mul,
            hazard_mul = output.hazard_mul,
            "director updated"
        );

        self.previous = output;
        self.last_update_ms = Some(inputs.now_ms);
        self.intensity = Some(intensity);
        self.refreshed = true;
        output
    }

    /// Returns to the neutral output and clears the rate limiter.
    pub fn reset(&mut self) {
        self.previous = DirectorOutput::neutral();
        self.last_update_ms = None;
        self.intensity = None;
        self.refreshed = false;
    }
}

fn lerp(from: f64, to: f64, t: f64) -> f64 {
    from + (to - from) * t
}

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(now_ms: u64, skill: f64, telemetry: &Stats) -> DirectorInputs<'_> {
        DirectorInputs {
            now_ms,
            skill,
            confidence: 1.0,
            telemetry,
            fatigue: 0.0,
            base_difficulty: DifficultyPreset::Normal,
            mode: SessionMode::Play,
        }
    }

    fn director() -> DifficultyDirector {
        DifficultyDirector::new(DirectorConfig::default()).expect("default config")
    }

    #[test]
    fn research_mode_is_neutral() {
        let mut director = director();
        let stats = Stats::empty();
        let output = director.update(DirectorInputs {
            mode: SessionMode::Research,
            ..inputs(10_000, 1.0, &stats)
        });
        assert_eq!(output, DirectorOutput::neutral());
    }

    #[test]
    fn second_call_inside_interval_repeats_output() {
        let mut director = director();
        let stats = Stats::empty();
        let first = director.update(inputs(10_000, 0.9, &stats));
        let second = director.update(inputs(10_400, 0.1, &stats));
        assert_eq!(first, second);
        assert!(!director.refreshed());
        assert_eq!(director.last_update_ms(), Some(10_000));

        let third = director.update(inputs(11_500, 0.1, &stats));
        assert_ne!(third, second);
    }

    #[test]
    fn skilled_players_get_faster_spawns_and_smaller_targets() {
        let mut director = director();
        let stats = Stats::empty();
        let output = director.update(inputs(0, 1.0, &stats));
        assert!(output.spawn_rate_mul > 1.0);
        assert!(output.target_size_mul < 1.0);
        assert!(output.hazard_mul > 1.0);
    }

    #[test]
    fn intensity_follows_blend_and_fatigue() {
        let mut director = director();
        let stats = Stats::empty();
        let _ = director.update(DirectorInputs {
            fatigue: 1.0,
            ..inputs(0, 1.0, &stats)
        });
        // lerp(0.5, 1.0, 0.6) = 0.8, softened by 35%.
        let intensity = director.intensity().expect("updated");
        assert!((intensity - 0.8 * 0.65).abs() < 1e-12);
    }

    #[test]
    fn zero_confidence_keeps_previous_output() {
        let mut director = director();
        let stats = Stats::empty();
        let output = director.update(DirectorInputs {
            confidence: 0.0,
            ..inputs(0, 1.0, &stats)
        });
        assert_eq!(output, DirectorOutput::neutral());
    }

    #[test]
    fn high_miss_rate_never_raises_hazard() {
        let mut director = director();
        let struggling = Stats {
            samples: 20,
            miss_rate: 0.6,
            accuracy: 0.4,
            ..Stats::empty()
        };
        let mut previous = director.previous().hazard_mul;
        for tick in 0..20 {
            let output = director.update(inputs(tick * 2_000, 1.0, &struggling));
            assert!(output.hazard_mul <= previous);
            previous = output.hazard_mul;
        }
    }

    #[test]
    fn nan_inputs_stay_in_bounds() {
        let mut director = director();
        let stats = Stats {
            miss_rate: f64::NAN,
            ..Stats::empty()
        };
        let output = director.update(DirectorInputs {
            skill: f64::NAN,
            confidence: f64::INFINITY,
            fatigue: f64::NAN,
            ..inputs(0, 0.0, &stats)
        });
        assert!(director.config().bounds.contains(&output));
        assert!(output.hazard_mul <= 1.0);
    }

    #[test]
    fn reset_clears_rate_limit_and_output() {
        let mut director = director();
        let stats = Stats::empty();
        let _ = director.update(inputs(0, 1.0, &stats));
        director.reset();
        assert_eq!(director.previous(), DirectorOutput::neutral());
        assert_eq!(director.last_update_ms(), None);
    }

    #[test]
    fn invalid_configs_fail_fast() {
        let smoothing = DirectorConfig {
            smoothing: 1.5,
            ..DirectorConfig::default()
        };
        assert!(matches!(
            DifficultyDirector::new(smoothing),
            Err(ConfigError::FractionOutOfRange {
                name: "smoothing",
                ..
            })
        ));

        let band = DirectorConfig {
            safety_band: FieldBounds::new(0.9, 0.1),
            ..DirectorConfig::default()
        };
        assert!(matches!(
            DifficultyDirector::new(band),
            Err(ConfigError::InvertedBounds {
                field: "safety_band",
                ..
            })
        ));

        let mut bounds = DirectorConfig::default();
        bounds.bounds.target_size_mul = FieldBounds::new(1.2, 0.8);
        assert!(DifficultyDirector::new(bounds).is_err());
    }
}
