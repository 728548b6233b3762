#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Online skill predictors that estimate the probability of the next hit.
//!
//! Two interchangeable models implement [`SkillPredictor`]: a logistic
//! regression ([`LinearModel`]) and a one-hidden-layer perceptron
//! ([`MlpModel`]). Both are trained one sample at a time by L2-regularised
//! stochastic gradient descent and always report probabilities inside the
//! configured clamp. [`SkillModel`] wraps the two so the session can pick one
//! from configuration.

use adaptive_play_core::{ConfigError, DeterministicRng, DifficultyPreset, OutcomeEvent, Phase, TargetKind};
use serde::{Deserialize, Serialize};
use tracing::trace;

mod accumulators;
mod linear;
mod mlp;

pub use accumulators::RollingAccumulators;
pub use linear::LinearModel;
pub use mlp::MlpModel;

/// Number of features produced by [`SkillPredictor::featurize`].
pub const FEATURE_COUNT: usize = 13;

const ZONE_SCALE: f64 = 5.0;

/// Selects the model implementation used by a session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Logistic regression over the raw features.
    Linear,
    /// One ReLU hidden layer followed by a sigmoid output.
    #[default]
    Mlp,
}

/// Tunables shared by every skill model.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillConfig {
    /// Model implementation to build.
    pub model: ModelKind,
    /// SGD step size.
    pub learning_rate: f64,
    /// L2 regularisation strength.
    pub l2: f64,
    /// Training steps after which the model is fully trusted.
    pub warmup_steps: u32,
    /// Lowest probability ever reported.
    pub min_probability: f64,
    /// Highest probability ever reported.
    pub max_probability: f64,
    /// Hidden units of the perceptron.
    pub hidden_units: usize,
    /// Scale of the normally distributed initial perceptron weights.
    pub init_scale: f64,
    /// Sample count above which the rolling accumulators decay.
    pub accumulator_cap: f64,
    /// Factor applied to the rolling accumulators once they exceed the cap.
    pub accumulator_decay: f64,
}

impl Default for SkillConfig {
    fn default() -> Self {
        Self {
            model: ModelKind::default(),
            learning_rate: 0.08,
            l2: 0.0008,
            warmup_steps: 40,
            min_probability: 0.03,
            max_probability: 0.97,
            hidden_units: 12,
            init_scale: 0.12,
            accumulator_cap: 120.0,
            accumulator_decay: 0.72,
        }
    }
}

impl SkillConfig {
    /// Smallest supported hidden layer.
    pub const MIN_HIDDEN_UNITS: usize = 8;
    /// Largest supported hidden layer.
    pub const MAX_HIDDEN_UNITS: usize = 16;

    /// Validates every tunable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (min, max) = (self.min_probability, self.max_probability);
        if !(min > 0.0 && min < max && max < 1.0) {
            return Err(ConfigError::InvalidProbabilityClamp { min, max });
        }
        for (name, value) in [
            ("learning_rate", self.learning_rate),
            ("init_scale", self.init_scale),
            ("accumulator_cap", self.accumulator_cap),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NonPositive { name, value });
            }
        }
        for (name, value) in [("l2", self.l2), ("accumulator_decay", self.accumulator_decay)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::FractionOutOfRange { name, value });
            }
        }
        if self.warmup_steps == 0 {
            return Err(ConfigError::CountOutOfRange {
                name: "warmup_steps",
                value: 0,
                min: 1,
                max: u32::MAX as usize,
            });
        }
        if !(Self::MIN_HIDDEN_UNITS..=Self::MAX_HIDDEN_UNITS).contains(&self.hidden_units) {
            return Err(ConfigError::CountOutOfRange {
                name: "hidden_units",
                value: self.hidden_units,
                min: Self::MIN_HIDDEN_UNITS,
                max: Self::MAX_HIDDEN_UNITS,
            });
        }
        Ok(())
    }

    fn clamp_probability(&self, probability: f64) -> f64 {
        if probability.is_nan() {
            return self.min_probability;
        }
        probability.clamp(self.min_probability, self.max_probability)
    }
}

/// Situation in which the player is about to act.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SkillContext {
    /// Kind of target presented.
    pub target_kind: TargetKind,
    /// Spatial zone of the target.
    pub zone_id: u8,
    /// Whether the boss is involved.
    pub boss_active: bool,
    /// Whether fever mode is running.
    pub fever_active: bool,
    /// Base difficulty of the session.
    pub preset: DifficultyPreset,
    /// Health fraction in `[0, 1]`.
    pub player_hp: f64,
    /// Session phase.
    pub phase: Phase,
    /// Reaction time of the resolved action; only used when training.
    pub reaction_time_ms: Option<f64>,
}

impl SkillContext {
    /// Builds the context describing a resolved telemetry event.
    #[must_use]
    pub fn from_event(event: &OutcomeEvent, preset: DifficultyPreset) -> Self {
        Self {
            target_kind: event.target_kind(),
            zone_id: event.zone_id(),
            boss_active: event.target_kind() == TargetKind::Boss,
            fever_active: event.fever_active(),
            preset,
            player_hp: event.player_hp(),
            phase: event.phase(),
            reaction_time_ms: event.reaction_time_ms(),
        }
    }
}

/// Bookkeeping shared by every model: step counter, last prediction and the
/// rolling accumulators that feed the history features.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LearnerState {
    config: SkillConfig,
    steps: u64,
    last_probability: f64,
    accumulators: RollingAccumulators,
}

impl LearnerState {
    fn new(config: SkillConfig) -> Self {
        Self {
            config,
            steps: 0,
            last_probability: 0.5,
            accumulators: RollingAccumulators::new(config.accumulator_cap, config.accumulator_decay),
        }
    }

    /// Configuration of the model.
    #[must_use]
    pub const fn config(&self) -> &SkillConfig {
        &self.config
    }

    /// Number of training steps taken.
    #[must_use]
    pub const fn steps(&self) -> u64 {
        self.steps
    }

    /// Probability reported by the most recent prediction or training step.
    #[must_use]
    pub const fn last_probability(&self) -> f64 {
        self.last_probability
    }

    /// Rolling hit and reaction time history.
    #[must_use]
    pub const fn accumulators(&self) -> &RollingAccumulators {
        &self.accumulators
    }

    fn finish_prediction(&mut self, raw: f64) -> f64 {
        let probability = self.config.clamp_probability(raw);
        self.last_probability = probability;
        probability
    }

    fn reset(&mut self) {
        *self = Self::new(self.config);
    }
}

/// Shared contract of every online skill model.
pub trait SkillPredictor {
    /// Bookkeeping shared by every model.
    fn learner(&self) -> &LearnerState;

    /// Mutable access to the shared bookkeeping.
    fn learner_mut(&mut self) -> &mut LearnerState;

    /// Predicts the hit probability for a raw feature vector without training.
    fn predict_features(&mut self, features: &[f64]) -> f64;

    /// Takes one SGD step on a raw feature vector and returns the updated probability.
    fn train_features(&mut self, features: &[f64], label: bool) -> f64;

    /// Restores initial weights and clears the history.
    fn reset(&mut self);

    /// Fixed-length feature vector describing `ctx` and the recent history.
    fn featurize(&self, ctx: &SkillContext) -> Vec<f64> {
        featurize(ctx, self.learner().accumulators())
    }

    /// Hit probability for `ctx`, clamped to the configured range. Weights are untouched.
    fn predict(&mut self, ctx: &SkillContext) -> f64 {
        let features = self.featurize(ctx);
        self.predict_features(&features)
    }

    /// Trains on the resolved action described by `ctx` and records it in the history.
    fn train(&mut self, ctx: &SkillContext, label: bool) -> f64 {
        let features = self.featurize(ctx);
        let probability = self.train_features(&features, label);
        self.learner_mut()
            .accumulators
            .record(label, ctx.reaction_time_ms);
        probability
    }

    /// Trust in the model, growing linearly to one over the warm-up period.
    fn confidence(&self) -> f64 {
        let learner = self.learner();
        (learner.steps as f64 / f64::from(learner.config.warmup_steps)).clamp(0.0, 1.0)
    }

    /// Probability reported by the most recent prediction or training step.
    fn last_probability(&self) -> f64 {
        self.learner().last_probability
    }

    /// Blend of rolling accuracy and reaction speed in `[0, 1]`.
    fn skill_score(&self) -> f64 {
        self.learner().accumulators.skill_score()
    }
}

/// Builds the feature vector for `ctx` given the rolling history.
#[must_use]
pub fn featurize(ctx: &SkillContext, history: &RollingAccumulators) -> Vec<f64> {
    let flag = |on: bool| if on { 1.0 } else { 0.0 };
    let player_hp = if ctx.player_hp.is_finite() {
        ctx.player_hp.clamp(0.0, 1.0)
    } else {
        1.0
    };

    vec![
        1.0,
        (f64::from(ctx.zone_id) / ZONE_SCALE).clamp(0.0, 1.0),
        flag(ctx.target_kind == TargetKind::Normal),
        flag(ctx.target_kind.is_hazard()),
        flag(ctx.target_kind.is_support()),
        flag(ctx.boss_active),
        flag(ctx.fever_active),
        flag(ctx.preset == DifficultyPreset::Easy),
        flag(ctx.preset == DifficultyPreset::Hard),
        history.accuracy(),
        history.rt_norm(),
        player_hp,
        ctx.phase.normalized(),
    ]
}

/// Model selected at runtime.
#[derive(Clone, Debug)]
pub enum SkillModel {
    /// Logistic regression.
    Linear(LinearModel),
    /// One-hidden-layer perceptron.
    Mlp(MlpModel),
}

impl SkillModel {
    /// Builds the model named by `config.model`.
    ///
    /// The perceptron draws its initial weights from `rng`; the linear model
    /// leaves it untouched.
    pub fn new<R>(config: SkillConfig, rng: &mut R) -> Result<Self, ConfigError>
    where
        R: DeterministicRng,
    {
        match config.model {
            ModelKind::Linear => LinearModel::new(config).map(Self::Linear),
            ModelKind::Mlp => MlpModel::new(config, rng).map(Self::Mlp),
        }
    }

    /// Implementation in use.
    #[must_use]
    pub const fn kind(&self) -> ModelKind {
        match self {
            Self::Linear(_) => ModelKind::Linear,
            Self::Mlp(_) => ModelKind::Mlp,
        }
    }

    fn inner(&self) -> &dyn SkillPredictor {
        match self {
            Self::Linear(model) => model,
            Self::Mlp(model) => model,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn SkillPredictor {
        match self {
            Self::Linear(model) => model,
            Self::Mlp(model) => model,
        }
    }
}

impl SkillPredictor for SkillModel {
    fn learner(&self) -> &LearnerState {
        self.inner().learner()
    }

    fn learner_mut(&mut self) -> &mut LearnerState {
        self.inner_mut().learner_mut()
    }

    fn predict_features(&mut self, features: &[f64]) -> f64 {
        self.inner_mut().predict_features(features)
    }

    fn train_features(&mut self, features: &[f64], label: bool) -> f64 {
        let probability = self.inner_mut().train_features(features, label);
        trace!(
            kind = ?self.kind(),
            label,
            probability,
            steps = self.learner().steps(),
            "skill model trained"
        );
        probability
    }

    fn reset(&mut self) {
        self.inner_mut().reset();
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

fn label_value(label: bool) -> f64 {
    if label {
        1.0
    } else {
        0.0
    }
}

/// Reads feature `index`, mapping missing and non-finite entries to zero.
fn feature(features: &[f64], index: usize) -> f64 {
    features
        .get(index)
        .copied()
        .filter(|value| value.is_finite())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use adaptive_play_core::{Outcome, SeededRng};

    fn context() -> SkillContext {
        SkillContext {
            target_kind: TargetKind::Decoy,
            zone_id: 3,
            boss_active: true,
            fever_active: false,
            preset: DifficultyPreset::Hard,
            player_hp: 0.8,
            phase: Phase::Mid,
            reaction_time_ms: Some(400.0),
        }
    }

    #[test]
    fn features_have_fixed_layout() {
        let history = RollingAccumulators::new(120.0, 0.72);
        let features = featurize(&context(), &history);
        assert_eq!(features.len(), FEATURE_COUNT);
        assert_eq!(
            features,
            vec![
                1.0,
                0.6,
                0.0,
                1.0,
                0.0,
                1.0,
                0.0,
                0.0,
                1.0,
                0.5,
                (520.0 - 220.0) / 530.0,
                0.8,
                0.5
            ]
        );
    }

    #[test]
    fn context_from_event_carries_sanitised_fields() {
        let event = OutcomeEvent::new(10, Outcome::Hit)
            .with_target(TargetKind::Boss)
            .with_player_hp(4.0)
            .with_reaction_time(f64::NAN);
        let ctx = SkillContext::from_event(&event, DifficultyPreset::Easy);
        assert!(ctx.boss_active);
        assert_eq!(ctx.player_hp, 1.0);
        assert_eq!(ctx.reaction_time_ms, None);
    }

    #[test]
    fn confidence_ramps_over_warmup() {
        let mut model = SkillModel::new(
            SkillConfig {
                model: ModelKind::Linear,
                ..SkillConfig::default()
            },
            &mut SeededRng::seed("confidence"),
        )
        .expect("config");
        assert_eq!(model.confidence(), 0.0);
        for _ in 0..20 {
            let _ = model.train(&context(), true);
        }
        assert!((model.confidence() - 0.5).abs() < 1e-12);
        for _ in 0..40 {
            let _ = model.train(&context(), false);
        }
        assert_eq!(model.confidence(), 1.0);
    }

    #[test]
    fn predict_does_not_train() {
        let mut model =
            SkillModel::new(SkillConfig::default(), &mut SeededRng::seed("predict")).expect("config");
        let first = model.predict(&context());
        let second = model.predict(&context());
        assert_eq!(first, second);
        assert_eq!(model.last_probability(), first);
        assert_eq!(model.learner().steps(), 0);
    }

    #[test]
    fn training_feeds_history() {
        let mut model =
            SkillModel::new(SkillConfig::default(), &mut SeededRng::seed("history")).expect("config");
        let _ = model.train(&context(), true);
        assert_eq!(model.learner().accumulators().accuracy(), 1.0);
        assert_eq!(model.learner().accumulators().mean_rt(), 400.0);
    }

    #[test]
    fn reset_restores_initial_predictions() {
        let mut model =
            SkillModel::new(SkillConfig::default(), &mut SeededRng::seed("reset")).expect("config");
        let initial = model.predict(&context());
        for _ in 0..30 {
            let _ = model.train(&context(), false);
        }
        assert_ne!(model.predict(&context()), initial);
        model.reset();
        assert_eq!(model.predict(&context()), initial);
        assert_eq!(model.confidence(), 0.0);
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let clamp = SkillConfig {
            min_probability: 0.9,
            max_probability: 0.1,
            ..SkillConfig::default()
        };
        assert!(matches!(
            clamp.validate(),
            Err(ConfigError::InvalidProbabilityClamp { .. })
        ));

        let hidden = SkillConfig {
            hidden_units: 32,
            ..SkillConfig::default()
        };
        assert!(matches!(
            hidden.validate(),
            Err(ConfigError::CountOutOfRange {
                name: "hidden_units",
                ..
            })
        ));

        let rate = SkillConfig {
            learning_rate: f64::NAN,
            ..SkillConfig::default()
        };
        assert!(matches!(
            rate.validate(),
            Err(ConfigError::NonPositive {
                name: "learning_rate",
                ..
            })
        ));
    }
}
