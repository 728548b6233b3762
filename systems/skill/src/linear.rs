use adaptive_play_core::ConfigError;

use crate::{feature, label_value, sigmoid, LearnerState, SkillConfig, SkillPredictor, FEATURE_COUNT};

/// Logistic regression with the bias folded into the first feature.
#[derive(Clone, Debug)]
pub struct LinearModel {
    weights: [f64; FEATURE_COUNT],
    learner: LearnerState,
}

impl LinearModel {
    /// Creates a model whose weights all start at zero.
    pub fn new(config: SkillConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            weights: [0.0; FEATURE_COUNT],
            learner: LearnerState::new(config),
        })
    }

    /// Current weights.
    #[must_use]
    pub const fn weights(&self) -> &[f64; FEATURE_COUNT] {
        &self.weights
    }

    fn raw_probability(&self, features: &[f64]) -> f64 {
        let z: f64 = self
            .weights
            .iter()
            .enumerate()
            .map(|(index, weight)| weight * feature(features, index))
            .sum();
        sigmoid(z)
    }
}

impl SkillPredictor for LinearModel {
    fn learner(&self) -> &LearnerState {
        &self.learner
    }

    fn learner_mut(&mut self) -> &mut LearnerState {
        &mut self.learner
    }

    fn predict_features(&mut self, features: &[f64]) -> f64 {
        let raw = self.raw_probability(features);
        self.learner.finish_prediction(raw)
    }

    fn train_features(&mut self, features: &[f64], label: bool) -> f64 {
        let config = *self.learner.config();
        let probability = config.clamp_probability(self.raw_probability(features));
        let err = probability - label_value(label);

        for (index, weight) in self.weights.iter_mut().enumerate() {
            let x = feature(features, index);
            *weight -= config.learning_rate * (err * x + config.l2 * *weight);
        }
        self.learner.steps += 1;

        self.predict_features(features)
    }

    fn reset(&mut self) {
        self.weights = [0.0; FEATURE_COUNT];
        self.learner.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untrained_model_predicts_even_odds() {
        let mut model = LinearModel::new(SkillConfig::default()).expect("config");
        assert_eq!(model.predict_features(&[1.0; FEATURE_COUNT]), 0.5);
    }

    #[test]
    fn single_step_follows_regularised_rule() {
        let mut model = LinearModel::new(SkillConfig::default()).expect("config");
        let mut features = [0.0; FEATURE_COUNT];
        features[0] = 1.0;
        features[3] = 0.5;
        let _ = model.train_features(&features, true);

        // err = 0.5 - 1 with zero starting weights, so the L2 term vanishes.
        assert!((model.weights()[0] - 0.04).abs() < 1e-12);
        assert!((model.weights()[3] - 0.02).abs() < 1e-12);
        assert_eq!(model.weights()[1], 0.0);
    }

    #[test]
    fn non_finite_features_contribute_nothing() {
        let mut model = LinearModel::new(SkillConfig::default()).expect("config");
        let mut features = [f64::NAN; FEATURE_COUNT];
        features[0] = 1.0;
        let probability = model.train_features(&features, true);
        assert!(probability.is_finite());
        assert!(model.weights().iter().all(|weight| weight.is_finite()));
    }
}
