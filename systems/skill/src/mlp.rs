use adaptive_play_core::{ConfigError, DeterministicRng};

use crate::{feature, label_value, sigmoid, LearnerState, SkillConfig, SkillPredictor, FEATURE_COUNT};

#[derive(Clone, Debug, PartialEq)]
struct Weights {
    hidden: Vec<[f64; FEATURE_COUNT]>,
    output: Vec<f64>,
    output_bias: f64,
}

/// Perceptron with one ReLU hidden layer and a sigmoid output unit.
#[derive(Clone, Debug)]
pub struct MlpModel {
    weights: Weights,
    initial: Weights,
    activations: Vec<f64>,
    learner: LearnerState,
}

impl MlpModel {
    /// Creates a model whose weights are drawn from `rng`.
    ///
    /// Draws happen hidden layer first, unit by unit, then the output layer;
    /// each weight is `init_scale` times a standard normal sample.
    pub fn new<R>(config: SkillConfig, rng: &mut R) -> Result<Self, ConfigError>
    where
        R: DeterministicRng,
    {
        config.validate()?;

        let mut hidden = Vec::with_capacity(config.hidden_units);
        for _ in 0..config.hidden_units {
            let mut unit = [0.0; FEATURE_COUNT];
            for weight in &mut unit {
                *weight = config.init_scale * rng.next_standard_normal();
            }
            hidden.push(unit);
        }
        let output = (0..config.hidden_units)
            .map(|_| config.init_scale * rng.next_standard_normal())
            .collect();

        let weights = Weights {
            hidden,
            output,
            output_bias: 0.0,
        };
        Ok(Self {
            initial: weights.clone(),
            activations: vec![0.0; config.hidden_units],
            weights,
            learner: LearnerState::new(config),
        })
    }

    /// Number of hidden units.
    #[must_use]
    pub fn hidden_units(&self) -> usize {
        self.weights.output.len()
    }

    fn forward(&mut self, features: &[f64]) -> f64 {
        let mut z = self.weights.output_bias;
        for ((unit, activation), output) in self
            .weights
            .hidden
            .iter()
            .zip(self.activations.iter_mut())
            .zip(&self.weights.output)
        {
            let pre: f64 = unit
                .iter()
                .enumerate()
                .map(|(index, weight)| weight * feature(features, index))
                .sum();
            *activation = pre.max(0.0);
            z += output * *activation;
        }
        sigmoid(z)
    }
}

impl SkillPredictor for MlpModel {
    fn learner(&self) -> &LearnerState {
        &self.learner
    }

    fn learner_mut(&mut self) -> &mut LearnerState {
        &mut self.learner
    }

    fn predict_features(&mut self, features: &[f64]) -> f64 {
        let raw = self.forward(features);
        self.learner.finish_prediction(raw)
    }

    fn train_features(&mut self, features: &[f64], label: bool) -> f64 {
        let config = *self.learner.config();
        let probability = config.clamp_probability(self.forward(features));
        let err = probability - label_value(label);
        let (lr, l2) = (config.learning_rate, config.l2);

        let Weights {
            hidden,
            output,
            output_bias,
        } = &mut self.weights;

        *output_bias -= lr * err;
        for ((unit, out), activation) in hidden
            .iter_mut()
            .zip(output.iter_mut())
            .zip(&self.activations)
        {
            let previous = *out;
            *out -= lr * (err * activation + l2 * previous);

            // ReLU gate: inactive units pass no gradient to their inputs.
            if *activation <= 0.0 {
                continue;
            }
            let grad = err * previous;
            for (index, weight) in unit.iter_mut().enumerate() {
                let x = feature(features, index);
                *weight -= lr * (grad * x + l2 * *weight);
            }
        }
        self.learner.steps += 1;

        self.predict_features(features)
    }

    fn reset(&mut self) {
        self.weights = self.initial.clone();
        self.activations.fill(0.0);
        self.learner.reset();
    }
}
