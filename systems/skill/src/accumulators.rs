use serde::Serialize;

const DEFAULT_ACCURACY: f64 = 0.5;
const DEFAULT_RT_MS: f64 = 520.0;
const FAST_RT_MS: f64 = 220.0;
const SLOW_RT_MS: f64 = 750.0;
const ACCURACY_WEIGHT: f64 = 0.62;
const SPEED_WEIGHT: f64 = 0.38;

/// Geometrically decayed hit and reaction time history.
///
/// Counts are kept as floats so that the periodic decay keeps proportions
/// intact while bounding growth.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RollingAccumulators {
    count: f64,
    hits: f64,
    misses: f64,
    rt_sum: f64,
    rt_count: f64,
    cap: f64,
    decay: f64,
}

impl RollingAccumulators {
    /// Creates empty accumulators that decay by `decay` once `count` exceeds `cap`.
    #[must_use]
    pub const fn new(cap: f64, decay: f64) -> Self {
        Self {
            count: 0.0,
            hits: 0.0,
            misses: 0.0,
            rt_sum: 0.0,
            rt_count: 0.0,
            cap,
            decay,
        }
    }

    /// Adds one resolved action.
    pub fn record(&mut self, hit: bool, reaction_time_ms: Option<f64>) {
        self.count += 1.0;
        if hit {
            self.hits += 1.0;
        } else {
            self.misses += 1.0;
        }
        if let Some(rt) = reaction_time_ms.filter(|rt| rt.is_finite() && *rt >= 0.0) {
            self.rt_sum += rt;
            self.rt_count += 1.0;
        }

        if self.count > self.cap {
            self.count *= self.decay;
            self.hits *= self.decay;
            self.misses *= self.decay;
            self.rt_sum *= self.decay;
            self.rt_count *= self.decay;
        }
    }

    /// Effective number of recorded actions.
    #[must_use]
    pub const fn count(&self) -> f64 {
        self.count
    }

    /// Share of hits; `0.5` before any action.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        let total = self.hits + self.misses;
        if total <= 0.0 {
            return DEFAULT_ACCURACY;
        }
        (self.hits / total).clamp(0.0, 1.0)
    }

    /// Mean reaction time; `520` ms before any measurement.
    #[must_use]
    pub fn mean_rt(&self) -> f64 {
        if self.rt_count <= 0.0 {
            return DEFAULT_RT_MS;
        }
        self.rt_sum / self.rt_count
    }

    /// Mean reaction time mapped from `[220, 750]` ms onto `[0, 1]`.
    #[must_use]
    pub fn rt_norm(&self) -> f64 {
        ((self.mean_rt() - FAST_RT_MS) / (SLOW_RT_MS - FAST_RT_MS)).clamp(0.0, 1.0)
    }

    /// Blend of accuracy and speed.
    #[must_use]
    pub fn skill_score(&self) -> f64 {
        (ACCURACY_WEIGHT * self.accuracy() + SPEED_WEIGHT * (1.0 - self.rt_norm())).clamp(0.0, 1.0)
    }
}
