#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Rolling telemetry window that derives player statistics from outcome events.

use std::collections::VecDeque;

use adaptive_play_core::{ConfigError, Outcome, OutcomeEvent, Stats, TargetKind};
use serde::{Deserialize, Serialize};
use tracing::warn;

const TREND_SCALE_MS: f64 = 500.0;
const MISS_RATE_FLOOR: f64 = 0.25;
const MISS_RATE_SPAN: f64 = 0.35;
const STABILITY_SCALE_MS: f64 = 420.0;

/// Tunables for the rolling telemetry window.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Maximum number of events retained.
    pub capacity: usize,
    /// Events older than the newest event minus this many milliseconds are evicted.
    pub window_ms: Option<u64>,
    /// Health fraction under which the newest event counts as low health.
    pub low_hp_threshold: f64,
    /// Amount added to the fatigue heuristic while health is low.
    pub low_hp_bonus: f64,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            capacity: 40,
            window_ms: Some(30_000),
            low_hp_threshold: 0.35,
            low_hp_bonus: 0.15,
        }
    }
}

impl AggregatorConfig {
    /// Rejects configurations that cannot hold a single event.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::CountOutOfRange {
                name: "capacity",
                value: self.capacity,
                min: 1,
                max: usize::MAX,
            });
        }
        if !(0.0..=1.0).contains(&self.low_hp_threshold) {
            return Err(ConfigError::FractionOutOfRange {
                name: "low_hp_threshold",
                value: self.low_hp_threshold,
            });
        }
        if !(0.0..=1.0).contains(&self.low_hp_bonus) {
            return Err(ConfigError::FractionOutOfRange {
                name: "low_hp_bonus",
                value: self.low_hp_bonus,
            });
        }
        Ok(())
    }
}

/// Bounded window of recent outcome events.
#[derive(Clone, Debug)]
pub struct TelemetryAggregator {
    config: AggregatorConfig,
    window: VecDeque<OutcomeEvent>,
}

impl TelemetryAggregator {
    /// Creates an empty aggregator after validating the configuration.
    pub fn new(config: AggregatorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            window: VecDeque::new(),
        })
    }

    /// Configuration the aggregator was built with.
    #[must_use]
    pub const fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Number of events currently retained.
    #[must_use]
    pub fn len(&self) -> usize {
        self.window.len()
    }

    /// Reports whether the window holds no events.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Iterates the retained events from oldest to newest.
    pub fn events(&self) -> impl Iterator<Item = &OutcomeEvent> + '_ {
        self.window.iter()
    }

    /// Appends an event and evicts whatever falls outside the time window or capacity.
    pub fn push(&mut self, event: OutcomeEvent) {
        if event.has_invalid_reaction_time() {
            warn!(
                t_ms = event.t_ms(),
                "discarding invalid reaction time from telemetry"
            );
        }

        let newest = event.t_ms();
        self.window.push_back(event);

        if let Some(window_ms) = self.config.window_ms {
            let cutoff = newest.saturating_sub(window_ms);
            while self
                .window
                .front()
                .is_some_and(|oldest| oldest.t_ms() < cutoff)
            {
                let _ = self.window.pop_front();
            }
        }

        while self.window.len() > self.config.capacity {
            let _ = self.window.pop_front();
        }
    }

    /// Derives statistics over the current window.
    #[must_use]
    pub fn snapshot(&self) -> Stats {
        let total = self.window.len();
        if total == 0 {
            return Stats::empty();
        }

        let mut misses = 0_usize;
        let mut timeouts = 0_usize;
        let mut bombs = 0_usize;
        let mut decoys = 0_usize;
        let mut reaction_times = Vec::with_capacity(total);

        for event in &self.window {
            let outcome = event.outcome();
            if !outcome.is_hit() {
                misses += 1;
            }
            match outcome {
                Outcome::Timeout => timeouts += 1,
                Outcome::Bomb => bombs += 1,
                Outcome::Hit | Outcome::Miss => {}
            }
            if event.target_kind() == TargetKind::Decoy && !outcome.is_hit() {
                decoys += 1;
            }
            if let Some(rt) = event.reaction_time_ms() {
                reaction_times.push(rt);
            }
        }

        let count = total as f64;
        let miss_rate = misses as f64 / count;
        let (rt_mean, rt_std) = mean_and_std(&reaction_times);
        let rt_trend = trend(&reaction_times);

        let low_hp = self
            .window
            .back()
            .is_some_and(|event| event.player_hp() < self.config.low_hp_threshold);
        let low_hp_bonus = if low_hp {
            self.config.low_hp_bonus
        } else {
            0.0
        };

        let trend_term = (rt_trend.unwrap_or(0.0) / TREND_SCALE_MS).clamp(0.0, 1.0);
        let miss_term = ((miss_rate - MISS_RATE_FLOOR) / MISS_RATE_SPAN).clamp(0.0, 1.0);
        let fatigue_heuristic = (0.5 * trend_term + 0.5 * miss_term + low_hp_bonus).clamp(0.0, 1.0);

        let stability = rt_std.map_or(1.0, |std| 1.0 - (std / STABILITY_SCALE_MS).clamp(0.0, 1.0));

        Stats {
            samples: total,
            accuracy: 1.0 - miss_rate,
            miss_rate,
            timeout_rate: timeouts as f64 / count,
            bomb_rate: bombs as f64 / count,
            decoy_rate: decoys as f64 / count,
            rt_mean,
            rt_std,
            rt_trend,
            fatigue_heuristic,
            stability,
            low_hp,
        }
    }

    /// Empties the window.
    pub fn reset(&mut self) {
        self.window.clear();
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn mean_and_std(values: &[f64]) -> (Option<f64>, Option<f64>) {
    let Some(mean) = mean(values) else {
        return (None, None);
    };
    let variance = values
        .iter()
        .map(|value| (value - mean).powi(2))
        .sum::<f64>()
        / values.len() as f64;
    (Some(mean), Some(variance.sqrt()))
}

/// Later half mean minus earlier half mean; the middle sample of an odd run
/// belongs to the later half.
fn trend(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let (early, late) = values.split_at(values.len() / 2);
    Some(mean(late)? - mean(early)?)
}
