#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Fatigue and focus estimator driven by reaction times and failure streaks.
//!
//! The estimator is a small heuristic rather than a model: reaction times feed
//! an exponentially weighted average, consecutive failures push fatigue up with
//! a growing gain, and the passage of time either recovers or drains the player
//! depending on the context supplied every tick. Focus is derived from the
//! other quantities after every mutation.

use adaptive_play_core::ConfigError;
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

const SESSION_OPEN_FATIGUE: f64 = 0.35;
const SESSION_OPEN_FOCUS: f64 = 0.65;
const NEUTRAL_RT_NORM: f64 = 0.5;
const STREAK_SATURATION: f64 = 6.0;
const STREAK_GAIN_CAP: u32 = 8;

/// Tunables for [`FatigueFocusEstimator`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FatigueConfig {
    /// Weight of the newest reaction time in the moving average.
    pub rt_alpha: f64,
    /// Fatigue gained per second while health is low.
    pub low_hp_gain_per_sec: f64,
    /// Fatigue shed per second while fever mode is active.
    pub fever_relief_per_sec: f64,
    /// Fatigue shed per second while no failure streak is running.
    pub idle_decay_per_sec: f64,
    /// Fatigue shed on every hit.
    pub hit_relief: f64,
    /// Base fatigue added per consecutive failure.
    pub streak_gain: f64,
    /// Fatigue shed when the player stabilises.
    pub stabilize_relief: f64,
    /// Reaction time that maps to a fully rested player.
    pub rt_good_ms: f64,
    /// Reaction time that maps to an exhausted player.
    pub rt_bad_ms: f64,
}

impl Default for FatigueConfig {
    fn default() -> Self {
        Self {
            rt_alpha: 0.2,
            low_hp_gain_per_sec: 0.04,
            fever_relief_per_sec: 0.06,
            idle_decay_per_sec: 0.02,
            hit_relief: 0.01,
            streak_gain: 0.03,
            stabilize_relief: 0.06,
            rt_good_ms: 380.0,
            rt_bad_ms: 900.0,
        }
    }
}

impl FatigueConfig {
    /// Checks that every rate is a fraction and the reference reaction times are ordered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("rt_alpha", self.rt_alpha),
            ("low_hp_gain_per_sec", self.low_hp_gain_per_sec),
            ("fever_relief_per_sec", self.fever_relief_per_sec),
            ("idle_decay_per_sec", self.idle_decay_per_sec),
            ("hit_relief", self.hit_relief),
            ("streak_gain", self.streak_gain),
            ("stabilize_relief", self.stabilize_relief),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::FractionOutOfRange { name, value });
            }
        }
        if !self.rt_good_ms.is_finite() || !self.rt_bad_ms.is_finite() {
            return Err(ConfigError::NonFiniteBounds {
                field: "reference_rt_ms",
            });
        }
        if self.rt_good_ms >= self.rt_bad_ms {
            return Err(ConfigError::InvertedBounds {
                field: "reference_rt_ms",
                min: self.rt_good_ms,
                max: self.rt_bad_ms,
            });
        }
        Ok(())
    }
}

/// Category of failure reported to [`FatigueFocusEstimator::on_miss`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MissKind {
    /// The target expired before the player reacted.
    Timeout,
    /// Any other failure: a wrong target, a bomb or a plain miss.
    Other,
}

/// Per-tick context for [`FatigueFocusEstimator::step`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepContext {
    /// Whether the player is on low health.
    pub low_hp: bool,
    /// Whether fever mode is running.
    pub fever_on: bool,
}

/// Complete estimator state.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FatigueFocusState {
    /// Fatigue in `[0, 1]`.
    pub fatigue: f64,
    /// Focus in `[0, 1]`.
    pub focus: f64,
    /// Moving average of reaction times, once one has been observed.
    pub rt_ewma: Option<f64>,
    /// Consecutive non-timeout failures.
    pub miss_streak: u32,
    /// Consecutive timeouts.
    pub timeout_streak: u32,
}

impl FatigueFocusState {
    /// State of a freshly opened session.
    #[must_use]
    pub const fn session_open() -> Self {
        Self {
            fatigue: SESSION_OPEN_FATIGUE,
            focus: SESSION_OPEN_FOCUS,
            rt_ewma: None,
            miss_streak: 0,
            timeout_streak: 0,
        }
    }
}

impl Default for FatigueFocusState {
    fn default() -> Self {
        Self::session_open()
    }
}

/// Read-only view handed to the director and UI.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FatigueFocusSnapshot {
    /// Fatigue in `[0, 1]`.
    pub fatigue: f64,
    /// Focus in `[0, 1]`.
    pub focus: f64,
}

/// Heuristic estimator of player fatigue and focus.
#[derive(Clone, Debug)]
pub struct FatigueFocusEstimator {
    config: FatigueConfig,
    state: FatigueFocusState,
}

impl FatigueFocusEstimator {
    /// Creates an estimator in the session-open state.
    pub fn new(config: FatigueConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            state: FatigueFocusState::session_open(),
        })
    }

    /// Configuration the estimator was built with.
    #[must_use]
    pub const fn config(&self) -> &FatigueConfig {
        &self.config
    }

    /// Full estimator state.
    #[must_use]
    pub const fn state(&self) -> &FatigueFocusState {
        &self.state
    }

    /// Current fatigue and focus.
    #[must_use]
    pub const fn snapshot(&self) -> FatigueFocusSnapshot {
        FatigueFocusSnapshot {
            fatigue: self.state.fatigue,
            focus: self.state.focus,
        }
    }

    /// Advances the estimator by `dt_s` seconds.
    ///
    /// Negative or non-finite durations are treated as zero.
    pub fn step(&mut self, dt_s: f64, ctx: StepContext) {
        let dt_s = if dt_s.is_finite() && dt_s > 0.0 {
            dt_s
        } else {
            if dt_s != 0.0 {
                warn!(dt_s, "ignoring invalid fatigue step duration");
            }
            0.0
        };

        let mut fatigue = self.state.fatigue;
        if ctx.low_hp {
            fatigue += self.config.low_hp_gain_per_sec * dt_s;
        }
        if ctx.fever_on {
            fatigue -= self.config.fever_relief_per_sec * dt_s;
        }
        if self.state.miss_streak == 0 && self.state.timeout_streak == 0 {
            fatigue -= self.config.idle_decay_per_sec * dt_s;
        }
        self.set_fatigue(fatigue);
    }

    /// Records a hit. Invalid reaction times leave the moving average untouched.
    pub fn on_hit(&mut self, reaction_time_ms: Option<f64>) {
        if let Some(rt) = reaction_time_ms.filter(|rt| rt.is_finite() && *rt >= 0.0) {
            self.state.rt_ewma = Some(match self.state.rt_ewma {
                Some(previous) => previous + (rt - previous) * self.config.rt_alpha,
                None => rt,
            });
        }
        self.state.miss_streak = 0;
        self.state.timeout_streak = 0;
        self.set_fatigue(self.state.fatigue - self.config.hit_relief);
    }

    /// Records a failure and grows the matching streak.
    pub fn on_miss(&mut self, kind: MissKind) {
        let streak = match kind {
            MissKind::Timeout => {
                self.state.timeout_streak = self.state.timeout_streak.saturating_add(1);
                self.state.timeout_streak
            }
            MissKind::Other => {
                self.state.miss_streak = self.state.miss_streak.saturating_add(1);
                self.state.miss_streak
            }
        };
        let gain =
            self.config.streak_gain * (0.6 + 0.08 * f64::from(streak.min(STREAK_GAIN_CAP)));
        trace!(?kind, streak, gain, "failure streak grew");
        self.set_fatigue(self.state.fatigue + gain);
    }

    /// Partial recovery: fatigue drops and each streak shrinks by one.
    pub fn on_stabilize(&mut self) {
        self.state.miss_streak = self.state.miss_streak.saturating_sub(1);
        self.state.timeout_streak = self.state.timeout_streak.saturating_sub(1);
        self.set_fatigue(self.state.fatigue - self.config.stabilize_relief);
    }

    /// Restores the session-open state.
    pub fn reset(&mut self) {
        self.state = FatigueFocusState::session_open();
    }

    fn set_fatigue(&mut self, fatigue: f64) {
        self.state.fatigue = if fatigue.is_finite() {
            fatigue.clamp(0.0, 1.0)
        } else {
            SESSION_OPEN_FATIGUE
        };
        self.state.focus = self.focus();
    }

    fn rt_norm(&self) -> f64 {
        self.state.rt_ewma.map_or(NEUTRAL_RT_NORM, |rt| {
            ((rt - self.config.rt_good_ms) / (self.config.rt_bad_ms - self.config.rt_good_ms))
                .clamp(0.0, 1.0)
        })
    }

    fn focus(&self) -> f64 {
        let streaks = f64::from(self.state.miss_streak) + f64::from(self.state.timeout_streak);
        let streak_norm = (streaks / STREAK_SATURATION).clamp(0.0, 1.0);
        (1.0 - (0.55 * self.state.fatigue + 0.30 * self.rt_norm() + 0.25 * streak_norm))
            .clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn estimator() -> FatigueFocusEstimator {
        FatigueFocusEstimator::new(FatigueConfig::default()).expect("default config")
    }

    #[test]
    fn starts_at_session_open_defaults() {
        let estimator = estimator();
        assert_eq!(
            estimator.snapshot(),
            FatigueFocusSnapshot {
                fatigue: 0.35,
                focus: 0.65
            }
        );
        assert_eq!(estimator.state().rt_ewma, None);
    }

    #[test]
    fn first_hit_seeds_average_and_later_hits_blend() {
        let mut estimator = estimator();
        estimator.on_hit(Some(500.0));
        assert_eq!(estimator.state().rt_ewma, Some(500.0));
        estimator.on_hit(Some(1_000.0));
        let average = estimator.state().rt_ewma.expect("average");
        assert!((average - 600.0).abs() < 1e-9);
    }

    #[test]
    fn invalid_reaction_time_is_ignored() {
        let mut estimator = estimator();
        estimator.on_hit(Some(f64::NAN));
        estimator.on_hit(Some(-1.0));
        assert_eq!(estimator.state().rt_ewma, None);
    }

    #[test]
    fn streak_gain_grows_then_caps() {
        let mut estimator = FatigueFocusEstimator::new(FatigueConfig::default()).expect("config");
        estimator.on_miss(MissKind::Other);
        let first = estimator.state().fatigue - 0.35;
        assert!((first - 0.03 * 0.68).abs() < 1e-12);

        for _ in 0..7 {
            estimator.on_miss(MissKind::Other);
        }
        let before = estimator.state().fatigue;
        estimator.on_miss(MissKind::Other);
        let capped = estimator.state().fatigue - before;
        assert!((capped - 0.03 * 1.24).abs() < 1e-12);
        assert_eq!(estimator.state().miss_streak, 9);
        assert_eq!(estimator.state().timeout_streak, 0);
    }

    #[test]
    fn hit_clears_both_streaks() {
        let mut estimator = estimator();
        estimator.on_miss(MissKind::Timeout);
        estimator.on_miss(MissKind::Other);
        estimator.on_hit(None);
        assert_eq!(estimator.state().miss_streak, 0);
        assert_eq!(estimator.state().timeout_streak, 0);
    }

    #[test]
    fn stabilize_only_decrements_streaks() {
        let mut estimator = estimator();
        for _ in 0..3 {
            estimator.on_miss(MissKind::Timeout);
        }
        estimator.on_stabilize();
        assert_eq!(estimator.state().timeout_streak, 2);
        estimator.on_stabilize();
        estimator.on_stabilize();
        estimator.on_stabilize();
        assert_eq!(estimator.state().timeout_streak, 0);
    }

    #[test]
    fn idle_decay_only_applies_without_streaks() {
        let mut estimator = estimator();
        estimator.step(1.0, StepContext::default());
        assert!((estimator.state().fatigue - 0.33).abs() < 1e-12);

        estimator.on_miss(MissKind::Timeout);
        let before = estimator.state().fatigue;
        estimator.step(5.0, StepContext::default());
        assert_eq!(estimator.state().fatigue, before);
    }

    #[test]
    fn low_health_drains_and_fever_restores() {
        let mut estimator = estimator();
        estimator.on_miss(MissKind::Other);
        let before = estimator.state().fatigue;
        estimator.step(
            2.0,
            StepContext {
                low_hp: true,
                fever_on: false,
            },
        );
        assert!((estimator.state().fatigue - (before + 0.08)).abs() < 1e-12);

        estimator.step(
            1.0,
            StepContext {
                low_hp: false,
                fever_on: true,
            },
        );
        assert!((estimator.state().fatigue - (before + 0.02)).abs() < 1e-12);
    }

    #[test]
    fn invalid_durations_do_nothing() {
        let mut estimator = estimator();
        estimator.step(f64::NAN, StepContext::default());
        estimator.step(-3.0, StepContext::default());
        assert_eq!(estimator.state().fatigue, 0.35);
    }

    #[test]
    fn values_stay_in_unit_range_under_extremes() {
        let mut estimator = estimator();
        for _ in 0..200 {
            estimator.on_miss(MissKind::Timeout);
            estimator.step(
                10.0,
                StepContext {
                    low_hp: true,
                    fever_on: false,
                },
            );
        }
        assert_eq!(estimator.state().fatigue, 1.0);
        assert!((estimator.state().focus - 0.05).abs() < 1e-12);

        for _ in 0..200 {
            estimator.on_hit(Some(0.0));
            estimator.step(
                10.0,
                StepContext {
                    low_hp: false,
                    fever_on: true,
                },
            );
        }
        assert_eq!(estimator.state().fatigue, 0.0);
        assert_eq!(estimator.state().focus, 1.0);
    }

    #[test]
    fn reset_restores_session_open_state() {
        let mut estimator = estimator();
        estimator.on_hit(Some(450.0));
        estimator.on_miss(MissKind::Timeout);
        estimator.reset();
        assert_eq!(*estimator.state(), FatigueFocusState::session_open());
    }

    #[test]
    fn inverted_reference_times_are_rejected() {
        let config = FatigueConfig {
            rt_good_ms: 900.0,
            rt_bad_ms: 380.0,
            ..FatigueConfig::default()
        };
        assert!(matches!(
            FatigueFocusEstimator::new(config),
            Err(ConfigError::InvertedBounds { .. })
        ));
    }
}
