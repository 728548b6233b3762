#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Scripted boss attacks and deterministic spawn placement.
//!
//! [`next_spawn`] is a pure function of the RNG, the step and the context.
//! [`SpawnSpacing`] wraps it with a short memory of recent positions so free
//! spawns spread across the arena.

use adaptive_play_core::{
    ActiveAttack, BossAttackKind, BossAttackLifecycleEvent, BossAttackState, ConfigError,
    DeterministicRng, Phase, PhaseSignal,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

mod spacing;
mod spawn;

pub use spacing::{SpacingConfig, SpawnSpacing, Zone};
pub use spawn::{next_spawn, SpawnContext};

/// Relative odds of each outcome of an attack draw.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhaseWeights {
    /// Odds of skipping this opportunity.
    pub none: f64,
    /// Odds of a storm.
    pub storm: f64,
    /// Odds of a feint.
    pub feint: f64,
    /// Odds of a shield break.
    pub shield_break: f64,
}

impl PhaseWeights {
    /// Creates a weight table.
    #[must_use]
    pub const fn new(none: f64, storm: f64, feint: f64, shield_break: f64) -> Self {
        Self {
            none,
            storm,
            feint,
            shield_break,
        }
    }

    fn table(&self) -> [(Option<BossAttackKind>, f64); 4] {
        [
            (None, self.none),
            (Some(BossAttackKind::Storm), self.storm),
            (Some(BossAttackKind::Feint), self.feint),
            (Some(BossAttackKind::ShieldBreak), self.shield_break),
        ]
    }

    fn validate(&self, name: &'static str) -> Result<(), ConfigError> {
        let weights = [self.none, self.storm, self.feint, self.shield_break];
        let total: f64 = weights.iter().sum();
        if weights.iter().any(|weight| !weight.is_finite() || *weight < 0.0) || total <= 0.0 {
            return Err(ConfigError::NonPositive { name, value: total });
        }
        Ok(())
    }
}

/// Tunables for [`PatternDirector`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    /// Minimum time between the end of one attack opportunity and the next draw.
    pub min_gap_ms: u64,
    /// Duration of a storm.
    pub storm_duration_ms: u64,
    /// Duration of a feint.
    pub feint_duration_ms: u64,
    /// Time allowed to break the shield.
    pub shield_break_duration_ms: u64,
    /// Successes needed to break the shield.
    pub shield_break_needed: u32,
    /// Attack odds during the early phase.
    pub early: PhaseWeights,
    /// Attack odds during the mid phase.
    pub mid: PhaseWeights,
    /// Attack odds during the late phase.
    pub late: PhaseWeights,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            min_gap_ms: 9_000,
            storm_duration_ms: 6_000,
            feint_duration_ms: 2_500,
            shield_break_duration_ms: 8_000,
            shield_break_needed: 6,
            early: PhaseWeights::new(5.0, 3.0, 0.0, 0.0),
            mid: PhaseWeights::new(3.0, 3.0, 2.0, 1.0),
            late: PhaseWeights::new(1.0, 3.0, 3.0, 3.0),
        }
    }
}

impl PatternConfig {
    /// Validates durations, the success requirement and every weight table.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("storm_duration_ms", self.storm_duration_ms),
            ("feint_duration_ms", self.feint_duration_ms),
            ("shield_break_duration_ms", self.shield_break_duration_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::NonPositive {
                    name,
                    value: value as f64,
                });
            }
        }
        if self.shield_break_needed == 0 {
            return Err(ConfigError::CountOutOfRange {
                name: "shield_break_needed",
                value: 0,
                min: 1,
                max: u32::MAX as usize,
            });
        }
        self.early.validate("early")?;
        self.mid.validate("mid")?;
        self.late.validate("late")?;
        Ok(())
    }

    /// Weight table for `phase`.
    #[must_use]
    pub const fn weights(&self, phase: Phase) -> &PhaseWeights {
        match phase {
            Phase::Early => &self.early,
            Phase::Mid => &self.mid,
            Phase::Late => &self.late,
        }
    }

    const fn duration_ms(&self, kind: BossAttackKind) -> u64 {
        match kind {
            BossAttackKind::Storm => self.storm_duration_ms,
            BossAttackKind::Feint => self.feint_duration_ms,
            BossAttackKind::ShieldBreak => self.shield_break_duration_ms,
        }
    }

    const fn needed(&self, kind: BossAttackKind) -> u32 {
        if kind.is_progress() {
            self.shield_break_needed
        } else {
            0
        }
    }
}

/// Result of a [`PatternDirector::tick`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternTick {
    /// Attack that began during this tick.
    pub started: Option<BossAttackKind>,
    /// Attack that expired during this tick.
    pub ended: Option<BossAttackKind>,
    /// Attack running after the tick.
    pub active: Option<ActiveAttack>,
}

impl PatternTick {
    /// Lifecycle events described by this tick, expiry first.
    #[must_use]
    pub fn lifecycle_events(&self) -> Vec<BossAttackLifecycleEvent> {
        let expired = self
            .ended
            .map(|kind| BossAttackLifecycleEvent::Expired { kind });
        let started = self
            .started
            .map(|kind| BossAttackLifecycleEvent::Started { kind });
        expired.into_iter().chain(started).collect()
    }
}

/// Boss attack script.
#[derive(Clone, Debug)]
pub struct PatternDirector {
    config: PatternConfig,
    state: BossAttackState,
    last_attack_at: u64,
}

impl PatternDirector {
    /// Creates an idle script.
    pub fn new(config: PatternConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            state: BossAttackState::Idle,
            last_attack_at: 0,
        })
    }

    /// Configuration the script was built with.
    #[must_use]
    pub const fn config(&self) -> &PatternConfig {
        &self.config
    }

    /// Current script state.
    #[must_use]
    pub const fn state(&self) -> &BossAttackState {
        &self.state
    }

    /// Session time the gap before the next draw is measured from.
    #[must_use]
    pub const fn last_attack_at(&self) -> u64 {
        self.last_attack_at
    }

    /// Reports whether a storm is running.
    #[must_use]
    pub fn storm_active(&self) -> bool {
        self.state
            .active()
            .is_some_and(|attack| attack.kind == BossAttackKind::Storm)
    }

    /// Expires a finished attack, then draws a new one once the gap has elapsed.
    ///
    /// At most one draw is taken from `rng` per tick.
    pub fn tick<R>(&mut self, now_ms: u64, signal: PhaseSignal, rng: &mut R) -> PatternTick
    where
        R: DeterministicRng,
    {
        let mut tick = PatternTick::default();

        if let Some(attack) = self.state.active().copied() {
            if now_ms >= attack.ends_at {
                info!(kind = ?attack.kind, now_ms, "boss attack expired");
                self.state = BossAttackState::Idle;
                self.last_attack_at = now_ms;
                tick.ended = Some(attack.kind);
            }
        }

        if self.state.active().is_none()
            && now_ms.saturating_sub(self.last_attack_at) >= self.config.min_gap_ms
        {
            let table = self.config.weights(signal.phase).table();
            match rng.pick_weighted(&table).flatten() {
                Some(kind) => {
                    let attack = ActiveAttack {
                        kind,
                        started_at: now_ms,
                        ends_at: now_ms.saturating_add(self.config.duration_ms(kind)),
                        progress: 0,
                        needed: self.config.needed(kind),
                    };
                    info!(?kind, now_ms, ends_at = attack.ends_at, "boss attack started");
                    self.state = BossAttackState::Active(attack);
                    tick.started = Some(kind);
                }
                None => {
                    debug!(now_ms, phase = ?signal.phase, "attack draw chose to wait");
                    self.last_attack_at = now_ms;
                }
            }
        }

        tick.active = self.state.active().copied();
        tick
    }

    /// Counts a player success toward a running progress attack.
    pub fn on_player_success(&mut self, now_ms: u64, out: &mut Vec<BossAttackLifecycleEvent>) {
        let BossAttackState::Active(attack) = &mut self.state else {
            return;
        };
        if !attack.kind.is_progress() {
            return;
        }

        attack.progress = (attack.progress + 1).min(attack.needed);
        out.push(BossAttackLifecycleEvent::Progress {
            got: attack.progress,
            need: attack.needed,
        });

        if attack.progress >= attack.needed {
            let kind = attack.kind;
            info!(?kind, now_ms, "boss attack completed");
            out.push(BossAttackLifecycleEvent::Completed { kind });
            self.state = BossAttackState::Idle;
            self.last_attack_at = now_ms;
        }
    }

    /// Aborts a running attack after a wrong player action.
    pub fn on_wrong_action(&mut self, now_ms: u64, out: &mut Vec<BossAttackLifecycleEvent>) {
        let Some(attack) = self.state.active().copied() else {
            return;
        };
        info!(kind = ?attack.kind, now_ms, "boss attack reset by wrong action");
        out.push(BossAttackLifecycleEvent::Reset { kind: attack.kind });
        self.state = BossAttackState::Idle;
        self.last_attack_at = now_ms;
    }

    /// Returns to idle with the gap measured from time zero.
    pub fn reset(&mut self) {
        self.state = BossAttackState::Idle;
        self.last_attack_at = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adaptive_play_core::SeededRng;

    fn late() -> PhaseSignal {
        PhaseSignal {
            phase: Phase::Late,
            boss_active: true,
        }
    }

    fn always(kind: BossAttackKind) -> PatternConfig {
        let weights = match kind {
            BossAttackKind::Storm => PhaseWeights::new(0.0, 1.0, 0.0, 0.0),
            BossAttackKind::Feint => PhaseWeights::new(0.0, 0.0, 1.0, 0.0),
            BossAttackKind::ShieldBreak => PhaseWeights::new(0.0, 0.0, 0.0, 1.0),
        };
        PatternConfig {
            early: weights,
            mid: weights,
            late: weights,
            ..PatternConfig::default()
        }
    }

    #[test]
    fn no_draw_before_gap_elapses() {
        let mut director = PatternDirector::new(PatternConfig::default()).expect("config");
        let mut rng = SeededRng::seed("gap");
        let before = rng.state();
        let tick = director.tick(8_999, late(), &mut rng);
        assert_eq!(tick, PatternTick::default());
        assert_eq!(rng.state(), before);
    }

    #[test]
    fn attack_starts_and_expires() {
        let mut director =
            PatternDirector::new(always(BossAttackKind::Storm)).expect("config");
        let mut rng = SeededRng::seed("storm");

        let tick = director.tick(9_000, late(), &mut rng);
        assert_eq!(tick.started, Some(BossAttackKind::Storm));
        assert!(director.storm_active());
        assert_eq!(
            tick.lifecycle_events(),
            vec![BossAttackLifecycleEvent::Started {
                kind: BossAttackKind::Storm
            }]
        );

        let running = director.tick(14_999, late(), &mut rng);
        assert_eq!(running.ended, None);
        assert!(running.active.is_some());

        let expired = director.tick(15_000, late(), &mut rng);
        assert_eq!(expired.ended, Some(BossAttackKind::Storm));
        assert_eq!(expired.started, None);
        assert_eq!(director.last_attack_at(), 15_000);
        assert_eq!(*director.state(), BossAttackState::Idle);
    }

    #[test]
    fn success_without_progress_attack_is_noop() {
        let mut director = PatternDirector::new(always(BossAttackKind::Feint)).expect("config");
        let mut rng = SeededRng::seed("noop");
        let mut out = Vec::new();

        director.on_player_success(0, &mut out);
        assert!(out.is_empty());

        let _ = director.tick(9_000, late(), &mut rng);
        director.on_player_success(9_100, &mut out);
        assert!(out.is_empty());
        assert!(director.state().active().is_some());
    }

    #[test]
    fn shield_break_completes_after_needed_successes() {
        let mut director =
            PatternDirector::new(always(BossAttackKind::ShieldBreak)).expect("config");
        let mut rng = SeededRng::seed("shield");
        let mut out = Vec::new();

        let _ = director.tick(9_000, late(), &mut rng);
        for _ in 0..6 {
            director.on_player_success(9_500, &mut out);
        }

        assert_eq!(out.len(), 7);
        assert_eq!(out[0], BossAttackLifecycleEvent::Progress { got: 1, need: 6 });
        assert_eq!(out[5], BossAttackLifecycleEvent::Progress { got: 6, need: 6 });
        assert_eq!(
            out[6],
            BossAttackLifecycleEvent::Completed {
                kind: BossAttackKind::ShieldBreak
            }
        );
        assert_eq!(*director.state(), BossAttackState::Idle);
        assert_eq!(director.last_attack_at(), 9_500);
    }

    #[test]
    fn wrong_action_resets_running_attack() {
        let mut director =
            PatternDirector::new(always(BossAttackKind::ShieldBreak)).expect("config");
        let mut rng = SeededRng::seed("wrong");
        let mut out = Vec::new();

        director.on_wrong_action(100, &mut out);
        assert!(out.is_empty());

        let _ = director.tick(9_000, late(), &mut rng);
        director.on_player_success(9_100, &mut out);
        director.on_wrong_action(9_200, &mut out);
        assert_eq!(
            out.last(),
            Some(&BossAttackLifecycleEvent::Reset {
                kind: BossAttackKind::ShieldBreak
            })
        );
        assert_eq!(*director.state(), BossAttackState::Idle);
    }

    #[test]
    fn waiting_draw_restarts_gap() {
        let config = PatternConfig {
            early: PhaseWeights::new(1.0, 0.0, 0.0, 0.0),
            ..PatternConfig::default()
        };
        let mut director = PatternDirector::new(config).expect("config");
        let mut rng = SeededRng::seed("wait");
        let signal = PhaseSignal::default();

        let tick = director.tick(10_000, signal, &mut rng);
        assert_eq!(tick.started, None);
        assert_eq!(director.last_attack_at(), 10_000);

        let before = rng.state();
        let _ = director.tick(18_000, signal, &mut rng);
        assert_eq!(rng.state(), before);
    }

    #[test]
    fn early_phase_never_draws_feints_or_shields() {
        let mut director = PatternDirector::new(PatternConfig::default()).expect("config");
        let mut rng = SeededRng::seed("early");
        let mut now_ms = 0;
        for _ in 0..300 {
            now_ms += 10_000;
            let tick = director.tick(now_ms, PhaseSignal::default(), &mut rng);
            if let Some(kind) = tick.started {
                assert_eq!(kind, BossAttackKind::Storm);
            }
        }
    }

    #[test]
    fn reset_returns_to_idle() {
        let mut director = PatternDirector::new(always(BossAttackKind::Storm)).expect("config");
        let mut rng = SeededRng::seed("reset");
        let _ = director.tick(9_000, late(), &mut rng);
        director.reset();
        assert_eq!(*director.state(), BossAttackState::Idle);
        assert_eq!(director.last_attack_at(), 0);
    }

    #[test]
    fn empty_weight_tables_are_rejected() {
        let config = PatternConfig {
            mid: PhaseWeights::new(0.0, 0.0, 0.0, 0.0),
            ..PatternConfig::default()
        };
        assert!(matches!(
            PatternDirector::new(config),
            Err(ConfigError::NonPositive { name: "mid", .. })
        ));
    }
}
