use adaptive_play_core::{DirectorOutput, Outcome, OutcomeEvent, Phase, TargetKind};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const FAST_RT_MS: f64 = 260.0;
const SLOW_RT_MS: f64 = 820.0;
const RT_JITTER_MS: f64 = 140.0;
const FATIGUE_RT_PENALTY_MS: f64 = 180.0;
const DAMAGE: f64 = 0.08;
const HEAL: f64 = 0.2;
const FEVER_STREAK: u32 = 10;
const ZONES: f64 = 6.0;

/// A target as the player sees it.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Encounter {
    /// Session time the target appeared.
    pub(crate) now_ms: u64,
    /// Kind of target.
    pub(crate) target: TargetKind,
    /// Horizontal spawn position in `[0, 1]`.
    pub(crate) x: f64,
    /// Time the target stays on screen.
    pub(crate) lifetime_ms: u64,
    /// Session phase.
    pub(crate) phase: Phase,
}

/// Scripted stand-in for a human player, driven by its own RNG so the session
/// RNG stays untouched.
#[derive(Debug)]
pub(crate) struct ScriptedPlayer {
    rng: ChaCha8Rng,
    skill: f64,
    hp: f64,
    hit_streak: u32,
}

impl ScriptedPlayer {
    /// Creates a player with `skill` in `[0, 1]` at full health.
    pub(crate) fn new(seed: u64, skill: f64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            skill: if skill.is_finite() {
                skill.clamp(0.0, 1.0)
            } else {
                0.5
            },
            hp: 1.0,
            hit_streak: 0,
        }
    }

    /// Current health fraction.
    pub(crate) const fn hp(&self) -> f64 {
        self.hp
    }

    /// Whether the player is in fever mode.
    pub(crate) const fn fever_active(&self) -> bool {
        self.hit_streak >= FEVER_STREAK
    }

    /// Decides how the player handles `encounter`.
    ///
    /// The player reacts more slowly when tired and misses small targets more
    /// often. Hazards count as hits when left alone.
    pub(crate) fn resolve(
        &mut self,
        encounter: &Encounter,
        output: &DirectorOutput,
        fatigue: f64,
    ) -> OutcomeEvent {
        let Encounter {
            now_ms,
            target,
            x,
            lifetime_ms,
            phase,
        } = *encounter;
        let size = if output.target_size_mul.is_finite() && output.target_size_mul > 0.0 {
            output.target_size_mul
        } else {
            1.0
        };
        let jitter = self.rng.gen_range(-RT_JITTER_MS..=RT_JITTER_MS);
        let reaction_time_ms = (SLOW_RT_MS - (SLOW_RT_MS - FAST_RT_MS) * self.skill
            + FATIGUE_RT_PENALTY_MS * fatigue
            + jitter)
            / size;
        let reaction_time_ms = reaction_time_ms.max(FAST_RT_MS / 2.0);

        let outcome = if target.is_hazard() {
            let tempted = (1.0 - self.skill) * 0.4 + fatigue * 0.1;
            match (self.rng.gen_bool(tempted.clamp(0.0, 1.0)), target) {
                (true, TargetKind::Bomb) => Outcome::Bomb,
                (true, _) => Outcome::Miss,
                (false, _) => Outcome::Hit,
            }
        } else if reaction_time_ms > lifetime_ms as f64 {
            Outcome::Timeout
        } else {
            let accuracy = (0.35 + 0.6 * self.skill) * size.min(1.2) - 0.15 * fatigue;
            if self.rng.gen_bool(accuracy.clamp(0.02, 0.98)) {
                Outcome::Hit
            } else {
                Outcome::Miss
            }
        };

        match (outcome, target) {
            (Outcome::Hit, TargetKind::Heal) => self.hp = (self.hp + HEAL).min(1.0),
            (Outcome::Hit, _) => {}
            _ => self.hp = (self.hp - DAMAGE).max(0.0),
        }
        if outcome.is_hit() {
            self.hit_streak += 1;
        } else {
            self.hit_streak = 0;
        }

        let mut event = OutcomeEvent::new(now_ms, outcome)
            .with_target(target)
            .with_zone(((x * ZONES) as u8).min(ZONES as u8 - 1))
            .with_phase(phase)
            .with_player_hp(self.hp)
            .with_fever(self.fever_active());
        if outcome != Outcome::Timeout && !target.is_hazard() {
            event = event.with_reaction_time(reaction_time_ms);
        }
        event
    }

    /// Time until the next spawn given the adjusted interval bounds.
    pub(crate) fn next_gap(&mut self, min_ms: u64, max_ms: u64) -> u64 {
        if max_ms <= min_ms {
            min_ms
        } else {
            self.rng.gen_range(min_ms..=max_ms)
        }
    }
}
