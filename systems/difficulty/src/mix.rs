use adaptive_play_core::{DirectorOutput, TargetKind};
use serde::{Deserialize, Serialize};

const TOTAL_WEIGHT: f64 = 100.0;
const MIN_NORMAL_WEIGHT: f64 = 38.0;
const BASE_DECOY: f64 = 10.0;
const BASE_BOMB: f64 = 8.0;
const BASE_HEAL: f64 = 9.0;
const BASE_SHIELD: f64 = 9.0;

const MIN_INTERVAL_FLOOR_MS: u64 = 320;
const INTERVAL_SPREAD_MS: u64 = 60;
const LIFETIME_FLOOR_MS: u64 = 520;

const BAND_THRESHOLD: f64 = 0.1;

/// Target-kind spawn weights derived from a director output. Weights sum to 100.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnMix {
    /// Weight of regular targets.
    pub normal: u32,
    /// Weight of decoys.
    pub decoy: u32,
    /// Weight of bombs.
    pub bomb: u32,
    /// Weight of heal pickups.
    pub heal: u32,
    /// Weight of shield pickups.
    pub shield: u32,
}

impl SpawnMix {
    /// Scales hazards with `hazard_mul` and support pickups with its inverse.
    ///
    /// Regular targets take the remainder but never drop below 38 before the
    /// weights are normalised.
    #[must_use]
    pub fn from_output(output: &DirectorOutput) -> Self {
        let hazard = if output.hazard_mul.is_finite() && output.hazard_mul > 0.0 {
            output.hazard_mul
        } else {
            1.0
        };

        let decoy = BASE_DECOY * hazard;
        let bomb = BASE_BOMB * hazard;
        let heal = BASE_HEAL / hazard;
        let shield = BASE_SHIELD / hazard;
        let normal = (TOTAL_WEIGHT - (decoy + bomb + heal + shield)).max(MIN_NORMAL_WEIGHT);

        let scale = TOTAL_WEIGHT / (normal + decoy + bomb + heal + shield);
        let round = |weight: f64| (weight * scale).round() as u32;
        let mut mix = Self {
            normal: round(normal),
            decoy: round(decoy),
            bomb: round(bomb),
            heal: round(heal),
            shield: round(shield),
        };

        let others = mix.decoy + mix.bomb + mix.heal + mix.shield;
        mix.normal = (TOTAL_WEIGHT as u32).saturating_sub(others);
        mix
    }

    /// Sum of all weights.
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.normal + self.decoy + self.bomb + self.heal + self.shield
    }

    /// Weight assigned to `kind`; bosses are scripted and never drawn from the mix.
    #[must_use]
    pub const fn weight(&self, kind: TargetKind) -> u32 {
        match kind {
            TargetKind::Normal => self.normal,
            TargetKind::Decoy => self.decoy,
            TargetKind::Bomb => self.bomb,
            TargetKind::Heal => self.heal,
            TargetKind::Shield => self.shield,
            TargetKind::Boss => 0,
        }
    }
}

impl Default for SpawnMix {
    fn default() -> Self {
        Self::from_output(&DirectorOutput::neutral())
    }
}

/// Spawn cadence and target lifetime in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnTiming {
    /// Shortest gap between two spawns.
    pub interval_min_ms: u64,
    /// Longest gap between two spawns.
    pub interval_max_ms: u64,
    /// Time a target stays on screen.
    pub target_lifetime_ms: u64,
}

impl Default for SpawnTiming {
    fn default() -> Self {
        Self {
            interval_min_ms: 650,
            interval_max_ms: 1_150,
            target_lifetime_ms: 1_600,
        }
    }
}

impl SpawnTiming {
    /// Applies `output` to these base timings.
    ///
    /// Intervals shrink as the spawn rate grows and lifetimes follow the target
    /// size, subject to fixed floors that keep the game playable.
    #[must_use]
    pub fn adjusted(&self, output: &DirectorOutput) -> Self {
        let rate = positive_or_one(output.spawn_rate_mul);
        let size = positive_or_one(output.target_size_mul);
        // `as` saturates, so a vanishing rate pins the interval at `u64::MAX`.
        let scale = |ms: u64, factor: f64| (ms as f64 * factor).round() as u64;

        let interval_min_ms = scale(self.interval_min_ms, 1.0 / rate).max(MIN_INTERVAL_FLOOR_MS);
        let interval_max_ms = scale(self.interval_max_ms, 1.0 / rate)
            .max(interval_min_ms.saturating_add(INTERVAL_SPREAD_MS));
        let target_lifetime_ms = scale(self.target_lifetime_ms, size).max(LIFETIME_FLOOR_MS);

        Self {
            interval_min_ms,
            interval_max_ms,
            target_lifetime_ms,
        }
    }
}

fn positive_or_one(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        1.0
    }
}

/// Coarse label describing how the director is treating the player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntensityBand {
    /// The director is easing off.
    Support,
    /// The director is close to neutral.
    Balance,
    /// The director is pushing the player.
    Challenge,
}

impl IntensityBand {
    /// Classifies `output` by its average departure from neutral toward difficulty.
    #[must_use]
    pub fn from_output(output: &DirectorOutput) -> Self {
        let pressure = ((output.spawn_rate_mul - 1.0)
            + (1.0 - output.target_size_mul)
            + (output.hazard_mul - 1.0))
            / 3.0;
        if pressure > BAND_THRESHOLD {
            Self::Challenge
        } else if pressure < -BAND_THRESHOLD {
            Self::Support
        } else {
            Self::Balance
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(spawn: f64, size: f64, hazard: f64) -> DirectorOutput {
        DirectorOutput {
            spawn_rate_mul: spawn,
            target_size_mul: size,
            hazard_mul: hazard,
            ..DirectorOutput::neutral()
        }
    }

    #[test]
    fn neutral_mix_matches_base_weights() {
        let mix = SpawnMix::default();
        assert_eq!(
            mix,
            SpawnMix {
                normal: 64,
                decoy: 10,
                bomb: 8,
                heal: 9,
                shield: 9
            }
        );
    }

    #[test]
    fn mix_always_sums_to_hundred_and_keeps_normals() {
        for hazard in [0.5, 0.7, 1.0, 1.4, 2.0, f64::NAN] {
            let mix = SpawnMix::from_output(&output(1.0, 1.0, hazard));
            assert_eq!(mix.total(), 100, "hazard {hazard}");
            assert!(mix.normal >= 38, "hazard {hazard}: {mix:?}");
        }
    }

    #[test]
    fn hazards_shift_weight_from_support() {
        let calm = SpawnMix::from_output(&output(1.0, 1.0, 0.7));
        let tense = SpawnMix::from_output(&output(1.0, 1.0, 1.4));
        assert!(tense.bomb > calm.bomb);
        assert!(tense.decoy > calm.decoy);
        assert!(tense.heal < calm.heal);
        assert_eq!(tense.weight(TargetKind::Boss), 0);
    }

    #[test]
    fn timing_respects_floors() {
        let base = SpawnTiming::default();
        let fast = base.adjusted(&output(10.0, 0.1, 1.0));
        assert_eq!(fast.interval_min_ms, 320);
        assert_eq!(fast.interval_max_ms, 380);
        assert_eq!(fast.target_lifetime_ms, 520);

        let neutral = base.adjusted(&DirectorOutput::neutral());
        assert_eq!(neutral, base);
    }

    #[test]
    fn vanishing_spawn_rate_saturates_instead_of_overflowing() {
        let base = SpawnTiming::default();
        let stalled = base.adjusted(&output(1e-20, 1e-30, 1.0));
        assert_eq!(stalled.interval_min_ms, u64::MAX);
        assert_eq!(stalled.interval_max_ms, u64::MAX);
        assert_eq!(stalled.target_lifetime_ms, 520);

        let flooded = base.adjusted(&output(1e300, 1e300, 1.0));
        assert_eq!(flooded.interval_min_ms, 320);
        assert_eq!(flooded.target_lifetime_ms, u64::MAX);
    }

    #[test]
    fn faster_spawn_rate_shortens_intervals() {
        let base = SpawnTiming::default();
        let adjusted = base.adjusted(&output(1.3, 0.85, 1.0));
        assert_eq!(adjusted.interval_min_ms, 500);
        assert_eq!(adjusted.interval_max_ms, 885);
        assert_eq!(adjusted.target_lifetime_ms, 1_360);
    }

    #[test]
    fn bands_classify_pressure() {
        assert_eq!(
            IntensityBand::from_output(&DirectorOutput::neutral()),
            IntensityBand::Balance
        );
        assert_eq!(
            IntensityBand::from_output(&output(1.3, 0.85, 1.3)),
            IntensityBand::Challenge
        );
        assert_eq!(
            IntensityBand::from_output(&output(0.8, 1.15, 0.8)),
            IntensityBand::Support
        );
    }
}
