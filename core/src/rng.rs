use std::f64::consts::TAU;

/// Fallback state used when a seed string is empty or hashes to zero.
pub const DEFAULT_SEED: u32 = 0x6d2b_79f5;

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;
const MULBERRY_INCREMENT: u32 = 0x6d2b_79f5;
const UNIT_SCALE: f64 = 1.0 / 4_294_967_296.0;

/// Source of reproducible uniform draws shared by every decision-layer consumer.
///
/// Only [`DeterministicRng::next_f64`] is required; the remaining helpers are
/// built on top of it so that every consumer spends draws the same way.
pub trait DeterministicRng {
    /// Returns the next uniform sample in `[0, 1)`.
    fn next_f64(&mut self) -> f64;

    /// Returns a uniform sample in `[low, high)`.
    fn next_range(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.next_f64()
    }

    /// Returns `true` with probability `p`.
    fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Picks an index in `0..len` using a single draw. Returns `0` when `len` is zero.
    fn pick_index(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        let index = (self.next_f64() * len as f64) as usize;
        index.min(len - 1)
    }

    /// Picks an item proportionally to its weight using a single draw.
    ///
    /// Non-positive and non-finite weights never win. Returns `None` when no
    /// item carries positive weight.
    fn pick_weighted<T: Copy>(&mut self, items: &[(T, f64)]) -> Option<T> {
        let total: f64 = items
            .iter()
            .map(|(_, weight)| sanitize_weight(*weight))
            .sum();
        if total <= 0.0 {
            return None;
        }

        let mut remaining = self.next_f64() * total;
        let mut last = None;
        for (item, weight) in items {
            let weight = sanitize_weight(*weight);
            if weight <= 0.0 {
                continue;
            }
            last = Some(*item);
            if remaining < weight {
                return Some(*item);
            }
            remaining -= weight;
        }
        last
    }

    /// Samples a standard normal value via Box–Muller, spending two draws.
    fn next_standard_normal(&mut self) -> f64 {
        let mut u1 = self.next_f64();
        while u1 <= 0.0 {
            u1 = self.next_f64();
        }
        let u2 = self.next_f64();
        (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos()
    }
}

fn sanitize_weight(weight: f64) -> f64 {
    if weight.is_finite() && weight > 0.0 {
        weight
    } else {
        0.0
    }
}

/// Canonical Mulberry32 generator seeded through a 32-bit FNV-1a string hash.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeededRng {
    state: u32,
}

impl SeededRng {
    /// Seeds the generator from an arbitrary session string.
    ///
    /// Empty strings and strings hashing to zero use [`DEFAULT_SEED`].
    #[must_use]
    pub fn seed(seed: &str) -> Self {
        if seed.is_empty() {
            return Self::from_state(DEFAULT_SEED);
        }
        Self::from_state(fnv1a32(seed.as_bytes()))
    }

    /// Creates a generator from a raw 32-bit state, replacing zero with [`DEFAULT_SEED`].
    #[must_use]
    pub const fn from_state(state: u32) -> Self {
        let state = if state == 0 { DEFAULT_SEED } else { state };
        Self { state }
    }

    /// Current internal state, suitable for snapshots and replay diagnostics.
    #[must_use]
    pub const fn state(&self) -> u32 {
        self.state
    }

    /// Advances the generator and returns the next 32-bit output.
    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(MULBERRY_INCREMENT);
        let t = self.state;
        let mut r = (t ^ (t >> 15)).wrapping_mul(t | 1);
        r ^= r.wrapping_add((r ^ (r >> 7)).wrapping_mul(r | 61));
        r ^ (r >> 14)
    }
}

impl DeterministicRng for SeededRng {
    fn next_f64(&mut self) -> f64 {
        f64::from(self.next_u32()) * UNIT_SCALE
    }
}

/// 32-bit FNV-1a hash of the provided bytes.
#[must_use]
pub fn fnv1a32(bytes: &[u8]) -> u32 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u32::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fnv_matches_reference_vectors() {
        assert_eq!(fnv1a32(b""), 0x811c_9dc5);
        assert_eq!(fnv1a32(b"a"), 0xe40c_292c);
        assert_eq!(fnv1a32(b"foobar"), 0xbf9c_f968);
    }

    #[test]
    fn empty_seed_uses_default_state() {
        assert_eq!(SeededRng::seed("").state(), DEFAULT_SEED);
        assert_eq!(SeededRng::from_state(0).state(), DEFAULT_SEED);
    }

    #[test]
    fn identical_seeds_replay_identical_sequences() {
        let mut first = SeededRng::seed("RB|S1|director");
        let mut second = SeededRng::seed("RB|S1|director");
        for _ in 0..256 {
            assert_eq!(first.next_u32(), second.next_u32());
        }
    }

    #[test]
    fn different_seeds_diverge() {
        let mut first = SeededRng::seed("alpha");
        let mut second = SeededRng::seed("beta");
        let a: Vec<u32> = (0..8).map(|_| first.next_u32()).collect();
        let b: Vec<u32> = (0..8).map(|_| second.next_u32()).collect();
        assert_ne!(a, b);
    }

    #[test]
    fn unit_draws_stay_in_half_open_interval() {
        let mut rng = SeededRng::seed("unit");
        let mut sum = 0.0;
        for _ in 0..10_000 {
            let value = rng.next_f64();
            assert!((0.0..1.0).contains(&value));
            sum += value;
        }
        let mean = sum / 10_000.0;
        assert!((mean - 0.5).abs() < 0.02, "mean drifted: {mean}");
    }

    #[test]
    fn weighted_pick_skips_zero_weights() {
        let mut rng = SeededRng::seed("weights");
        for _ in 0..500 {
            let picked = rng.pick_weighted(&[('a', 0.0), ('b', 2.0), ('c', f64::NAN)]);
            assert_eq!(picked, Some('b'));
        }
        assert_eq!(rng.pick_weighted::<char>(&[('a', 0.0)]), None);
    }

    #[test]
    fn pick_index_handles_empty_and_bounds() {
        let mut rng = SeededRng::seed("index");
        assert_eq!(rng.pick_index(0), 0);
        for _ in 0..1_000 {
            assert!(rng.pick_index(3) < 3);
        }
    }
}
