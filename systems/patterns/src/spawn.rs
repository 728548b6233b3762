use std::f64::consts::{PI, TAU};

use adaptive_play_core::{DeterministicRng, SpawnDirective, SpawnPattern};
use serde::{Deserialize, Serialize};

pub(crate) const CENTER: f64 = 0.5;
pub(crate) const UNIFORM_MARGIN: f64 = 0.15;
pub(crate) const UNIFORM_SPAN: f64 = 0.7;
const GRID_SLOTS: [f64; 3] = [0.2, 0.5, 0.8];
const RING_POINTS: u64 = 8;
const RING_RADIUS: f64 = 0.28;
const SWIRL_TURN_STEPS: u64 = 12;
const SWIRL_MIN_RADIUS: f64 = 0.06;
const SWIRL_RADIUS_SPAN: f64 = 0.3;
const BURST_MIN_RADIUS: f64 = 0.1;
const BURST_RADIUS_SPAN: f64 = 0.15;

/// Flags that select the spawn pattern for one spawn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SpawnContext {
    /// The boss is on screen.
    pub boss_active: bool,
    /// A storm attack is running.
    pub storm_active: bool,
    /// The session is a research session.
    pub research: bool,
    /// Pattern variety requested by the difficulty director, in `[0, 1]`.
    pub remix: f64,
}

/// Chooses and places the spawn for `step`.
///
/// Boss and storm spawns follow their scripted shapes. Research sessions cycle
/// through the grid without touching `rng`. Otherwise one draw picks between
/// the uniform, grid and ring shapes, with `remix` moving weight away from the
/// uniform shape, and the chosen shape then spends its own draws.
pub fn next_spawn<R>(rng: &mut R, step: u64, ctx: SpawnContext) -> SpawnDirective
where
    R: DeterministicRng,
{
    let pattern = if ctx.boss_active {
        SpawnPattern::BossBurst
    } else if ctx.storm_active {
        SpawnPattern::StormSwirl
    } else if ctx.research {
        return grid_slot(step, (step % 9) as usize);
    } else {
        free_pattern(rng, ctx.remix)
    };
    place(rng, step, pattern)
}

/// One weighted draw between the shapes open to a regular spawn.
pub(crate) fn free_pattern<R>(rng: &mut R, remix: f64) -> SpawnPattern
where
    R: DeterministicRng,
{
    let remix = if remix.is_finite() {
        remix.clamp(0.0, 1.0)
    } else {
        0.0
    };
    rng.pick_weighted(&[
        (SpawnPattern::Uniform, 5.0 * (1.0 - remix)),
        (SpawnPattern::Grid9, 3.0 + 2.0 * remix),
        (SpawnPattern::Ring, 2.0 + 3.0 * remix),
    ])
    .unwrap_or(SpawnPattern::Grid9)
}

pub(crate) fn place<R>(rng: &mut R, step: u64, pattern: SpawnPattern) -> SpawnDirective
where
    R: DeterministicRng,
{
    match pattern {
        SpawnPattern::Uniform => {
            let x = UNIFORM_MARGIN + rng.next_f64() * UNIFORM_SPAN;
            let y = UNIFORM_MARGIN + rng.next_f64() * UNIFORM_SPAN;
            directive(pattern, step, x, y)
        }
        SpawnPattern::Grid9 => grid_slot(step, rng.pick_index(9)),
        SpawnPattern::Ring => {
            let angle = (step % RING_POINTS) as f64 / RING_POINTS as f64 * TAU;
            directive(
                pattern,
                step,
                CENTER + angle.cos() * RING_RADIUS,
                CENTER + angle.sin() * RING_RADIUS,
            )
        }
        SpawnPattern::StormSwirl => {
            let golden_angle = PI * (3.0 - 5.0_f64.sqrt());
            let angle = step as f64 * golden_angle;
            let turn = (step % SWIRL_TURN_STEPS) as f64 / SWIRL_TURN_STEPS as f64;
            let radius = SWIRL_MIN_RADIUS + turn * SWIRL_RADIUS_SPAN;
            directive(
                pattern,
                step,
                CENTER + angle.cos() * radius,
                CENTER + angle.sin() * radius,
            )
        }
        SpawnPattern::BossBurst => {
            let angle = rng.next_f64() * TAU;
            let radius = BURST_MIN_RADIUS + rng.next_f64() * BURST_RADIUS_SPAN;
            directive(
                pattern,
                step,
                CENTER + angle.cos() * radius,
                CENTER + angle.sin() * radius,
            )
        }
    }
}

fn grid_slot(step: u64, slot: usize) -> SpawnDirective {
    let slot = slot % 9;
    directive(
        SpawnPattern::Grid9,
        step,
        GRID_SLOTS[slot % 3],
        GRID_SLOTS[slot / 3],
    )
}

pub(crate) fn directive(pattern: SpawnPattern, step: u64, x: f64, y: f64) -> SpawnDirective {
    SpawnDirective {
        pattern,
        step,
        x: x.clamp(0.0, 1.0),
        y: y.clamp(0.0, 1.0),
    }
}
