use adaptive_play_core::{BossAttackLifecycleEvent, Phase, PhaseSignal, SeededRng, SpawnDirective};
use adaptive_play_system_patterns::{next_spawn, PatternConfig, PatternDirector, SpawnContext};

#[derive(Debug, PartialEq)]
struct Trace {
    lifecycle: Vec<(u64, BossAttackLifecycleEvent)>,
    spawns: Vec<SpawnDirective>,
    rng_state: u32,
}

fn phase_at(now_ms: u64) -> Phase {
    match now_ms {
        0..=60_000 => Phase::Early,
        60_001..=120_000 => Phase::Mid,
        _ => Phase::Late,
    }
}

fn run(seed: &str) -> Trace {
    let mut director = PatternDirector::new(PatternConfig::default()).expect("config");
    let mut rng = SeededRng::seed(seed);
    let mut lifecycle = Vec::new();
    let mut spawns = Vec::new();
    let mut step = 0_u64;

    for frame in 1..=900_u64 {
        let now_ms = frame * 200;
        let signal = PhaseSignal {
            phase: phase_at(now_ms),
            boss_active: now_ms > 150_000,
        };
        let tick = director.tick(now_ms, signal, &mut rng);
        lifecycle.extend(
            tick.lifecycle_events()
                .into_iter()
                .map(|event| (now_ms, event)),
        );

        let mut out = Vec::new();
        if frame % 3 == 0 {
            director.on_player_success(now_ms, &mut out);
        }
        if frame % 97 == 0 {
            director.on_wrong_action(now_ms, &mut out);
        }
        lifecycle.extend(out.into_iter().map(|event| (now_ms, event)));

        if frame % 4 == 0 {
            let ctx = SpawnContext {
                boss_active: signal.boss_active,
                storm_active: director.storm_active(),
                research: false,
                remix: (frame % 10) as f64 / 10.0,
            };
            spawns.push(next_spawn(&mut rng, step, ctx));
            step += 1;
        }
    }

    Trace {
        lifecycle,
        spawns,
        rng_state: rng.state(),
    }
}

#[test]
fn identical_seeds_replay_identical_scripts() {
    let first = run("RB|S1|director");
    let second = run("RB|S1|director");
    assert_eq!(first, second);
    assert!(!first.lifecycle.is_empty());
    assert_eq!(first.spawns.len(), 225);
}

#[test]
fn different_seeds_diverge() {
    assert_ne!(run("RB|S1|director").rng_state, run("RB|S2|director").rng_state);
}

#[test]
fn every_start_is_followed_by_exactly_one_ending() {
    let trace = run("lifecycle");
    let mut open = false;
    for (_, event) in &trace.lifecycle {
        match event {
            BossAttackLifecycleEvent::Started { .. } => {
                assert!(!open, "attack started while another was running");
                open = true;
            }
            BossAttackLifecycleEvent::Completed { .. }
            | BossAttackLifecycleEvent::Expired { .. }
            | BossAttackLifecycleEvent::Reset { .. } => {
                assert!(open, "attack ended without starting");
                open = false;
            }
            BossAttackLifecycleEvent::Progress { got, need } => {
                assert!(open);
                assert!(got <= need);
            }
        }
    }
}
