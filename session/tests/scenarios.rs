use std::time::Duration;

use adaptive_play_core::{
    Command, DirectorOutput, Event, FieldBounds, Outcome, OutcomeEvent, PhaseSignal, SessionMode,
};
use adaptive_play_session::{query, Session, SessionConfig};
use adaptive_play_system_difficulty::{Endpoints, IntensityBand};

fn tick(now_ms: u64) -> Command {
    Command::Tick {
        now_ms,
        dt: Duration::from_secs(1),
        signal: PhaseSignal::default(),
    }
}

#[test]
fn twenty_timeouts_exhaust_the_player_and_never_raise_hazards() {
    let mut session = Session::new(SessionConfig {
        seed: "RB|S1|director".to_owned(),
        ..SessionConfig::default()
    })
    .expect("config");

    let mut hazard_at_five = None;
    for streak in 1..=20_u64 {
        let now_ms = streak * 1_000;
        let _ = session.apply(Command::RecordOutcome {
            event: OutcomeEvent::new(now_ms, Outcome::Timeout),
        });
        let _ = session.apply(tick(now_ms));
        if streak == 5 {
            hazard_at_five = Some(query::director_output(&session).hazard_mul);
        }
    }

    let state = query::fatigue_state(&session);
    assert_eq!(state.timeout_streak, 20);
    assert!(
        (0.60..=1.00).contains(&state.fatigue),
        "fatigue out of band: {}",
        state.fatigue
    );

    let hazard_at_twenty = query::director_output(&session).hazard_mul;
    let hazard_at_five = hazard_at_five.expect("streak five was reached");
    assert!(
        hazard_at_twenty <= hazard_at_five,
        "hazard grew from {hazard_at_five} to {hazard_at_twenty}"
    );
    assert_ne!(query::intensity_band(&session), IntensityBand::Challenge);
}

#[test]
fn research_sessions_stay_neutral_for_any_telemetry() {
    let mut session = Session::new(SessionConfig {
        mode: SessionMode::Research,
        ..SessionConfig::default()
    })
    .expect("config");

    for frame in 1..=120_u64 {
        let now_ms = frame * 700;
        let outcome = if frame % 4 == 0 {
            Outcome::Bomb
        } else {
            Outcome::Hit
        };
        let _ = session.apply(Command::RecordOutcome {
            event: OutcomeEvent::new(now_ms, outcome)
                .with_reaction_time(150.0)
                .with_player_hp(0.05),
        });
        for event in session.apply(tick(now_ms)) {
            if let Event::DirectorUpdated { output, refreshed } = event {
                assert_eq!(output, DirectorOutput::neutral());
                assert!(refreshed);
            }
        }
    }
    assert_eq!(query::intensity_band(&session), IntensityBand::Balance);
    assert_eq!(
        query::spawn_timing(&session),
        session.config().spawn_timing
    );
}

#[test]
fn skilled_player_raises_intensity_in_play_mode() {
    let mut session = Session::new(SessionConfig::default()).expect("config");
    for frame in 1..=150_u64 {
        let now_ms = frame * 600;
        let _ = session.apply(Command::RecordOutcome {
            event: OutcomeEvent::new(now_ms, Outcome::Hit).with_reaction_time(240.0),
        });
        let _ = session.apply(tick(now_ms));
    }

    let output = query::director_output(&session);
    assert!(output.spawn_rate_mul > 1.0, "{output:?}");
    assert!(output.target_size_mul < 1.0, "{output:?}");
    assert!(query::confidence(&session) >= 1.0);
    assert!(query::last_probability(&session) > 0.9);
}

#[test]
fn vanishing_spawn_rate_floor_stalls_spawns_without_panicking() {
    let mut config = SessionConfig::default();
    config.director.bounds.spawn_rate_mul = FieldBounds::new(1e-20, 1.35);
    config.director.spawn_rate = Endpoints::new(-1.0e6, 1.3);
    config.director.smoothing = 1.0;
    config.skill.warmup_steps = 1;
    let mut session = Session::new(config).expect("config");

    for step in 1..=40_u64 {
        let now_ms = step * 2_000;
        let _ = session.apply(Command::RecordOutcome {
            event: OutcomeEvent::new(now_ms, Outcome::Timeout),
        });
        let _ = session.apply(tick(now_ms));
    }

    let output = query::director_output(&session);
    assert_eq!(output.spawn_rate_mul, 1e-20);
    let timing = query::spawn_timing(&session);
    assert_eq!(timing.interval_min_ms, u64::MAX);
    assert_eq!(timing.interval_max_ms, u64::MAX);
    assert!(matches!(
        &session.apply(Command::PlanSpawn)[..],
        [Event::SpawnPlanned { .. }]
    ));
}

#[test]
fn non_positive_spawn_rate_floor_is_rejected() {
    let mut config = SessionConfig::default();
    config.director.bounds.spawn_rate_mul = FieldBounds::new(0.0, 1.35);
    assert!(Session::new(config).is_err());
}
