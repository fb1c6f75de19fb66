//! Session state machine scenarios, driven tick by tick with synthetic
//! statistics and explicit monotonic time.

use scale_core::{Effect, SessionCfg, SessionController, SessionState, Stats};

fn cfg() -> SessionCfg {
    SessionCfg {
        presence_threshold: 0.05,
        zero_band: 0.03,
        stable_stddev: 0.1,
        stable_min_ms: 500,
        weighing_timeout_ms: 2000,
        no_id_zero_timeout_ms: 1000,
        display_zero_clamp: 0.002,
    }
}

fn stats(mean: f64, stddev: f64) -> Stats {
    Stats {
        mean,
        stddev,
        count: 10,
    }
}

/// Drive the machine from Idle into AwaitingIdentity with a steady load.
fn settle_at(ctl: &mut SessionController, weight: f64, mut now: u64) -> u64 {
    ctl.tick(weight, stats(weight, 0.01), None, now);
    assert_eq!(ctl.state(), SessionState::Weighing);
    loop {
        now += 100;
        ctl.tick(weight, stats(weight, 0.01), None, now);
        if ctl.state() == SessionState::AwaitingIdentity {
            return now;
        }
        assert!(now < 10_000, "machine never settled");
    }
}

#[test]
fn scenario_a_steady_load_settles_and_captures() {
    let mut ctl = SessionController::new(cfg());
    assert_eq!(ctl.state(), SessionState::Idle);

    // Present 5.0 with stddev held below threshold.
    let fx = ctl.tick(5.0, stats(5.0, 0.01), None, 0);
    assert_eq!(ctl.state(), SessionState::Weighing);
    assert!(fx.contains(&Effect::ClearBuffer));
    assert!(fx.contains(&Effect::ShowWeighing));

    let mut now = 0;
    while ctl.state() == SessionState::Weighing {
        now += 100;
        let fx = ctl.tick(5.0, stats(5.0, 0.01), None, now);
        if ctl.state() == SessionState::AwaitingIdentity {
            assert!(fx.contains(&Effect::ShowStable(5.0)));
            assert!(fx.contains(&Effect::PromptIdentity));
        }
    }
    // stable_min_ms after the settle clock started at now=100.
    assert_eq!(now, 600);
    assert_eq!(ctl.stable_weight(), Some(5.0));
}

#[test]
fn excursion_restarts_the_settle_clock() {
    let mut ctl = SessionController::new(cfg());
    ctl.tick(5.0, stats(5.0, 0.01), None, 0);

    // Quiet for 400 ms, one noisy tick, then quiet again: capture must
    // wait a full stable window after the excursion.
    for now in [100, 200, 300, 400] {
        ctl.tick(5.0, stats(5.0, 0.01), None, now);
    }
    ctl.tick(5.0, stats(5.0, 0.5), None, 500);
    assert_eq!(ctl.state(), SessionState::Weighing);
    for now in [600, 700, 800, 900, 1000] {
        ctl.tick(5.0, stats(5.0, 0.01), None, now);
        assert_eq!(ctl.state(), SessionState::Weighing);
    }
    ctl.tick(5.0, stats(5.0, 0.01), None, 1100);
    assert_eq!(ctl.state(), SessionState::AwaitingIdentity);
}

#[test]
fn scenario_b_noisy_load_force_captures_on_timeout() {
    let mut ctl = SessionController::new(cfg());
    ctl.tick(5.0, stats(5.2, 9.0), None, 0);
    assert_eq!(ctl.state(), SessionState::Weighing);

    let mut now = 0;
    while now < 1900 {
        now += 100;
        ctl.tick(5.0, stats(5.2, 9.0), None, now);
        assert_eq!(ctl.state(), SessionState::Weighing, "captured too early");
    }
    ctl.tick(5.0, stats(5.2, 9.0), None, 2000);
    assert_eq!(ctl.state(), SessionState::AwaitingIdentity);
    // Forced capture uses the buffer mean.
    assert_eq!(ctl.stable_weight(), Some(5.2));
}

#[test]
fn removal_before_settling_returns_to_idle() {
    let mut ctl = SessionController::new(cfg());
    ctl.tick(5.0, stats(5.0, 0.01), None, 0);
    ctl.tick(0.01, stats(2.0, 3.0), None, 100);
    assert_eq!(ctl.state(), SessionState::Idle);
    assert_eq!(ctl.stable_weight(), None);
}

#[test]
fn scenario_c_abandoned_session_times_out_only_after_full_window() {
    let mut ctl = SessionController::new(cfg());
    let now = settle_at(&mut ctl, 5.0, 0);

    // Load removed, no tag scanned. The window opens at the first zero
    // tick; holding for less than the full window must not transition.
    let mut t = now;
    for _ in 0..10 {
        t += 100;
        ctl.tick(0.0, stats(0.0, 0.01), None, t);
        assert_eq!(ctl.state(), SessionState::AwaitingIdentity);
    }
    t += 100;
    let fx = ctl.tick(0.0, stats(0.0, 0.01), None, t);
    assert_eq!(ctl.state(), SessionState::Idle);
    assert!(fx.contains(&Effect::ClearDisplay));
}

#[test]
fn zero_excursion_resets_abandon_timer() {
    let mut ctl = SessionController::new(cfg());
    let now = settle_at(&mut ctl, 5.0, 0);

    // In the zero band for a while, briefly back near the stable weight,
    // then zero again: the abandon window restarts.
    for dt in [100, 200, 300] {
        ctl.tick(0.0, stats(0.0, 0.01), None, now + dt);
    }
    ctl.tick(5.0, stats(5.0, 0.01), None, now + 400);
    for dt in [500, 600, 700, 800, 900, 1000, 1100, 1200, 1300, 1400] {
        ctl.tick(0.0, stats(0.0, 0.01), None, now + dt);
        assert_eq!(ctl.state(), SessionState::AwaitingIdentity);
    }
    ctl.tick(0.0, stats(0.0, 0.01), None, now + 1500);
    assert_eq!(ctl.state(), SessionState::Idle);
}

#[test]
fn scenario_d_tag_scan_requests_exactly_one_upload() {
    let mut ctl = SessionController::new(cfg());
    let now = settle_at(&mut ctl, 5.0, 0);

    let fx = ctl.tick(5.0, stats(5.0, 0.01), Some("CAFE01".into()), now + 100);
    let uploads: Vec<_> = fx
        .iter()
        .filter(|e| matches!(e, Effect::Upload { .. }))
        .collect();
    assert_eq!(uploads.len(), 1);
    assert_eq!(
        uploads[0],
        &Effect::Upload {
            tag: "CAFE01".into(),
            weight: 5.0
        }
    );
    assert_eq!(ctl.state(), SessionState::AwaitingRemoval);

    // Further ticks in AwaitingRemoval never re-upload.
    let fx = ctl.tick(5.0, stats(5.0, 0.01), None, now + 200);
    assert!(!fx.iter().any(|e| matches!(e, Effect::Upload { .. })));
    assert!(!ctl.wants_tag());
}

#[test]
fn empty_tag_is_ignored() {
    let mut ctl = SessionController::new(cfg());
    let now = settle_at(&mut ctl, 5.0, 0);
    let fx = ctl.tick(5.0, stats(5.0, 0.01), Some(String::new()), now + 100);
    assert_eq!(ctl.state(), SessionState::AwaitingIdentity);
    assert!(!fx.iter().any(|e| matches!(e, Effect::Upload { .. })));
}

#[test]
fn removal_after_upload_completes_the_session() {
    let mut ctl = SessionController::new(cfg());
    let now = settle_at(&mut ctl, 5.0, 0);
    ctl.tick(5.0, stats(5.0, 0.01), Some("CAFE01".into()), now + 100);
    assert_eq!(ctl.state(), SessionState::AwaitingRemoval);

    let fx = ctl.tick(0.0, stats(0.0, 0.01), None, now + 200);
    assert_eq!(ctl.state(), SessionState::Idle);
    assert!(fx.contains(&Effect::ClearBuffer));
    assert!(fx.contains(&Effect::ClearDisplay));
}

#[test]
fn new_object_interrupts_awaiting_identity() {
    let mut ctl = SessionController::new(cfg());
    let now = settle_at(&mut ctl, 5.0, 0);

    // A weight well away from the captured value (but not zero) restarts
    // the settle cycle.
    let fx = ctl.tick(9.0, stats(7.0, 2.0), None, now + 100);
    assert_eq!(ctl.state(), SessionState::Weighing);
    assert!(fx.contains(&Effect::ClearBuffer));
    assert_eq!(ctl.stable_weight(), None);
}

#[test]
fn new_object_interrupts_awaiting_removal() {
    let mut ctl = SessionController::new(cfg());
    let now = settle_at(&mut ctl, 5.0, 0);
    ctl.tick(5.0, stats(5.0, 0.01), Some("CAFE01".into()), now + 100);

    let fx = ctl.tick(11.0, stats(8.0, 3.0), None, now + 200);
    assert_eq!(ctl.state(), SessionState::Weighing);
    assert!(fx.contains(&Effect::ClearBuffer));
}

#[test]
fn reset_returns_to_idle_from_any_state() {
    let mut ctl = SessionController::new(cfg());
    let now = settle_at(&mut ctl, 5.0, 0);
    ctl.tick(5.0, stats(5.0, 0.01), Some("CAFE01".into()), now + 100);
    assert_eq!(ctl.state(), SessionState::AwaitingRemoval);

    let fx = ctl.reset();
    assert_eq!(ctl.state(), SessionState::Idle);
    assert_eq!(ctl.stable_weight(), None);
    assert!(fx.contains(&Effect::ClearBuffer));
    assert!(fx.contains(&Effect::ClearDisplay));

    // Timers were dropped: a fresh load settles on its own schedule.
    ctl.tick(3.0, stats(3.0, 0.01), None, now + 200);
    assert_eq!(ctl.state(), SessionState::Weighing);
}

#[test]
fn display_value_is_clamped_to_exact_zero_near_zero() {
    let mut ctl = SessionController::new(cfg());
    let fx = ctl.tick(-0.0015, stats(-0.0015, 0.01), None, 0);
    assert!(fx.contains(&Effect::ShowWeight(0.0)), "got {fx:?}");

    let fx = ctl.tick(0.004, stats(0.004, 0.01), None, 100);
    assert!(fx.contains(&Effect::ShowWeight(0.004)));
}

#[test]
fn under_filled_buffer_never_satisfies_stability() {
    let mut ctl = SessionController::new(cfg());
    ctl.tick(5.0, stats(5.0, 0.01), None, 0);
    // Sentinel stddev from an under-filled buffer keeps the machine
    // weighing no matter how long it holds.
    for now in (100..=1900).step_by(100) {
        ctl.tick(5.0, stats(5.0, f64::INFINITY), None, now);
        assert_eq!(ctl.state(), SessionState::Weighing);
    }
}
