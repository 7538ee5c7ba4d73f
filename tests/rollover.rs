use freehub::rollover::RolloverCounter;

const GATE_WINDOW_MS: u64 = 500;

#[test]
fn first_sample_yields_no_rate() {
    let mut crank = RolloverCounter::crank(GATE_WINDOW_MS);

    assert_eq!(crank.update(1000, 30000, 0), 0.0);
}

#[test]
fn steady_crank_rate() {
    let mut crank = RolloverCounter::crank(GATE_WINDOW_MS);

    crank.update(0, 0, 0);

    // 60 revolutions over 61440 ticks (60 s) is one per second.
    assert_eq!(crank.update(60, 0xf000, 60000), 60.0);

    // Two more over 1024 ticks (1 s).
    assert_eq!(crank.update(62, 0xf400, 61000), 120.0);
}

#[test]
fn steady_wheel_rate() {
    let mut wheel = RolloverCounter::wheel(2.105, GATE_WINDOW_MS);

    wheel.update(0, 0, 0);

    // Two revolutions over 2048 ticks (1 s) of a 2.105 m wheel.
    let speed = wheel.update(2, 2048, 1000);
    assert!((speed - 15.16).abs() < 1e-9);
}

#[test]
fn still_counter_yields_zero() {
    let mut crank = RolloverCounter::crank(GATE_WINDOW_MS);

    crank.update(0, 0, 0);
    assert_eq!(crank.update(10, 1024, 1000), 600.0);

    // Coasting: the counter holds while event time advances.
    assert_eq!(crank.update(10, 4096, 4000), 0.0);
    assert_eq!(crank.update(10, 8192, 8000), 0.0);
}

#[test]
fn repeated_event_time_is_gated() {
    let mut crank = RolloverCounter::crank(GATE_WINDOW_MS);

    crank.update(0, 0, 0);
    assert_eq!(crank.update(10, 1024, 1000), 600.0);

    // Re-notifications of the same event hold the value for up to three
    // consecutive samples, then the gate is forced open and the still
    // counter reports zero.
    assert_eq!(crank.update(10, 1024, 2000), 600.0);
    assert_eq!(crank.update(10, 1024, 3000), 600.0);
    assert_eq!(crank.update(10, 1024, 4000), 600.0);
    assert_eq!(crank.update(10, 1024, 5000), 0.0);
}

#[test]
fn fast_arrival_is_gated() {
    let mut crank = RolloverCounter::crank(GATE_WINDOW_MS);

    crank.update(0, 0, 0);

    // Arrives 100 ms after the previous acceptance, inside the window.
    assert_eq!(crank.update(10, 1024, 100), 0.0);

    // A gated sample is not stored; the next acceptance differences
    // against the original state.
    assert_eq!(crank.update(20, 2048, 1000), 600.0);
}

#[test]
fn revolution_counter_rollover() {
    let mut crank = RolloverCounter::crank(GATE_WINDOW_MS);

    crank.update(65530, 0, 0);

    // The 16-bit counter wrapped: the delta is 4 + (65536 - 65530) = 10.
    assert_eq!(crank.update(4, 1024, 1000), 600.0);
}

#[test]
fn event_time_rollover() {
    let mut crank = RolloverCounter::crank(GATE_WINDOW_MS);

    crank.update(0, 65000, 0);

    // The 16-bit timer wrapped: the delta is 488 + (65536 - 65000) = 1024
    // ticks, one second.
    assert_eq!(crank.update(10, 488, 1000), 600.0);
}

#[test]
fn reset_returns_prior_sample() {
    let mut crank = RolloverCounter::crank(GATE_WINDOW_MS);

    assert_eq!(crank.reset(), None);

    crank.update(0, 0, 0);
    crank.update(10, 1024, 1000);

    assert_eq!(crank.reset(), Some((10, 1024)));
    assert_eq!(crank.value(), 0.0);

    // Back to seeding: the next sample yields no rate.
    assert_eq!(crank.update(20, 2048, 2000), 0.0);
}

#[test]
fn calibrated_gate_depth_applies() {
    let mut crank = RolloverCounter::crank(GATE_WINDOW_MS);
    crank.set_max_gate_count(1);
    assert_eq!(crank.max_gate_count(), 1);

    crank.update(0, 0, 0);
    assert_eq!(crank.update(10, 1024, 1000), 600.0);

    // Only one consecutive re-notification is now suppressed.
    assert_eq!(crank.update(10, 1024, 2000), 600.0);
    assert_eq!(crank.update(10, 1024, 3000), 0.0);
}
