// Tests for the monotonic session clock.

use segcap::SessionClock;
use std::time::Duration;

#[test]
fn clock_starts_once() {
    let clock = SessionClock::new();
    assert!(!clock.is_started());

    clock.start().unwrap();
    assert!(clock.is_started());
    assert!(clock.start().is_err(), "restarting a started clock is invalid");
}

#[test]
fn reading_before_start_is_an_error() {
    let clock = SessionClock::new();
    assert!(clock.seconds_since_start().is_err());
}

#[test]
fn start_if_not_started_is_idempotent() {
    let clock = SessionClock::new();
    clock.start_if_not_started();
    clock.start_if_not_started();
    assert!(clock.is_started());
}

#[test]
fn elapsed_time_is_monotonic() {
    let clock = SessionClock::new();
    clock.start().unwrap();

    let first = clock.seconds_since_start().unwrap();
    std::thread::sleep(Duration::from_millis(10));
    let second = clock.seconds_since_start().unwrap();

    assert!(first >= 0.0);
    assert!(second >= first);
}
