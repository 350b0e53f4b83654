use presence_core::clock::Millis;
use presence_core::hold::LightHoldController;

const HOLD: Millis = Millis::new(90_000);

#[test]
fn light_is_on_strictly_inside_hold_interval() {
    let fixtures: [(u32, u32, bool); 6] = [
        (0, 0, true),
        (0, 89_999, true),
        (0, 90_000, false),
        (0, 90_001, false),
        (500, 90_499, true),
        (500, 90_500, false),
    ];

    for (detected_at, now, expected) in fixtures {
        let mut hold = LightHoldController::new(Millis::ZERO, HOLD);
        hold.record_detection(Millis::new(detected_at));
        assert_eq!(
            hold.is_light_on(Millis::new(now), HOLD),
            expected,
            "detection at {detected_at}ms, queried at {now}ms"
        );
    }
}

#[test]
fn hold_interval_straddles_counter_wrap() {
    let mut hold = LightHoldController::new(Millis::ZERO, HOLD);
    let detected_at = Millis::new(u32::MAX - 999);
    hold.record_detection(detected_at);

    // 1_000 ms before the wrap plus 88_999 ms after it: 89_999 ms elapsed.
    assert!(hold.is_light_on(Millis::new(88_999), HOLD));
    assert!(!hold.is_light_on(Millis::new(89_000), HOLD));
}

#[test]
fn expired_hold_is_clamped_to_interval() {
    let mut hold = LightHoldController::new(Millis::ZERO, HOLD);
    hold.record_detection(Millis::new(1_000));

    let now = Millis::new(3_000_000);
    assert!(!hold.is_light_on(now, HOLD));
    assert_eq!(hold.last_detection(), Millis::new(3_000_000 - 90_000));

    // Idle for more than half a counter period; without the clamp the stale
    // detection would read as recent once the wrapping age overflows.
    let mut now = now;
    for _ in 0..6 {
        now = now.wrapping_add(Millis::new(1_000_000_000));
        assert!(!hold.is_light_on(now, HOLD));
        assert_eq!(hold.last_detection(), now.wrapping_sub(HOLD));
    }
}

#[test]
fn stale_detection_without_clamp_would_reactivate() {
    // Documents the failure mode the clamp prevents: a detection left a full
    // counter period behind looks brand new to a wrapping subtraction.
    let stale = Millis::new(1_000);
    let later = stale.wrapping_add(Millis::new(u32::MAX)).wrapping_add(Millis::new(1));
    assert_eq!(later.wrapping_since(stale), Millis::ZERO);

    let mut hold = LightHoldController::new(Millis::ZERO, HOLD);
    hold.record_detection(stale);
    assert!(!hold.is_light_on(Millis::new(200_000), HOLD));
    assert!(!hold.is_light_on(later, HOLD));
}

#[test]
fn starts_off_for_any_boot_time() {
    for boot in [0, 1, 45_000, u32::MAX] {
        let boot = Millis::new(boot);
        let mut hold = LightHoldController::new(boot, HOLD);
        assert!(!hold.is_light_on(boot, HOLD));
    }
}
