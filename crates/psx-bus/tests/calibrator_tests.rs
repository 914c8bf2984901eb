use psx_bus::{CalibrationConfig, CalibrationEvent, Calibrator};

/// Feed one address/command pair, deciding success from the parameters in
/// force when the command byte is exchanged.
fn exchange(
    cal: &mut Calibrator,
    now: u64,
    works: impl Fn(u8, u8) -> bool,
) -> Vec<CalibrationEvent> {
    let mut events = Vec::new();
    events.extend(cal.on_address(now));
    let ok = works(cal.pulse_us(), cal.post_wait_us());
    events.extend(cal.on_command(ok, now));
    events
}

fn grid_points(config: &CalibrationConfig) -> usize {
    let pulses = (config.pulse_max_us - config.pulse_min_us) / config.step_us + 1;
    let posts = (config.post_max_us - config.post_min_us) / config.step_us + 1;
    pulses as usize * posts as usize
}

#[test]
fn locks_inside_working_region_within_one_sweep() {
    let config = CalibrationConfig::default();
    let mut cal = Calibrator::new(config);
    let works = |pulse: u8, post: u8| {
        (2..=3).contains(&pulse) && (3..=4).contains(&post)
    };

    let budget = grid_points(&config) * config.trial_len as usize;
    let mut now = 0;
    let mut locked_at = None;
    for n in 0..budget {
        now += 16_000;
        let events = exchange(&mut cal, now, works);
        if events.iter().any(|e| matches!(e, CalibrationEvent::Locked(_))) {
            locked_at = Some(n);
            break;
        }
    }
    assert!(locked_at.is_some());

    let status = cal.snapshot();
    assert!(status.locked);
    assert!(status.started);
    // Shortest wait wins, then the pulse closest to the middle of 1..=6.
    assert_eq!((status.pulse_us, status.post_wait_us), (3, 3));

    for _ in 0..100 {
        now += 16_000;
        exchange(&mut cal, now, |_, _| false);
    }
    assert_eq!(cal.snapshot(), status);
}

#[test]
fn higher_rate_beats_shorter_wait() {
    let config = CalibrationConfig::default();
    let mut cal = Calibrator::new(config);
    let mut attempt = 0u32;
    let budget = grid_points(&config) * config.trial_len as usize;
    let mut now = 0;
    for _ in 0..budget {
        now += 16_000;
        attempt += 1;
        let flaky = attempt % 4 != 0;
        exchange(&mut cal, now, |pulse, post| match (pulse, post) {
            (5, 1) => flaky,
            (2, 4) => true,
            _ => false,
        });
    }
    let status = cal.snapshot();
    assert!(status.locked);
    assert_eq!((status.pulse_us, status.post_wait_us), (2, 4));
    assert_eq!(cal.best().map(|b| b.rate_pct()), Some(100));
}

#[test]
fn idle_host_resets_calibration() {
    let config = CalibrationConfig::default();
    let mut cal = Calibrator::new(config);
    let mut now = 0;
    let budget = grid_points(&config) * config.trial_len as usize;
    for _ in 0..budget {
        now += 16_000;
        exchange(&mut cal, now, |_, _| true);
    }
    assert!(cal.is_locked());

    now += config.idle_timeout_us;
    let events = exchange(&mut cal, now, |_, _| true);
    assert_eq!(events, [CalibrationEvent::IdleReset]);

    let status = cal.snapshot();
    assert!(!status.locked);
    assert!(status.started);
    assert_eq!(status.pulse_us, config.pulse_max_us);
    assert_eq!(status.post_wait_us, config.post_min_us);
    assert_eq!(cal.best(), None);
}

#[test]
fn fruitless_sweep_starts_over() {
    let config = CalibrationConfig::default();
    let mut cal = Calibrator::new(config);
    let budget = grid_points(&config) * config.trial_len as usize;
    let mut now = 0;
    let mut events = Vec::new();
    for _ in 0..budget {
        now += 16_000;
        events.extend(exchange(&mut cal, now, |_, _| false));
    }
    assert_eq!(events, [CalibrationEvent::Restarted]);
    let status = cal.snapshot();
    assert!(!status.locked);
    assert_eq!(
        (status.pulse_us, status.post_wait_us),
        (config.pulse_max_us, config.post_min_us)
    );
}
