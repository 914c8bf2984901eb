use crate::config::CalibrationConfig;

/// A grid point together with the result of its trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Candidate {
    pub pulse_us: u8,
    pub post_wait_us: u8,
    pub successes: u8,
    pub attempts: u8,
}

impl Candidate {
    /// Success rate in whole percent.
    pub fn rate_pct(&self) -> u8 {
        if self.attempts == 0 {
            return 0;
        }
        (self.successes as u16 * 100 / self.attempts as u16) as u8
    }

    fn qualifies(&self, threshold_pct: u8) -> bool {
        self.attempts > 0
            && self.successes as u32 * 100
                >= threshold_pct as u32 * self.attempts as u32
    }

    fn midpoint_distance(&self, config: &CalibrationConfig) -> u16 {
        let doubled = 2 * self.pulse_us as u16;
        let span = config.pulse_min_us as u16 + config.pulse_max_us as u16;
        doubled.abs_diff(span)
    }

    /// Whether `self` should replace `other` as the best known point.
    fn beats(&self, other: &Candidate, config: &CalibrationConfig) -> bool {
        let lhs = self.successes as u32 * other.attempts as u32;
        let rhs = other.successes as u32 * self.attempts as u32;
        if lhs != rhs {
            return lhs > rhs;
        }
        if self.post_wait_us != other.post_wait_us {
            return self.post_wait_us < other.post_wait_us;
        }
        self.midpoint_distance(config) < other.midpoint_distance(config)
    }
}

/// Something worth logging once the bus is released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationEvent {
    /// A trial produced a better qualifying point.
    NewBest(Candidate),
    /// The sweep finished and the best point is now held.
    Locked(Candidate),
    /// The sweep finished without a qualifying point and starts over.
    Restarted,
    /// The host went quiet for too long; everything was forgotten.
    IdleReset,
}

/// Read-only view of the calibrator for telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationStatus {
    pub pulse_us: u8,
    pub post_wait_us: u8,
    pub locked: bool,
    pub started: bool,
}

/// Online grid search for acknowledge timing.
///
/// The pulse width is swept downwards from its maximum and, for each pulse
/// width, the post-acknowledge wait upwards from its minimum. Every grid
/// point is tried for `trial_len` address arrivals (or `trial_timeout_us`,
/// whichever comes first) and scored by how many of the following command
/// bytes actually arrived.
pub struct Calibrator {
    config: CalibrationConfig,
    pulse_us: u8,
    post_wait_us: u8,
    started: bool,
    locked: bool,
    attempts: u8,
    successes: u8,
    trial_start_us: u64,
    last_address_us: u64,
    best: Option<Candidate>,
}

impl Calibrator {
    pub const fn new(config: CalibrationConfig) -> Self {
        Self {
            pulse_us: config.pulse_max_us,
            post_wait_us: config.post_min_us,
            config,
            started: false,
            locked: false,
            attempts: 0,
            successes: 0,
            trial_start_us: 0,
            last_address_us: 0,
            best: None,
        }
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    #[inline(always)]
    pub fn pulse_us(&self) -> u8 {
        self.pulse_us
    }

    #[inline(always)]
    pub fn post_wait_us(&self) -> u8 {
        self.post_wait_us
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn best(&self) -> Option<Candidate> {
        self.best
    }

    pub fn snapshot(&self) -> CalibrationStatus {
        CalibrationStatus {
            pulse_us: self.pulse_us,
            post_wait_us: self.post_wait_us,
            locked: self.locked,
            started: self.started,
        }
    }

    /// Forget everything and go back to the first grid point.
    pub fn reset(&mut self) {
        *self = Self::new(self.config);
    }

    /// Reset if no address has arrived for the idle timeout. Called while
    /// the bus is quiet so a host that went away does not leave a stale
    /// lock behind.
    pub fn poll_idle(&mut self, now_us: u64) -> Option<CalibrationEvent> {
        if self.started
            && now_us.saturating_sub(self.last_address_us)
                >= self.config.idle_timeout_us
        {
            self.reset();
            return Some(CalibrationEvent::IdleReset);
        }
        None
    }

    /// An address byte for this device arrived at `now_us`.
    pub fn on_address(&mut self, now_us: u64) -> Option<CalibrationEvent> {
        let mut event = self.poll_idle(now_us);
        self.last_address_us = now_us;

        if !self.started {
            self.started = true;
            self.trial_start_us = now_us;
        }
        if self.locked {
            return event;
        }

        if now_us.saturating_sub(self.trial_start_us)
            >= self.config.trial_timeout_us
        {
            event = self.close_trial(now_us).or(event);
        }
        self.attempts = self.attempts.saturating_add(1);
        event
    }

    /// The command byte that followed the last address either arrived
    /// (`success`) or did not.
    pub fn on_command(
        &mut self,
        success: bool,
        now_us: u64,
    ) -> Option<CalibrationEvent> {
        if self.locked || !self.started {
            return None;
        }
        if success {
            self.successes = self.successes.saturating_add(1);
        }
        if self.attempts >= self.config.trial_len {
            return self.close_trial(now_us);
        }
        None
    }

    fn close_trial(&mut self, now_us: u64) -> Option<CalibrationEvent> {
        let result = Candidate {
            pulse_us: self.pulse_us,
            post_wait_us: self.post_wait_us,
            successes: self.successes,
            attempts: self.attempts,
        };
        self.attempts = 0;
        self.successes = 0;
        self.trial_start_us = now_us;

        let mut event = None;
        if result.qualifies(self.config.success_threshold_pct)
            && self
                .best
                .map_or(true, |best| result.beats(&best, &self.config))
        {
            self.best = Some(result);
            event = Some(CalibrationEvent::NewBest(result));
        }

        if !self.advance() {
            event = Some(match self.best {
                Some(best) => {
                    self.pulse_us = best.pulse_us;
                    self.post_wait_us = best.post_wait_us;
                    self.locked = true;
                    CalibrationEvent::Locked(best)
                }
                None => {
                    self.pulse_us = self.config.pulse_max_us;
                    self.post_wait_us = self.config.post_min_us;
                    CalibrationEvent::Restarted
                }
            });
        }
        event
    }

    /// Move to the next grid point. Returns false once the grid is done.
    fn advance(&mut self) -> bool {
        let step = self.config.step_us.max(1);
        match self.post_wait_us.checked_add(step) {
            Some(post) if post <= self.config.post_max_us => {
                self.post_wait_us = post;
                return true;
            }
            _ => {}
        }
        match self.pulse_us.checked_sub(step) {
            Some(pulse) if pulse >= self.config.pulse_min_us => {
                self.pulse_us = pulse;
                self.post_wait_us = self.config.post_min_us;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> CalibrationConfig {
        CalibrationConfig {
            pulse_min_us: 1,
            pulse_max_us: 2,
            post_min_us: 0,
            post_max_us: 1,
            trial_len: 2,
            ..CalibrationConfig::default()
        }
    }

    #[test]
    fn sweep_order() {
        let mut cal = Calibrator::new(small());
        let mut visited = Vec::new();
        let mut now = 0;
        for _ in 0..4 {
            visited.push((cal.pulse_us(), cal.post_wait_us()));
            for _ in 0..2 {
                now += 1000;
                cal.on_address(now);
                cal.on_command(false, now);
            }
        }
        assert_eq!(visited, [(2, 0), (2, 1), (1, 0), (1, 1)]);
        assert!(!cal.is_locked());
        assert_eq!((cal.pulse_us(), cal.post_wait_us()), (2, 0));
    }

    #[test]
    fn tie_prefers_shorter_wait_then_midpoint() {
        let config = CalibrationConfig::default();
        let full = |pulse_us, post_wait_us| Candidate {
            pulse_us,
            post_wait_us,
            successes: 8,
            attempts: 8,
        };
        assert!(full(6, 1).beats(&full(3, 2), &config));
        assert!(full(3, 2).beats(&full(6, 2), &config));
        assert!(full(4, 2).beats(&full(6, 2), &config));
        assert!(!full(3, 2).beats(&full(4, 2), &config));
        let partial = Candidate { successes: 7, ..full(3, 0) };
        assert!(full(6, 6).beats(&partial, &config));
    }

    #[test]
    fn threshold_is_inclusive() {
        let half = Candidate {
            pulse_us: 1,
            post_wait_us: 0,
            successes: 4,
            attempts: 8,
        };
        assert!(half.qualifies(50));
        assert!(!Candidate { successes: 3, ..half }.qualifies(50));
        assert!(!Candidate { successes: 0, attempts: 0, ..half }.qualifies(0));
        assert_eq!(half.rate_pct(), 50);
    }

    #[test]
    fn trial_timeout_closes_short_trial() {
        let config = CalibrationConfig {
            idle_timeout_us: 60_000_000,
            ..small()
        };
        let mut cal = Calibrator::new(config);
        cal.on_address(0);
        cal.on_command(true, 0);
        let later = config.trial_timeout_us;
        let event = cal.on_address(later);
        assert!(matches!(event, Some(CalibrationEvent::NewBest(c)) if c.attempts == 1));
        assert_eq!((cal.pulse_us(), cal.post_wait_us()), (2, 1));
    }

    #[test]
    fn quiet_bus_clears_lock() {
        let config = small();
        let mut cal = Calibrator::new(config);
        let mut now = 0;
        for _ in 0..8 {
            now += 1000;
            cal.on_address(now);
            cal.on_command(true, now);
        }
        assert!(cal.is_locked());

        assert_eq!(cal.poll_idle(now + config.idle_timeout_us - 1), None);
        assert!(cal.is_locked());

        let event = cal.poll_idle(now + config.idle_timeout_us);
        assert_eq!(event, Some(CalibrationEvent::IdleReset));
        let status = cal.snapshot();
        assert!(!status.locked);
        assert!(!status.started);
        assert_eq!((status.pulse_us, status.post_wait_us), (2, 0));

        // Nothing more to reset until a host shows up again.
        assert_eq!(cal.poll_idle(now + 10 * config.idle_timeout_us), None);
    }

    #[test]
    fn locked_ignores_outcomes() {
        let mut cal = Calibrator::new(small());
        let mut now = 0;
        let mut last = None;
        for _ in 0..8 {
            now += 1000;
            cal.on_address(now);
            last = cal.on_command(true, now).or(last);
        }
        assert!(matches!(last, Some(CalibrationEvent::Locked(_))));
        let held = cal.snapshot();
        for _ in 0..20 {
            now += 1000;
            cal.on_address(now);
            cal.on_command(false, now);
        }
        assert_eq!(cal.snapshot(), held);
    }
}
