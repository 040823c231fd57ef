//! Hands-free launches at randomized intervals.

use std::time::Duration;

use fastrand::Rng;

use crate::physics::uniform;

pub const MIN_DELAY_MS: f32 = 400.0;
pub const MAX_DELAY_MS: f32 = 1500.0;

/// Launch scheduler for hands-free shows.
///
/// Time is whatever monotonic clock the caller passes in. Stopping drops the
/// pending deadline, so nothing is left scheduled.
#[derive(Debug, Default)]
pub struct AutoFire {
    next: Option<Duration>,
}

impl AutoFire {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.next.is_some()
    }

    /// Deadline of the pending launch, if any.
    pub fn pending(&self) -> Option<Duration> {
        self.next
    }

    /// Start firing. The first launch is due immediately.
    pub fn start(&mut self, now: Duration) {
        if self.next.is_none() {
            self.next = Some(now);
        }
    }

    pub fn stop(&mut self) {
        self.next = None;
    }

    /// Returns `true` when a launch is due and schedules the next one.
    pub fn poll(&mut self, now: Duration, rng: &mut Rng) -> bool {
        match self.next {
            Some(due) if now >= due => {
                self.next = Some(now + next_delay(rng));
                true
            }
            _ => false,
        }
    }
}

/// Delay before the following launch, uniform in `[400, 1500)` ms.
pub fn next_delay(rng: &mut Rng) -> Duration {
    Duration::from_secs_f32(uniform(rng, MIN_DELAY_MS, MAX_DELAY_MS) / 1000.0)
}

/// Random auto-fire target high in the sky of a `width x height` surface.
pub fn sky_target(rng: &mut Rng, width: f32, height: f32) -> (f32, f32) {
    (
        uniform(rng, width * 0.15, width * 0.85),
        uniform(rng, height * 0.1, height * 0.4),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delays_are_within_bounds() {
        let mut rng = Rng::with_seed(31);
        let mut min = f32::MAX;
        let mut max = 0.0f32;
        for _ in 0..5000 {
            let ms = next_delay(&mut rng).as_secs_f32() * 1000.0;
            assert!((MIN_DELAY_MS - 0.01..MAX_DELAY_MS + 0.01).contains(&ms));
            min = min.min(ms);
            max = max.max(ms);
        }
        // roughly uniform: both ends of the range get visited
        assert!(min < 450.0);
        assert!(max > 1450.0);
    }

    #[test]
    fn test_first_launch_is_immediate_then_spaced() {
        let mut rng = Rng::with_seed(32);
        let mut auto = AutoFire::new();
        let t0 = Duration::from_secs(10);
        auto.start(t0);
        assert!(auto.poll(t0, &mut rng));

        let due = auto.pending().unwrap();
        let gap = due - t0;
        assert!(gap >= Duration::from_millis(399) && gap <= Duration::from_millis(1500));

        assert!(!auto.poll(t0 + Duration::from_millis(399), &mut rng));
        assert!(auto.poll(due, &mut rng));
    }

    #[test]
    fn test_stop_cancels_pending_launch() {
        let mut rng = Rng::with_seed(33);
        let mut auto = AutoFire::new();
        auto.start(Duration::ZERO);
        assert!(auto.poll(Duration::ZERO, &mut rng));
        auto.stop();
        assert!(!auto.is_active());
        assert!(auto.pending().is_none());
        assert!(!auto.poll(Duration::from_secs(60), &mut rng));
    }

    #[test]
    fn test_restart_does_not_reset_pending_deadline() {
        let mut rng = Rng::with_seed(34);
        let mut auto = AutoFire::new();
        auto.start(Duration::ZERO);
        auto.poll(Duration::ZERO, &mut rng);
        let due = auto.pending();
        auto.start(Duration::from_millis(5));
        assert_eq!(auto.pending(), due);
    }

    #[test]
    fn test_sky_target_in_upper_band() {
        let mut rng = Rng::with_seed(35);
        for _ in 0..1000 {
            let (x, y) = sky_target(&mut rng, 1000.0, 800.0);
            assert!((150.0..=850.0).contains(&x));
            assert!((80.0..=320.0).contains(&y));
        }
    }
}
