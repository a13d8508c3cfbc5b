//! Time-based opacity fade.

use std::time::{Duration, Instant};

/// A fade from one alpha to another. Sampled by the main loop while active;
/// starting a new fade replaces the old one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fade {
    from: f64,
    to: f64,
    started: Instant,
    duration: Duration,
}

impl Fade {
    pub fn new(from: f64, to: f64, started: Instant, duration: Duration) -> Self {
        Self {
            from,
            to,
            started,
            duration,
        }
    }

    #[cfg(test)]
    pub fn target(&self) -> f64 {
        self.to
    }

    #[cfg(test)]
    pub fn started(&self) -> Instant {
        self.started
    }

    /// Alpha at `now`, eased in and out
    pub fn sample(&self, now: Instant) -> f64 {
        let t = ease_in_out(self.progress(now));
        self.from + (self.to - self.from) * t
    }

    pub fn is_finished(&self, now: Instant) -> bool {
        self.progress(now) >= 1.0
    }

    fn progress(&self, now: Instant) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(self.started);
        (elapsed.as_secs_f64() / self.duration.as_secs_f64()).clamp(0.0, 1.0)
    }
}

fn ease_in_out(t: f64) -> f64 {
    if t < 0.5 {
        2.0 * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DURATION: Duration = Duration::from_millis(300);

    #[test]
    fn test_endpoints() {
        let start = Instant::now();
        let fade = Fade::new(0.0, 1.0, start, DURATION);
        assert_eq!(fade.sample(start), 0.0);
        assert!(!fade.is_finished(start));
        assert_eq!(fade.sample(start + DURATION), 1.0);
        assert!(fade.is_finished(start + DURATION));
        assert_eq!(fade.sample(start + DURATION * 4), 1.0);
    }

    #[test]
    fn test_midpoint_and_monotonic() {
        let start = Instant::now();
        let fade = Fade::new(1.0, 0.0, start, DURATION);
        assert!((fade.sample(start + DURATION / 2) - 0.5).abs() < 1e-9);

        let mut last = fade.sample(start);
        for ms in (0..=300).step_by(10) {
            let alpha = fade.sample(start + Duration::from_millis(ms));
            assert!(alpha <= last + 1e-12);
            last = alpha;
        }
    }

    #[test]
    fn test_zero_duration_jumps_to_target() {
        let start = Instant::now();
        let fade = Fade::new(0.3, 1.0, start, Duration::ZERO);
        assert_eq!(fade.sample(start), 1.0);
        assert!(fade.is_finished(start));
    }

    #[test]
    fn test_sample_before_start_holds_origin() {
        let start = Instant::now() + Duration::from_secs(1);
        let fade = Fade::new(0.2, 1.0, start, DURATION);
        assert_eq!(fade.sample(Instant::now()), 0.2);
    }
}
