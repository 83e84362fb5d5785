//! Frame timing

use std::time::Instant;

use crate::consts::{FALLBACK_DT, FRAME_RATE_UNITS};

/// Supplies the delta time for each frame
pub trait Clock {
    /// Time since the previous call; never negative or NaN
    fn delta_time(&mut self) -> f64;
}

/// Constant delta, for headless runs and tests
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    dt: f64,
}

impl FixedClock {
    /// Invalid deltas (negative, NaN) fall back to `FALLBACK_DT`
    pub fn new(dt: f64) -> Self {
        Self {
            dt: sanitize(dt).unwrap_or(FALLBACK_DT),
        }
    }
}

impl Clock for FixedClock {
    fn delta_time(&mut self) -> f64 {
        self.dt
    }
}

/// Wall-clock frame timer reporting deltas in scaled frame units
///
/// With the default scale of 30, a frame at 30 FPS reports 1.0 and a frame
/// at 60 FPS reports 0.5. The first call, and any call with no measurable
/// elapsed time, reports `FALLBACK_DT`.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Option<Instant>,
    scale: f64,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(FRAME_RATE_UNITS)
    }
}

impl FrameClock {
    pub fn new(scale: f64) -> Self {
        Self { last: None, scale }
    }

    /// Frame delta given the elapsed seconds since the last frame
    pub fn scaled_delta(&self, elapsed_secs: Option<f64>) -> f64 {
        elapsed_secs
            .filter(|secs| *secs > 0.0)
            .and_then(|secs| sanitize(secs * self.scale))
            .unwrap_or(FALLBACK_DT)
    }
}

impl Clock for FrameClock {
    fn delta_time(&mut self) -> f64 {
        let now = Instant::now();
        let elapsed = self.last.map(|last| now.duration_since(last).as_secs_f64());
        self.last = Some(now);
        self.scaled_delta(elapsed)
    }
}

fn sanitize(dt: f64) -> Option<f64> {
    (dt.is_finite() && dt >= 0.0).then_some(dt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let mut clock = FixedClock::new(0.25);
        assert_eq!(clock.delta_time(), 0.25);
        assert_eq!(clock.delta_time(), 0.25);
    }

    #[test]
    fn test_fixed_clock_rejects_invalid() {
        assert_eq!(FixedClock::new(-1.0).delta_time(), FALLBACK_DT);
        assert_eq!(FixedClock::new(f64::NAN).delta_time(), FALLBACK_DT);
    }

    #[test]
    fn test_frame_clock_first_frame_falls_back() {
        let mut clock = FrameClock::default();
        assert_eq!(clock.delta_time(), FALLBACK_DT);
        let dt = clock.delta_time();
        assert!(dt >= 0.0 && dt.is_finite());
    }

    #[test]
    fn test_frame_clock_scaling() {
        let clock = FrameClock::default();
        assert!((clock.scaled_delta(Some(1.0 / 60.0)) - 0.5).abs() < 1e-12);
        assert_eq!(clock.scaled_delta(Some(0.0)), FALLBACK_DT);
        assert_eq!(clock.scaled_delta(None), FALLBACK_DT);
    }
}
