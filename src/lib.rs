//! Particle Cache - real-time particle simulation with cached sprite transforms
//!
//! Core modules:
//! - `sim`: Particle integration, lifecycle and spawning
//! - `transform`: Image transforms and the cached transform pipeline
//! - `image`: Shared image handles and pixel operations
//! - `platform`: Clock, randomness and renderer capabilities supplied by the host
//! - `settings`: Data-driven simulation configuration

pub mod error;
pub mod image;
pub mod platform;
pub mod settings;
pub mod sim;
pub mod transform;

pub use error::ConfigError;
pub use crate::image::{ImageHandle, ImageId};
pub use settings::{QualityPreset, Settings};

use glam::DVec2;

/// Simulation configuration constants
pub mod consts {
    use glam::DVec2;

    /// Frame delta used when the clock has nothing to report (first frame)
    pub const FALLBACK_DT: f64 = 1.0;
    /// Frame clock scale: deltas are reported in frames at this rate
    pub const FRAME_RATE_UNITS: f64 = 30.0;

    /// Default downward pull, per frame unit squared
    pub const DEFAULT_GRAVITY: DVec2 = DVec2::new(0.0, 0.5);
    /// Default floor below which particles are removed
    pub const DEFAULT_FLOOR_Y: f64 = 810.0;

    /// Particle defaults
    pub const DEFAULT_LIFE_SPAN: f64 = 10.0;
    pub const DEFAULT_CULL_CHANCE: f64 = 0.1;
    /// Emitter velocity range is (-spread, spread) on each axis
    pub const DEFAULT_SPAWN_SPREAD: f64 = 10.0;

    /// Speed (|vx| + |vy|) added to this before dividing gives the stretch factor
    pub const STRETCH_REFERENCE_SPEED: f64 = 50.0;
    /// Upper clamp for the stretch factor
    pub const MAX_STRETCH: f64 = 1.5;
    /// Scale-over-lifetime buckets per unit of scale
    pub const DEFAULT_SCALE_GRANULARITY: f64 = 10.0;
}

/// Round a continuous value to its integer bucket
///
/// Non-finite input lands in bucket 0 rather than saturating.
#[inline]
pub fn quantize(value: f64) -> i64 {
    if value.is_finite() {
        value.round() as i64
    } else {
        0
    }
}

/// Screen-space heading of a velocity in degrees, in (0, 360]
///
/// Uses `atan2(x, y)` (x first) so that 0 velocity points "down" the
/// screen, then offsets by 180 to match sprite rotation direction.
#[inline]
pub fn heading_degrees(velocity: DVec2) -> f64 {
    velocity.x.atan2(velocity.y).to_degrees() + 180.0
}
