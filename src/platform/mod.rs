//! Platform abstraction layer
//!
//! Capabilities the host supplies to the simulation:
//! - Frame time (`Clock`)
//! - Randomness (`RandomSource`)
//! - Drawing (`Renderer`)
//!
//! The core never owns a window or display surface.

pub mod random;
pub mod render;
pub mod time;

pub use random::{PcgRandom, RandomSource};
pub use render::{Renderer, draw_particles};
pub use time::{Clock, FixedClock, FrameClock};
