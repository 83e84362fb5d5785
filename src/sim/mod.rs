//! Particle simulation module
//!
//! Single-threaded and synchronous: one `tick` per frame, no background
//! work. Given the same seed, dt sequence and spawn requests, a run is
//! reproducible:
//! - Seeded RNG only (through `RandomSource`)
//! - Stable iteration order (by particle ID)
//! - No rendering or platform dependencies

pub mod emitter;
pub mod particle;
pub mod system;

pub use emitter::Emitter;
pub use particle::{Particle, ParticleId, StepResult};
pub use system::{
    ParticleSystem, Spawn, SystemStats, TickReport, below_floor, unbounded,
};
