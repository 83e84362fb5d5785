//! Point emitter with random initial velocity

use glam::DVec2;

use super::particle::ParticleId;
use super::system::{ParticleSystem, Spawn};
use crate::consts::{DEFAULT_CULL_CHANCE, DEFAULT_LIFE_SPAN, DEFAULT_SPAWN_SPREAD};
use crate::image::ImageHandle;
use crate::platform::RandomSource;
use crate::transform::PolicyId;

/// Spawns particles at a point, each with velocity in (-spread, spread) per axis
#[derive(Debug, Clone)]
pub struct Emitter {
    pub position: DVec2,
    pub spread: f64,
    pub image: ImageHandle,
    pub life_span: f64,
    pub cull_chance: f64,
    pub policy: Option<PolicyId>,
}

impl Emitter {
    pub fn new(position: DVec2, image: ImageHandle) -> Self {
        Self {
            position,
            spread: DEFAULT_SPAWN_SPREAD,
            image,
            life_span: DEFAULT_LIFE_SPAN,
            cull_chance: DEFAULT_CULL_CHANCE,
            policy: None,
        }
    }

    /// Build the next spawn request (two draws for velocity)
    pub fn next_spawn<R: RandomSource + ?Sized>(&self, rng: &mut R) -> Spawn {
        let velocity = DVec2::new(rng.signed(self.spread), rng.signed(self.spread));
        Spawn {
            position: self.position,
            velocity,
            image: self.image.clone(),
            life_span: self.life_span,
            cull_chance: self.cull_chance,
            policy: self.policy,
        }
    }

    /// Try to spawn one particle into `system`
    pub fn emit<R: RandomSource + ?Sized>(
        &self,
        system: &mut ParticleSystem,
        rng: &mut R,
    ) -> Option<ParticleId> {
        let spawn = self.next_spawn(rng);
        system.spawn(rng, spawn)
    }

    /// Emit `count` times; returns how many particles were actually created
    pub fn burst<R: RandomSource + ?Sized>(
        &self,
        system: &mut ParticleSystem,
        rng: &mut R,
        count: usize,
    ) -> usize {
        let mut created = 0;
        for _ in 0..count {
            if self.emit(system, rng).is_some() {
                created += 1;
            }
        }
        created
    }
}
