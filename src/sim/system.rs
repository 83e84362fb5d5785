//! Particle system: ownership, spawning and per-tick lifecycle

use glam::DVec2;

use super::particle::{Particle, ParticleId, StepResult};
use crate::image::ImageHandle;
use crate::platform::RandomSource;
use crate::transform::{PolicyId, TransformPolicy};

/// Parameters for a single spawn request
#[derive(Debug, Clone)]
pub struct Spawn {
    pub position: DVec2,
    pub velocity: DVec2,
    pub image: ImageHandle,
    pub life_span: f64,
    /// Probability in [0, 1] that the request is dropped
    pub cull_chance: f64,
    pub policy: Option<PolicyId>,
}

impl Spawn {
    /// Spawn request with default life span, no culling and no policy
    pub fn new(position: DVec2, velocity: DVec2, image: ImageHandle) -> Self {
        Self {
            position,
            velocity,
            image,
            life_span: crate::consts::DEFAULT_LIFE_SPAN,
            cull_chance: 0.0,
            policy: None,
        }
    }
}

/// What one tick removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub stepped: usize,
    pub expired: usize,
    pub out_of_bounds: usize,
}

impl TickReport {
    pub fn removed(&self) -> usize {
        self.expired + self.out_of_bounds
    }
}

/// Lifetime counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SystemStats {
    pub spawned: u64,
    /// Spawn requests dropped by the cull draw
    pub culled: u64,
    /// Spawn requests dropped because the system was full
    pub capped: u64,
    pub expired: u64,
    pub out_of_bounds: u64,
}

/// Bounds predicate: true once a particle falls below `floor_y`
///
/// Screen space, so "below" means a larger y.
pub fn below_floor(floor_y: f64) -> impl Fn(&Particle) -> bool {
    move |particle| particle.position.y > floor_y
}

/// Bounds predicate that never removes anything
pub fn unbounded(_: &Particle) -> bool {
    false
}

/// Owns live particles and the transform policies they share
#[derive(Debug, Clone, Default)]
pub struct ParticleSystem {
    /// Live particles, in spawn (id) order
    particles: Vec<Particle>,
    policies: Vec<TransformPolicy>,
    /// Hard cap on live particles (None = unlimited)
    max_particles: Option<usize>,
    stats: SystemStats,
    next_id: u32,
}

impl ParticleSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_particles(mut self, max_particles: Option<usize>) -> Self {
        self.max_particles = max_particles;
        self
    }

    /// Register a policy for particles to share
    pub fn add_policy(&mut self, policy: TransformPolicy) -> PolicyId {
        let id = PolicyId(self.policies.len());
        log::info!(
            "Registered transform policy {} ({} transforms, cache {})",
            id.index(),
            policy.transforms().len(),
            if policy.uses_cache() { "on" } else { "off" }
        );
        self.policies.push(policy);
        id
    }

    pub fn policy(&self, id: PolicyId) -> Option<&TransformPolicy> {
        self.policies.get(id.index())
    }

    pub fn policy_mut(&mut self, id: PolicyId) -> Option<&mut TransformPolicy> {
        self.policies.get_mut(id.index())
    }

    pub fn policies(&self) -> &[TransformPolicy] {
        &self.policies
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn get(&self, id: ParticleId) -> Option<&Particle> {
        // Ids wrap at u32::MAX, so the list is not always sorted by id
        self.particles.iter().find(|p| p.id == id)
    }

    /// Number of live particles
    pub fn live(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn stats(&self) -> SystemStats {
        self.stats
    }

    /// Remove every particle (policies and their caches stay)
    pub fn clear(&mut self) {
        self.particles.clear();
    }

    fn next_particle_id(&mut self) -> ParticleId {
        let id = ParticleId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        id
    }

    /// Spawn a particle unless the cull draw or the cap rejects it
    ///
    /// Exactly one uniform value is drawn per call. The particle takes its
    /// own copy of position and velocity.
    pub fn spawn<R>(&mut self, rng: &mut R, spawn: Spawn) -> Option<ParticleId>
    where
        R: RandomSource + ?Sized,
    {
        if rng.uniform() < spawn.cull_chance {
            self.stats.culled += 1;
            return None;
        }

        if let Some(max) = self.max_particles {
            if self.particles.len() >= max {
                log::debug!("Particle cap of {} reached, dropping spawn", max);
                self.stats.capped += 1;
                return None;
            }
        }

        if let Some(policy) = spawn.policy {
            if policy.index() >= self.policies.len() {
                log::warn!(
                    "Spawn references unknown policy {}, particle will not be transformed",
                    policy.index()
                );
            }
        }

        let id = self.next_particle_id();
        self.particles.push(Particle::new(
            id,
            spawn.position,
            spawn.velocity,
            spawn.image,
            spawn.life_span,
            spawn.policy,
        ));
        self.stats.spawned += 1;
        Some(id)
    }

    /// Step every live particle and drop the ones that expire or leave bounds
    ///
    /// Removal happens in the same pass, so after this returns no particle
    /// has `age >= life_span`.
    pub fn tick<F>(&mut self, gravity: DVec2, dt: f64, out_of_bounds: F) -> TickReport
    where
        F: Fn(&Particle) -> bool,
    {
        let mut report = TickReport::default();
        let policies = &mut self.policies;

        self.particles.retain_mut(|particle| {
            report.stepped += 1;
            let policy = match particle.policy {
                Some(id) => policies.get_mut(id.index()),
                None => None,
            };
            match particle.step(gravity, dt, policy) {
                StepResult::Expired => {
                    report.expired += 1;
                    false
                }
                StepResult::Alive if out_of_bounds(&*particle) => {
                    report.out_of_bounds += 1;
                    false
                }
                StepResult::Alive => true,
            }
        });

        self.stats.expired += report.expired as u64;
        self.stats.out_of_bounds += report.out_of_bounds as u64;
        report
    }
}
