//! Particle state and integration

use std::fmt;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::image::ImageHandle;
use crate::transform::{PolicyId, PolicyKey, TransformPolicy};

/// Stable particle identifier, allocated in spawn order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParticleId(pub u32);

impl fmt::Display for ParticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Result of advancing a particle one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    Alive,
    /// Age reached life span; the particle was not moved this tick
    Expired,
}

/// A short-lived sprite advanced under constant acceleration
#[derive(Debug, Clone)]
pub struct Particle {
    pub(crate) id: ParticleId,
    /// Continuous position (the renderer may round it)
    pub(crate) position: DVec2,
    pub(crate) velocity: DVec2,
    pub(crate) age: f64,
    pub(crate) life_span: f64,
    /// Reference sprite, never replaced
    pub(crate) original_image: ImageHandle,
    /// Sprite to draw: the original or a policy output
    pub(crate) current_image: ImageHandle,
    /// Policy key behind `current_image`, kept for lossy updates
    pub(crate) last_cache_key: Option<PolicyKey>,
    pub(crate) policy: Option<PolicyId>,
}

impl Particle {
    /// Create a particle at age 0 showing its original image
    ///
    /// A NaN or negative life span is treated as 0 (expires on first step).
    pub fn new(
        id: ParticleId,
        position: DVec2,
        velocity: DVec2,
        image: ImageHandle,
        life_span: f64,
        policy: Option<PolicyId>,
    ) -> Self {
        let life_span = if life_span >= 0.0 { life_span } else { 0.0 };
        Self {
            id,
            position,
            velocity,
            age: 0.0,
            life_span,
            current_image: image.clone(),
            original_image: image,
            last_cache_key: None,
            policy,
        }
    }

    #[inline]
    pub fn id(&self) -> ParticleId {
        self.id
    }

    #[inline]
    pub fn position(&self) -> DVec2 {
        self.position
    }

    /// Position snapped to whole pixels for drawing
    pub fn render_position(&self) -> DVec2 {
        self.position.round()
    }

    #[inline]
    pub fn velocity(&self) -> DVec2 {
        self.velocity
    }

    #[inline]
    pub fn age(&self) -> f64 {
        self.age
    }

    #[inline]
    pub fn life_span(&self) -> f64 {
        self.life_span
    }

    pub fn is_expired(&self) -> bool {
        self.age >= self.life_span
    }

    pub fn original_image(&self) -> &ImageHandle {
        &self.original_image
    }

    pub fn current_image(&self) -> &ImageHandle {
        &self.current_image
    }

    pub fn last_cache_key(&self) -> Option<&PolicyKey> {
        self.last_cache_key.as_ref()
    }

    pub fn policy(&self) -> Option<PolicyId> {
        self.policy
    }

    /// Advance by `dt`: age, then semi-implicit Euler, then refresh visuals
    ///
    /// `policy` should be the policy this particle was spawned with; the
    /// owning system resolves it.
    pub fn step(
        &mut self,
        gravity: DVec2,
        dt: f64,
        policy: Option<&mut TransformPolicy>,
    ) -> StepResult {
        self.age += dt;
        if self.is_expired() {
            return StepResult::Expired;
        }

        // Velocity first, then position with the new velocity
        self.velocity += gravity * dt;
        self.position += self.velocity * dt;

        if let Some(policy) = policy {
            policy.refresh(self);
        }

        StepResult::Alive
    }
}
