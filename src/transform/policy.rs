//! Transform policies
//!
//! A policy is an ordered transform pipeline plus an optional cache of its
//! outputs. Policies are meant to be shared: every particle pointing at the
//! same policy reads and fills the same cache, which is where the hit rate
//! comes from.
//!
//! The cache is never evicted. Key cardinality is bounded by quantization,
//! but a fine-grained pipeline over many source images can still grow it
//! without limit; hosts that care call [`TransformPolicy::clear_cache`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{Transform, TransformKey};
use crate::image::{ImageHandle, ImageId};
use crate::sim::Particle;

/// Index of a policy registered with a [`ParticleSystem`](crate::sim::ParticleSystem)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PolicyId(pub(crate) usize);

impl PolicyId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Cache key for a whole pipeline
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PolicyKey {
    /// Source image identity, when the policy serves several sprites
    pub source: Option<ImageId>,
    /// One key per transform, in pipeline order
    pub parts: Vec<TransformKey>,
}

/// Serializable description of a policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub transforms: Vec<Transform>,
    pub use_cache: bool,
    /// Prefix keys with the source image identity
    pub include_source_identity: bool,
    /// Skip recomputation while a particle's key is unchanged
    pub lossy_updates: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            transforms: vec![Transform::roto_stretch()],
            use_cache: true,
            include_source_identity: true,
            lossy_updates: false,
        }
    }
}

/// What a single `refresh` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Caching off: pipeline ran
    Uncached,
    /// Cached image reused, no transform ran
    Hit,
    /// Pipeline ran and the result was stored
    Miss,
    /// Lossy update: key unchanged, image left as is
    Skipped,
}

/// Running counters for a policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PolicyStats {
    pub hits: u64,
    pub misses: u64,
    pub uncached: u64,
    pub skipped: u64,
}

impl PolicyStats {
    /// Fraction of cached lookups that hit (0 when nothing was looked up)
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }

    fn record(&mut self, outcome: RefreshOutcome) {
        match outcome {
            RefreshOutcome::Uncached => self.uncached += 1,
            RefreshOutcome::Hit => self.hits += 1,
            RefreshOutcome::Miss => self.misses += 1,
            RefreshOutcome::Skipped => self.skipped += 1,
        }
    }
}

/// Ordered transform pipeline with an owned output cache
#[derive(Debug, Clone)]
pub struct TransformPolicy {
    sequence: Vec<Transform>,
    use_cache: bool,
    include_source_identity: bool,
    lossy_updates: bool,
    cache: HashMap<PolicyKey, ImageHandle>,
    stats: PolicyStats,
}

impl TransformPolicy {
    /// Uncached pipeline of `sequence`
    pub fn new(sequence: Vec<Transform>) -> Self {
        Self {
            sequence,
            use_cache: false,
            include_source_identity: false,
            lossy_updates: false,
            cache: HashMap::new(),
            stats: PolicyStats::default(),
        }
    }

    pub fn from_config(config: &PolicyConfig) -> Self {
        Self::new(config.transforms.clone())
            .with_cache(config.use_cache)
            .with_source_identity(config.include_source_identity)
            .with_lossy_updates(config.lossy_updates)
    }

    pub fn with_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    pub fn with_source_identity(mut self, include: bool) -> Self {
        self.include_source_identity = include;
        self
    }

    pub fn with_lossy_updates(mut self, lossy: bool) -> Self {
        self.lossy_updates = lossy;
        self
    }

    pub fn transforms(&self) -> &[Transform] {
        &self.sequence
    }

    pub fn uses_cache(&self) -> bool {
        self.use_cache
    }

    pub fn stats(&self) -> PolicyStats {
        self.stats
    }

    /// Number of distinct cached images
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Drop every cached image (particles keep the images they hold)
    pub fn clear_cache(&mut self) {
        log::debug!("Clearing transform cache ({} entries)", self.cache.len());
        self.cache.clear();
    }

    /// Composite key for `particle` under this pipeline
    pub fn cache_key(&self, particle: &Particle) -> PolicyKey {
        PolicyKey {
            source: self
                .include_source_identity
                .then(|| particle.original_image.id()),
            parts: self.sequence.iter().map(|t| t.cache_key(particle)).collect(),
        }
    }

    /// Run the pipeline from the particle's original image
    pub fn render(&self, particle: &Particle) -> ImageHandle {
        self.sequence
            .iter()
            .fold(particle.original_image.clone(), |image, t| {
                t.apply(particle, &image)
            })
    }

    /// Recompute `particle.current_image` from its current physical state
    pub fn refresh(&mut self, particle: &mut Particle) -> RefreshOutcome {
        let key = (self.use_cache || self.lossy_updates).then(|| self.cache_key(particle));

        if self.lossy_updates && key.is_some() && particle.last_cache_key == key {
            self.stats.record(RefreshOutcome::Skipped);
            return RefreshOutcome::Skipped;
        }

        // Transforms aren't incremental: always start over from the original
        particle.current_image = particle.original_image.clone();

        let outcome = match &key {
            Some(key) if self.use_cache => match self.cache.get(key) {
                Some(image) => {
                    particle.current_image = image.clone();
                    RefreshOutcome::Hit
                }
                None => {
                    let image = self.render(particle);
                    log::trace!(
                        "Transform cache miss for particle {} ({} entries)",
                        particle.id,
                        self.cache.len() + 1
                    );
                    self.cache.insert(key.clone(), image.clone());
                    particle.current_image = image;
                    RefreshOutcome::Miss
                }
            },
            _ => {
                particle.current_image = self.render(particle);
                RefreshOutcome::Uncached
            }
        };

        if self.lossy_updates {
            particle.last_cache_key = key;
        }
        self.stats.record(outcome);
        outcome
    }
}
