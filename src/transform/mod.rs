//! Image transforms driven by particle state
//!
//! Every transform has two faces:
//! - `apply`: produce a new image from the incoming one
//! - `cache_key`: a quantized summary of exactly the state `apply` reads
//!
//! `apply` renders the *quantized* value its key reports (rounded pixel
//! size, whole-degree angle, bucketed scale), so two particles with equal
//! keys always get identical images. That is what makes the policy cache
//! safe to share.

pub mod policy;

pub use policy::{PolicyConfig, PolicyId, PolicyKey, PolicyStats, RefreshOutcome, TransformPolicy};

use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_SCALE_GRANULARITY, MAX_STRETCH, STRETCH_REFERENCE_SPEED};
use crate::image::ImageHandle;
use crate::sim::Particle;
use crate::{heading_degrees, quantize};

/// Quantized, hashable summary of one transform's visual input
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TransformKey {
    /// Rounded output size in pixels (width, height)
    Size(i64, i64),
    /// Whole-degree rotation
    Angle(i64),
    /// Scale bucket (scale * granularity, rounded)
    Scale(i64),
    /// Ordered keys of a chained transform
    Chain(Vec<TransformKey>),
}

fn default_granularity() -> f64 {
    DEFAULT_SCALE_GRANULARITY
}

/// A named, pure image transform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transform {
    /// Squash horizontally and stretch vertically with speed
    StretchByVelocity,
    /// Turn the sprite to face its direction of travel
    RotateByVelocityDirection,
    /// Linear scale from `start` at birth to `end` at expiry
    ScaleOverLifetime {
        start: f64,
        end: f64,
        /// Buckets per unit of scale; higher = finer, fewer cache hits
        #[serde(default = "default_granularity")]
        granularity: f64,
    },
    /// Apply each transform in order, each consuming the previous output
    Chain { transforms: Vec<Transform> },
}

impl Transform {
    /// Stretch then rotate, the usual spark look
    pub fn roto_stretch() -> Self {
        Transform::Chain {
            transforms: vec![
                Transform::StretchByVelocity,
                Transform::RotateByVelocityDirection,
            ],
        }
    }

    /// Shrink from full size to nothing over the particle's life
    pub fn shrink_over_life() -> Self {
        Transform::ScaleOverLifetime {
            start: 1.0,
            end: 0.0,
            granularity: DEFAULT_SCALE_GRANULARITY,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Transform::StretchByVelocity => "stretch_by_velocity",
            Transform::RotateByVelocityDirection => "rotate_by_velocity_direction",
            Transform::ScaleOverLifetime { .. } => "scale_over_lifetime",
            Transform::Chain { .. } => "chain",
        }
    }

    /// Produce the transformed image for `particle`, starting from `input`
    pub fn apply(&self, particle: &Particle, input: &ImageHandle) -> ImageHandle {
        match self {
            Transform::StretchByVelocity => {
                // The key size is relative to the original sprite; carry the
                // same ratio onto whatever earlier transforms produced.
                let (key_w, key_h) = stretch_key_size(particle);
                let (orig_w, orig_h) = particle.original_image.dimensions();
                let (in_w, in_h) = input.dimensions();
                let w = rescale(key_w, in_w, orig_w);
                let h = rescale(key_h, in_h, orig_h);
                if (w, h) == (in_w, in_h) {
                    input.clone()
                } else {
                    input.scaled(w, h)
                }
            }
            Transform::RotateByVelocityDirection => {
                input.rotated(quantize(heading_degrees(particle.velocity)) as f64)
            }
            Transform::ScaleOverLifetime {
                start,
                end,
                granularity,
            } => {
                let granularity = effective_granularity(*granularity);
                let bucket = scale_bucket(*start, *end, granularity, particle);
                let scale = (bucket as f64 / granularity).max(0.0);
                let (w, h) = input.dimensions();
                input.scaled(pixels(w as f64 * scale), pixels(h as f64 * scale))
            }
            Transform::Chain { transforms } => transforms
                .iter()
                .fold(input.clone(), |image, t| t.apply(particle, &image)),
        }
    }

    /// Quantized key of the state `apply` consumes
    pub fn cache_key(&self, particle: &Particle) -> TransformKey {
        match self {
            Transform::StretchByVelocity => {
                let (w, h) = stretch_key_size(particle);
                TransformKey::Size(w, h)
            }
            Transform::RotateByVelocityDirection => {
                TransformKey::Angle(quantize(heading_degrees(particle.velocity)))
            }
            Transform::ScaleOverLifetime {
                start,
                end,
                granularity,
            } => TransformKey::Scale(scale_bucket(
                *start,
                *end,
                effective_granularity(*granularity),
                particle,
            )),
            Transform::Chain { transforms } => {
                TransformKey::Chain(transforms.iter().map(|t| t.cache_key(particle)).collect())
            }
        }
    }
}

/// Stretched (width, height) from the original sprite size, or None at rest
fn stretch_size(particle: &Particle) -> Option<(f64, f64)> {
    let v = particle.velocity;
    let total_delta = v.x.abs() + v.y.abs();
    if total_delta == 0.0 || !total_delta.is_finite() {
        return None;
    }

    let stretch = ((STRETCH_REFERENCE_SPEED + total_delta) / STRETCH_REFERENCE_SPEED)
        .clamp(1.0, MAX_STRETCH);
    let compress = 2.0 - stretch;

    let (w, h) = particle.original_image.dimensions();
    Some((compress * w as f64, stretch * h as f64))
}

/// Rounded stretched size of the original sprite; its own size at rest
fn stretch_key_size(particle: &Particle) -> (i64, i64) {
    let (w, h) = stretch_size(particle).unwrap_or_else(|| {
        let (w, h) = particle.original_image.dimensions();
        (w as f64, h as f64)
    });
    (quantize(w), quantize(h))
}

/// Map a size quantized against `original` onto an `incoming` dimension
fn rescale(target: i64, incoming: u32, original: u32) -> u32 {
    if original == 0 {
        pixels(target as f64)
    } else {
        pixels(target as f64 * incoming as f64 / original as f64)
    }
}

/// Fraction of life used, 0 when the life span is zero
fn life_fraction(particle: &Particle) -> f64 {
    if particle.life_span > 0.0 {
        particle.age / particle.life_span
    } else {
        0.0
    }
}

fn scale_bucket(start: f64, end: f64, granularity: f64, particle: &Particle) -> i64 {
    let scale = start + (end - start) * life_fraction(particle);
    quantize(scale * granularity)
}

fn effective_granularity(granularity: f64) -> f64 {
    if granularity.is_finite() && granularity > 0.0 {
        granularity
    } else {
        DEFAULT_SCALE_GRANULARITY
    }
}

/// Rounded, non-negative pixel count
fn pixels(value: f64) -> u32 {
    quantize(value).clamp(0, u32::MAX as i64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::ParticleId;
    use glam::DVec2;
    use proptest::prelude::*;

    fn sprite() -> ImageHandle {
        ImageHandle::bordered_square(20, 2, [255, 255, 255, 255])
    }

    fn particle_with(velocity: DVec2, image: ImageHandle) -> Particle {
        Particle::new(ParticleId(1), DVec2::ZERO, velocity, image, 10.0, None)
    }

    #[test]
    fn test_stretch_at_rest_is_identity() {
        let image = sprite();
        let p = particle_with(DVec2::ZERO, image.clone());

        let out = Transform::StretchByVelocity.apply(&p, &image);
        assert_eq!(out, image);
        assert_eq!(
            Transform::StretchByVelocity.cache_key(&p),
            TransformKey::Size(20, 20)
        );
    }

    #[test]
    fn test_stretch_after_shrink_keeps_shrink() {
        let image = sprite();
        let policy = TransformPolicy::new(vec![
            Transform::shrink_over_life(),
            Transform::StretchByVelocity,
        ]);
        let mut rest = particle_with(DVec2::ZERO, image.clone());
        let mut slow = particle_with(DVec2::new(0.0, 0.01), image.clone());
        let mut fast = particle_with(DVec2::new(0.0, 10.0), image.clone());
        rest.age = 5.0;
        slow.age = 5.0;
        fast.age = 5.0;

        // Same key at rest and barely moving: same half-size image
        assert_eq!(policy.cache_key(&rest), policy.cache_key(&slow));
        let (rest_img, slow_img) = (policy.render(&rest), policy.render(&slow));
        assert_eq!(rest_img.dimensions(), (10, 10));
        assert_eq!(rest_img.pixels().as_raw(), slow_img.pixels().as_raw());

        // Moving: stretch (16x24 at full size) applies to the shrunk sprite
        assert_eq!(policy.render(&fast).dimensions(), (8, 12));
    }

    #[test]
    fn test_stretch_scales_with_speed() {
        let image = sprite();
        // d = 10 -> stretch 1.2, compress 0.8
        let p = particle_with(DVec2::new(6.0, -4.0), image.clone());

        assert_eq!(
            Transform::StretchByVelocity.cache_key(&p),
            TransformKey::Size(16, 24)
        );
        let out = Transform::StretchByVelocity.apply(&p, &image);
        assert_eq!(out.dimensions(), (16, 24));
    }

    #[test]
    fn test_stretch_clamps_at_max() {
        let image = sprite();
        let p = particle_with(DVec2::new(500.0, 500.0), image.clone());
        assert_eq!(
            Transform::StretchByVelocity.cache_key(&p),
            TransformKey::Size(10, 30)
        );
    }

    #[test]
    fn test_rotate_key_for_3_4() {
        let p = particle_with(DVec2::new(3.0, 4.0), sprite());
        assert_eq!(
            Transform::RotateByVelocityDirection.cache_key(&p),
            TransformKey::Angle(217)
        );
    }

    #[test]
    fn test_scale_over_lifetime_buckets() {
        let image = sprite();
        let mut p = particle_with(DVec2::ZERO, image.clone());
        p.age = 5.0;

        let shrink = Transform::shrink_over_life();
        assert_eq!(shrink.cache_key(&p), TransformKey::Scale(5));
        assert_eq!(shrink.apply(&p, &image).dimensions(), (10, 10));

        p.age = 10.0;
        assert_eq!(shrink.cache_key(&p), TransformKey::Scale(0));
        assert!(shrink.apply(&p, &image).is_empty());
    }

    #[test]
    fn test_scale_zero_life_span_uses_start() {
        let image = sprite();
        let mut p = Particle::new(ParticleId(1), DVec2::ZERO, DVec2::ZERO, image, 0.0, None);
        p.age = 3.0;
        let grow = Transform::ScaleOverLifetime {
            start: 2.0,
            end: 4.0,
            granularity: 10.0,
        };
        assert_eq!(grow.cache_key(&p), TransformKey::Scale(20));
    }

    #[test]
    fn test_scale_bad_granularity_falls_back() {
        let mut p = particle_with(DVec2::ZERO, sprite());
        p.age = 5.0;
        let t = Transform::ScaleOverLifetime {
            start: 1.0,
            end: 0.0,
            granularity: 0.0,
        };
        assert_eq!(t.cache_key(&p), TransformKey::Scale(5));
    }

    #[test]
    fn test_chain_key_is_ordered_tuple() {
        let p = particle_with(DVec2::new(3.0, 4.0), sprite());
        // d = 7 -> stretch 1.14, compress 0.86
        assert_eq!(
            Transform::roto_stretch().cache_key(&p),
            TransformKey::Chain(vec![TransformKey::Size(17, 23), TransformKey::Angle(217)])
        );
    }

    #[test]
    fn test_chain_applies_in_order() {
        let image = sprite();
        let p = particle_with(DVec2::new(0.0, 50.0), image.clone());
        // Stretch to 10x30, then a half turn (heading 180) keeps the bounding box
        let out = Transform::roto_stretch().apply(&p, &image);
        assert_eq!(out.dimensions(), (10, 30));
    }

    #[test]
    fn test_transform_serde_tags() {
        let json = r#"[
            {"kind": "stretch_by_velocity"},
            {"kind": "scale_over_lifetime", "start": 1.0, "end": 0.5},
            {"kind": "chain", "transforms": [{"kind": "rotate_by_velocity_direction"}]}
        ]"#;
        let parsed: Vec<Transform> = serde_json::from_str(json).unwrap();
        assert_eq!(parsed[0], Transform::StretchByVelocity);
        assert_eq!(
            parsed[1],
            Transform::ScaleOverLifetime {
                start: 1.0,
                end: 0.5,
                granularity: DEFAULT_SCALE_GRANULARITY,
            }
        );
        assert_eq!(parsed[2].name(), "chain");
    }

    proptest! {
        #[test]
        fn prop_equal_stretch_keys_give_equal_sizes(
            vx in -200.0f64..200.0, vy in -200.0f64..200.0,
            dx in -0.5f64..0.5, dy in -0.5f64..0.5,
        ) {
            let image = sprite();
            let a = particle_with(DVec2::new(vx, vy), image.clone());
            let b = particle_with(DVec2::new(vx + dx, vy + dy), image.clone());
            let t = Transform::StretchByVelocity;
            if t.cache_key(&a) == t.cache_key(&b) {
                prop_assert_eq!(
                    t.apply(&a, &image).dimensions(),
                    t.apply(&b, &image).dimensions()
                );
            }
        }

        #[test]
        fn prop_rotate_key_is_pure(vx in -100.0f64..100.0, vy in -100.0f64..100.0) {
            let image = sprite();
            let p = particle_with(DVec2::new(vx, vy), image.clone());
            let q = particle_with(DVec2::new(vx, vy), image.clone());
            let t = Transform::RotateByVelocityDirection;
            let before = t.cache_key(&p);
            let rotated = t.apply(&p, &image);
            prop_assert_eq!(&before, &t.cache_key(&p));
            prop_assert_eq!(&before, &t.cache_key(&q));
            prop_assert_eq!(rotated.dimensions(), t.apply(&q, &image).dimensions());
        }

        #[test]
        fn prop_equal_rotate_keys_give_equal_pixels(
            vx in -100.0f64..100.0, vy in -100.0f64..100.0, jitter in -1e-3f64..1e-3,
        ) {
            let image = sprite();
            let a = particle_with(DVec2::new(vx, vy), image.clone());
            let b = particle_with(DVec2::new(vx + jitter, vy), image.clone());
            let t = Transform::RotateByVelocityDirection;
            if t.cache_key(&a) == t.cache_key(&b) {
                let (ia, ib) = (t.apply(&a, &image), t.apply(&b, &image));
                prop_assert_eq!(ia.pixels().as_raw(), ib.pixels().as_raw());
            }
        }

        #[test]
        fn prop_mixed_pipelines_equal_keys_equal_images(
            vx in prop_oneof![Just(0.0f64), -3.0f64..3.0],
            vy in prop_oneof![Just(0.0f64), -3.0f64..3.0],
            jitter in prop_oneof![Just(0.0f64), -0.02f64..0.02],
            age in 0.0f64..10.0,
            rotate_first in any::<bool>(),
        ) {
            let image = sprite();
            let lead = if rotate_first {
                Transform::RotateByVelocityDirection
            } else {
                Transform::shrink_over_life()
            };
            let policy = TransformPolicy::new(vec![lead, Transform::StretchByVelocity]);

            let mut a = particle_with(DVec2::new(vx, vy), image.clone());
            let mut b = particle_with(DVec2::new(vx + jitter, vy), image.clone());
            a.age = age;
            b.age = age;

            if policy.cache_key(&a) == policy.cache_key(&b) {
                let (ia, ib) = (policy.render(&a), policy.render(&b));
                prop_assert_eq!(ia.dimensions(), ib.dimensions());
                prop_assert_eq!(ia.pixels().as_raw(), ib.pixels().as_raw());
            }
        }
    }
}
