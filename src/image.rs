//! Shared image handles
//!
//! An [`ImageHandle`] is a cheap, cloneable reference to an immutable RGBA
//! bitmap. Equality and hashing go by identity ([`ImageId`]), not pixels:
//! two handles are equal only if they refer to the same allocation.
//! Transforms never mutate a bitmap; they produce a new handle.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::{DMat2, DVec2};
use image::RgbaImage;
use image::imageops::{self, FilterType};
use serde::{Deserialize, Serialize};

static NEXT_IMAGE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of an image allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ImageId(u64);

impl ImageId {
    fn next() -> Self {
        Self(NEXT_IMAGE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "img#{}", self.0)
    }
}

/// Opaque, shareable reference to a renderable bitmap
#[derive(Clone)]
pub struct ImageHandle {
    id: ImageId,
    pixels: Arc<RgbaImage>,
}

impl ImageHandle {
    /// Take ownership of a bitmap and give it a fresh identity
    pub fn new(pixels: RgbaImage) -> Self {
        Self {
            id: ImageId::next(),
            pixels: Arc::new(pixels),
        }
    }

    /// Fully transparent image of the given size
    pub fn blank(width: u32, height: u32) -> Self {
        Self::new(RgbaImage::new(width, height))
    }

    /// Transparent square with an opaque inset square of `color`
    ///
    /// The default particle sprite: 20x20 with a 2px transparent margin.
    pub fn bordered_square(size: u32, margin: u32, color: [u8; 4]) -> Self {
        let inner = margin..size.saturating_sub(margin);
        Self::new(RgbaImage::from_fn(size, size, |x, y| {
            if inner.contains(&x) && inner.contains(&y) {
                image::Rgba(color)
            } else {
                image::Rgba([0, 0, 0, 0])
            }
        }))
    }

    #[inline]
    pub fn id(&self) -> ImageId {
        self.id
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    /// True if the image has no pixels (a zero dimension)
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Borrow the underlying bitmap (for renderers uploading textures)
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Resize to exactly `width` x `height` (nearest-neighbour)
    ///
    /// Zero in either dimension yields an empty image instead of sampling.
    pub fn scaled(&self, width: u32, height: u32) -> Self {
        if width == 0 || height == 0 || self.is_empty() {
            return Self::blank(width, height);
        }
        Self::new(imageops::resize(
            &*self.pixels,
            width,
            height,
            FilterType::Nearest,
        ))
    }

    /// Rotate counter-clockwise (as seen on screen) by `degrees`
    ///
    /// The canvas grows to the rotated bounding box; uncovered pixels are
    /// transparent.
    pub fn rotated(&self, degrees: f64) -> Self {
        if self.is_empty() {
            return self.clone();
        }
        let (w, h) = self.dimensions();
        let theta = degrees.to_radians();
        let (sin, cos) = (theta.sin().abs(), theta.cos().abs());
        let (wf, hf) = (w as f64, h as f64);
        // Shave float noise so 90 degree turns don't gain a pixel
        let out_w = (wf * cos + hf * sin - 1e-6).ceil().max(1.0) as u32;
        let out_h = (wf * sin + hf * cos - 1e-6).ceil().max(1.0) as u32;

        let src_center = DVec2::new(wf, hf) / 2.0;
        let dst_center = DVec2::new(out_w as f64, out_h as f64) / 2.0;
        // Screen y points down, so the inverse of a visual CCW turn is the
        // y-up CCW matrix.
        let inverse = DMat2::from_angle(theta);

        let src = &*self.pixels;
        let out = RgbaImage::from_fn(out_w, out_h, |x, y| {
            let d = DVec2::new(x as f64 + 0.5, y as f64 + 0.5) - dst_center;
            let s = inverse * d + src_center;
            if s.x >= 0.0 && s.y >= 0.0 && s.x < wf && s.y < hf {
                *src.get_pixel(s.x as u32, s.y as u32)
            } else {
                image::Rgba([0, 0, 0, 0])
            }
        });
        Self::new(out)
    }

    /// Identity comparison (same as `==`)
    pub fn same_as(&self, other: &ImageHandle) -> bool {
        self.id == other.id
    }
}

impl PartialEq for ImageHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ImageHandle {}

impl Hash for ImageHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ImageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageHandle")
            .field("id", &self.id)
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_compare_by_identity() {
        let a = ImageHandle::blank(4, 4);
        let b = ImageHandle::blank(4, 4);
        let a2 = a.clone();
        assert_eq!(a, a2);
        assert_ne!(a, b);
        assert!(a.same_as(&a2));
    }

    #[test]
    fn test_scaled_dimensions() {
        let img = ImageHandle::bordered_square(20, 2, [255, 255, 255, 255]);
        let scaled = img.scaled(14, 26);
        assert_eq!(scaled.dimensions(), (14, 26));
        assert_ne!(scaled.id(), img.id());
        // Source untouched
        assert_eq!(img.dimensions(), (20, 20));
    }

    #[test]
    fn test_scaled_to_zero_is_empty() {
        let img = ImageHandle::blank(20, 20);
        let scaled = img.scaled(0, 20);
        assert!(scaled.is_empty());
    }

    #[test]
    fn test_rotated_quarter_turn_swaps_dimensions() {
        let img = ImageHandle::blank(10, 20);
        let rotated = img.rotated(90.0);
        assert_eq!(rotated.dimensions(), (20, 10));
    }

    #[test]
    fn test_rotated_diagonal_grows_canvas() {
        let img = ImageHandle::blank(20, 20);
        let rotated = img.rotated(45.0);
        // 20 * sqrt(2) = 28.28
        assert_eq!(rotated.dimensions(), (29, 29));
    }

    #[test]
    fn test_rotated_quarter_turn_moves_pixels_counter_clockwise() {
        // Mark the right-middle pixel; a CCW quarter turn moves it to top-middle
        let mut pixels = RgbaImage::new(3, 3);
        pixels.put_pixel(2, 1, image::Rgba([255, 0, 0, 255]));
        let rotated = ImageHandle::new(pixels).rotated(90.0);
        assert_eq!(rotated.dimensions(), (3, 3));
        assert_eq!(rotated.pixels().get_pixel(1, 0).0, [255, 0, 0, 255]);
        assert_eq!(rotated.pixels().get_pixel(2, 1).0, [0, 0, 0, 0]);
    }

    #[test]
    fn test_bordered_square_has_transparent_margin() {
        let img = ImageHandle::bordered_square(20, 2, [255, 255, 255, 255]);
        assert_eq!(img.pixels().get_pixel(0, 0).0[3], 0);
        assert_eq!(img.pixels().get_pixel(10, 10).0[3], 255);
        assert_eq!(img.pixels().get_pixel(18, 10).0[3], 0);
    }
}
