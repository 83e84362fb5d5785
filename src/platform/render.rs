//! Renderer capability
//!
//! Drawing belongs to the host. The simulation only decides which particles
//! are alive and what each should look like.

use glam::DVec2;

use crate::image::ImageHandle;
use crate::sim::Particle;

/// Draws an image centered at a position
pub trait Renderer {
    fn draw(&mut self, image: &ImageHandle, position: DVec2);
}

/// Draw every particle once, at its pixel-snapped position
pub fn draw_particles<'a, R, I>(renderer: &mut R, particles: I) -> usize
where
    R: Renderer + ?Sized,
    I: IntoIterator<Item = &'a Particle>,
{
    let mut drawn = 0;
    for particle in particles {
        renderer.draw(particle.current_image(), particle.render_position());
        drawn += 1;
    }
    drawn
}
