//! Particle Cache headless demo
//!
//! Runs the emitter/gravity/floor loop without a window and reports
//! particle counts and transform cache effectiveness.
//!
//! Usage: `particle-cache [settings.json] [frames] [low|medium|high]`
//!
//! Pass `-` as the settings path to use the defaults.

use glam::DVec2;

use particle_cache::ImageHandle;
use particle_cache::Settings;
use particle_cache::platform::{
    Clock, FixedClock, FrameClock, PcgRandom, Renderer, draw_particles,
};
use particle_cache::sim::{Emitter, ParticleSystem, below_floor};
use particle_cache::transform::TransformPolicy;

const DEFAULT_FRAMES: u32 = 600;
const REPORT_EVERY: u32 = 60;
const ARENA_SIZE: f64 = 800.0;

/// Stands in for a real blitter: counts draws and covered pixels
#[derive(Default)]
struct CountingRenderer {
    draws: u64,
    pixels: u64,
}

impl Renderer for CountingRenderer {
    fn draw(&mut self, image: &ImageHandle, _position: DVec2) {
        self.draws += 1;
        self.pixels += image.width() as u64 * image.height() as u64;
    }
}

fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let mut settings = match args.next() {
        Some(path) if path != "-" => match Settings::load(&path) {
            Ok(settings) => settings,
            Err(e) => {
                log::error!("{}", e);
                std::process::exit(1);
            }
        },
        _ => Settings::default(),
    };
    let frames = args
        .next()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_FRAMES);
    if let Some(quality) = args.next() {
        if let Err(e) = settings.apply_quality(&quality) {
            log::error!("{}", e);
            std::process::exit(1);
        }
    }

    log::info!(
        "Particle Cache demo starting: {} frames, quality {}",
        frames,
        settings.quality.as_str()
    );

    let mut clock: Box<dyn Clock> = match settings.fixed_dt {
        Some(dt) => Box::new(FixedClock::new(dt)),
        None => Box::new(FrameClock::default()),
    };
    let mut rng = PcgRandom::new(settings.seed);
    let mut system = ParticleSystem::new().with_max_particles(settings.max_particles());
    let policy = system.add_policy(TransformPolicy::from_config(&settings.policy));

    let mut emitter = Emitter::new(
        DVec2::splat(ARENA_SIZE / 2.0),
        ImageHandle::bordered_square(20, 2, [255, 255, 255, 255]),
    );
    emitter.spread = settings.spawn_spread;
    emitter.life_span = settings.life_span;
    emitter.cull_chance = settings.cull_chance;
    emitter.policy = Some(policy);

    let out_of_bounds = below_floor(settings.floor_y);
    let mut renderer = CountingRenderer::default();

    for frame in 1..=frames {
        let dt = clock.delta_time();

        // Sweep the emitter across the arena like a cursor would
        let sweep = (frame as f64 * 0.02).sin() * 0.4 + 0.5;
        emitter.position.x = sweep * ARENA_SIZE;

        emitter.emit(&mut system, &mut rng);
        system.tick(settings.gravity, dt, &out_of_bounds);
        draw_particles(&mut renderer, system.particles());

        if frame % REPORT_EVERY == 0 {
            let stats = system.policy(policy).map(|p| p.stats()).unwrap_or_default();
            let cached = system.policy(policy).map(|p| p.cache_len()).unwrap_or(0);
            log::info!(
                "frame {:>5}: particles {:>4}, cache {:>4} entries, hit rate {:.1}%",
                frame,
                system.live(),
                cached,
                stats.hit_rate() * 100.0
            );
        }
    }

    let stats = system.stats();
    log::info!(
        "Done: spawned {}, culled {}, capped {}, expired {}, fell {}; {} draws, {} pixels",
        stats.spawned,
        stats.culled,
        stats.capped,
        stats.expired,
        stats.out_of_bounds,
        renderer.draws,
        renderer.pixels
    );
}
