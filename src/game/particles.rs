//! Particle streams - stochastic decaying particles for exhaust, trails and
//! explosion debris

use rand::Rng;

use super::physics::heading;
use super::Rgb;

/// Particles at or below this opacity are dropped
pub const OPACITY_EPSILON: f32 = 0.01;

/// Per-tick velocity damping divisor
const VELOCITY_DAMPING: f32 = 1.1;

/// A single particle
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    pub vel_x: f32,
    pub vel_y: f32,
    /// 0..1, divided by the stream's decay rate every tick
    pub opacity: f32,
    /// Diameter in pixels (fixed for the particle's lifetime)
    pub size: f32,
}

impl Particle {
    pub fn new(x: f32, y: f32, vel_x: f32, vel_y: f32, opacity: f32, size: f32) -> Self {
        Self {
            x,
            y,
            vel_x,
            vel_y,
            opacity,
            size,
        }
    }
}

/// Describes one batch of particles leaving an emitter
#[derive(Debug, Clone, Copy)]
pub struct Emission {
    /// Emitter center
    pub x: f32,
    pub y: f32,
    /// Emitter facing in degrees (0 = up); particles leave from behind it
    pub rotation: f32,
    /// Distance from the center to the emission point
    pub distance: f32,
    /// Width of the emission line
    pub spread: f32,
    /// Initial particle speed
    pub speed: f32,
    pub count: u32,
    pub size: f32,
}

/// Ordered set of particles sharing a color
#[derive(Debug, Clone)]
pub struct ParticleStream {
    particles: Vec<Particle>,
    color: Rgb,
}

impl ParticleStream {
    pub fn new(color: Rgb) -> Self {
        Self {
            particles: Vec::new(),
            color,
        }
    }

    pub fn color(&self) -> Rgb {
        self.color
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn push(&mut self, particle: Particle) {
        self.particles.push(particle);
    }

    /// Add `emission.count` particles trailing behind the emitter.
    ///
    /// Each particle starts `distance + jitter` behind the center along the
    /// emission axis, displaced laterally by a cubed jitter so most particles
    /// hug the axis. Its velocity points away from the emitter's facing.
    pub fn emit<R: Rng + ?Sized>(&mut self, emission: &Emission, rng: &mut R) {
        let (back_x, back_y) = heading(emission.rotation - 180.0);
        let (axis_x, axis_y) = heading(emission.rotation - 90.0);

        self.particles.reserve(emission.count as usize);
        for _ in 0..emission.count {
            let jitter_stream = rng.gen::<f32>() * emission.spread;
            let lateral_x = (rng.gen::<f32>() - 0.5).powi(3) * (jitter_stream + emission.spread) * 3.0;
            let lateral_y = (rng.gen::<f32>() - 0.5).powi(3) * (jitter_stream + emission.spread) * 3.0;

            let along = emission.distance + jitter_stream;
            let x = emission.x + along * back_x + lateral_x * axis_x;
            let y = emission.y + along * back_y + lateral_y * axis_y;

            let vel_x = back_x * emission.speed;
            let vel_y = back_y * emission.speed;
            let opacity = rng.gen::<f32>();

            self.particles.push(Particle::new(
                x - vel_x,
                y - vel_y,
                vel_x,
                vel_y,
                opacity,
                emission.size,
            ));
        }
    }

    /// Advance every particle one tick and drop the faded ones.
    ///
    /// `decay_rate` divides opacity each tick; larger values fade faster.
    pub fn decay<R: Rng + ?Sized>(&mut self, decay_rate: f32, rng: &mut R) {
        self.particles.retain_mut(|p| {
            p.x += (rng.gen::<f32>() - 0.5) * 2.0 + p.vel_x;
            p.y += (rng.gen::<f32>() - 0.5) * 2.0 + p.vel_y;
            p.vel_x /= VELOCITY_DAMPING;
            p.vel_y /= VELOCITY_DAMPING;
            p.opacity /= decay_rate;
            p.opacity > OPACITY_EPSILON
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(7)
    }

    fn emission(count: u32) -> Emission {
        Emission {
            x: 100.0,
            y: 100.0,
            rotation: 0.0,
            distance: 10.0,
            spread: 10.0,
            speed: 5.0,
            count,
            size: 4.0,
        }
    }

    #[test]
    fn test_emit_adds_requested_count() {
        let mut stream = ParticleStream::new(Rgb::WHITE);
        stream.emit(&emission(20), &mut rng());
        assert_eq!(stream.len(), 20);
        assert!(stream.particles().iter().all(|p| p.size == 4.0));
        assert!(stream
            .particles()
            .iter()
            .all(|p| (0.0..1.0).contains(&p.opacity)));
    }

    #[test]
    fn test_emitted_particles_trail_behind() {
        // Facing up (+y); particles must start below the emitter and drift down
        let mut stream = ParticleStream::new(Rgb::WHITE);
        stream.emit(&emission(50), &mut rng());
        for p in stream.particles() {
            assert!(p.vel_y < 0.0);
            assert!(p.vel_x.abs() < 1e-4);
            assert!(p.y < 100.0);
        }
    }

    #[test]
    fn test_opacity_decay_and_removal_tick() {
        let rate = 1.07;
        let start = 0.5;
        let mut stream = ParticleStream::new(Rgb::WHITE);
        stream.push(Particle::new(0.0, 0.0, 0.0, 0.0, start, 1.0));

        let mut rng = rng();
        let mut expected = start;
        let mut ticks = 0;
        loop {
            stream.decay(rate, &mut rng);
            expected /= rate;
            ticks += 1;
            if expected <= OPACITY_EPSILON {
                assert!(stream.is_empty(), "particle should be gone at tick {ticks}");
                break;
            }
            assert_eq!(stream.len(), 1, "particle removed early at tick {ticks}");
            let analytic = start / rate.powi(ticks);
            assert!((stream.particles()[0].opacity - analytic).abs() < 1e-4);
        }
        assert!(ticks > 1);
    }

    #[test]
    fn test_decay_removes_without_skipping_neighbours() {
        let mut stream = ParticleStream::new(Rgb::WHITE);
        // Alternate fading and healthy particles; every fading one must go
        for i in 0..10 {
            let opacity = if i % 2 == 0 { 0.0105 } else { 0.9 };
            stream.push(Particle::new(0.0, 0.0, 0.0, 0.0, opacity, 1.0));
        }
        stream.decay(1.2, &mut rng());
        assert_eq!(stream.len(), 5);
        assert!(stream.particles().iter().all(|p| p.opacity > OPACITY_EPSILON));
    }

    #[test]
    fn test_velocity_damped_each_tick() {
        let mut stream = ParticleStream::new(Rgb::WHITE);
        stream.push(Particle::new(0.0, 0.0, 11.0, -11.0, 1.0, 1.0));
        stream.decay(1.01, &mut rng());
        let p = &stream.particles()[0];
        assert!((p.vel_x - 10.0).abs() < 1e-5);
        assert!((p.vel_y + 10.0).abs() < 1e-5);
    }
}
