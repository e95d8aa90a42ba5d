//! Explosions - fans of radiating streams that shed particles as they fade

use rand::Rng;

use crate::config::ExplosionSpec;

use super::particles::{Emission, ParticleStream};
use super::physics::heading;
use super::Rgb;

/// Opacity divisor for explosion particles
pub const EXPLOSION_PARTICLE_DECAY: f32 = 1.2;

/// Stream size lost per tick
const STREAM_SHRINK: f32 = 3.0;

/// (count, strength divisor for size) of the batches each stream emits per tick
const STREAM_BATCHES: [(u32, f32); 3] = [(10, 10.0), (5, 7.0), (5, 5.0)];

/// One radiating element of an explosion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExplosionStream {
    pub x: f32,
    pub y: f32,
    /// Direction of travel, degrees (0 = up)
    pub angle: f32,
    /// Remaining size; the stream is dropped once this reaches zero
    pub size: f32,
}

#[derive(Debug, Clone)]
pub struct Explosion {
    streams: Vec<ExplosionStream>,
    particles: ParticleStream,
    color: Rgb,
    strength: f32,
}

impl Explosion {
    /// Create an explosion at `(x, y)`.
    ///
    /// Streams are spread evenly across `spec.span` degrees centred on
    /// `rotation + 180`. With a non-positive span or a single stream every
    /// stream points straight at `rotation + 180`.
    pub fn new<R: Rng + ?Sized>(
        x: f32,
        y: f32,
        rotation: f32,
        spec: ExplosionSpec,
        color: Rgb,
        rng: &mut R,
    ) -> Self {
        let (step, half_span) = if spec.span > 0.0 && spec.streams > 1 {
            (spec.span / (spec.streams - 1) as f32, spec.span / 2.0)
        } else {
            (0.0, 0.0)
        };

        let jitter_bound = (spec.strength / 3.0) as i32;
        let streams = (0..spec.streams)
            .map(|i| {
                let jitter = if jitter_bound > 0 {
                    rng.gen_range(-jitter_bound..jitter_bound)
                } else {
                    0
                };
                ExplosionStream {
                    x,
                    y,
                    angle: -half_span + i as f32 * step + rotation + 180.0,
                    size: spec.strength + jitter as f32,
                }
            })
            .collect();

        Self {
            streams,
            particles: ParticleStream::new(color),
            color,
            strength: spec.strength,
        }
    }

    pub fn streams(&self) -> &[ExplosionStream] {
        &self.streams
    }

    pub fn particles(&self) -> &ParticleStream {
        &self.particles
    }

    pub fn color(&self) -> Rgb {
        self.color
    }

    pub fn strength(&self) -> f32 {
        self.strength
    }

    /// Alive while any stream or particle remains
    pub fn is_alive(&self) -> bool {
        !self.streams.is_empty() || !self.particles.is_empty()
    }

    /// Advance one tick. Returns whether the explosion is still alive.
    pub fn advance<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        self.particles.decay(EXPLOSION_PARTICLE_DECAY, rng);

        let strength = self.strength;
        for stream in self.streams.iter_mut() {
            let (dir_x, dir_y) = heading(stream.angle);
            stream.x += strength * dir_x;
            stream.y += strength * dir_y;
            stream.size -= STREAM_SHRINK;
        }
        self.streams.retain(|s| s.size > 0.0);

        for stream in &self.streams {
            for (count, divisor) in STREAM_BATCHES {
                self.particles.emit(
                    &Emission {
                        x: stream.x,
                        y: stream.y,
                        rotation: 0.0,
                        distance: 0.0,
                        spread: stream.size,
                        speed: 0.0,
                        count,
                        size: strength / divisor,
                    },
                    rng,
                );
            }
        }

        self.is_alive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn spec(streams: u32, span: f32, strength: f32) -> ExplosionSpec {
        ExplosionSpec {
            streams,
            span,
            strength,
        }
    }

    #[test]
    fn test_streams_evenly_spread() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let e = Explosion::new(0.0, 0.0, 0.0, spec(3, 40.0, 9.0), Rgb::SPARK, &mut rng);
        let angles: Vec<f32> = e.streams().iter().map(|s| s.angle).collect();
        assert_eq!(angles, vec![160.0, 180.0, 200.0]);
    }

    #[test]
    fn test_degenerate_span_points_backwards() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let e = Explosion::new(0.0, 0.0, 30.0, spec(1, 360.0, 9.0), Rgb::FLAME, &mut rng);
        assert_eq!(e.streams().len(), 1);
        assert_eq!(e.streams()[0].angle, 210.0);

        let e = Explosion::new(0.0, 0.0, 30.0, spec(4, 0.0, 9.0), Rgb::FLAME, &mut rng);
        assert!(e.streams().iter().all(|s| s.angle == 210.0));
    }

    #[test]
    fn test_stream_size_jitter_within_bounds() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let e = Explosion::new(0.0, 0.0, 0.0, spec(12, 360.0, 16.0), Rgb::FLAME, &mut rng);
        for s in e.streams() {
            assert!(s.size >= 11.0 && s.size < 21.0, "size {}", s.size);
        }
    }

    #[test]
    fn test_explosion_decays_completely() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut e = Explosion::new(100.0, 100.0, 0.0, spec(12, 360.0, 16.0), Rgb::FLAME, &mut rng);
        let mut ticks = 0;
        while e.advance(&mut rng) {
            ticks += 1;
            assert!(ticks < 1000, "explosion never finished");
        }
        assert!(e.streams().is_empty());
        assert!(e.particles().is_empty());
    }

    #[test]
    fn test_streams_move_and_emit() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        // rotation 180 makes the single stream point up
        let mut e = Explosion::new(0.0, 0.0, 180.0, spec(1, 0.0, 16.0), Rgb::FLAME, &mut rng);
        let size_before = e.streams()[0].size;
        assert!(e.advance(&mut rng));
        let s = e.streams()[0];
        assert!(s.x.abs() < 1e-3);
        assert!((s.y - 16.0).abs() < 1e-3);
        assert_eq!(s.size, size_before - 3.0);
        assert_eq!(e.particles().len(), 20);
    }

    #[test]
    fn test_zero_strength_dies_immediately() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut e = Explosion::new(0.0, 0.0, 0.0, spec(3, 40.0, 0.0), Rgb::SPARK, &mut rng);
        assert!(!e.advance(&mut rng));
    }
}
