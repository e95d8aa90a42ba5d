//! Configuration module - environment variable parsing and arena tuning

use std::env;
use std::net::SocketAddr;

use crate::util::time::millis_to_ticks;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Relay server address; `None` runs an offline hot-seat match
    pub relay_addr: Option<SocketAddr>,
    /// Seed for the simulation RNG (particles, explosion jitter)
    pub seed: u64,
    /// Which avatar this process controls (0 or 1)
    pub local_avatar: u8,
    /// Simulation constants
    pub arena: ArenaConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let relay_addr = match env::var("RELAY_ADDR") {
            Ok(addr) if !addr.trim().is_empty() => Some(
                addr.trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidAddress)?,
            ),
            _ => None,
        };

        let seed = match env::var("ARENA_SEED") {
            Ok(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid("ARENA_SEED"))?,
            Err(_) => DEFAULT_SEED,
        };

        let local_avatar = match env::var("LOCAL_AVATAR") {
            Ok(raw) => match raw.trim().parse::<u8>() {
                Ok(id @ (0 | 1)) => id,
                _ => return Err(ConfigError::Invalid("LOCAL_AVATAR")),
            },
            Err(_) => 1,
        };

        Ok(Self {
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            relay_addr,
            seed,
            local_avatar,
            arena: ArenaConfig::default(),
        })
    }
}

const DEFAULT_SEED: u64 = 0x5EED_D20E;

/// Minimum time between two shots from the same avatar
const FIRE_COOLDOWN_MILLIS: u64 = 300;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid relay address format")]
    InvalidAddress,
}

/// Spawn point: position plus facing (degrees, 0 = up)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnPoint {
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
}

/// Parameters of one kind of explosion
#[derive(Debug, Clone, Copy)]
pub struct ExplosionSpec {
    pub streams: u32,
    /// Degrees covered by the fan of streams (360 = full circle)
    pub span: f32,
    pub strength: f32,
}

/// Simulation tuning. Velocities and accelerations are per tick.
#[derive(Debug, Clone)]
pub struct ArenaConfig {
    // Avatar movement
    pub max_velocity: f32,
    pub max_acceleration: f32,
    pub max_rotate_velocity: f32,
    pub max_rotate_acceleration: f32,

    // Avatar body
    pub avatar_radius: f32,
    pub max_health: f32,
    pub max_lives: u32,

    // Weapon
    pub projectile_radius: f32,
    pub projectile_mass: f32,
    pub projectile_velocity: f32,
    pub projectile_damage: f32,
    /// Ticks between shots
    pub fire_cooldown_ticks: u32,

    // Arena / collision grid
    pub tile_size: f32,
    pub tiles_wide: usize,
    pub tiles_high: usize,

    /// Displacement from spawn needed before a respawned avatar unfreezes
    pub unfreeze_distance: f32,
    /// Damage per unit of impact speed (avatar and wall collisions)
    pub momentum_damage_ratio: f32,

    pub projectile_hit_explosion: ExplosionSpec,
    pub projectile_collision_explosion: ExplosionSpec,
    /// Stream count and span for avatar-vs-avatar explosions; strength is
    /// derived from impact speed
    pub avatar_collision_explosion: ExplosionSpec,
    /// Relative speed is divided by this to size avatar-collision explosions
    pub avatar_collision_strength_divisor: f32,

    // Countdown
    pub countdown_phases: usize,
    pub countdown_frames_per_phase: u32,
    pub countdown_glyph_size: f32,
    pub countdown_shrink_rate: f32,

    pub spawn_points: [SpawnPoint; 2],
}

impl ArenaConfig {
    pub fn width(&self) -> f32 {
        self.tile_size * self.tiles_wide as f32
    }

    pub fn height(&self) -> f32 {
        self.tile_size * self.tiles_high as f32
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        let max_rotate_acceleration = 0.3;
        Self {
            max_velocity: 5.0,
            max_acceleration: 0.1,
            max_rotate_velocity: 15.0 * max_rotate_acceleration,
            max_rotate_acceleration,

            avatar_radius: 22.0,
            max_health: 30.0,
            max_lives: 3,

            projectile_radius: 8.0,
            projectile_mass: 0.5,
            projectile_velocity: 15.0,
            projectile_damage: 10.0,
            fire_cooldown_ticks: millis_to_ticks(FIRE_COOLDOWN_MILLIS),

            tile_size: 32.0,
            tiles_wide: 60,
            tiles_high: 30,

            unfreeze_distance: 150.0,
            momentum_damage_ratio: 1.0,

            projectile_hit_explosion: ExplosionSpec {
                streams: 12,
                span: 360.0,
                strength: 16.0,
            },
            projectile_collision_explosion: ExplosionSpec {
                streams: 15,
                span: 360.0,
                strength: 7.0,
            },
            avatar_collision_explosion: ExplosionSpec {
                streams: 3,
                span: 40.0,
                strength: 0.0,
            },
            avatar_collision_strength_divisor: 1.4,

            countdown_phases: 3,
            countdown_frames_per_phase: 60,
            countdown_glyph_size: 160.0,
            countdown_shrink_rate: 0.005,

            spawn_points: [
                SpawnPoint {
                    x: 1400.0,
                    y: 500.0,
                    rotation: 20.0,
                },
                SpawnPoint {
                    x: 500.0,
                    y: 500.0,
                    rotation: 200.0,
                },
            ],
        }
    }
}
