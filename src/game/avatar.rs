//! Avatars (drones) and their projectiles

use rand::Rng;
use tracing::trace;

use crate::config::{ArenaConfig, SpawnPoint};

use super::particles::{Emission, ParticleStream};
use super::physics::{heading, normalize_degrees};
use super::{AvatarId, Rgb};

/// Hull exhaust opacity divisor per tick
pub const EXHAUST_DECAY: f32 = 1.05;
/// Projectile trail opacity divisor per tick
pub const TRAIL_DECAY: f32 = 1.07;

/// (count, size) of the three exhaust batches emitted per thrust tick
const EXHAUST_BATCHES: [(u32, f32); 3] = [(2, 8.0), (5, 5.0), (20, 2.0)];
const EXHAUST_DISTANCE: f32 = 10.0;
const EXHAUST_SPREAD: f32 = 10.0;
const EXHAUST_SPEED: f32 = 5.0;

/// (count, size) of the three trail batches emitted per projectile per tick
const TRAIL_BATCHES: [(u32, f32); 3] = [(2, 1.0), (2, 3.0), (1, 5.0)];
const TRAIL_SPREAD: f32 = 3.0;
const TRAIL_SPEED: f32 = 1.0;

/// A projectile in flight
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projectile {
    pub owner: AvatarId,
    pub x: f32,
    pub y: f32,
    /// Facing at fire time, degrees
    pub rotation: f32,
    pub radius: f32,
    /// Fixed per-tick velocity computed at fire time
    pub vel_x: f32,
    pub vel_y: f32,
    pub mass: f32,
    pub damage: f32,
    /// Removed during collision resolution; dropped at the end of the tick
    spent: bool,
}

impl Projectile {
    /// Create a projectile leaving `(x, y)` along `rotation`
    pub fn new(owner: AvatarId, x: f32, y: f32, rotation: f32, config: &ArenaConfig) -> Self {
        let (dir_x, dir_y) = heading(rotation);
        Self {
            owner,
            x,
            y,
            rotation,
            radius: config.projectile_radius,
            vel_x: dir_x * config.projectile_velocity,
            vel_y: dir_y * config.projectile_velocity,
            mass: config.projectile_mass,
            damage: config.projectile_damage,
            spent: false,
        }
    }

    pub fn is_spent(&self) -> bool {
        self.spent
    }
}

/// An avatar in the arena
#[derive(Debug, Clone)]
pub struct Avatar {
    pub id: AvatarId,

    // Kinematics
    pub x: f32,
    pub y: f32,
    pub vel_x: f32,
    pub vel_y: f32,
    pub acc_x: f32,
    pub acc_y: f32,
    /// Degrees in [0, 360), 0 = up
    pub rotation: f32,
    pub rotate_vel: f32,
    pub rotate_acc: f32,

    // Body
    pub radius: f32,
    /// Equal to the radius by convention
    pub mass: f32,

    // Combat
    pub health: f32,
    pub max_health: f32,
    pub lives: u32,
    pub max_lives: u32,
    /// Set at spawn; cleared once the avatar leaves the spawn area
    pub frozen: bool,
    pub spawn: SpawnPoint,
    /// Kinematics come from the network instead of the integrator
    pub remote: bool,

    // Presentation
    pub color: Rgb,
    pub projectile_color: Rgb,
    pub exhaust: ParticleStream,
    pub trail: ParticleStream,

    pub projectiles: Vec<Projectile>,
    /// Fired since the last outbound update
    new_projectiles: Vec<Projectile>,
    /// Ticks until the weapon may fire again
    weapon_cooldown: u32,
}

impl Avatar {
    pub fn new(
        id: AvatarId,
        config: &ArenaConfig,
        spawn: SpawnPoint,
        color: Rgb,
        projectile_color: Rgb,
    ) -> Self {
        Self {
            id,
            x: spawn.x,
            y: spawn.y,
            vel_x: 0.0,
            vel_y: 0.0,
            acc_x: 0.0,
            acc_y: 0.0,
            rotation: normalize_degrees(spawn.rotation),
            rotate_vel: 0.0,
            rotate_acc: 0.0,
            radius: config.avatar_radius,
            mass: config.avatar_radius,
            health: config.max_health,
            max_health: config.max_health,
            lives: config.max_lives,
            max_lives: config.max_lives,
            frozen: true,
            spawn,
            remote: false,
            color,
            projectile_color,
            exhaust: ParticleStream::new(color),
            trail: ParticleStream::new(projectile_color),
            projectiles: Vec::new(),
            new_projectiles: Vec::new(),
            weapon_cooldown: 0,
        }
    }

    /// Apply full thrust along the current facing and emit exhaust
    pub fn throttle_on<R: Rng + ?Sized>(&mut self, config: &ArenaConfig, rng: &mut R) {
        let (dir_x, dir_y) = heading(self.rotation);
        self.acc_x = config.max_acceleration * dir_x;
        self.acc_y = config.max_acceleration * dir_y;

        for (count, size) in EXHAUST_BATCHES {
            self.exhaust.emit(
                &Emission {
                    x: self.x,
                    y: self.y,
                    rotation: self.rotation,
                    distance: EXHAUST_DISTANCE,
                    spread: EXHAUST_SPREAD,
                    speed: EXHAUST_SPEED,
                    count,
                    size,
                },
                rng,
            );
        }
    }

    pub fn turn_left(&mut self, config: &ArenaConfig) {
        self.rotate_acc += config.max_rotate_acceleration;
    }

    pub fn turn_right(&mut self, config: &ArenaConfig) {
        self.rotate_acc -= config.max_rotate_acceleration;
    }

    /// Clear per-tick control accelerations
    pub fn reset_controls(&mut self) {
        self.acc_x = 0.0;
        self.acc_y = 0.0;
        self.rotate_acc = 0.0;
    }

    pub fn can_fire(&self) -> bool {
        self.weapon_cooldown == 0
    }

    /// Count the weapon cooldown down by one tick
    pub fn tick_cooldown(&mut self) {
        self.weapon_cooldown = self.weapon_cooldown.saturating_sub(1);
    }

    /// Fire a projectile if the weapon is ready. Returns true if fired.
    pub fn fire(&mut self, config: &ArenaConfig) -> bool {
        if !self.can_fire() {
            return false;
        }
        let projectile = Projectile::new(self.id, self.x, self.y, self.rotation, config);
        self.projectiles.push(projectile);
        self.new_projectiles.push(projectile);
        self.weapon_cooldown = config.fire_cooldown_ticks;
        true
    }

    /// Append a projectile fired by the remote peer
    pub fn add_remote_projectile(&mut self, x: f32, y: f32, rotation: f32, config: &ArenaConfig) {
        self.projectiles
            .push(Projectile::new(self.id, x, y, rotation, config));
    }

    /// Projectiles fired since the last call
    pub fn take_new_projectiles(&mut self) -> Vec<Projectile> {
        std::mem::take(&mut self.new_projectiles)
    }

    pub fn new_projectiles(&self) -> &[Projectile] {
        &self.new_projectiles
    }

    /// Live projectile at `index`; `None` if it no longer exists
    pub fn projectile(&self, index: usize) -> Option<&Projectile> {
        match self.projectiles.get(index) {
            Some(p) if !p.spent => Some(p),
            _ => {
                trace!(avatar = %self.id, index, "Stale projectile reference");
                None
            }
        }
    }

    /// Mark a projectile as removed, returning its last state. Indices of
    /// the remaining projectiles stay valid until `compact_projectiles`.
    pub fn remove_projectile(&mut self, index: usize) -> Option<Projectile> {
        match self.projectiles.get_mut(index) {
            Some(p) if !p.spent => {
                p.spent = true;
                Some(*p)
            }
            _ => {
                trace!(avatar = %self.id, index, "Stale projectile reference");
                None
            }
        }
    }

    /// Drop projectiles removed this tick
    pub fn compact_projectiles(&mut self) {
        self.projectiles.retain(|p| !p.spent);
    }

    pub fn live_projectiles(&self) -> impl Iterator<Item = &Projectile> {
        self.projectiles.iter().filter(|p| !p.spent)
    }

    /// Change health by `-damage`. When health reaches zero a life is lost
    /// and health is restored to max. Returns true if a life was lost.
    pub fn apply_damage(&mut self, damage: f32) -> bool {
        self.health -= damage;
        if self.health <= 0.0 {
            self.lives = self.lives.saturating_sub(1);
            self.health = self.max_health;
            return true;
        }
        false
    }

    pub fn is_depleted(&self) -> bool {
        self.lives == 0
    }

    /// Return to the spawn point, stopped and frozen
    pub fn respawn(&mut self) {
        self.x = self.spawn.x;
        self.y = self.spawn.y;
        self.rotation = normalize_degrees(self.spawn.rotation);
        self.vel_x = 0.0;
        self.vel_y = 0.0;
        self.frozen = true;
    }

    /// Place the avatar and make that position its spawn point
    pub fn set_spawn(&mut self, x: f32, y: f32, rotation: f32) {
        self.spawn = SpawnPoint { x, y, rotation };
        self.x = x;
        self.y = y;
        self.rotation = normalize_degrees(rotation);
    }

    /// Overwrite position and rotation with authoritative remote values
    pub fn overwrite_kinematics(&mut self, x: f32, y: f32, rotation: f32) {
        self.x = x;
        self.y = y;
        self.rotation = normalize_degrees(rotation);
    }

    /// Emit this tick's trail particles behind every live projectile
    pub fn emit_trails<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for projectile in self.projectiles.iter().filter(|p| !p.spent) {
            for (count, size) in TRAIL_BATCHES {
                self.trail.emit(
                    &Emission {
                        x: projectile.x,
                        y: projectile.y,
                        rotation: 0.0,
                        distance: 0.0,
                        spread: TRAIL_SPREAD,
                        speed: TRAIL_SPEED,
                        count,
                        size,
                    },
                    rng,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn avatar(config: &ArenaConfig) -> Avatar {
        Avatar::new(
            AvatarId(1),
            config,
            config.spawn_points[1],
            Rgb::WHITE,
            Rgb::YELLOW,
        )
    }

    #[test]
    fn test_new_avatar_starts_frozen_at_spawn() {
        let config = ArenaConfig::default();
        let a = avatar(&config);
        assert!(a.frozen);
        assert_eq!((a.x, a.y, a.rotation), (500.0, 500.0, 200.0));
        assert_eq!(a.mass, a.radius);
        assert_eq!(a.health, config.max_health);
        assert_eq!(a.lives, config.max_lives);
    }

    #[test]
    fn test_fire_respects_cooldown() {
        let config = ArenaConfig::default();
        let mut a = avatar(&config);
        assert!(a.fire(&config));
        assert!(!a.fire(&config));
        for _ in 0..config.fire_cooldown_ticks {
            a.tick_cooldown();
        }
        assert!(a.fire(&config));
        assert_eq!(a.projectiles.len(), 2);
        assert_eq!(a.take_new_projectiles().len(), 2);
        assert!(a.new_projectiles().is_empty());
    }

    #[test]
    fn test_projectile_velocity_follows_rotation() {
        let config = ArenaConfig::default();
        let p = Projectile::new(AvatarId(0), 0.0, 0.0, 0.0, &config);
        assert!(p.vel_x.abs() < 1e-5);
        assert!((p.vel_y - config.projectile_velocity).abs() < 1e-5);
        assert_eq!(p.mass, config.projectile_mass);
    }

    #[test]
    fn test_damage_below_health_keeps_life() {
        let config = ArenaConfig::default();
        let mut a = avatar(&config);
        assert!(!a.apply_damage(10.0));
        assert_eq!(a.health, 20.0);
        assert_eq!(a.lives, 3);
    }

    #[test]
    fn test_depleting_damage_costs_exactly_one_life() {
        let config = ArenaConfig::default();
        let mut a = avatar(&config);
        assert!(a.apply_damage(1000.0));
        assert_eq!(a.lives, 2);
        assert_eq!(a.health, config.max_health);
    }

    #[test]
    fn test_removed_projectile_is_stale_until_compacted() {
        let config = ArenaConfig::default();
        let mut a = avatar(&config);
        a.add_remote_projectile(10.0, 10.0, 0.0, &config);
        a.add_remote_projectile(20.0, 20.0, 0.0, &config);

        let removed = a.remove_projectile(0).expect("live projectile");
        assert_eq!(removed.x, 10.0);
        assert!(a.projectile(0).is_none());
        assert!(a.remove_projectile(0).is_none());
        assert_eq!(a.projectile(1).map(|p| p.x), Some(20.0));
        assert!(a.projectile(7).is_none());

        a.compact_projectiles();
        assert_eq!(a.projectiles.len(), 1);
        assert_eq!(a.projectiles[0].x, 20.0);
    }

    #[test]
    fn test_respawn_resets_position_velocity_and_freezes() {
        let config = ArenaConfig::default();
        let mut a = avatar(&config);
        a.frozen = false;
        a.x = 900.0;
        a.vel_x = 3.0;
        a.vel_y = -1.0;
        a.respawn();
        assert_eq!((a.x, a.y), (500.0, 500.0));
        assert_eq!((a.vel_x, a.vel_y), (0.0, 0.0));
        assert!(a.frozen);
    }
}
