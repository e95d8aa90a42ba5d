//! Collision resolution
//!
//! Candidates come from the collision grid and are confirmed with an exact
//! circle-overlap test before any side effect is applied. Wall impacts are
//! checked separately against the arena rectangle.

use tracing::{debug, info};

use super::events::{Axis, MatchEvent};
use super::explosion::Explosion;
use super::grid::{CellTag, Occupant};
use super::physics::{circles_overlap, distance, exchange_velocity};
use super::world::World;
use super::{AvatarId, Rgb};

use crate::config::ExplosionSpec;

impl World {
    /// Resolve every collision for this tick
    pub(super) fn resolve_collisions(&mut self, events: &mut Vec<MatchEvent>) {
        self.resolve_walls(events);
        for (this, other) in self.rebuild_grid() {
            match (this.occupant, other.occupant) {
                (Occupant::Avatar, Occupant::Avatar) => {
                    self.avatar_vs_avatar(this.owner, other.owner, events)
                }
                (Occupant::Avatar, Occupant::Projectile(index)) => {
                    self.avatar_vs_projectile(this.owner, other.owner, index, events)
                }
                (Occupant::Projectile(index), Occupant::Avatar) => {
                    self.avatar_vs_projectile(other.owner, this.owner, index, events)
                }
                (Occupant::Projectile(index), Occupant::Projectile(other_index)) => self
                    .projectile_vs_projectile(this.owner, index, other.owner, other_index, events),
            }
        }
    }

    /// Rebuild the grid from empty, avatars first and then each avatar's
    /// projectiles in list order. Returns `(registering, occupant)` pairs.
    fn rebuild_grid(&mut self) -> Vec<(CellTag, CellTag)> {
        self.grid.clear();
        let mut candidates = Vec::new();

        for avatar in &self.avatars {
            let tag = CellTag::avatar(avatar.id);
            if let Some(other) = self.grid.register(avatar.x, avatar.y, avatar.radius, tag) {
                candidates.push((tag, other));
            }
        }
        for avatar in &self.avatars {
            for (index, projectile) in avatar.projectiles.iter().enumerate() {
                if projectile.is_spent() {
                    continue;
                }
                let tag = CellTag::projectile(avatar.id, index);
                if let Some(other) =
                    self.grid
                        .register(projectile.x, projectile.y, projectile.radius, tag)
                {
                    candidates.push((tag, other));
                }
            }
        }
        candidates
    }

    /// Bounce avatars off the arena edges. Remote avatars are positioned by
    /// the peer and skipped.
    fn resolve_walls(&mut self, events: &mut Vec<MatchEvent>) {
        let (width, height) = (self.config.width(), self.config.height());
        let ratio = self.config.momentum_damage_ratio;

        for index in 0..self.avatars.len() {
            let avatar = &mut self.avatars[index];
            if avatar.remote {
                continue;
            }
            let id = avatar.id;
            let mut impacts = Vec::new();
            if avatar.x < 0.0 || avatar.x > width {
                impacts.push((Axis::X, avatar.vel_x.abs() * ratio));
                avatar.vel_x = -avatar.vel_x;
            }
            if avatar.y < 0.0 || avatar.y > height {
                impacts.push((Axis::Y, avatar.vel_y.abs() * ratio));
                avatar.vel_y = -avatar.vel_y;
            }

            for (axis, damage) in impacts {
                debug!(avatar = %id, ?axis, damage, "Wall impact");
                events.push(MatchEvent::WallImpact {
                    avatar: id,
                    axis,
                    damage,
                });
                self.damage_avatar(id, damage, events);
            }
        }
    }

    fn avatar_vs_projectile(
        &mut self,
        target: AvatarId,
        owner: AvatarId,
        index: usize,
        events: &mut Vec<MatchEvent>,
    ) {
        let Some(projectile) = self
            .avatars
            .get(owner.index())
            .and_then(|a| a.projectile(index))
            .copied()
        else {
            return;
        };
        let local = self.local;
        let Some(avatar) = self.avatars.get_mut(target.index()) else {
            return;
        };
        if !circles_overlap(
            avatar.x,
            avatar.y,
            avatar.radius,
            projectile.x,
            projectile.y,
            projectile.radius,
        ) {
            return;
        }
        if avatar.frozen && target == local {
            return;
        }

        avatar.vel_x = exchange_velocity(avatar.vel_x, avatar.mass, projectile.vel_x, projectile.mass);
        avatar.vel_y = exchange_velocity(avatar.vel_y, avatar.mass, projectile.vel_y, projectile.mass);
        self.avatars[owner.index()].remove_projectile(index);

        let spec = self.config.projectile_hit_explosion;
        self.spawn_explosion(projectile.x, projectile.y, projectile.rotation, spec, Rgb::FLAME);

        debug!(avatar = %target, owner = %owner, damage = projectile.damage, "Projectile hit");
        events.push(MatchEvent::ProjectileHit {
            avatar: target,
            owner,
            damage: projectile.damage,
        });
        self.damage_avatar(target, projectile.damage, events);
    }

    fn avatar_vs_avatar(&mut self, first: AvatarId, second: AvatarId, events: &mut Vec<MatchEvent>) {
        let (Some(a), Some(b)) = (
            self.avatars.get(first.index()),
            self.avatars.get(second.index()),
        ) else {
            return;
        };
        if !circles_overlap(a.x, a.y, a.radius, b.x, b.y, b.radius) || a.frozen || b.frozen {
            return;
        }

        let speed = distance(a.vel_x, a.vel_y, b.vel_x, b.vel_y);
        let a_vel = (
            exchange_velocity(a.vel_x, a.mass, b.vel_x, b.mass),
            exchange_velocity(a.vel_y, a.mass, b.vel_y, b.mass),
        );
        let b_vel = (
            exchange_velocity(b.vel_x, b.mass, a.vel_x, a.mass),
            exchange_velocity(b.vel_y, b.mass, a.vel_y, a.mass),
        );
        let angle = (a.x - b.x).atan2(a.y - b.y).to_degrees();
        let (mid_x, mid_y) = ((a.x + b.x) / 2.0, (a.y + b.y) / 2.0);

        // Apply the new velocities and step both apart once so they do not
        // stay overlapped into the next tick
        for (id, (vel_x, vel_y)) in [(first, a_vel), (second, b_vel)] {
            let avatar = &mut self.avatars[id.index()];
            avatar.vel_x = vel_x;
            avatar.vel_y = vel_y;
            avatar.x += vel_x;
            avatar.y += vel_y;
        }

        let spec = ExplosionSpec {
            strength: speed / self.config.avatar_collision_strength_divisor,
            ..self.config.avatar_collision_explosion
        };
        self.spawn_explosion(mid_x, mid_y, angle + 90.0, spec, Rgb::SPARK);
        self.spawn_explosion(mid_x, mid_y, angle - 90.0, spec, Rgb::SPARK);

        debug!(first = %first, second = %second, speed, "Avatar collision");
        events.push(MatchEvent::AvatarCollision {
            first,
            second,
            speed,
        });

        let damage = speed * self.config.momentum_damage_ratio;
        self.damage_avatar(first, damage, events);
        self.damage_avatar(second, damage, events);
    }

    /// A projectile whose counterpart is already gone still counts as hit
    fn projectile_vs_projectile(
        &mut self,
        owner: AvatarId,
        index: usize,
        other_owner: AvatarId,
        other_index: usize,
        events: &mut Vec<MatchEvent>,
    ) {
        let Some(projectile) = self
            .avatars
            .get(owner.index())
            .and_then(|a| a.projectile(index))
            .copied()
        else {
            return;
        };
        let other = self
            .avatars
            .get(other_owner.index())
            .and_then(|a| a.projectile(other_index))
            .copied();
        if let Some(other) = other {
            if !circles_overlap(
                projectile.x,
                projectile.y,
                projectile.radius,
                other.x,
                other.y,
                other.radius,
            ) {
                return;
            }
        }

        self.avatars[owner.index()].remove_projectile(index);
        self.avatars[other_owner.index()].remove_projectile(other_index);

        let spec = self.config.projectile_collision_explosion;
        self.spawn_explosion(projectile.x, projectile.y, projectile.rotation, spec, Rgb::FLAME);

        debug!(owner = %owner, other_owner = %other_owner, "Projectiles collided");
        events.push(MatchEvent::ProjectilesCollided {
            x: projectile.x,
            y: projectile.y,
        });
    }

    fn spawn_explosion(&mut self, x: f32, y: f32, rotation: f32, spec: ExplosionSpec, color: Rgb) {
        let explosion = Explosion::new(x, y, rotation, spec, color, &mut self.rng);
        self.explosions.push(explosion);
    }

    /// Apply damage; a lost life respawns the local avatar
    fn damage_avatar(&mut self, id: AvatarId, damage: f32, events: &mut Vec<MatchEvent>) {
        let is_local = id == self.local;
        let Some(avatar) = self.avatars.get_mut(id.index()) else {
            return;
        };
        if !avatar.apply_damage(damage) {
            return;
        }

        info!(avatar = %id, lives_left = avatar.lives, "Life lost");
        events.push(MatchEvent::LifeLost {
            avatar: id,
            lives_left: avatar.lives,
        });
        if is_local {
            avatar.respawn();
            info!(avatar = %id, "Respawned");
            events.push(MatchEvent::Respawned { avatar: id });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ArenaConfig;
    use crate::game::{Stage, TickInput};

    const LOCAL: AvatarId = AvatarId(1);
    const OPPONENT: AvatarId = AvatarId(0);

    fn active_world() -> World {
        let mut world = World::new(ArenaConfig::default(), 9, LOCAL);
        for _ in 0..180 {
            world.tick(TickInput::default());
        }
        assert_eq!(world.stage(), Stage::Active);
        world
    }

    fn place(world: &mut World, id: AvatarId, x: f32, y: f32, vel_x: f32, vel_y: f32) {
        let avatar = &mut world.avatars[id.index()];
        avatar.x = x;
        avatar.y = y;
        avatar.vel_x = vel_x;
        avatar.vel_y = vel_y;
        avatar.frozen = false;
    }

    fn resolve(world: &mut World) -> Vec<MatchEvent> {
        let mut events = Vec::new();
        world.resolve_collisions(&mut events);
        events
    }

    #[test]
    fn test_head_on_equal_masses_swap_velocities() {
        let mut w = active_world();
        place(&mut w, OPPONENT, 800.0, 500.0, 3.0, 0.0);
        place(&mut w, LOCAL, 830.0, 500.0, -3.0, 0.0);

        let events = resolve(&mut w);

        assert!((w.avatars[0].vel_x + 3.0).abs() < 1e-5);
        assert!((w.avatars[1].vel_x - 3.0).abs() < 1e-5);
        assert!(events
            .iter()
            .any(|e| matches!(e, MatchEvent::AvatarCollision { speed, .. } if (*speed - 6.0).abs() < 1e-5)));
        // Relative speed 6 deals 6 damage to each
        assert!((w.avatars[0].health - 24.0).abs() < 1e-5);
        assert!((w.avatars[1].health - 24.0).abs() < 1e-5);
        assert_eq!(w.explosions.len(), 2);
        // Unstick step moves them apart
        assert!(w.avatars[0].x < 800.0);
        assert!(w.avatars[1].x > 830.0);
    }

    #[test]
    fn test_frozen_avatars_do_not_collide() {
        let mut w = active_world();
        place(&mut w, OPPONENT, 800.0, 500.0, 3.0, 0.0);
        place(&mut w, LOCAL, 830.0, 500.0, -3.0, 0.0);
        w.avatars[0].frozen = true;

        let events = resolve(&mut w);
        assert!(events.is_empty());
        assert_eq!(w.avatars[1].vel_x, -3.0);
        assert!(w.explosions.is_empty());
    }

    #[test]
    fn test_separated_avatars_sharing_cells_do_not_collide() {
        let mut w = active_world();
        // Same grid cells but 50 apart, more than the 44 radius sum
        place(&mut w, OPPONENT, 790.0, 500.0, 0.0, 0.0);
        place(&mut w, LOCAL, 840.0, 500.0, 0.0, 0.0);
        assert!(resolve(&mut w).is_empty());
    }

    #[test]
    fn test_projectile_damage_below_health() {
        let mut w = active_world();
        let config = w.config.clone();
        place(&mut w, LOCAL, 500.0, 500.0, 0.0, 0.0);
        w.avatars[0].add_remote_projectile(505.0, 500.0, 0.0, &config);

        let events = resolve(&mut w);

        assert_eq!(w.avatars[1].health, 20.0);
        assert_eq!(w.avatars[1].lives, 3);
        assert_eq!(w.avatars[0].live_projectiles().count(), 0);
        assert_eq!(w.explosions.len(), 1);
        assert!(events.contains(&MatchEvent::ProjectileHit {
            avatar: LOCAL,
            owner: OPPONENT,
            damage: 10.0
        }));
        // Momentum from the projectile pushes the avatar along its path
        assert!(w.avatars[1].vel_y > 0.0);
    }

    #[test]
    fn test_projectile_depletes_health_and_respawns_local() {
        let mut w = active_world();
        let config = w.config.clone();
        place(&mut w, LOCAL, 700.0, 600.0, 1.0, 1.0);
        w.avatars[1].health = 10.0;
        w.avatars[0].add_remote_projectile(700.0, 610.0, 0.0, &config);

        let events = resolve(&mut w);

        let local = &w.avatars[1];
        assert_eq!(local.lives, 2);
        assert_eq!(local.health, config.max_health);
        assert_eq!((local.x, local.y), (500.0, 500.0));
        assert_eq!((local.vel_x, local.vel_y), (0.0, 0.0));
        assert!(local.frozen);
        assert_eq!(w.explosions.len(), 1);
        assert_eq!(w.explosions[0].streams()[0].x, 700.0);
        assert_eq!(w.explosions[0].streams()[0].y, 610.0);
        let lost = events
            .iter()
            .filter(|e| matches!(e, MatchEvent::LifeLost { .. }))
            .count();
        assert_eq!(lost, 1);
        assert!(events.contains(&MatchEvent::Respawned { avatar: LOCAL }));
    }

    #[test]
    fn test_opponent_loses_life_without_respawn() {
        let mut w = active_world();
        let config = w.config.clone();
        place(&mut w, OPPONENT, 900.0, 300.0, 0.0, 0.0);
        w.avatars[0].health = 5.0;
        w.avatars[1].add_remote_projectile(900.0, 305.0, 0.0, &config);

        let events = resolve(&mut w);

        assert_eq!(w.avatars[0].lives, 2);
        assert!(!w.avatars[0].frozen);
        assert_eq!(w.avatars[0].x, 900.0);
        assert!(!events
            .iter()
            .any(|e| matches!(e, MatchEvent::Respawned { .. })));
    }

    #[test]
    fn test_frozen_local_avatar_ignores_projectiles() {
        let mut w = active_world();
        let config = w.config.clone();
        w.avatars[0].add_remote_projectile(505.0, 500.0, 0.0, &config);
        assert!(w.avatars[1].frozen);

        assert!(resolve(&mut w).is_empty());
        assert_eq!(w.avatars[1].health, 30.0);
        assert_eq!(w.avatars[0].live_projectiles().count(), 1);
    }

    #[test]
    fn test_frozen_opponent_still_takes_hits() {
        let mut w = active_world();
        let config = w.config.clone();
        assert!(w.avatars[0].frozen);
        w.avatars[1].add_remote_projectile(1405.0, 500.0, 0.0, &config);

        resolve(&mut w);
        assert_eq!(w.avatars[0].health, 20.0);
    }

    #[test]
    fn test_projectiles_from_different_owners_destroy_each_other() {
        let mut w = active_world();
        let config = w.config.clone();
        w.avatars[0].add_remote_projectile(300.0, 300.0, 0.0, &config);
        w.avatars[1].add_remote_projectile(305.0, 300.0, 180.0, &config);

        let events = resolve(&mut w);

        assert_eq!(w.avatars[0].live_projectiles().count(), 0);
        assert_eq!(w.avatars[1].live_projectiles().count(), 0);
        assert_eq!(w.explosions.len(), 1);
        assert!(events.contains(&MatchEvent::ProjectilesCollided { x: 305.0, y: 300.0 }));
    }

    #[test]
    fn test_projectile_pair_collides_when_counterpart_already_spent() {
        let mut w = active_world();
        let config = w.config.clone();
        place(&mut w, LOCAL, 295.0, 300.0, 0.0, 0.0);
        // The opponent's shot hits the avatar first; the local shot shares
        // its cell but sits 18 apart, beyond the 16 radius sum
        w.avatars[0].add_remote_projectile(322.0, 300.0, 0.0, &config);
        w.avatars[1].add_remote_projectile(340.0, 300.0, 0.0, &config);

        let events = resolve(&mut w);

        assert!(matches!(events[0], MatchEvent::ProjectileHit { avatar: LOCAL, owner: OPPONENT, .. }));
        assert!(events.contains(&MatchEvent::ProjectilesCollided { x: 340.0, y: 300.0 }));
        assert_eq!(w.avatars[0].live_projectiles().count(), 0);
        assert_eq!(w.avatars[1].live_projectiles().count(), 0);
    }

    #[test]
    fn test_wall_crossing_flips_velocity_and_damages() {
        let mut w = active_world();
        place(&mut w, LOCAL, -1.0, 500.0, -3.0, 0.5);

        let events = resolve(&mut w);

        let local = &w.avatars[1];
        assert_eq!(local.vel_x, 3.0);
        assert_eq!(local.vel_y, 0.5);
        assert_eq!(local.health, 27.0);
        assert!(events.contains(&MatchEvent::WallImpact {
            avatar: LOCAL,
            axis: Axis::X,
            damage: 3.0
        }));
    }

    #[test]
    fn test_grid_holds_only_current_entities() {
        let mut w = active_world();
        let config = w.config.clone();
        w.avatars[0].add_remote_projectile(100.0, 100.0, 0.0, &config);
        resolve(&mut w);
        assert!(w.grid.cell_of(100.0, 100.0).and_then(|(c, r)| w.grid.occupant(c, r)).is_some());

        w.avatars[0].projectiles.clear();
        resolve(&mut w);
        for tag in w.grid.tags() {
            assert_eq!(tag.occupant, Occupant::Avatar);
        }
    }
}
