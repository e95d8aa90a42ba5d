//! Avatar and projectile kinematics
//!
//! Rotation is in degrees with 0 pointing straight up; the direction of
//! travel for a rotation `r` is the unit vector at `r + 90` degrees.

use crate::config::ArenaConfig;

use super::avatar::Avatar;

/// Rotational velocity below this magnitude snaps to zero while coasting
const ROTATION_REST_EPSILON: f32 = 1e-4;

/// Unit vector for a rotation in degrees (0 = up)
#[inline]
pub fn heading(rotation: f32) -> (f32, f32) {
    let radians = (rotation + 90.0).to_radians();
    (radians.cos(), radians.sin())
}

/// Wrap an angle into [0, 360)
#[inline]
pub fn normalize_degrees(degrees: f32) -> f32 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Euclidean distance between two points
#[inline]
pub fn distance(x1: f32, y1: f32, x2: f32, y2: f32) -> f32 {
    let dx = x2 - x1;
    let dy = y2 - y1;
    (dx * dx + dy * dy).sqrt()
}

/// Exact circle-overlap test (strictly closer than the sum of radii)
#[inline]
pub fn circles_overlap(x1: f32, y1: f32, radius1: f32, x2: f32, y2: f32, radius2: f32) -> bool {
    distance(x1, y1, x2, y2) < radius1 + radius2
}

/// One-axis velocity exchange used for every body-vs-body impact:
/// `v' = (v_self (m_self - m_other) + 2 m_other v_other) / (m_self + m_other)`
#[inline]
pub fn exchange_velocity(v_self: f32, m_self: f32, v_other: f32, m_other: f32) -> f32 {
    (v_self * (m_self - m_other) + 2.0 * m_other * v_other) / (m_self + m_other)
}

/// Whether a point lies inside the arena rectangle (edges inclusive)
#[inline]
pub fn in_arena(x: f32, y: f32, width: f32, height: f32) -> bool {
    x >= 0.0 && x <= width && y >= 0.0 && y <= height
}

/// Physics system for integrating avatars and projectiles
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Advance an avatar's linear motion one tick.
    ///
    /// Above max speed each velocity component is nudged one acceleration
    /// step toward the target velocity implied by the current thrust, so the
    /// speed converges instead of being clamped.
    pub fn integrate_position(avatar: &mut Avatar, config: &ArenaConfig) {
        avatar.vel_x += avatar.acc_x;
        avatar.vel_y += avatar.acc_y;

        let target_x = (avatar.acc_x / config.max_acceleration) * config.max_velocity;
        let target_y = (avatar.acc_y / config.max_acceleration) * config.max_velocity;
        let speed = (avatar.vel_x * avatar.vel_x + avatar.vel_y * avatar.vel_y).sqrt();
        if speed > config.max_velocity {
            avatar.vel_x = step_toward(avatar.vel_x, target_x, config.max_acceleration);
            avatar.vel_y = step_toward(avatar.vel_y, target_y, config.max_acceleration);
        }

        avatar.x += avatar.vel_x;
        avatar.y += avatar.vel_y;
    }

    /// Advance an avatar's rotation one tick
    pub fn integrate_rotation(avatar: &mut Avatar, config: &ArenaConfig) {
        avatar.rotate_vel += avatar.rotate_acc;
        if avatar.rotate_vel.abs() > config.max_rotate_velocity {
            avatar.rotate_vel -= avatar.rotate_acc;
        }

        if avatar.rotate_acc == 0.0 {
            if avatar.rotate_vel > 0.0 {
                if avatar.rotate_vel < ROTATION_REST_EPSILON {
                    avatar.rotate_vel = 0.0;
                } else {
                    avatar.rotate_vel -= config.max_rotate_acceleration;
                }
            } else if avatar.rotate_vel < 0.0 {
                if avatar.rotate_vel > -ROTATION_REST_EPSILON {
                    avatar.rotate_vel = 0.0;
                } else {
                    avatar.rotate_vel += config.max_rotate_acceleration;
                }
            }
        }

        avatar.rotation = normalize_degrees(avatar.rotation + avatar.rotate_vel);
    }

    /// Full integrator step for a locally simulated avatar. Inputs must be
    /// reapplied every tick; accelerations are cleared afterwards.
    pub fn update_avatar(avatar: &mut Avatar, config: &ArenaConfig) {
        Self::integrate_position(avatar, config);
        Self::integrate_rotation(avatar, config);
        avatar.reset_controls();
    }

    /// Move every projectile by its fixed velocity and drop the ones that
    /// left the arena. Returns how many were dropped.
    pub fn update_projectiles(avatar: &mut Avatar, config: &ArenaConfig) -> usize {
        let (width, height) = (config.width(), config.height());
        let before = avatar.projectiles.len();
        for projectile in avatar.projectiles.iter_mut() {
            projectile.x += projectile.vel_x;
            projectile.y += projectile.vel_y;
        }
        avatar
            .projectiles
            .retain(|p| in_arena(p.x, p.y, width, height));
        before - avatar.projectiles.len()
    }

    /// Clear the frozen flag once the avatar has moved far enough from spawn
    pub fn check_unfreeze(avatar: &mut Avatar, config: &ArenaConfig) -> bool {
        if !avatar.frozen {
            return false;
        }
        let spawn = avatar.spawn;
        if distance(avatar.x, avatar.y, spawn.x, spawn.y) > config.unfreeze_distance {
            avatar.frozen = false;
            return true;
        }
        false
    }
}

/// Move `value` one `step` toward `target`
#[inline]
fn step_toward(value: f32, target: f32, step: f32) -> f32 {
    if value > target {
        value - step
    } else if value < target {
        value + step
    } else {
        value
    }
}
