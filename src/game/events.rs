//! Events produced by a simulation tick

use serde::Serialize;

use super::world::{MatchOutcome, Stage};
use super::AvatarId;

/// Axis of a wall impact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    X,
    Y,
}

/// Something notable that happened during a tick
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum MatchEvent {
    StageChanged {
        stage: Stage,
    },
    ProjectileFired {
        avatar: AvatarId,
        x: f32,
        y: f32,
        rotation: f32,
    },
    /// A projectile struck an avatar
    ProjectileHit {
        avatar: AvatarId,
        owner: AvatarId,
        damage: f32,
    },
    /// Two projectiles from different owners destroyed each other
    ProjectilesCollided {
        x: f32,
        y: f32,
    },
    AvatarCollision {
        first: AvatarId,
        second: AvatarId,
        /// Relative speed at impact
        speed: f32,
    },
    WallImpact {
        avatar: AvatarId,
        axis: Axis,
        damage: f32,
    },
    LifeLost {
        avatar: AvatarId,
        lives_left: u32,
    },
    Respawned {
        avatar: AvatarId,
    },
    Unfrozen {
        avatar: AvatarId,
    },
    MatchEnded {
        outcome: MatchOutcome,
    },
}
