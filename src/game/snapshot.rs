//! Read-only views of the world for the renderer and HUD

use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;

use super::avatar::{Avatar, Projectile};
use super::countdown::CountdownView;
use super::explosion::Explosion;
use super::particles::ParticleStream;
use super::world::{MatchOutcome, Stage, World};
use super::{AvatarId, Rgb};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParticleView {
    pub x: f32,
    pub y: f32,
    pub opacity: f32,
    pub size: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamView {
    pub color: Rgb,
    pub particles: Vec<ParticleView>,
}

impl From<&ParticleStream> for StreamView {
    fn from(stream: &ParticleStream) -> Self {
        Self {
            color: stream.color(),
            particles: stream
                .particles()
                .iter()
                .map(|p| ParticleView {
                    x: p.x,
                    y: p.y,
                    opacity: p.opacity,
                    size: p.size,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProjectileView {
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
    pub radius: f32,
}

impl From<&Projectile> for ProjectileView {
    fn from(p: &Projectile) -> Self {
        Self {
            x: p.x,
            y: p.y,
            rotation: p.rotation,
            radius: p.radius,
        }
    }
}

/// Per-avatar render and HUD state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvatarView {
    pub id: AvatarId,
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
    pub radius: f32,
    pub color: Rgb,
    pub projectile_color: Rgb,
    /// Health as a whole percentage of max, truncated (HUD)
    pub health_percent: u32,
    pub lives: u32,
    pub frozen: bool,
    pub projectiles: Vec<ProjectileView>,
    pub exhaust: StreamView,
    pub trail: StreamView,
}

impl From<&Avatar> for AvatarView {
    fn from(a: &Avatar) -> Self {
        let health_percent = if a.max_health > 0.0 {
            (a.health * 100.0 / a.max_health).clamp(0.0, 100.0).floor() as u32
        } else {
            0
        };
        Self {
            id: a.id,
            x: a.x,
            y: a.y,
            rotation: a.rotation,
            radius: a.radius,
            color: a.color,
            projectile_color: a.projectile_color,
            health_percent,
            lives: a.lives,
            frozen: a.frozen,
            projectiles: a.live_projectiles().map(ProjectileView::from).collect(),
            exhaust: StreamView::from(&a.exhaust),
            trail: StreamView::from(&a.trail),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExplosionStreamView {
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    pub size: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExplosionView {
    pub color: Rgb,
    pub streams: Vec<ExplosionStreamView>,
    pub particles: StreamView,
}

impl From<&Explosion> for ExplosionView {
    fn from(e: &Explosion) -> Self {
        Self {
            color: e.color(),
            streams: e
                .streams()
                .iter()
                .map(|s| ExplosionStreamView {
                    x: s.x,
                    y: s.y,
                    angle: s.angle,
                    size: s.size,
                })
                .collect(),
            particles: StreamView::from(e.particles()),
        }
    }
}

/// Everything the renderer needs for one frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorldSnapshot {
    pub tick: u64,
    pub stage: Stage,
    pub outcome: Option<MatchOutcome>,
    pub local: AvatarId,
    /// Present only during the countdown
    pub countdown: Option<CountdownView>,
    pub avatars: Vec<AvatarView>,
    pub explosions: Vec<ExplosionView>,
}

impl WorldSnapshot {
    pub fn capture(world: &World) -> Self {
        Self {
            tick: world.tick_count(),
            stage: world.stage(),
            outcome: world.outcome(),
            local: world.local(),
            countdown: (world.stage() == Stage::Countdown).then(|| world.countdown().view()),
            avatars: world.avatars().iter().map(AvatarView::from).collect(),
            explosions: world.explosions().iter().map(ExplosionView::from).collect(),
        }
    }

    pub fn avatar(&self, id: AvatarId) -> Option<&AvatarView> {
        self.avatars.iter().find(|a| a.id == id)
    }
}

/// Latest published snapshot, shared between the simulation and a renderer
#[derive(Debug, Clone, Default)]
pub struct SnapshotSlot {
    inner: Arc<RwLock<Option<Arc<WorldSnapshot>>>>,
}

impl SnapshotSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the published snapshot
    pub fn publish(&self, snapshot: WorldSnapshot) {
        *self.inner.write() = Some(Arc::new(snapshot));
    }

    /// Most recent snapshot, if any tick has run
    pub fn latest(&self) -> Option<Arc<WorldSnapshot>> {
        self.inner.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ArenaConfig;
    use crate::game::TickInput;

    #[test]
    fn test_capture_reflects_world() {
        let world = World::new(ArenaConfig::default(), 7, AvatarId(1));
        let snap = WorldSnapshot::capture(&world);
        assert_eq!(snap.stage, Stage::Countdown);
        assert!(snap.countdown.is_some());
        assert_eq!(snap.avatars.len(), 2);
        let local = snap.avatar(AvatarId(1)).unwrap();
        assert_eq!((local.x, local.y), (500.0, 500.0));
        assert_eq!(local.health_percent, 100);
        assert_eq!(local.lives, 3);
    }

    #[test]
    fn test_health_percent_truncates() {
        let config = ArenaConfig::default();
        let mut world = World::new(config, 7, AvatarId(1));
        world.avatars[1].apply_damage(10.0);
        let snap = WorldSnapshot::capture(&world);
        assert_eq!(snap.avatar(AvatarId(1)).unwrap().health_percent, 66);
    }

    #[test]
    fn test_slot_publishes_latest() {
        let slot = SnapshotSlot::new();
        assert!(slot.latest().is_none());

        let mut world = World::new(ArenaConfig::default(), 7, AvatarId(0));
        world.tick(TickInput::default());
        slot.publish(world.snapshot());
        world.tick(TickInput::default());
        slot.publish(world.snapshot());

        let reader = slot.clone();
        assert_eq!(reader.latest().unwrap().tick, 2);
    }
}
