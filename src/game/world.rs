//! World - the whole simulation state and the per-tick pipeline
//!
//! One tick runs, in order: countdown clock, controls, integration,
//! projectile movement, trails, unfreeze checks, collision resolution,
//! projectile compaction, effect decay and the terminal check.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::ArenaConfig;
use crate::net::protocol::{MessageKind, RemoteMessage, RemoteProjectile};

use super::avatar::{Avatar, EXHAUST_DECAY, TRAIL_DECAY};
use super::countdown::Countdown;
use super::events::MatchEvent;
use super::explosion::Explosion;
use super::grid::CollisionGrid;
use super::physics::PhysicsSystem;
use super::snapshot::WorldSnapshot;
use super::{AvatarId, Controls, Rgb, TickInput};

/// Match stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Pre-match countdown; controls are ignored
    Countdown,
    /// Match in progress
    Active,
    /// Terminal; only effects keep animating
    Ended,
}

/// Result of an ended match, from the local player's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOutcome {
    Victory,
    Defeat,
}

/// Simulation state for one match
pub struct World {
    pub(super) config: ArenaConfig,
    pub(super) avatars: Vec<Avatar>,
    pub(super) local: AvatarId,
    pub(super) explosions: Vec<Explosion>,
    pub(super) grid: CollisionGrid,
    pub(super) rng: ChaCha8Rng,
    stage: Stage,
    outcome: Option<MatchOutcome>,
    countdown: Countdown,
    tick: u64,
}

impl World {
    /// Create a world with both avatars at their spawn points
    pub fn new(config: ArenaConfig, seed: u64, local: AvatarId) -> Self {
        let projectile_colors = [Rgb::PALE_BLUE, Rgb::YELLOW];
        let avatars = config
            .spawn_points
            .iter()
            .zip(projectile_colors)
            .enumerate()
            .map(|(i, (spawn, projectile_color))| {
                Avatar::new(AvatarId(i as u8), &config, *spawn, Rgb::WHITE, projectile_color)
            })
            .collect();

        Self {
            grid: CollisionGrid::for_arena(&config),
            countdown: Countdown::new(&config),
            config,
            avatars,
            local,
            explosions: Vec::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            stage: Stage::Countdown,
            outcome: None,
            tick: 0,
        }
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    /// Number of ticks run so far
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn outcome(&self) -> Option<MatchOutcome> {
        self.outcome
    }

    pub fn countdown(&self) -> &Countdown {
        &self.countdown
    }

    pub fn local(&self) -> AvatarId {
        self.local
    }

    /// The avatar not controlled by this process
    pub fn opponent(&self) -> AvatarId {
        AvatarId(if self.local.0 == 0 { 1 } else { 0 })
    }

    pub fn avatars(&self) -> &[Avatar] {
        &self.avatars
    }

    pub fn avatar(&self, id: AvatarId) -> Option<&Avatar> {
        self.avatars.get(id.index())
    }

    pub fn explosions(&self) -> &[Explosion] {
        &self.explosions
    }

    pub fn grid(&self) -> &CollisionGrid {
        &self.grid
    }

    /// Hand the opponent's kinematics to the network
    pub fn set_remote_opponent(&mut self, remote: bool) {
        let opponent = self.opponent().index();
        if let Some(avatar) = self.avatars.get_mut(opponent) {
            avatar.remote = remote;
        }
    }

    /// Ended with every explosion and particle faded out
    pub fn is_settled(&self) -> bool {
        self.stage == Stage::Ended
            && self.explosions.is_empty()
            && self
                .avatars
                .iter()
                .all(|a| a.exhaust.is_empty() && a.trail.is_empty())
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot::capture(self)
    }

    /// Overwrite the opponent with state received from the peer
    pub fn apply_remote(&mut self, msg: &RemoteMessage) {
        let opponent = self.opponent();
        let Some(avatar) = self.avatars.get_mut(opponent.index()) else {
            return;
        };
        match msg.kind {
            MessageKind::Join => {
                avatar.set_spawn(msg.x, msg.y, msg.rotation);
                info!(avatar = %opponent, x = msg.x, y = msg.y, "Opponent joined");
            }
            MessageKind::Update => avatar.overwrite_kinematics(msg.x, msg.y, msg.rotation),
        }
        for p in &msg.projectiles {
            avatar.add_remote_projectile(p.x, p.y, p.rotation, &self.config);
        }
    }

    /// Announce the local avatar to the peer
    pub fn join_message(&self) -> Option<RemoteMessage> {
        self.avatar(self.local)
            .map(|a| RemoteMessage::join(a.x, a.y, a.rotation))
    }

    /// Local avatar state plus projectiles fired since the last call
    pub fn outbound_update(&mut self) -> Option<RemoteMessage> {
        let avatar = self.avatars.get_mut(self.local.index())?;
        let projectiles = avatar
            .take_new_projectiles()
            .into_iter()
            .map(|p| RemoteProjectile {
                x: p.x,
                y: p.y,
                rotation: p.rotation,
            })
            .collect();
        Some(RemoteMessage::update(
            avatar.x,
            avatar.y,
            avatar.rotation,
            projectiles,
        ))
    }

    /// Advance the simulation one tick
    pub fn tick(&mut self, input: TickInput) -> Vec<MatchEvent> {
        let mut events = Vec::new();
        self.tick += 1;

        if self.stage == Stage::Countdown && self.countdown.advance() {
            self.set_stage(Stage::Active, &mut events);
        }

        if self.stage != Stage::Ended {
            let opponent = self.opponent();
            for avatar in self.avatars.iter_mut() {
                avatar.tick_cooldown();
            }
            self.apply_controls(self.local, input.local, &mut events);
            self.apply_controls(opponent, input.opponent, &mut events);

            for avatar in self.avatars.iter_mut() {
                if avatar.remote {
                    avatar.reset_controls();
                } else {
                    PhysicsSystem::update_avatar(avatar, &self.config);
                }
            }
            for avatar in self.avatars.iter_mut() {
                PhysicsSystem::update_projectiles(avatar, &self.config);
                avatar.emit_trails(&mut self.rng);
            }
            for avatar in self.avatars.iter_mut() {
                if PhysicsSystem::check_unfreeze(avatar, &self.config) {
                    debug!(avatar = %avatar.id, "Avatar unfrozen");
                    events.push(MatchEvent::Unfrozen { avatar: avatar.id });
                }
            }

            self.resolve_collisions(&mut events);

            for avatar in self.avatars.iter_mut() {
                avatar.compact_projectiles();
                // Only the local avatar's shots are sent to the peer
                if avatar.id != self.local {
                    avatar.take_new_projectiles();
                }
            }
        }

        self.advance_effects();
        self.check_terminal(&mut events);
        events
    }

    /// Map one control set onto an avatar. Thrust works whenever the match
    /// is active; turning and firing also need the avatar unfrozen.
    fn apply_controls(&mut self, id: AvatarId, controls: Controls, events: &mut Vec<MatchEvent>) {
        if self.stage != Stage::Active {
            return;
        }
        let Some(avatar) = self.avatars.get_mut(id.index()) else {
            return;
        };
        if avatar.remote {
            return;
        }

        if controls.thrust {
            avatar.throttle_on(&self.config, &mut self.rng);
        }
        if avatar.frozen {
            return;
        }
        if controls.turn_left {
            avatar.turn_left(&self.config);
        }
        if controls.turn_right {
            avatar.turn_right(&self.config);
        }
        if controls.fire && avatar.fire(&self.config) {
            events.push(MatchEvent::ProjectileFired {
                avatar: id,
                x: avatar.x,
                y: avatar.y,
                rotation: avatar.rotation,
            });
        }
    }

    fn advance_effects(&mut self) {
        for avatar in self.avatars.iter_mut() {
            avatar.exhaust.decay(EXHAUST_DECAY, &mut self.rng);
            avatar.trail.decay(TRAIL_DECAY, &mut self.rng);
        }
        let rng = &mut self.rng;
        self.explosions.retain_mut(|e| e.advance(rng));
    }

    fn check_terminal(&mut self, events: &mut Vec<MatchEvent>) {
        if self.stage == Stage::Ended {
            return;
        }
        let depleted = |id: AvatarId| self.avatar(id).map_or(false, Avatar::is_depleted);
        let outcome = if depleted(self.local) {
            MatchOutcome::Defeat
        } else if depleted(self.opponent()) {
            MatchOutcome::Victory
        } else {
            return;
        };

        self.outcome = Some(outcome);
        self.set_stage(Stage::Ended, events);
        info!(tick = self.tick, outcome = ?outcome, "Match ended");
        events.push(MatchEvent::MatchEnded { outcome });
    }

    fn set_stage(&mut self, stage: Stage, events: &mut Vec<MatchEvent>) {
        info!(tick = self.tick, from = ?self.stage, to = ?stage, "Stage changed");
        self.stage = stage;
        events.push(MatchEvent::StageChanged { stage });
    }
}
