//! Fixed-rate match loop driving a World

use serde::Serialize;
use std::future::Future;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::net::protocol::RemoteMessage;
use crate::util::time::{tick_duration, unix_millis, Timer};

use super::events::MatchEvent;
use super::snapshot::{AvatarView, SnapshotSlot};
use super::world::{MatchOutcome, Stage, World};
use super::{AvatarId, InputSource, TickInput};

/// Inbound remote messages buffered between ticks
const INBOUND_CAPACITY: usize = 256;
/// Events buffered for slow subscribers
const EVENT_CAPACITY: usize = 256;

/// Counters accumulated from tick events
#[derive(Debug, Clone, Default, Serialize)]
pub struct MatchStats {
    pub shots_fired: u32,
    pub projectile_hits: u32,
    pub projectile_collisions: u32,
    pub avatar_collisions: u32,
    pub wall_impacts: u32,
    pub lives_lost: u32,
}

impl MatchStats {
    fn record(&mut self, event: &MatchEvent) {
        match event {
            MatchEvent::ProjectileFired { .. } => self.shots_fired += 1,
            MatchEvent::ProjectileHit { .. } => self.projectile_hits += 1,
            MatchEvent::ProjectilesCollided { .. } => self.projectile_collisions += 1,
            MatchEvent::AvatarCollision { .. } => self.avatar_collisions += 1,
            MatchEvent::WallImpact { .. } => self.wall_impacts += 1,
            MatchEvent::LifeLost { .. } => self.lives_lost += 1,
            _ => {}
        }
    }
}

/// Final state of a match, logged by the host when it stops
#[derive(Debug, Clone, Serialize)]
pub struct MatchSummary {
    pub ticks: u64,
    pub duration_ms: u64,
    pub stage: Stage,
    pub outcome: Option<MatchOutcome>,
    pub local: AvatarId,
    pub avatars: Vec<AvatarSummary>,
    pub stats: MatchStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct AvatarSummary {
    pub id: AvatarId,
    pub lives: u32,
    pub health_percent: u32,
}

/// Handle for feeding and observing a running match
#[derive(Clone)]
pub struct MatchHandle {
    pub inbound_tx: mpsc::Sender<RemoteMessage>,
    pub snapshot: SnapshotSlot,
    event_tx: broadcast::Sender<MatchEvent>,
}

impl MatchHandle {
    /// Receive every event produced from now on
    pub fn subscribe(&self) -> broadcast::Receiver<MatchEvent> {
        self.event_tx.subscribe()
    }
}

/// A match in progress
pub struct GameMatch {
    world: World,
    input: Box<dyn InputSource + Send>,
    inbound_rx: mpsc::Receiver<RemoteMessage>,
    outbound_tx: Option<mpsc::Sender<RemoteMessage>>,
    event_tx: broadcast::Sender<MatchEvent>,
    snapshot: SnapshotSlot,
    stats: MatchStats,
    started_at: u64,
}

impl GameMatch {
    /// Create a match around a world
    pub fn new(world: World, input: Box<dyn InputSource + Send>) -> (Self, MatchHandle) {
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CAPACITY);
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);
        let snapshot = SnapshotSlot::new();

        let handle = MatchHandle {
            inbound_tx,
            snapshot: snapshot.clone(),
            event_tx: event_tx.clone(),
        };

        let game_match = Self {
            world,
            input,
            inbound_rx,
            outbound_tx: None,
            event_tx,
            snapshot,
            stats: MatchStats::default(),
            started_at: unix_millis(),
        };

        (game_match, handle)
    }

    /// Send local state to a peer every tick. The opponent becomes
    /// network driven.
    pub fn with_outbound(mut self, outbound_tx: mpsc::Sender<RemoteMessage>) -> Self {
        self.world.set_remote_opponent(true);
        self.outbound_tx = Some(outbound_tx);
        self
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn stats(&self) -> &MatchStats {
        &self.stats
    }

    /// Run until the match has ended and its effects have faded
    pub async fn run(self) -> MatchSummary {
        self.run_until(std::future::pending()).await
    }

    /// Run at the simulation rate until the match settles or `shutdown`
    /// completes, whichever comes first
    pub async fn run_until<F>(mut self, shutdown: F) -> MatchSummary
    where
        F: Future<Output = ()>,
    {
        info!(local = %self.world.local(), "Match started");

        let mut tick_interval = interval(tick_duration());
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = tick_interval.tick() => {}
                _ = &mut shutdown => {
                    info!(tick = self.world.tick_count(), "Match interrupted");
                    break;
                }
            }

            self.step();

            if self.world.is_settled() {
                info!(tick = self.world.tick_count(), "Match settled");
                break;
            }
        }

        self.build_summary()
    }

    /// Run one tick: apply queued remote state, sample input, simulate,
    /// then publish the snapshot, events and outbound update
    pub fn step(&mut self) -> Vec<MatchEvent> {
        self.process_inbound();

        let input = TickInput::sample(self.input.as_ref());
        let timer = Timer::new();
        let events = self.world.tick(input);
        if timer.over_tick_budget() {
            warn!(
                tick = self.world.tick_count(),
                elapsed_us = timer.elapsed_micros(),
                "Tick over budget"
            );
        }

        self.snapshot.publish(self.world.snapshot());
        self.send_outbound();

        for event in &events {
            self.stats.record(event);
            // No subscribers is fine
            let _ = self.event_tx.send(event.clone());
        }
        events
    }

    /// Drain remote messages received since the last tick
    fn process_inbound(&mut self) {
        while let Ok(msg) = self.inbound_rx.try_recv() {
            self.world.apply_remote(&msg);
        }
    }

    fn send_outbound(&mut self) {
        // Always drain so shots do not pile up offline
        let Some(update) = self.world.outbound_update() else {
            return;
        };
        let Some(tx) = &self.outbound_tx else {
            return;
        };
        match tx.try_send(update) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(tick = self.world.tick_count(), "Outbound queue full, dropping update");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("Outbound channel closed");
                self.outbound_tx = None;
            }
        }
    }

    fn build_summary(&self) -> MatchSummary {
        MatchSummary {
            ticks: self.world.tick_count(),
            duration_ms: unix_millis().saturating_sub(self.started_at),
            stage: self.world.stage(),
            outcome: self.world.outcome(),
            local: self.world.local(),
            avatars: self
                .world
                .avatars()
                .iter()
                .map(|a| {
                    let view = AvatarView::from(a);
                    AvatarSummary {
                        id: view.id,
                        lives: view.lives,
                        health_percent: view.health_percent,
                    }
                })
                .collect(),
            stats: self.stats.clone(),
        }
    }
}
