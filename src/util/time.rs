//! Time utilities for the simulation loop

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Get current Unix timestamp in milliseconds
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

/// Tick rate configuration
pub const SIMULATION_TPS: u32 = 60; // one step per rendered frame
pub const TICK_DURATION_MICROS: u64 = 1_000_000 / SIMULATION_TPS as u64;

/// Duration of one simulation tick
pub fn tick_duration() -> Duration {
    Duration::from_micros(TICK_DURATION_MICROS)
}

/// Convert a millisecond interval to whole ticks (at least one)
pub fn millis_to_ticks(millis: u64) -> u32 {
    let ticks = (millis * SIMULATION_TPS as u64 + 999) / 1000;
    ticks.max(1) as u32
}

/// A simple timer for measuring durations
#[derive(Debug, Clone)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_micros(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }

    /// True once more than one tick's worth of wall time has passed
    pub fn over_tick_budget(&self) -> bool {
        self.elapsed_micros() > TICK_DURATION_MICROS
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
