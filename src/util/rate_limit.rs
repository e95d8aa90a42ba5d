//! Rate limiting utilities

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;

use super::time::SIMULATION_TPS;

/// Rate limiter type alias
pub type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Create a rate limiter with the specified messages per second
pub fn create_limiter(per_second: u32) -> Arc<Limiter> {
    let quota = Quota::per_second(NonZeroU32::new(per_second).unwrap_or(NonZeroU32::MIN));
    Arc::new(RateLimiter::direct(quota))
}

/// Inbound remote updates: the peer sends one per tick, allow twice that
pub const REMOTE_MESSAGE_RATE_LIMIT: u32 = SIMULATION_TPS * 2;

/// Limiter for messages arriving from the relay
#[derive(Clone)]
pub struct RemoteRateLimiter {
    limiter: Arc<Limiter>,
}

impl RemoteRateLimiter {
    pub fn new() -> Self {
        Self::with_rate(REMOTE_MESSAGE_RATE_LIMIT)
    }

    pub fn with_rate(per_second: u32) -> Self {
        Self {
            limiter: create_limiter(per_second),
        }
    }

    /// Check if a message is allowed (returns true if allowed)
    pub fn check(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

impl Default for RemoteRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
