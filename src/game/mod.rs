//! Game simulation modules

pub mod avatar;
pub mod collision;
pub mod countdown;
pub mod events;
pub mod explosion;
pub mod grid;
pub mod r#match;
pub mod particles;
pub mod physics;
pub mod snapshot;
pub mod world;

pub use avatar::{Avatar, Projectile};
pub use events::MatchEvent;
pub use r#match::{GameMatch, MatchHandle};
pub use snapshot::{SnapshotSlot, WorldSnapshot};
pub use world::{MatchOutcome, Stage, World};

use serde::Serialize;
use std::fmt;

/// Identifier of an avatar; also its index in the world's avatar list
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct AvatarId(pub u8);

impl AvatarId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for AvatarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// RGB color tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const WHITE: Rgb = Rgb(255, 255, 255);
    pub const YELLOW: Rgb = Rgb(255, 255, 0);
    pub const PALE_BLUE: Rgb = Rgb(170, 170, 255);
    /// Default explosion color
    pub const FLAME: Rgb = Rgb(255, 170, 40);
    /// Avatar-vs-avatar impact sparks
    pub const SPARK: Rgb = Rgb(255, 220, 150);
}

/// Keys the simulation reads from the input source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Thrust,
    TurnLeft,
    TurnRight,
    Fire,
    /// Hot-seat controls for the opponent avatar
    OpponentThrust,
    OpponentTurnLeft,
    OpponentTurnRight,
    OpponentFire,
}

/// Boolean per-key queries, sampled once at the start of each tick
pub trait InputSource {
    fn is_pressed(&self, key: Key) -> bool;
}

/// Input source with nothing pressed (headless hosts)
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInput;

impl InputSource for NoInput {
    fn is_pressed(&self, _key: Key) -> bool {
        false
    }
}

/// Control state for one avatar for one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Controls {
    pub thrust: bool,
    pub turn_left: bool,
    pub turn_right: bool,
    pub fire: bool,
}

/// Input state for a single tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickInput {
    pub local: Controls,
    /// Only applied when the opponent is not driven by the network
    pub opponent: Controls,
}

impl TickInput {
    /// Sample every key once
    pub fn sample(source: &dyn InputSource) -> Self {
        Self {
            local: Controls {
                thrust: source.is_pressed(Key::Thrust),
                turn_left: source.is_pressed(Key::TurnLeft),
                turn_right: source.is_pressed(Key::TurnRight),
                fire: source.is_pressed(Key::Fire),
            },
            opponent: Controls {
                thrust: source.is_pressed(Key::OpponentThrust),
                turn_left: source.is_pressed(Key::OpponentTurnLeft),
                turn_right: source.is_pressed(Key::OpponentTurnRight),
                fire: source.is_pressed(Key::OpponentFire),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    struct Pressed(HashSet<Key>);

    impl InputSource for Pressed {
        fn is_pressed(&self, key: Key) -> bool {
            self.0.contains(&key)
        }
    }

    #[test]
    fn test_sample_maps_keys_to_controls() {
        let source = Pressed([Key::Thrust, Key::Fire, Key::OpponentTurnLeft].into_iter().collect());
        let input = TickInput::sample(&source);
        assert!(input.local.thrust && input.local.fire);
        assert!(!input.local.turn_left && !input.local.turn_right);
        assert!(input.opponent.turn_left);
        assert!(!input.opponent.thrust);
    }

    #[test]
    fn test_no_input_is_idle() {
        assert_eq!(TickInput::sample(&NoInput), TickInput::default());
    }
}
