//! Two-avatar arena simulation core
//!
//! The [`game::World`] holds the whole simulation and advances it one fixed
//! tick at a time; [`game::GameMatch`] drives a world at 60 Hz and connects
//! it to an optional relay transport.

pub mod config;
pub mod game;
pub mod net;
pub mod util;
