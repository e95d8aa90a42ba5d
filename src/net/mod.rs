//! Relay networking: wire format and TCP transport

pub mod client;
pub mod protocol;

pub use client::NetError;
pub use protocol::{ProtocolError, RemoteMessage};
