//! Relay wire format
//!
//! Messages are single lines of whitespace-delimited tokens at fixed
//! positions:
//!
//! ```text
//! Join: DRONE x: <f> y: <f> r: <f>
//! Update: DRONE x: <f> y: <f> r: <f>( P: <f> <f> <f>)*
//! ```
//!
//! The relay prepends a numeric sender id when forwarding, so a leading
//! integer token is accepted and ignored.

use std::fmt;

/// Message kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Sent once on connect; also fixes the sender's spawn point
    Join,
    /// Sent every tick
    Update,
}

impl MessageKind {
    fn tag(self) -> &'static str {
        match self {
            MessageKind::Join => "Join:",
            MessageKind::Update => "Update:",
        }
    }
}

/// A projectile fired since the sender's previous update
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RemoteProjectile {
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
}

/// Avatar state exchanged with the peer
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteMessage {
    pub kind: MessageKind,
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
    pub projectiles: Vec<RemoteProjectile>,
}

/// Malformed remote message
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ProtocolError {
    #[error("Empty message")]
    Empty,

    #[error("Unknown message kind: {0}")]
    UnknownKind(String),

    #[error("Missing token at position {index}")]
    MissingToken { index: usize },

    #[error("Expected '{expected}' at position {index}, found '{found}'")]
    UnexpectedToken {
        index: usize,
        expected: &'static str,
        found: String,
    },

    #[error("Invalid number '{value}' at position {index}")]
    InvalidNumber { index: usize, value: String },
}

const ENTITY_TAG: &str = "DRONE";
const PROJECTILE_TAG: &str = "P:";

impl RemoteMessage {
    pub fn join(x: f32, y: f32, rotation: f32) -> Self {
        Self {
            kind: MessageKind::Join,
            x,
            y,
            rotation,
            projectiles: Vec::new(),
        }
    }

    pub fn update(x: f32, y: f32, rotation: f32, projectiles: Vec<RemoteProjectile>) -> Self {
        Self {
            kind: MessageKind::Update,
            x,
            y,
            rotation,
            projectiles,
        }
    }

    /// Parse one line (trailing newline optional)
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let mut tokens = Tokens::new(line);
        tokens.skip_sender_id();

        let kind = match tokens.next_token()? {
            "Join:" => MessageKind::Join,
            "Update:" => MessageKind::Update,
            other => return Err(ProtocolError::UnknownKind(other.to_string())),
        };
        tokens.expect(ENTITY_TAG)?;
        tokens.expect("x:")?;
        let x = tokens.number()?;
        tokens.expect("y:")?;
        let y = tokens.number()?;
        tokens.expect("r:")?;
        let rotation = tokens.number()?;

        let mut projectiles = Vec::new();
        match kind {
            MessageKind::Update => {
                while !tokens.is_done() {
                    tokens.expect(PROJECTILE_TAG)?;
                    projectiles.push(RemoteProjectile {
                        x: tokens.number()?,
                        y: tokens.number()?,
                        rotation: tokens.number()?,
                    });
                }
            }
            MessageKind::Join => tokens.expect_end()?,
        }

        Ok(Self {
            kind,
            x,
            y,
            rotation,
            projectiles,
        })
    }
}

impl fmt::Display for RemoteMessage {
    /// Wire form, without the trailing newline
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} x: {} y: {} r: {}",
            self.kind.tag(),
            ENTITY_TAG,
            self.x,
            self.y,
            self.rotation
        )?;
        if self.kind == MessageKind::Update {
            for p in &self.projectiles {
                write!(f, " {} {} {} {}", PROJECTILE_TAG, p.x, p.y, p.rotation)?;
            }
        }
        Ok(())
    }
}

/// Positional token cursor
struct Tokens<'a> {
    tokens: Vec<&'a str>,
    pos: usize,
}

impl<'a> Tokens<'a> {
    fn new(line: &'a str) -> Self {
        Self {
            tokens: line.split_whitespace().collect(),
            pos: 0,
        }
    }

    fn skip_sender_id(&mut self) {
        if let Some(first) = self.tokens.first() {
            if first.trim_end_matches(':').parse::<u64>().is_ok() {
                self.pos = 1;
            }
        }
    }

    fn is_done(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn next_token(&mut self) -> Result<&'a str, ProtocolError> {
        let token = match self.tokens.get(self.pos) {
            Some(token) => *token,
            None if self.tokens.is_empty() => return Err(ProtocolError::Empty),
            None => return Err(ProtocolError::MissingToken { index: self.pos }),
        };
        self.pos += 1;
        Ok(token)
    }

    fn expect(&mut self, expected: &'static str) -> Result<(), ProtocolError> {
        let index = self.pos;
        let found = self.next_token()?;
        if found != expected {
            return Err(ProtocolError::UnexpectedToken {
                index,
                expected,
                found: found.to_string(),
            });
        }
        Ok(())
    }

    fn expect_end(&self) -> Result<(), ProtocolError> {
        match self.tokens.get(self.pos) {
            None => Ok(()),
            Some(found) => Err(ProtocolError::UnexpectedToken {
                index: self.pos,
                expected: "end of message",
                found: found.to_string(),
            }),
        }
    }

    fn number(&mut self) -> Result<f32, ProtocolError> {
        let index = self.pos;
        let raw = self.next_token()?;
        match raw.parse::<f32>() {
            Ok(value) if value.is_finite() => Ok(value),
            _ => Err(ProtocolError::InvalidNumber {
                index,
                value: raw.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_join() {
        let msg = RemoteMessage::parse("Join: DRONE x: 1400 y: 500 r: 20\n").unwrap();
        assert_eq!(msg, RemoteMessage::join(1400.0, 500.0, 20.0));
    }

    #[test]
    fn test_parse_update_with_projectiles() {
        let msg =
            RemoteMessage::parse("Update: DRONE x: 10.5 y: 20 r: 359.9 P: 1 2 3 P: 4 5 6").unwrap();
        assert_eq!(msg.kind, MessageKind::Update);
        assert_eq!((msg.x, msg.y, msg.rotation), (10.5, 20.0, 359.9));
        assert_eq!(
            msg.projectiles,
            vec![
                RemoteProjectile {
                    x: 1.0,
                    y: 2.0,
                    rotation: 3.0
                },
                RemoteProjectile {
                    x: 4.0,
                    y: 5.0,
                    rotation: 6.0
                },
            ]
        );
    }

    #[test]
    fn test_relay_sender_prefix_ignored() {
        let msg = RemoteMessage::parse("7 Update: DRONE x: 1 y: 2 r: 3").unwrap();
        assert_eq!((msg.x, msg.y, msg.rotation), (1.0, 2.0, 3.0));
    }

    #[test]
    fn test_display_matches_wire_format() {
        let msg = RemoteMessage::update(
            1400.0,
            500.5,
            20.0,
            vec![RemoteProjectile {
                x: 1.0,
                y: 2.0,
                rotation: 90.0,
            }],
        );
        assert_eq!(msg.to_string(), "Update: DRONE x: 1400 y: 500.5 r: 20 P: 1 2 90");
        assert_eq!(
            RemoteMessage::join(1.0, 2.0, 3.0).to_string(),
            "Join: DRONE x: 1 y: 2 r: 3"
        );
        assert_eq!(RemoteMessage::parse(&msg.to_string()).unwrap(), msg);
    }

    #[test]
    fn test_malformed_messages_rejected() {
        assert_eq!(RemoteMessage::parse("   "), Err(ProtocolError::Empty));
        assert!(matches!(
            RemoteMessage::parse("Leave: DRONE"),
            Err(ProtocolError::UnknownKind(_))
        ));
        assert_eq!(
            RemoteMessage::parse("Update: DRONE x: 1 y: 2"),
            Err(ProtocolError::MissingToken { index: 6 })
        );
        assert!(matches!(
            RemoteMessage::parse("Update: SHIP x: 1 y: 2 r: 3"),
            Err(ProtocolError::UnexpectedToken { index: 1, .. })
        ));
        assert_eq!(
            RemoteMessage::parse("Update: DRONE x: abc y: 2 r: 3"),
            Err(ProtocolError::InvalidNumber {
                index: 3,
                value: "abc".to_string()
            })
        );
        // Join carries no projectiles
        assert_eq!(
            RemoteMessage::parse("Join: DRONE x: 1 y: 2 r: 3 P: 1 2 3"),
            Err(ProtocolError::UnexpectedToken {
                index: 8,
                expected: "end of message",
                found: "P:".to_string()
            })
        );
        assert!(matches!(
            RemoteMessage::parse("4 Join: DRONE x: 1 y: 2 r: 3 extra"),
            Err(ProtocolError::UnexpectedToken { index: 9, .. })
        ));
        // Truncated projectile triple
        assert!(RemoteMessage::parse("Update: DRONE x: 1 y: 2 r: 3 P: 1 2").is_err());
        assert!(RemoteMessage::parse("Update: DRONE x: NaN y: 2 r: 3").is_err());
    }
}
