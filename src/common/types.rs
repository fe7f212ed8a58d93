//! Shared types used across the application.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Discord user snowflake.
pub type DiscordId = u64;

/// A player identity as seen by the host on a connection attempt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub uuid: Uuid,
    pub name: String,
}

impl Identity {
    pub fn new(uuid: Uuid, name: impl Into<String>) -> Self {
        Self {
            uuid,
            name: name.into(),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.uuid)
    }
}

/// What an external authority thinks about an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowState {
    Allowed,
    Denied,
}

impl AllowState {
    pub fn is_allowed(self) -> bool {
        self == AllowState::Allowed
    }
}

/// A player-facing text shown by the host (kick screen, chat line).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DisplayMessage(pub String);

impl DisplayMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DisplayMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_display() {
        let id = Uuid::nil();
        let identity = Identity::new(id, "Notch");
        assert_eq!(
            identity.to_string(),
            "Notch (00000000-0000-0000-0000-000000000000)"
        );
    }

    #[test]
    fn test_display_message_serializes_as_string() {
        let msg = DisplayMessage::new("join our Discord");
        assert_eq!(serde_json::to_string(&msg).unwrap(), "\"join our Discord\"");
    }
}
