//! Canonical message types for bridge communication.
//!
//! This module defines the single source of truth for message types
//! passed between the host adapters, the relay and the Discord side.

use tracing::warn;

use crate::common::types::{DisplayMessage, Identity};

/// Classification of a host broadcast.
///
/// Downstream routing keys off this value, so it must survive the relay
/// unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BroadcastKind {
    /// Player chat, always attributed to an origin identity.
    Chat,
    /// System / game messages (joins, deaths, advancements).
    System,
    /// Decorated command output (`/say`, `/me`, `/msg` broadcasts).
    Command,
}

impl BroadcastKind {
    /// Parse a host chat type name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "chat" | "player" => Some(Self::Chat),
            "system" | "game" | "game_info" => Some(Self::System),
            "command" | "say_command" | "msg_command" | "emote_command" => Some(Self::Command),
            _ => None,
        }
    }

    /// Parse a host chat type name, treating unknown names as System.
    pub fn from_wire(s: &str) -> Self {
        Self::parse(s).unwrap_or_else(|| {
            warn!(chat_type = s, "Unrecognized broadcast kind, treating as system");
            Self::System
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::System => "system",
            Self::Command => "command",
        }
    }
}

/// The host entry point a broadcast was observed at.
///
/// Several of these can fire for the same logical broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastSource {
    /// `broadcastMessage(Component, ChatType, UUID)`.
    LegacyBroadcast,
    /// `broadcastMessage(Component, Function, ChatType, UUID)`.
    FilteredBroadcast,
    /// Chat packet handler after the filtered broadcast.
    ChatPacket,
    /// Loader chat event (Forge `ServerChatEvent`).
    ChatEvent,
    /// `broadcastSystemMessage`.
    SystemBroadcast,
    /// `broadcastChatMessage` with a command source.
    ChatBroadcast,
}

/// A broadcast reported by the host, translated into the unified shape.
#[derive(Debug, Clone)]
pub struct BroadcastEvent {
    pub kind: BroadcastKind,
    /// Flattened message text.
    pub content: String,
    /// The player who sent it, if any.
    pub origin: Option<Identity>,
    pub source: BroadcastSource,
    /// Host tick or timestamp, part of the idempotency key when present.
    pub stamp: Option<u64>,
    /// The host is echoing a message the bridge injected from Discord.
    pub from_discord: bool,
}

impl BroadcastEvent {
    pub fn new(kind: BroadcastKind, content: impl Into<String>, source: BroadcastSource) -> Self {
        Self {
            kind,
            content: content.into(),
            origin: None,
            source,
            stamp: None,
            from_discord: false,
        }
    }

    pub fn chat(origin: Identity, content: impl Into<String>, source: BroadcastSource) -> Self {
        Self::new(BroadcastKind::Chat, content, source).with_origin(Some(origin))
    }

    pub fn system(content: impl Into<String>, source: BroadcastSource) -> Self {
        Self::new(BroadcastKind::System, content, source)
    }

    pub fn with_origin(mut self, origin: Option<Identity>) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_stamp(mut self, stamp: Option<u64>) -> Self {
        self.stamp = stamp;
        self
    }

    pub fn with_from_discord(mut self, from_discord: bool) -> Self {
        self.from_discord = from_discord;
        self
    }
}

/// A classified broadcast ready to be handed to a chat sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayMessage {
    pub kind: BroadcastKind,
    pub content: String,
    /// Set for Chat, always `None` for System and Command.
    pub origin: Option<Identity>,
}

/// Outcome of a login check, consumed immediately by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginDecision {
    pub allowed: bool,
    pub reason: Option<DisplayMessage>,
}

impl LoginDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn deny(reason: DisplayMessage) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
        }
    }
}

/// A Discord message on its way into the game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Discord display name of the author.
    pub author: String,
    /// Resolved, host-ready content.
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parsing() {
        assert_eq!(BroadcastKind::parse("CHAT"), Some(BroadcastKind::Chat));
        assert_eq!(BroadcastKind::parse("system"), Some(BroadcastKind::System));
        assert_eq!(BroadcastKind::parse("say_command"), Some(BroadcastKind::Command));
        assert_eq!(BroadcastKind::parse("game_info"), Some(BroadcastKind::System));
        assert_eq!(BroadcastKind::parse("emote"), None);
    }

    #[test]
    fn test_unknown_kind_defaults_to_system() {
        assert_eq!(BroadcastKind::from_wire("actionbar"), BroadcastKind::System);
    }

    #[test]
    fn test_chat_constructor_sets_origin() {
        let identity = Identity::new(uuid::Uuid::nil(), "Alex");
        let event = BroadcastEvent::chat(identity.clone(), "hi", BroadcastSource::ChatEvent);
        assert_eq!(event.kind, BroadcastKind::Chat);
        assert_eq!(event.origin, Some(identity));
        assert!(!event.from_discord);
    }
}
