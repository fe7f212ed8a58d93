//! Common utilities and types shared across the application.

pub mod error;
pub mod messages;
pub mod types;

// Re-export message types from messages module
pub use messages::{
    BroadcastEvent, BroadcastKind, BroadcastSource, InboundMessage, LoginDecision, RelayMessage,
};
pub use types::{AllowState, DiscordId, DisplayMessage, Identity};
