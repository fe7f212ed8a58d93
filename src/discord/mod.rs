//! Discord bot integration.
//!
//! Provides the relay sink, the Discord -> game message path and the
//! account linking commands.

pub mod client;
pub mod commands;
pub mod handler;
pub mod resolver;

pub use client::{DiscordBot, DiscordSink};
pub use commands::CommandHandler;
pub use handler::BridgeHandler;
