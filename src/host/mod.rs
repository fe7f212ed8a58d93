//! Game server side of the bridge.
//!
//! ## Module Structure
//!
//! - `server`: TCP endpoint speaking JSON lines with the plugin
//! - `wire`: Frame definitions
//! - `hooks`: Named hook registrations and the online player list
//! - `adapter`: Per-loader hook translation
//! - `text`: Text component flattening

pub mod adapter;
pub mod hooks;
pub mod server;
pub mod text;
pub mod wire;

pub use adapter::HostAdapter;
pub use hooks::{HostHooks, OnlinePlayers};
pub use server::HostServer;
