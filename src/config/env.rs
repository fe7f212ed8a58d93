//! Environment variable overrides for configuration.
//!
//! Supports overriding config values with environment variables:
//! - `ASTRALBRIDGE_DISCORD_TOKEN` - Discord bot token
//! - `ASTRALBRIDGE_DISCORD_CHANNEL` - Chat sync channel ID
//! - `ASTRALBRIDGE_HOST_BIND` - Listen address for the game plugin
//! - `ASTRALBRIDGE_WHITELIST_MODE` - `grant_only`, `override` or `require_link`

use std::env;

use tracing::warn;

use crate::config::types::{Config, PolicyMode};

/// Environment variable prefix for all config overrides.
const ENV_PREFIX: &str = "ASTRALBRIDGE";

/// Apply environment variable overrides to a config.
///
/// This allows sensitive values like the bot token to be provided via
/// environment variables instead of the config file.
pub fn apply_env_overrides(mut config: Config) -> Config {
    if let Ok(token) = env::var(format!("{}_DISCORD_TOKEN", ENV_PREFIX)) {
        config.discord.token = token;
    }

    if let Ok(channel) = env::var(format!("{}_DISCORD_CHANNEL", ENV_PREFIX)) {
        match channel.parse() {
            Ok(id) => config.discord.channel = id,
            Err(_) => warn!("Ignoring non-numeric {}_DISCORD_CHANNEL", ENV_PREFIX),
        }
    }

    if let Ok(bind) = env::var(format!("{}_HOST_BIND", ENV_PREFIX)) {
        config.host.bind = bind;
    }

    if let Ok(mode) = env::var(format!("{}_WHITELIST_MODE", ENV_PREFIX)) {
        match PolicyMode::from_str(&mode) {
            Some(mode) => config.whitelist.mode = mode,
            None => warn!("Ignoring unknown {}_WHITELIST_MODE '{}'", ENV_PREFIX, mode),
        }
    }

    config
}

/// Check if any required environment variables are set but empty.
///
/// Returns a list of variable names that are set but empty.
pub fn check_empty_env_vars() -> Vec<String> {
    let vars = [format!("{}_DISCORD_TOKEN", ENV_PREFIX)];

    vars.into_iter()
        .filter(|var| env::var(var).map(|v| v.is_empty()).unwrap_or(false))
        .collect()
}

/// Get the config file path from environment or use default.
///
/// Checks `ASTRALBRIDGE_CONFIG` environment variable, otherwise returns "astralbridge.conf".
pub fn get_config_path() -> String {
    env::var(format!("{}_CONFIG", ENV_PREFIX)).unwrap_or_else(|_| "astralbridge.conf".to_string())
}
