//! Configuration type definitions.

use serde::Deserialize;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub discord: DiscordConfig,
    #[serde(default)]
    pub host: HostConfig,
    #[serde(default)]
    pub whitelist: WhitelistConfig,
    #[serde(default)]
    pub relay: RelayConfig,
    pub filters: Option<FiltersConfig>,
}

/// Discord bot configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscordConfig {
    pub token: String,
    /// Channel where chat is synchronized.
    pub channel: u64,
    /// Invite link shown to players who still need to link.
    #[serde(default)]
    pub invite_link: String,
    #[serde(default = "default_true")]
    pub enable_commands: bool,
    /// Role granted to members when they link an account.
    #[serde(default)]
    pub link_role: Option<u64>,
}

/// Listener for game-side plugin connections.
#[derive(Debug, Clone, Deserialize)]
pub struct HostConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Loader assumed for connections that never send `hello`.
    #[serde(default)]
    pub loader: Loader,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            loader: Loader::default(),
        }
    }
}

/// Mod-loader variant the host plugin runs under.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Loader {
    Vanilla,
    #[default]
    Fabric,
    Forge,
    NeoForge,
}

impl Loader {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "vanilla" | "dedicated" => Some(Loader::Vanilla),
            "fabric" | "quilt" => Some(Loader::Fabric),
            "forge" => Some(Loader::Forge),
            "neoforge" | "neo_forge" => Some(Loader::NeoForge),
            _ => None,
        }
    }
}

/// How the external authority combines with the engine's own decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyMode {
    /// The authority may only grant access the engine would refuse.
    #[default]
    GrantOnly,
    /// The authority's answer replaces the engine's when it has one.
    Override,
    /// Both the engine and the authority must allow.
    RequireLink,
}

impl PolicyMode {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "grant_only" | "grant-only" | "grant" => Some(PolicyMode::GrantOnly),
            "override" => Some(PolicyMode::Override),
            "require_link" | "require-link" => Some(PolicyMode::RequireLink),
            _ => None,
        }
    }
}

/// Whitelist arbitration settings.
#[derive(Debug, Clone, Deserialize)]
pub struct WhitelistConfig {
    #[serde(default)]
    pub mode: PolicyMode,
    /// Path of the persisted link table.
    #[serde(default = "default_store")]
    pub store: String,
    /// Message template; `{{USER}}`, `{{CODE}}` and `{{DISCORD}}` are replaced.
    pub template: Option<String>,
    #[serde(default = "default_lookup_timeout_ms")]
    pub lookup_timeout_ms: u64,
    /// Shown when the authority cannot produce a message.
    #[serde(default = "default_fallback_message")]
    pub fallback_message: String,
}

impl Default for WhitelistConfig {
    fn default() -> Self {
        Self {
            mode: PolicyMode::default(),
            store: default_store(),
            template: None,
            lookup_timeout_ms: default_lookup_timeout_ms(),
            fallback_message: default_fallback_message(),
        }
    }
}

/// Relay queue, dedup and retry settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_dedup_window_ms")]
    pub dedup_window_ms: u64,
    #[serde(default = "default_dedup_capacity")]
    pub dedup_capacity: usize,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub formats: FormatsConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            dedup_window_ms: default_dedup_window_ms(),
            dedup_capacity: default_dedup_capacity(),
            retry: RetryConfig::default(),
            formats: FormatsConfig::default(),
        }
    }
}

/// Bounded retry budget for sink publishes.
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            min_delay_ms: default_min_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

/// Per-kind format strings.
#[derive(Debug, Clone, Deserialize)]
pub struct FormatsConfig {
    #[serde(default = "default_chat_format")]
    pub chat: String,
    #[serde(default = "default_plain_format")]
    pub system: String,
    #[serde(default = "default_plain_format")]
    pub command: String,
    /// Discord -> game.
    #[serde(default = "default_discord_format")]
    pub discord: String,
}

impl Default for FormatsConfig {
    fn default() -> Self {
        Self {
            chat: default_chat_format(),
            system: default_plain_format(),
            command: default_plain_format(),
            discord: default_discord_format(),
        }
    }
}

/// Message filtering configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FiltersConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Patterns to filter out in both directions.
    pub patterns: Option<Vec<String>>,
}

fn default_true() -> bool {
    true
}

fn default_bind() -> String {
    "127.0.0.1:25580".to_string()
}

fn default_store() -> String {
    "whitelist.json".to_string()
}

fn default_lookup_timeout_ms() -> u64 {
    250
}

fn default_fallback_message() -> String {
    "You are not whitelisted on this server.".to_string()
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_dedup_window_ms() -> u64 {
    500
}

fn default_dedup_capacity() -> usize {
    512
}

fn default_max_attempts() -> usize {
    5
}

fn default_min_delay_ms() -> u64 {
    200
}

fn default_max_delay_ms() -> u64 {
    5_000
}

fn default_chat_format() -> String {
    "**%user**: %message".to_string()
}

fn default_plain_format() -> String {
    "%message".to_string()
}

fn default_discord_format() -> String {
    "[Discord] %user: %message".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loader_parsing() {
        assert_eq!(Loader::from_str("NeoForge"), Some(Loader::NeoForge));
        assert_eq!(Loader::from_str("dedicated"), Some(Loader::Vanilla));
        assert_eq!(Loader::from_str("bukkit"), None);
    }

    #[test]
    fn test_policy_mode_parsing() {
        assert_eq!(PolicyMode::from_str("grant-only"), Some(PolicyMode::GrantOnly));
        assert_eq!(PolicyMode::from_str("OVERRIDE"), Some(PolicyMode::Override));
        assert_eq!(PolicyMode::from_str("require_link"), Some(PolicyMode::RequireLink));
        assert_eq!(PolicyMode::from_str("strict"), None);
    }

    #[test]
    fn test_defaults() {
        let relay = RelayConfig::default();
        assert_eq!(relay.queue_capacity, 1024);
        assert_eq!(relay.retry.max_attempts, 5);
        assert_eq!(WhitelistConfig::default().mode, PolicyMode::GrantOnly);
        assert_eq!(HostConfig::default().loader, Loader::Fabric);
    }
}
