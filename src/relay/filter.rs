//! Message filtering with regex patterns.
//!
//! Filters messages based on configurable regex patterns to prevent
//! spam or unwanted messages from being relayed between the game and Discord.

use fancy_regex::Regex;
use tracing::warn;

use crate::config::types::FiltersConfig;

/// Direction of message flow for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDirection {
    /// Game to Discord.
    HostToDiscord,
    /// Discord to game.
    DiscordToHost,
}

/// Message filter that checks messages against regex patterns.
#[derive(Debug, Clone)]
pub struct MessageFilter {
    host_to_discord_patterns: Vec<CompiledPattern>,
    discord_to_host_patterns: Vec<CompiledPattern>,
}

/// A compiled regex pattern with its original string for debugging.
#[derive(Debug, Clone)]
struct CompiledPattern {
    original: String,
    regex: Regex,
}

impl MessageFilter {
    /// Create a new message filter from pattern strings.
    ///
    /// Invalid regex patterns are logged and skipped.
    pub fn new(host_to_discord: Option<Vec<String>>, discord_to_host: Option<Vec<String>>) -> Self {
        Self {
            host_to_discord_patterns: compile_patterns(host_to_discord.unwrap_or_default()),
            discord_to_host_patterns: compile_patterns(discord_to_host.unwrap_or_default()),
        }
    }

    /// Create an empty filter that allows all messages.
    pub fn empty() -> Self {
        Self {
            host_to_discord_patterns: Vec::new(),
            discord_to_host_patterns: Vec::new(),
        }
    }

    /// Build the global filter; configured patterns apply in both directions.
    pub fn from_config(filters: Option<&FiltersConfig>) -> Self {
        match filters {
            Some(f) if f.enabled => Self::new(f.patterns.clone(), f.patterns.clone()),
            _ => Self::empty(),
        }
    }

    /// Check if a message should be filtered (blocked) for the given direction.
    ///
    /// Returns `true` if the message matches any filter pattern and should be blocked.
    pub fn should_filter(&self, direction: FilterDirection, message: &str) -> bool {
        let patterns = match direction {
            FilterDirection::HostToDiscord => &self.host_to_discord_patterns,
            FilterDirection::DiscordToHost => &self.discord_to_host_patterns,
        };

        patterns.iter().any(|p| {
            p.regex.is_match(message).unwrap_or_else(|e| {
                warn!("Regex match error for pattern '{}': {}", p.original, e);
                false
            })
        })
    }

    /// Returns true if the filter has any patterns configured.
    pub fn has_patterns(&self) -> bool {
        !self.host_to_discord_patterns.is_empty() || !self.discord_to_host_patterns.is_empty()
    }
}

/// Compile a list of regex pattern strings, skipping invalid ones.
fn compile_patterns(patterns: Vec<String>) -> Vec<CompiledPattern> {
    patterns
        .into_iter()
        .filter_map(|pattern| match Regex::new(&pattern) {
            Ok(regex) => Some(CompiledPattern {
                original: pattern,
                regex,
            }),
            Err(e) => {
                warn!("Invalid filter regex pattern '{}': {}", pattern, e);
                None
            }
        })
        .collect()
}
