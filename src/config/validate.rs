//! Configuration validation.
//!
//! Validates configuration values and provides helpful error messages.

use std::net::SocketAddr;

use fancy_regex::Regex;

use crate::common::error::ConfigError;
use crate::config::types::Config;

/// Validate a configuration and return detailed errors.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    // Discord
    if config.discord.token.is_empty() {
        errors.push("discord.token is required".to_string());
    }
    if config.discord.token == "YOUR_DISCORD_TOKEN_HERE" {
        errors.push("discord.token has not been configured (still using placeholder)".to_string());
    }
    if config.discord.channel == 0 {
        errors.push("discord.channel must be non-zero".to_string());
    }
    if config.discord.link_role == Some(0) {
        errors.push("discord.link_role must be a role id, not 0".to_string());
    }

    // Host listener
    if config.host.bind.parse::<SocketAddr>().is_err() {
        errors.push(format!(
            "host.bind '{}' is not a valid socket address",
            config.host.bind
        ));
    }

    // Whitelist
    if config.whitelist.store.is_empty() {
        errors.push("whitelist.store is required".to_string());
    }
    if config.whitelist.lookup_timeout_ms == 0 {
        errors.push("whitelist.lookup_timeout_ms must be non-zero".to_string());
    }
    if let Some(ref template) = config.whitelist.template {
        if template.trim().is_empty() {
            errors.push("whitelist.template must not be empty".to_string());
        }
    }

    // Relay
    if config.relay.queue_capacity == 0 {
        errors.push("relay.queue_capacity must be non-zero".to_string());
    }
    if config.relay.dedup_capacity == 0 {
        errors.push("relay.dedup_capacity must be non-zero".to_string());
    }
    if config.relay.retry.min_delay_ms > config.relay.retry.max_delay_ms {
        errors.push(format!(
            "relay.retry.min_delay_ms ({}) exceeds max_delay_ms ({})",
            config.relay.retry.min_delay_ms, config.relay.retry.max_delay_ms
        ));
    }
    let formats = &config.relay.formats;
    for (name, format) in [
        ("chat", &formats.chat),
        ("system", &formats.system),
        ("command", &formats.command),
        ("discord", &formats.discord),
    ] {
        if !format.contains("%message") {
            errors.push(format!("relay.formats.{} must contain %message", name));
        }
    }

    // Validate filter patterns (try to compile them)
    if let Some(ref filters) = config.filters {
        if let Some(ref patterns) = filters.patterns {
            for (i, pattern) in patterns.iter().enumerate() {
                if Regex::new(pattern).is_err() {
                    errors.push(format!(
                        "filters.patterns[{}] is not a valid regex: '{}'",
                        i, pattern
                    ));
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError {
            message: errors.join("\n"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::*;

    fn make_valid_config() -> Config {
        Config {
            discord: DiscordConfig {
                token: "valid_token_here".to_string(),
                channel: 987654321,
                invite_link: "https://discord.gg/example".to_string(),
                enable_commands: true,
                link_role: None,
            },
            host: HostConfig::default(),
            whitelist: WhitelistConfig::default(),
            relay: RelayConfig::default(),
            filters: None,
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate_config(&make_valid_config()).is_ok());
    }

    #[test]
    fn test_empty_token_fails() {
        let mut config = make_valid_config();
        config.discord.token = String::new();

        let result = validate_config(&config);
        assert!(result.unwrap_err().to_string().contains("discord.token"));
    }

    #[test]
    fn test_zero_link_role_fails() {
        let mut config = make_valid_config();
        config.discord.link_role = Some(0);

        let result = validate_config(&config);
        assert!(result.unwrap_err().to_string().contains("discord.link_role"));
    }

    #[test]
    fn test_placeholder_token_fails() {
        let mut config = make_valid_config();
        config.discord.token = "YOUR_DISCORD_TOKEN_HERE".to_string();

        let result = validate_config(&config);
        assert!(result.unwrap_err().to_string().contains("placeholder"));
    }

    #[test]
    fn test_bad_bind_address_fails() {
        let mut config = make_valid_config();
        config.host.bind = "localhost".to_string();

        let result = validate_config(&config);
        assert!(result.unwrap_err().to_string().contains("host.bind"));
    }

    #[test]
    fn test_retry_delays_checked() {
        let mut config = make_valid_config();
        config.relay.retry.min_delay_ms = 10_000;

        let result = validate_config(&config);
        assert!(result.unwrap_err().to_string().contains("min_delay_ms"));
    }

    #[test]
    fn test_format_without_message_fails() {
        let mut config = make_valid_config();
        config.relay.formats.chat = "%user said something".to_string();

        let result = validate_config(&config);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("relay.formats.chat"));
    }

    #[test]
    fn test_invalid_regex_filter_fails() {
        let mut config = make_valid_config();
        config.filters = Some(FiltersConfig {
            enabled: true,
            patterns: Some(vec!["[invalid".to_string()]),
        });

        let result = validate_config(&config);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("not a valid regex"));
    }

    #[test]
    fn test_errors_are_collected() {
        let mut config = make_valid_config();
        config.discord.token = String::new();
        config.discord.channel = 0;

        let message = validate_config(&config).unwrap_err().to_string();
        assert!(message.contains("discord.token"));
        assert!(message.contains("discord.channel"));
    }
}
