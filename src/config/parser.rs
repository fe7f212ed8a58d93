//! Configuration file parsing (HOCON format).

use std::path::Path;

use crate::common::error::ConfigError;
use crate::config::types::Config;
use hocon::HoconLoader;

/// Load configuration from a HOCON file.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();

    HoconLoader::new()
        .load_file(path)
        .map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
        })?
        .resolve()
        .map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })
}

/// Load configuration from a HOCON string.
pub fn load_config_str(content: &str) -> Result<Config, ConfigError> {
    HoconLoader::new()
        .load_str(content)
        .map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?
        .resolve()
        .map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::{Loader, PolicyMode};

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = load_config_str(
            r#"
            discord {
                token = "abc"
                channel = 1234
            }
            "#,
        )
        .unwrap();

        assert_eq!(config.discord.token, "abc");
        assert_eq!(config.discord.channel, 1234);
        assert!(config.discord.enable_commands);
        assert_eq!(config.discord.link_role, None);
        assert_eq!(config.host.bind, "127.0.0.1:25580");
        assert_eq!(config.whitelist.mode, PolicyMode::GrantOnly);
        assert_eq!(config.relay.dedup_window_ms, 500);
        assert!(config.filters.is_none());
    }

    #[test]
    fn test_full_config() {
        let config = load_config_str(
            r#"
            discord {
                token = "abc"
                channel = 42
                invite_link = "https://discord.gg/example"
                link_role = 777
            }
            host {
                bind = "0.0.0.0:4000"
                loader = "neoforge"
            }
            whitelist {
                mode = "override"
                lookup_timeout_ms = 100
            }
            relay {
                queue_capacity = 16
                retry {
                    max_attempts = 2
                }
                formats {
                    chat = "<%user> %message"
                }
            }
            filters {
                enabled = true
                patterns = ["spam"]
            }
            "#,
        )
        .unwrap();

        assert_eq!(config.discord.link_role, Some(777));
        assert_eq!(config.host.loader, Loader::NeoForge);
        assert_eq!(config.whitelist.mode, PolicyMode::Override);
        assert_eq!(config.whitelist.lookup_timeout_ms, 100);
        assert_eq!(config.relay.queue_capacity, 16);
        assert_eq!(config.relay.retry.max_attempts, 2);
        assert_eq!(config.relay.retry.min_delay_ms, 200);
        assert_eq!(config.relay.formats.chat, "<%user> %message");
        assert_eq!(config.relay.formats.system, "%message");
        assert_eq!(
            config.filters.unwrap().patterns,
            Some(vec!["spam".to_string()])
        );
    }

    #[test]
    fn test_missing_discord_section_fails() {
        assert!(load_config_str("host { bind = \"x\" }").is_err());
    }
}
