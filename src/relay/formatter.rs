//! Message formatting for display.
//!
//! Handles placeholder substitution in message format strings.
//! Supports placeholders: %time, %user, %name, %message, %kind

use chrono::Local;

use crate::common::{BroadcastKind, RelayMessage};
use crate::config::types::FormatsConfig;

/// Discord's hard limit on message length.
pub const DISCORD_MESSAGE_LIMIT: usize = 2000;

/// Message formatter that substitutes placeholders in format strings.
#[derive(Debug, Clone)]
pub struct MessageFormatter {
    format: String,
}

impl MessageFormatter {
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
        }
    }

    /// Format a message with the given context.
    ///
    /// - `%time` - Current time (HH:MM:SS)
    /// - `%user` - Display name of the sender
    /// - `%name` - Account name of the sender
    /// - `%message` - The actual message content
    /// - `%kind` - chat, system or command
    pub fn format(&self, ctx: &FormatContext) -> String {
        // %message last so placeholders typed by players stay literal.
        self.format
            .replace("%time", &get_time())
            .replace("%user", &ctx.user)
            .replace("%name", &ctx.name)
            .replace("%kind", &ctx.kind)
            .replace("%message", &ctx.message)
    }

    pub fn format_string(&self) -> &str {
        &self.format
    }
}

/// Context for message formatting.
#[derive(Debug, Clone, Default)]
pub struct FormatContext {
    pub user: String,
    pub name: String,
    pub message: String,
    pub kind: String,
}

impl FormatContext {
    pub fn new(user: impl Into<String>, message: impl Into<String>) -> Self {
        let user = user.into();
        Self {
            name: user.clone(),
            user,
            message: message.into(),
            kind: String::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_kind(mut self, kind: BroadcastKind) -> Self {
        self.kind = kind.name().to_string();
        self
    }
}

/// Per-kind formatters for game -> Discord traffic.
#[derive(Debug, Clone)]
pub struct RelayFormats {
    chat: MessageFormatter,
    system: MessageFormatter,
    command: MessageFormatter,
}

impl RelayFormats {
    pub fn from_config(config: &FormatsConfig) -> Self {
        Self {
            chat: MessageFormatter::new(&config.chat),
            system: MessageFormatter::new(&config.system),
            command: MessageFormatter::new(&config.command),
        }
    }

    /// Render a relay message as Discord markdown.
    pub fn render(&self, message: &RelayMessage) -> String {
        let content = escape_markdown(&message.content);
        let formatter = match message.kind {
            BroadcastKind::Chat => &self.chat,
            BroadcastKind::System => &self.system,
            BroadcastKind::Command => &self.command,
        };

        let ctx = match message.origin {
            Some(ref origin) => {
                let name = escape_markdown(&origin.name);
                FormatContext::new(name.clone(), content).with_name(name)
            }
            None => FormatContext::new("", content),
        };
        formatter.format(&ctx.with_kind(message.kind))
    }
}

impl Default for RelayFormats {
    fn default() -> Self {
        Self::from_config(&FormatsConfig::default())
    }
}

/// Escape underscores so Minecraft names don't turn into Discord italics.
pub fn escape_markdown(text: &str) -> String {
    text.replace('_', "\\_")
}

/// Get the current time as HH:MM:SS string.
fn get_time() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

/// Find the last UTF-8 char boundary at or before `byte_index` in `s`.
fn floor_char_boundary(s: &str, byte_index: usize) -> usize {
    if byte_index >= s.len() {
        return s.len();
    }
    let mut i = byte_index;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Split a message into chunks that fit within the max length (in bytes).
///
/// Tries to split on line or word boundaries when possible. Never splits in
/// the middle of a multi-byte UTF-8 character.
pub fn split_message(message: &str, max_len: usize) -> Vec<String> {
    if message.len() <= max_len {
        return vec![message.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = message;

    while !remaining.is_empty() {
        remaining = remaining.trim_start();
        if remaining.is_empty() {
            break;
        }

        if remaining.len() <= max_len {
            chunks.push(remaining.to_string());
            break;
        }

        let split_at = floor_char_boundary(remaining, max_len);

        // Force at least one character so a tiny limit cannot loop forever.
        if split_at == 0 {
            let first_char_end = remaining
                .char_indices()
                .nth(1)
                .map(|(i, _)| i)
                .unwrap_or(remaining.len());
            chunks.push(remaining[..first_char_end].to_string());
            remaining = &remaining[first_char_end..];
            continue;
        }

        let chunk = &remaining[..split_at];

        if let Some(idx) = chunk.rfind('\n').or_else(|| chunk.rfind(' ')) {
            chunks.push(remaining[..idx].to_string());
            remaining = &remaining[idx + 1..];
        } else {
            chunks.push(chunk.to_string());
            remaining = &remaining[split_at..];
        }
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Identity;

    #[test]
    fn test_basic_format() {
        let formatter = MessageFormatter::new("<%user> %message");
        let ctx = FormatContext::new("Steve", "Hello world!");
        assert_eq!(formatter.format(&ctx), "<Steve> Hello world!");
    }

    #[test]
    fn test_player_placeholders_stay_literal() {
        let formatter = MessageFormatter::new("%user: %message");
        let ctx = FormatContext::new("Steve", "my %user and %time");
        assert_eq!(formatter.format(&ctx), "Steve: my %user and %time");
    }

    #[test]
    fn test_format_with_time() {
        let formatter = MessageFormatter::new("[%time] %user: %message");
        let result = formatter.format(&FormatContext::new("Steve", "Test"));
        assert!(result.contains("Steve: Test"));
        assert!(result.starts_with('['));
    }

    #[test]
    fn test_render_chat_escapes_names() {
        let formats = RelayFormats::default();
        let message = RelayMessage {
            kind: BroadcastKind::Chat,
            content: "snake_case rules".to_string(),
            origin: Some(Identity::new(uuid::Uuid::nil(), "cool_guy")),
        };
        assert_eq!(formats.render(&message), "**cool\\_guy**: snake\\_case rules");
    }

    #[test]
    fn test_render_system_has_no_user() {
        let formats = RelayFormats::default();
        let message = RelayMessage {
            kind: BroadcastKind::System,
            content: "Server restarting".to_string(),
            origin: None,
        };
        assert_eq!(formats.render(&message), "Server restarting");
    }

    #[test]
    fn test_render_uses_kind_specific_format() {
        let config = FormatsConfig {
            command: "> %message (%kind)".to_string(),
            ..FormatsConfig::default()
        };
        let formats = RelayFormats::from_config(&config);
        let message = RelayMessage {
            kind: BroadcastKind::Command,
            content: "[Server] hello".to_string(),
            origin: None,
        };
        assert_eq!(formats.render(&message), "> [Server] hello (command)");
    }

    #[test]
    fn test_split_message_short() {
        assert_eq!(split_message("Hello world", 50), vec!["Hello world"]);
    }

    #[test]
    fn test_split_message_on_space() {
        let chunks = split_message("Hello beautiful world", 15);
        assert_eq!(chunks, vec!["Hello", "beautiful world"]);
    }

    #[test]
    fn test_split_message_prefers_newline() {
        let chunks = split_message("line one\nline two words", 16);
        assert_eq!(chunks, vec!["line one", "line two words"]);
    }

    #[test]
    fn test_split_message_no_space() {
        let chunks = split_message("HelloBeautifulWorld", 10);
        assert_eq!(chunks, vec!["HelloBeaut", "ifulWorld"]);
    }

    #[test]
    fn test_split_message_multibyte_utf8() {
        let chunks = split_message("caf\u{e9} rest", 4);
        assert_eq!(chunks, vec!["caf", "\u{e9}", "rest"]);
    }
}
