//! Mention and emoji resolution for Discord -> game messages.
//!
//! The game renders neither Discord's `<@id>` markup nor most emoji, so
//! both are turned into readable text before a message is sent in.

use fancy_regex::Regex;
use serenity::cache::Cache;
use serenity::model::id::{ChannelId, RoleId, UserId};

#[derive(Debug, Clone)]
pub struct MessageResolver {
    /// `<@123>` or `<@!123>`.
    mention_pattern: Regex,
    /// `<#123>`.
    channel_pattern: Regex,
    /// `<@&123>`.
    role_pattern: Regex,
    /// `<:name:id>` or `<a:name:id>`.
    emoji_pattern: Regex,
}

impl Default for MessageResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageResolver {
    pub fn new() -> Self {
        Self {
            mention_pattern: Regex::new(r"<@!?(\d+)>").expect("static mention pattern"),
            channel_pattern: Regex::new(r"<#(\d+)>").expect("static channel pattern"),
            role_pattern: Regex::new(r"<@&(\d+)>").expect("static role pattern"),
            emoji_pattern: Regex::new(r"<a?:([a-zA-Z0-9_]+):\d+>").expect("static emoji pattern"),
        }
    }

    /// `<@123456789>` -> `@username`, left untouched when the user is not cached.
    pub fn resolve_mentions_to_text(&self, message: &str, cache: &Cache) -> String {
        self.mention_pattern
            .replace_all(message, |caps: &fancy_regex::Captures| -> String {
                if let Some(user_id) = parse_id(&caps[1]) {
                    if let Some(user) = cache.user(UserId::new(user_id)) {
                        return format!("@{}", user.name);
                    }
                }
                caps[0].to_string()
            })
            .to_string()
    }

    pub fn resolve_channel_mentions(&self, message: &str, cache: &Cache) -> String {
        self.channel_pattern
            .replace_all(message, |caps: &fancy_regex::Captures| -> String {
                if let Some(channel_id) = parse_id(&caps[1]) {
                    let channel_id = ChannelId::new(channel_id);
                    for guild_id in cache.guilds() {
                        if let Some(guild) = cache.guild(guild_id) {
                            if let Some(channel) = guild.channels.get(&channel_id) {
                                return format!("#{}", channel.name);
                            }
                        }
                    }
                }
                caps[0].to_string()
            })
            .to_string()
    }

    pub fn resolve_role_mentions(&self, message: &str, cache: &Cache) -> String {
        self.role_pattern
            .replace_all(message, |caps: &fancy_regex::Captures| -> String {
                if let Some(role_id) = parse_id(&caps[1]) {
                    for guild_id in cache.guilds() {
                        if let Some(guild) = cache.guild(guild_id) {
                            if let Some(role) = guild.roles.get(&RoleId::new(role_id)) {
                                return format!("@{}", role.name);
                            }
                        }
                    }
                }
                caps[0].to_string()
            })
            .to_string()
    }

    pub fn resolve_custom_emojis_to_text(&self, message: &str) -> String {
        self.emoji_pattern.replace_all(message, ":$1:").to_string()
    }

    /// Unicode emoji -> `:shortcode:`, or `:name:` when there is no shortcode.
    pub fn resolve_unicode_emojis_to_text(&self, message: &str) -> String {
        let mut result = String::with_capacity(message.len() * 2);
        let mut chars = message.chars().peekable();

        while let Some(ch) = chars.next() {
            if ch.is_ascii() {
                result.push(ch);
                continue;
            }

            if let Some(emoji) = emojis::get(ch.encode_utf8(&mut [0; 4])) {
                push_alias(&mut result, emoji);
                continue;
            }

            // Two-codepoint emoji (variation selectors, skin tones).
            let mut grapheme = ch.to_string();
            if let Some(&next) = chars.peek() {
                if !next.is_ascii() {
                    grapheme.push(next);
                    if let Some(emoji) = emojis::get(grapheme.as_str()) {
                        chars.next();
                        push_alias(&mut result, emoji);
                        continue;
                    }
                    grapheme.pop();
                }
            }
            result.push_str(&grapheme);
        }

        result
    }

    /// Everything a Discord message needs before it is shown in game.
    pub fn process_discord_to_game(&self, message: &str, cache: &Cache) -> String {
        let text = self.resolve_unicode_emojis_to_text(message);
        let text = self.resolve_mentions_to_text(&text, cache);
        let text = self.resolve_channel_mentions(&text, cache);
        let text = self.resolve_role_mentions(&text, cache);
        self.resolve_custom_emojis_to_text(&text)
    }
}

/// Snowflake from mention digits. Zero is not a valid id and the id
/// constructors panic on it.
fn parse_id(digits: &str) -> Option<u64> {
    digits.parse::<u64>().ok().filter(|id| *id != 0)
}

fn push_alias(out: &mut String, emoji: &emojis::Emoji) {
    out.push(':');
    out.push_str(emoji.shortcode().unwrap_or_else(|| emoji.name()));
    out.push(':');
}
