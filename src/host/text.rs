//! Minecraft text components.
//!
//! Plugins send message content either as a plain string or as the JSON
//! form of a chat component. Only the text survives; styling, hover and
//! click events are dropped.

use serde::Deserialize;

/// Translation key vanilla uses for `<player> message` chat lines.
pub const CHAT_TRANSLATION_KEY: &str = "chat.type.text";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TextContent {
    Plain(String),
    Component(TextComponent),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TextComponent {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub translate: Option<String>,
    #[serde(default)]
    pub with: Vec<TextContent>,
    #[serde(default)]
    pub extra: Vec<TextContent>,
}

impl TextContent {
    /// Flatten into the text a player would see.
    pub fn flatten(&self) -> String {
        let mut out = String::new();
        self.write_to(&mut out);
        out
    }

    /// The bare message of a `chat.type.text` component, the whole text otherwise.
    pub fn chat_body(&self) -> String {
        match self {
            TextContent::Component(c) if c.translate.as_deref() == Some(CHAT_TRANSLATION_KEY) => c
                .with
                .get(1)
                .map(TextContent::flatten)
                .unwrap_or_else(|| self.flatten()),
            _ => self.flatten(),
        }
    }

    fn write_to(&self, out: &mut String) {
        match self {
            TextContent::Plain(s) => out.push_str(s),
            TextContent::Component(c) => c.write_to(out),
        }
    }
}

impl From<&str> for TextContent {
    fn from(s: &str) -> Self {
        TextContent::Plain(s.to_string())
    }
}

impl TextComponent {
    fn write_to(&self, out: &mut String) {
        if let Some(ref text) = self.text {
            out.push_str(text);
        }
        if let Some(ref key) = self.translate {
            let args: Vec<String> = self.with.iter().map(TextContent::flatten).collect();
            out.push_str(&translate(key, &args));
        }
        for child in &self.extra {
            child.write_to(out);
        }
    }
}

/// English rendering of the translation keys that show up in broadcasts.
fn translate(key: &str, args: &[String]) -> String {
    let pattern = match key {
        CHAT_TRANSLATION_KEY => "<%s> %s",
        "chat.type.announcement" => "[%s] %s",
        "chat.type.emote" => "* %s %s",
        "multiplayer.player.joined" => "%s joined the game",
        "multiplayer.player.joined.renamed" => "%s (formerly known as %s) joined the game",
        "multiplayer.player.left" => "%s left the game",
        _ => {
            if args.is_empty() {
                return key.to_string();
            }
            return format!("{} {}", key, args.join(" "));
        }
    };

    let mut args = args.iter();
    let mut out = String::with_capacity(pattern.len());
    let mut parts = pattern.split("%s").peekable();
    while let Some(part) = parts.next() {
        out.push_str(part);
        if parts.peek().is_some() {
            if let Some(arg) = args.next() {
                out.push_str(arg);
            }
        }
    }
    out
}
