//! Kick-screen message template.
//!
//! Supports placeholders: {{USER}}, {{CODE}}, {{DISCORD}}

use crate::common::DisplayMessage;

/// Template used when a template is not configured.
pub const DEFAULT_TEMPLATE: &str = "Hello {{USER}}, you're not whitelisted yet.

To whitelist yourself, join the discord:
{{DISCORD}}

and run the !link command with the following code:

{{CODE}}";

/// Renders the message shown to players who still have to link.
#[derive(Debug, Clone)]
pub struct WhitelistTemplate {
    template: String,
}

impl WhitelistTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Substitute the placeholders.
    ///
    /// `{{DISCORD}}` is dropped when no invite link is configured.
    pub fn render(&self, user: &str, code: Option<u32>, invite_link: &str) -> DisplayMessage {
        let code = code.map(|c| c.to_string()).unwrap_or_default();
        let text = self
            .template
            .replace("{{USER}}", user)
            .replace("{{CODE}}", &code)
            .replace("{{DISCORD}}", invite_link);
        DisplayMessage::new(text)
    }
}

impl Default for WhitelistTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPLATE)
    }
}
