//! JSON-lines frames exchanged with the game-side plugin.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::{Identity, LoginDecision};
use crate::config::types::Loader;
use crate::host::text::TextContent;

/// Longest line accepted from a plugin.
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Plugin -> service.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostFrame {
    Hello {
        loader: Loader,
    },
    LoginCheck {
        id: u64,
        uuid: Uuid,
        name: String,
        prior: bool,
    },
    LoginMessage {
        id: u64,
        uuid: Uuid,
        name: String,
    },
    Hook(HookCall),
    PlayerJoin {
        uuid: Uuid,
        name: String,
    },
    PlayerLeave {
        uuid: Uuid,
        name: String,
    },
}

/// One raw invocation of a broadcast hook, as the loader saw it.
#[derive(Debug, Clone, Deserialize)]
pub struct HookCall {
    pub hook: String,
    #[serde(default)]
    pub chat_type: Option<String>,
    pub content: TextContent,
    #[serde(default)]
    pub sender: Option<Identity>,
    #[serde(default)]
    pub stamp: Option<u64>,
    #[serde(default)]
    pub from_discord: bool,
}

impl HookCall {
    pub fn new(hook: impl Into<String>, content: impl Into<TextContent>) -> Self {
        Self {
            hook: hook.into(),
            chat_type: None,
            content: content.into(),
            sender: None,
            stamp: None,
            from_discord: false,
        }
    }

    pub fn with_chat_type(mut self, chat_type: impl Into<String>) -> Self {
        self.chat_type = Some(chat_type.into());
        self
    }

    pub fn with_sender(mut self, sender: Identity) -> Self {
        self.sender = Some(sender);
        self
    }

    pub fn with_stamp(mut self, stamp: u64) -> Self {
        self.stamp = Some(stamp);
        self
    }
}

/// Service -> plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServiceFrame {
    LoginDecision {
        id: u64,
        allowed: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    LoginText {
        id: u64,
        message: String,
    },
    DiscordMessage {
        author: String,
        content: String,
    },
    Error {
        message: String,
    },
}

impl ServiceFrame {
    pub fn decision(id: u64, decision: LoginDecision) -> Self {
        ServiceFrame::LoginDecision {
            id,
            allowed: decision.allowed,
            message: decision.reason.map(|r| r.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::DisplayMessage;

    #[test]
    fn test_parse_login_check() {
        let frame: HostFrame = serde_json::from_str(
            r#"{"type":"login_check","id":7,"uuid":"069a79f4-44e9-4726-a5be-fca90e38aaf5","name":"Notch","prior":false}"#,
        )
        .unwrap();
        match frame {
            HostFrame::LoginCheck { id, name, prior, .. } => {
                assert_eq!(id, 7);
                assert_eq!(name, "Notch");
                assert!(!prior);
            }
            other => panic!("unexpected frame {:?}", other),
        }
    }

    #[test]
    fn test_parse_hook_with_component() {
        let frame: HostFrame = serde_json::from_str(
            r#"{"type":"hook","hook":"broadcast_message","chat_type":"system","content":{"text":"Server restarting"},"stamp":99}"#,
        )
        .unwrap();
        let HostFrame::Hook(call) = frame else {
            panic!("expected hook frame");
        };
        assert_eq!(call.hook, "broadcast_message");
        assert_eq!(call.chat_type.as_deref(), Some("system"));
        assert_eq!(call.content.flatten(), "Server restarting");
        assert_eq!(call.stamp, Some(99));
        assert!(!call.from_discord);
        assert!(call.sender.is_none());
    }

    #[test]
    fn test_parse_hello() {
        let frame: HostFrame = serde_json::from_str(r#"{"type":"hello","loader":"neoforge"}"#).unwrap();
        assert!(matches!(frame, HostFrame::Hello { loader: Loader::NeoForge }));
    }

    #[test]
    fn test_unknown_type_is_error() {
        assert!(serde_json::from_str::<HostFrame>(r#"{"type":"teleport"}"#).is_err());
    }

    #[test]
    fn test_decision_frame_serialization() {
        let allow = ServiceFrame::decision(1, LoginDecision::allow());
        assert_eq!(
            serde_json::to_string(&allow).unwrap(),
            r#"{"type":"login_decision","id":1,"allowed":true}"#
        );

        let deny = ServiceFrame::decision(2, LoginDecision::deny(DisplayMessage::new("link first")));
        assert_eq!(
            serde_json::to_string(&deny).unwrap(),
            r#"{"type":"login_decision","id":2,"allowed":false,"message":"link first"}"#
        );
    }
}
