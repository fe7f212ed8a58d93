//! Per-loader translation of raw hook calls.
//!
//! Each loader intercepts broadcasts at different places and with
//! different argument shapes. The adapter turns whatever its loader
//! reports into at most one [`BroadcastEvent`].

use tracing::{debug, warn};

use crate::common::{BroadcastEvent, BroadcastKind, BroadcastSource};
use crate::config::types::Loader;
use crate::host::wire::HookCall;

/// `PlayerList.broadcastMessage(Component, ChatType, UUID)`.
pub const HOOK_BROADCAST: &str = "broadcast_message";
/// `PlayerList.broadcastMessage(Component, Function, ChatType, UUID)`.
pub const HOOK_BROADCAST_FILTERED: &str = "broadcast_message_filtered";
/// Packet listener after a chat line was broadcast.
pub const HOOK_HANDLE_CHAT: &str = "handle_chat";
/// Loader chat event.
pub const HOOK_SERVER_CHAT: &str = "server_chat";
/// `PlayerList.broadcastSystemMessage`.
pub const HOOK_SYSTEM_MESSAGE: &str = "broadcast_system_message";
/// `PlayerList.broadcastChatMessage` with a command source.
pub const HOOK_CHAT_MESSAGE: &str = "broadcast_chat_message";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostAdapter {
    loader: Loader,
}

impl HostAdapter {
    pub fn new(loader: Loader) -> Self {
        Self { loader }
    }

    pub fn loader(&self) -> Loader {
        self.loader
    }

    /// Translate a hook call; `None` when this loader ignores it.
    pub fn translate(&self, call: HookCall) -> Option<BroadcastEvent> {
        let event = match self.loader {
            Loader::Vanilla => None,
            Loader::Fabric => fabric(&call),
            Loader::Forge => forge(&call),
            Loader::NeoForge => neoforge(&call),
        };

        match event {
            Some(event) => Some(
                event
                    .with_stamp(call.stamp)
                    .with_from_discord(call.from_discord),
            ),
            None => {
                debug!(loader = ?self.loader, hook = %call.hook, "Hook ignored");
                None
            }
        }
    }
}

fn fabric(call: &HookCall) -> Option<BroadcastEvent> {
    let source = match call.hook.as_str() {
        HOOK_BROADCAST => BroadcastSource::LegacyBroadcast,
        HOOK_BROADCAST_FILTERED => BroadcastSource::FilteredBroadcast,
        HOOK_HANDLE_CHAT => {
            return Some(
                BroadcastEvent::new(BroadcastKind::Chat, call.content.chat_body(), BroadcastSource::ChatPacket)
                    .with_origin(call.sender.clone()),
            )
        }
        other => return unknown_hook(Loader::Fabric, other),
    };

    let kind = chat_kind(call);
    let content = match kind {
        BroadcastKind::Chat => call.content.chat_body(),
        _ => call.content.flatten(),
    };
    let origin = match kind {
        BroadcastKind::Chat => call.sender.clone(),
        _ => None,
    };
    Some(BroadcastEvent::new(kind, content, source).with_origin(origin))
}

fn forge(call: &HookCall) -> Option<BroadcastEvent> {
    match call.hook.as_str() {
        HOOK_BROADCAST | HOOK_BROADCAST_FILTERED => {
            let source = if call.hook == HOOK_BROADCAST {
                BroadcastSource::LegacyBroadcast
            } else {
                BroadcastSource::FilteredBroadcast
            };
            // Chat reaches Forge through ServerChatEvent instead.
            (chat_kind(call) == BroadcastKind::System)
                .then(|| BroadcastEvent::system(call.content.flatten(), source))
        }
        HOOK_SERVER_CHAT => Some(chat_event(call)),
        other => unknown_hook(Loader::Forge, other),
    }
}

fn neoforge(call: &HookCall) -> Option<BroadcastEvent> {
    match call.hook.as_str() {
        HOOK_SYSTEM_MESSAGE => Some(BroadcastEvent::system(
            call.content.flatten(),
            BroadcastSource::SystemBroadcast,
        )),
        HOOK_CHAT_MESSAGE => Some(BroadcastEvent::new(
            BroadcastKind::Command,
            call.content.flatten(),
            BroadcastSource::ChatBroadcast,
        )),
        HOOK_SERVER_CHAT => Some(chat_event(call)),
        other => unknown_hook(Loader::NeoForge, other),
    }
}

fn chat_event(call: &HookCall) -> BroadcastEvent {
    BroadcastEvent::new(BroadcastKind::Chat, call.content.chat_body(), BroadcastSource::ChatEvent)
        .with_origin(call.sender.clone())
}

fn chat_kind(call: &HookCall) -> BroadcastKind {
    match call.chat_type {
        Some(ref chat_type) => BroadcastKind::from_wire(chat_type),
        None => BroadcastKind::System,
    }
}

fn unknown_hook(loader: Loader, hook: &str) -> Option<BroadcastEvent> {
    warn!(?loader, hook, "Unknown hook name");
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Identity;
    use crate::host::text::TextContent;
    use uuid::Uuid;

    fn steve() -> Identity {
        Identity::new(Uuid::new_v4(), "Steve")
    }

    fn chat_component() -> TextContent {
        serde_json::from_str(r#"{"translate":"chat.type.text","with":["Steve","hi all"]}"#).unwrap()
    }

    #[test]
    fn test_fabric_chat_broadcast_unwraps_and_keeps_sender() {
        let adapter = HostAdapter::new(Loader::Fabric);
        let call = HookCall::new(HOOK_BROADCAST_FILTERED, chat_component())
            .with_chat_type("chat")
            .with_sender(steve());

        let event = adapter.translate(call).unwrap();
        assert_eq!(event.kind, BroadcastKind::Chat);
        assert_eq!(event.content, "hi all");
        assert_eq!(event.origin.map(|o| o.name), Some("Steve".to_string()));
        assert_eq!(event.source, BroadcastSource::FilteredBroadcast);
    }

    #[test]
    fn test_fabric_system_broadcast_has_no_origin() {
        let adapter = HostAdapter::new(Loader::Fabric);
        let call = HookCall::new(HOOK_BROADCAST, "Server restarting")
            .with_chat_type("system")
            .with_sender(steve())
            .with_stamp(5);

        let event = adapter.translate(call).unwrap();
        assert_eq!(event.kind, BroadcastKind::System);
        assert!(event.origin.is_none());
        assert_eq!(event.stamp, Some(5));
    }

    #[test]
    fn test_fabric_handle_chat_is_chat_packet() {
        let adapter = HostAdapter::new(Loader::Fabric);
        let call = HookCall::new(HOOK_HANDLE_CHAT, "raw text").with_sender(steve());

        let event = adapter.translate(call).unwrap();
        assert_eq!(event.kind, BroadcastKind::Chat);
        assert_eq!(event.source, BroadcastSource::ChatPacket);
        assert_eq!(event.content, "raw text");
    }

    #[test]
    fn test_unknown_chat_type_is_system() {
        let adapter = HostAdapter::new(Loader::Fabric);
        let call = HookCall::new(HOOK_BROADCAST, "ding").with_chat_type("game_overlay");
        assert_eq!(adapter.translate(call).unwrap().kind, BroadcastKind::System);
    }

    #[test]
    fn test_forge_ignores_chat_broadcasts() {
        let adapter = HostAdapter::new(Loader::Forge);
        let chat = HookCall::new(HOOK_BROADCAST, chat_component())
            .with_chat_type("chat")
            .with_sender(steve());
        assert!(adapter.translate(chat).is_none());

        let system = HookCall::new(HOOK_BROADCAST_FILTERED, "Alex joined the game").with_chat_type("system");
        let event = adapter.translate(system).unwrap();
        assert_eq!(event.kind, BroadcastKind::System);
        assert_eq!(event.source, BroadcastSource::FilteredBroadcast);
    }

    #[test]
    fn test_forge_server_chat() {
        let adapter = HostAdapter::new(Loader::Forge);
        let call = HookCall::new(HOOK_SERVER_CHAT, "hello").with_sender(steve());
        let event = adapter.translate(call).unwrap();
        assert_eq!(event.kind, BroadcastKind::Chat);
        assert_eq!(event.source, BroadcastSource::ChatEvent);
        assert!(event.origin.is_some());
    }

    #[test]
    fn test_neoforge_hooks() {
        let adapter = HostAdapter::new(Loader::NeoForge);

        let system = adapter
            .translate(HookCall::new(HOOK_SYSTEM_MESSAGE, "Steve fell from a high place"))
            .unwrap();
        assert_eq!(system.kind, BroadcastKind::System);

        let command = adapter
            .translate(HookCall::new(HOOK_CHAT_MESSAGE, "[Server] restart in 5").with_sender(steve()))
            .unwrap();
        assert_eq!(command.kind, BroadcastKind::Command);
        assert!(command.origin.is_none());
    }

    #[test]
    fn test_vanilla_ignores_broadcasts() {
        let adapter = HostAdapter::new(Loader::Vanilla);
        let call = HookCall::new(HOOK_BROADCAST, "hi").with_chat_type("system");
        assert!(adapter.translate(call).is_none());
    }

    #[test]
    fn test_unknown_hook_ignored() {
        let adapter = HostAdapter::new(Loader::NeoForge);
        assert!(adapter.translate(HookCall::new(HOOK_BROADCAST, "hi")).is_none());
    }

    #[test]
    fn test_from_discord_flag_carried() {
        let adapter = HostAdapter::new(Loader::NeoForge);
        let mut call = HookCall::new(HOOK_SYSTEM_MESSAGE, "[Discord] Alex: hi");
        call.from_discord = true;
        assert!(adapter.translate(call).unwrap().from_discord);
    }
}
