//! Discord message event handling.
//!
//! Messages in the bridge channel become [`InboundMessage`]s for every
//! connected host plugin; `!` commands are answered in place. Members who
//! leave the guild lose their link, and with it their whitelist access.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serenity::async_trait;
use serenity::gateway::ActivityData;
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::model::guild::Member;
use serenity::model::id::{ChannelId, GuildId};
use serenity::model::user::User;
use serenity::prelude::*;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::common::{DiscordId, InboundMessage};
use crate::discord::commands::CommandHandler;
use crate::discord::resolver::MessageResolver;
use crate::host::OnlinePlayers;
use crate::relay::{FilterDirection, MessageFilter, MessageFormatter};
use crate::relay::formatter::FormatContext;
use crate::whitelist::{Link, LinkStore};

const PRESENCE_INTERVAL: Duration = Duration::from_secs(30);

pub struct BridgeHandler {
    channel: ChannelId,
    inbound_tx: broadcast::Sender<InboundMessage>,
    filter: MessageFilter,
    resolver: MessageResolver,
    format: MessageFormatter,
    commands: Option<CommandHandler>,
    players: Arc<OnlinePlayers>,
    store: Arc<LinkStore>,
    presence_started: AtomicBool,
}

impl BridgeHandler {
    pub fn new(
        channel: ChannelId,
        inbound_tx: broadcast::Sender<InboundMessage>,
        filter: MessageFilter,
        format: MessageFormatter,
        commands: Option<CommandHandler>,
        players: Arc<OnlinePlayers>,
        store: Arc<LinkStore>,
    ) -> Self {
        Self {
            channel,
            inbound_tx,
            filter,
            resolver: MessageResolver::new(),
            format,
            commands,
            players,
            store,
            presence_started: AtomicBool::new(false),
        }
    }

    /// Format a resolved Discord message for the game, or `None` if filtered.
    pub fn to_inbound(&self, author: &str, content: &str) -> Option<InboundMessage> {
        if self.filter.should_filter(FilterDirection::DiscordToHost, content) {
            info!("FILTERED Discord -> game: {}", content);
            return None;
        }
        let formatted = self.format.format(&FormatContext::new(author, content));
        Some(InboundMessage {
            author: author.to_string(),
            content: formatted,
        })
    }

    /// Drop the link of a user who left the guild.
    pub async fn forget_member(&self, discord_id: DiscordId) -> Option<Link> {
        match self.store.unlink(discord_id).await {
            Ok(Some(link)) => {
                info!(discord_id, "Member left, unlinked {}", link.name);
                Some(link)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(discord_id, "Failed to unlink departed member: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl EventHandler for BridgeHandler {
    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot || msg.channel_id != self.channel {
            return;
        }

        let content = msg.content.trim();
        if content.is_empty() && msg.attachments.is_empty() {
            return;
        }

        if content.starts_with('!') {
            if let Some(ref commands) = self.commands {
                match commands.handle_command(&ctx, &msg, content).await {
                    Ok(true) => return,
                    Ok(false) => {}
                    Err(e) => {
                        error!("Command handler error: {}", e);
                        return;
                    }
                }
            }
        }

        let author = msg
            .member
            .as_ref()
            .and_then(|m| m.nick.clone())
            .or_else(|| msg.author.global_name.clone())
            .unwrap_or_else(|| msg.author.name.clone());

        let mut full_content = content.to_string();
        for attachment in &msg.attachments {
            if !full_content.is_empty() {
                full_content.push(' ');
            }
            full_content.push_str(&attachment.url);
        }

        let processed = self.resolver.process_discord_to_game(&full_content, &ctx.cache);
        let Some(inbound) = self.to_inbound(&author, &processed) else {
            return;
        };

        info!("Discord -> game: {}", inbound.content);
        if self.inbound_tx.send(inbound).is_err() {
            debug!("No host plugin connected, Discord message not delivered");
        }
    }

    async fn guild_member_removal(
        &self,
        _ctx: Context,
        _guild_id: GuildId,
        user: User,
        _member: Option<Member>,
    ) {
        self.forget_member(user.id.get()).await;
    }

    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("Discord bot connected as {}", ready.user.name);

        if self.presence_started.swap(true, Ordering::SeqCst) {
            return;
        }

        let players = self.players.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(PRESENCE_INTERVAL);
            let mut last = None;
            loop {
                interval.tick().await;
                let count = players.count().await;
                if last == Some(count) {
                    continue;
                }
                last = Some(count);
                ctx.set_activity(Some(ActivityData::watching(presence_text(count))));
            }
        });
    }
}

fn presence_text(count: usize) -> String {
    match count {
        0 => "an empty server".to_string(),
        1 => "1 player".to_string(),
        n => format!("{} players", n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{AllowState, Identity};
    use crate::whitelist::{WhitelistAuthority, WhitelistTemplate};
    use uuid::Uuid;

    async fn store(dir: &tempfile::TempDir) -> Arc<LinkStore> {
        Arc::new(
            LinkStore::load(dir.path().join("links.json"), WhitelistTemplate::default(), "")
                .await
                .unwrap(),
        )
    }

    fn handler(
        filter: MessageFilter,
        store: Arc<LinkStore>,
    ) -> (BridgeHandler, broadcast::Receiver<InboundMessage>) {
        let (tx, rx) = broadcast::channel(8);
        let handler = BridgeHandler::new(
            ChannelId::new(1),
            tx,
            filter,
            MessageFormatter::new("[Discord] %user: %message"),
            None,
            Arc::new(OnlinePlayers::new()),
            store,
        );
        (handler, rx)
    }

    #[tokio::test]
    async fn test_to_inbound_formats() {
        let dir = tempfile::tempdir().unwrap();
        let (handler, _rx) = handler(MessageFilter::empty(), store(&dir).await);
        let inbound = handler.to_inbound("Alex", "hello :tada:").unwrap();
        assert_eq!(inbound.author, "Alex");
        assert_eq!(inbound.content, "[Discord] Alex: hello :tada:");
    }

    #[tokio::test]
    async fn test_to_inbound_filtered() {
        let dir = tempfile::tempdir().unwrap();
        let (handler, _rx) = handler(
            MessageFilter::new(None, Some(vec!["(?i)badword".to_string()])),
            store(&dir).await,
        );
        assert!(handler.to_inbound("Alex", "BadWord here").is_none());
    }

    #[tokio::test]
    async fn test_member_leaving_guild_is_unlinked() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir).await;
        let (handler, _rx) = handler(MessageFilter::empty(), store.clone());
        let steve = Identity::new(Uuid::new_v4(), "Steve");
        let code = store.code_for(&steve);
        store.link(600, code).await.unwrap();

        let removed = handler.forget_member(600).await;
        assert_eq!(removed.map(|l| l.name), Some("Steve".to_string()));
        assert_eq!(
            store.lookup(&steve).await.unwrap(),
            Some(AllowState::Denied)
        );
        assert!(handler.forget_member(600).await.is_none());
    }

    #[test]
    fn test_presence_text() {
        assert_eq!(presence_text(0), "an empty server");
        assert_eq!(presence_text(1), "1 player");
        assert_eq!(presence_text(7), "7 players");
    }
}
