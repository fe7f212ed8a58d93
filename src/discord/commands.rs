//! Discord text commands (!link, !unlink, !linkcheck, !online, !help).

use std::sync::Arc;

use serenity::model::channel::Message;
use serenity::model::id::{RoleId, UserId};
use serenity::model::permissions::Permissions;
use serenity::prelude::*;
use tracing::{debug, info, warn};

use crate::common::error::StoreError;
use crate::common::DiscordId;
use crate::host::OnlinePlayers;
use crate::whitelist::LinkStore;

const HELP_TEXT: &str = r#"**Available Commands:**
• `!link <code>` - Link your Minecraft account using the code from the join screen
• `!unlink` - Remove your link
• `!unlink <@user|name>` - Remove someone else's link (moderators)
• `!linkcheck <@user|name>` - Show who a Discord user or Minecraft name is linked to
• `!online` - List players on the server
• `!help` - Show this help message"#;

/// A parsed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    Link { code: Option<u32> },
    Unlink { target: Option<LinkTarget> },
    LinkCheck { target: Option<LinkTarget> },
    Online,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    Discord(DiscordId),
    Minecraft(String),
}

impl BotCommand {
    /// Parse a `!command args` line. Returns `None` for anything that is not ours.
    pub fn parse(content: &str) -> Option<Self> {
        if content.len() > 100 {
            return None;
        }
        let rest = content.strip_prefix('!')?;
        let mut parts = rest.splitn(2, ' ');
        let command = parts.next()?.to_lowercase();
        let args = parts.next().map(str::trim).filter(|a| !a.is_empty());

        match command.as_str() {
            "link" => Some(BotCommand::Link {
                code: args.and_then(|a| a.parse().ok()),
            }),
            "unlink" => Some(BotCommand::Unlink {
                target: args.map(LinkTarget::parse),
            }),
            "linkcheck" => Some(BotCommand::LinkCheck {
                target: args.map(LinkTarget::parse),
            }),
            "online" | "list" => Some(BotCommand::Online),
            "help" => Some(BotCommand::Help),
            _ => None,
        }
    }
}

impl LinkTarget {
    fn parse(arg: &str) -> Self {
        let id = arg
            .strip_prefix("<@")
            .and_then(|s| s.strip_suffix('>'))
            .map(|s| s.trim_start_matches('!'))
            .unwrap_or(arg);
        match id.parse::<DiscordId>() {
            Ok(id) if id > 99_999 => LinkTarget::Discord(id),
            _ => LinkTarget::Minecraft(arg.to_string()),
        }
    }
}

/// Who issued a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Invoker {
    pub id: DiscordId,
    /// Holds Moderate Members (or Administrator) in the guild.
    pub moderator: bool,
}

impl Invoker {
    pub fn member(id: DiscordId) -> Self {
        Self {
            id,
            moderator: false,
        }
    }

    pub fn moderator(id: DiscordId) -> Self {
        Self { id, moderator: true }
    }
}

/// A role to add to a member after the reply is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleGrant {
    pub user: DiscordId,
    pub role: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReply {
    pub text: String,
    pub grant: Option<RoleGrant>,
}

impl From<String> for CommandReply {
    fn from(text: String) -> Self {
        Self { text, grant: None }
    }
}

impl From<&str> for CommandReply {
    fn from(text: &str) -> Self {
        text.to_string().into()
    }
}

pub struct CommandHandler {
    store: Arc<LinkStore>,
    players: Arc<OnlinePlayers>,
    link_role: Option<u64>,
}

impl CommandHandler {
    pub fn new(store: Arc<LinkStore>, players: Arc<OnlinePlayers>, link_role: Option<u64>) -> Self {
        Self {
            store,
            players,
            link_role: link_role.filter(|role| *role != 0),
        }
    }

    /// Parse and execute a command from Discord.
    ///
    /// Returns `true` if the message was a command, `false` otherwise.
    pub async fn handle_command(
        &self,
        ctx: &Context,
        msg: &Message,
        content: &str,
    ) -> anyhow::Result<bool> {
        let Some(command) = BotCommand::parse(content) else {
            return Ok(false);
        };

        debug!("Processing command {:?} from {}", command, msg.author.name);
        let moderator = msg.author_permissions(ctx).is_some_and(|p| {
            p.contains(Permissions::MODERATE_MEMBERS) || p.contains(Permissions::ADMINISTRATOR)
        });
        let invoker = Invoker {
            id: msg.author.id.get(),
            moderator,
        };

        let reply = self.execute(command, invoker).await;
        msg.channel_id.say(&ctx.http, reply.text).await?;

        if let (Some(grant), Some(guild_id)) = (reply.grant, msg.guild_id) {
            if let Err(e) = ctx
                .http
                .add_member_role(
                    guild_id,
                    UserId::new(grant.user),
                    RoleId::new(grant.role),
                    Some("Linked a Minecraft account"),
                )
                .await
            {
                warn!(discord_id = grant.user, "Failed to grant link role {}: {}", grant.role, e);
            }
        }
        Ok(true)
    }

    /// Run a command for `invoker` and produce the reply.
    pub async fn execute(&self, command: BotCommand, invoker: Invoker) -> CommandReply {
        match command {
            BotCommand::Link { code: None } => {
                "Usage: `!link <code>`. You get the code when joining the server.".into()
            }
            BotCommand::Link { code: Some(code) } => self.link(invoker.id, code).await,
            BotCommand::Unlink { target: None } => self.unlink(invoker.id).await.into(),
            BotCommand::Unlink { target: Some(target) } => {
                self.unlink_other(invoker, target).await.into()
            }
            BotCommand::LinkCheck { target: None } => {
                "Usage: `!linkcheck <@user|minecraft name>`".into()
            }
            BotCommand::LinkCheck { target: Some(target) } => self.link_check(target).await.into(),
            BotCommand::Online => self.online().await.into(),
            BotCommand::Help => HELP_TEXT.into(),
        }
    }

    async fn link(&self, author: DiscordId, code: u32) -> CommandReply {
        let text = match self.store.link(author, code).await {
            Ok(link) => {
                info!(discord_id = author, "!link succeeded for {}", link.name);
                return CommandReply {
                    text: format!(
                        "Linked <@{}> to Minecraft account **{}**. You can join the server now.",
                        author, link.name
                    ),
                    grant: self.link_role.map(|role| RoleGrant { user: author, role }),
                };
            }
            Err(StoreError::UnknownCode { .. }) => {
                "That code doesn't belong to any Minecraft account. Join the server to get a fresh one.".to_string()
            }
            Err(StoreError::MinecraftTaken { name }) => {
                format!("Minecraft account **{}** is already linked to someone.", name)
            }
            Err(StoreError::DiscordTaken { .. }) => {
                "Your Discord account is already linked. Use `!unlink` first.".to_string()
            }
            Err(e) => {
                warn!(discord_id = author, "!link failed: {}", e);
                format!("Something went wrong while linking: {}", e)
            }
        };
        text.into()
    }

    async fn unlink(&self, author: DiscordId) -> String {
        match self.store.unlink(author).await {
            Ok(Some(link)) => format!("Unlinked <@{}> from **{}**.", author, link.name),
            Ok(None) => "You don't have a linked Minecraft account.".to_string(),
            Err(e) => {
                warn!(discord_id = author, "!unlink failed: {}", e);
                format!("Something went wrong while unlinking: {}", e)
            }
        }
    }

    /// `!unlink <target>`: only moderators may remove someone else's link.
    async fn unlink_other(&self, invoker: Invoker, target: LinkTarget) -> String {
        let discord_id = match target {
            LinkTarget::Discord(id) => id,
            LinkTarget::Minecraft(name) => match self.store.by_name(&name).await {
                Some(link) => link.discord_id,
                None => {
                    return format!("Minecraft username **{}** is not linked to any Discord user", name)
                }
            },
        };

        if discord_id == invoker.id {
            return self.unlink(discord_id).await;
        }
        if !invoker.moderator {
            return "You need the Moderate Members permission to unlink someone else.".to_string();
        }

        match self.store.unlink(discord_id).await {
            Ok(Some(link)) => {
                info!(
                    moderator = invoker.id,
                    discord_id, "Moderator unlinked {}", link.name
                );
                format!("Unlinked <@{}> from **{}**.", discord_id, link.name)
            }
            Ok(None) => format!("<@{}> is not linked to any Minecraft account", discord_id),
            Err(e) => {
                warn!(discord_id, "!unlink failed: {}", e);
                format!("Something went wrong while unlinking: {}", e)
            }
        }
    }

    async fn link_check(&self, target: LinkTarget) -> String {
        match target {
            LinkTarget::Discord(id) => match self.store.by_discord(id).await {
                Some(link) => format!("<@{}> is linked to Minecraft username **{}**", id, link.name),
                None => format!("<@{}> is not linked to any Minecraft account", id),
            },
            LinkTarget::Minecraft(name) => match self.store.by_name(&name).await {
                Some(link) => format!("Minecraft username **{}** is linked to <@{}>", link.name, link.discord_id),
                None => format!("Minecraft username **{}** is not linked to any Discord user", name),
            },
        }
    }

    async fn online(&self) -> String {
        let names = self.players.names().await;
        if names.is_empty() {
            return "There are no players online currently.".to_string();
        }
        format!(
            "**{}** online: {}",
            names.len(),
            names
                .iter()
                .map(|n| crate::relay::formatter::escape_markdown(n))
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}
