//! Discord client, gateway loop and the relay sink.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use backon::BackoffBuilder;
use serenity::builder::CreateMessage;
use serenity::http::{Http, HttpBuilder, HttpError};
use serenity::model::channel::MessageFlags;
use serenity::model::id::ChannelId;
use serenity::prelude::*;
use serenity::Client;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::common::error::SinkError;
use crate::common::RelayMessage;
use crate::discord::handler::BridgeHandler;
use crate::relay::formatter::{split_message, DISCORD_MESSAGE_LIMIT};
use crate::relay::{ChatSink, RelayFormats};

/// Build the serenity HTTP client with our own timeouts.
pub fn build_http(token: &str) -> anyhow::Result<Http> {
    let reqwest_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(15))
        .connect_timeout(Duration::from_secs(10))
        .build()?;

    Ok(HttpBuilder::new(token).client(reqwest_client).build())
}

pub async fn build_client(token: &str, handler: Arc<BridgeHandler>) -> anyhow::Result<Client> {
    let intents = GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
        | GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MEMBERS;

    let client = serenity::client::ClientBuilder::new_with_http(build_http(token)?, intents)
        .event_handler_arc(handler)
        .await?;
    Ok(client)
}

/// Chunks of a split message already accepted by Discord, so a retried
/// publish continues where the failed attempt stopped.
#[derive(Debug, Default)]
struct ChunkProgress {
    pending: Mutex<Option<(String, usize)>>,
}

impl ChunkProgress {
    /// Index of the first chunk of `text` that still has to be sent.
    fn resume_from(&self, text: &str) -> usize {
        match self.lock().as_ref() {
            Some((pending, sent)) if pending == text => *sent,
            _ => 0,
        }
    }

    fn record(&self, text: &str, sent: usize) {
        *self.lock() = Some((text.to_string(), sent));
    }

    fn finish(&self) {
        *self.lock() = None;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<(String, usize)>> {
        match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Publishes relayed game messages into the bridge channel.
pub struct DiscordSink {
    http: Arc<Http>,
    channel: ChannelId,
    formats: RelayFormats,
    progress: ChunkProgress,
}

impl DiscordSink {
    pub fn new(http: Arc<Http>, channel: ChannelId, formats: RelayFormats) -> Self {
        Self {
            http,
            channel,
            formats,
            progress: ChunkProgress::default(),
        }
    }
}

#[async_trait]
impl ChatSink for DiscordSink {
    async fn publish(&self, message: &RelayMessage) -> Result<(), SinkError> {
        let text = self.formats.render(message);
        let chunks = split_message(&text, DISCORD_MESSAGE_LIMIT);
        let start = self.progress.resume_from(&text);
        if start > 0 {
            debug!("Resuming message at chunk {} of {}", start + 1, chunks.len());
        }

        for (index, chunk) in chunks.into_iter().enumerate().skip(start) {
            let builder = CreateMessage::new()
                .content(chunk)
                .flags(MessageFlags::SUPPRESS_NOTIFICATIONS);
            self.channel
                .send_message(&self.http, builder)
                .await
                .map_err(classify_error)?;
            self.progress.record(&text, index + 1);
        }
        self.progress.finish();
        debug!(kind = message.kind.name(), "Game -> Discord: {}", text);
        Ok(())
    }
}

/// Client errors other than rate limiting will not succeed on retry.
fn classify_error(e: serenity::Error) -> SinkError {
    if let serenity::Error::Http(HttpError::UnsuccessfulRequest(ref response)) = e {
        let status = response.status_code;
        if status.is_client_error() && status.as_u16() != 429 {
            return SinkError::Rejected {
                message: e.to_string(),
            };
        }
    }
    SinkError::Unavailable {
        message: e.to_string(),
    }
}

pub struct DiscordBot {
    client: Option<Client>,
    token: String,
    handler: Arc<BridgeHandler>,
    shutdown_rx: watch::Receiver<bool>,
}

impl DiscordBot {
    pub async fn new(
        token: String,
        handler: Arc<BridgeHandler>,
        shutdown_rx: watch::Receiver<bool>,
    ) -> anyhow::Result<Self> {
        let client = build_client(&token, handler.clone()).await?;
        Ok(Self {
            client: Some(client),
            token,
            handler,
            shutdown_rx,
        })
    }

    pub async fn run(mut self) {
        let shard_manager = self.client.as_ref().map(|c| c.shard_manager.clone());
        let mut shutdown_rx = self.shutdown_rx.clone();

        tokio::select! {
            _ = Self::run_connection(&mut self.client, &self.token, &self.handler) => {},
            _ = async {
                loop {
                    if shutdown_rx.changed().await.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
                if let Some(ref manager) = shard_manager {
                    info!("Initiating graceful Discord shutdown...");
                    manager.shutdown_all().await;
                    info!("Discord shutdown complete");
                }
            } => {}
        }
        info!("Discord task ended");
    }

    async fn run_connection(client: &mut Option<Client>, token: &str, handler: &Arc<BridgeHandler>) {
        /// 5s initial, 5min max, factor 1.1, with jitter, unlimited retries.
        fn discord_backoff() -> impl Iterator<Item = Duration> {
            backon::ExponentialBuilder::default()
                .with_min_delay(Duration::from_secs(5))
                .with_max_delay(Duration::from_secs(300))
                .with_factor(1.1)
                .with_jitter()
                .without_max_times()
                .build()
        }

        let mut backoff = discord_backoff();

        loop {
            info!("Connecting to Discord...");

            let mut current = match client.take() {
                Some(client) => client,
                None => match build_client(token, handler.clone()).await {
                    Ok(client) => {
                        backoff = discord_backoff();
                        client
                    }
                    Err(e) => {
                        error!("Failed to rebuild Discord client: {}", e);
                        let delay = backoff.next().unwrap_or(Duration::from_secs(300));
                        warn!("Retrying in {:.1}s...", delay.as_secs_f64());
                        sleep(delay).await;
                        continue;
                    }
                },
            };

            match current.start().await {
                Ok(()) => {
                    info!("Discord client disconnected normally");
                    break;
                }
                Err(e) => {
                    error!("Discord client error: {}", e);
                    let delay = backoff.next().unwrap_or(Duration::from_secs(300));
                    warn!(
                        "Discord disconnected. Reconnecting in {:.1}s...",
                        delay.as_secs_f64()
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_resumes_same_text_only() {
        let progress = ChunkProgress::default();
        assert_eq!(progress.resume_from("long message"), 0);

        progress.record("long message", 2);
        assert_eq!(progress.resume_from("long message"), 2);
        assert_eq!(progress.resume_from("another message"), 0);

        progress.finish();
        assert_eq!(progress.resume_from("long message"), 0);
    }

    #[test]
    fn test_progress_restarts_after_newer_message() {
        let progress = ChunkProgress::default();
        progress.record("dropped after retries", 1);
        progress.record("next message", 3);
        assert_eq!(progress.resume_from("dropped after retries"), 0);
        assert_eq!(progress.resume_from("next message"), 3);
    }
}
