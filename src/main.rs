//! Astralbridge - Discord whitelist and chat bridge for Minecraft servers
//!
//! Runs next to the game server. The game-side plugin asks it whether a
//! player may join and reports broadcasts, which are relayed to a Discord
//! channel; Discord messages are sent back into the game.

mod common;
mod config;
mod discord;
mod host;
mod relay;
mod whitelist;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serenity::model::id::ChannelId;
use tokio::signal;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, error, info, warn};

use common::{InboundMessage, RelayMessage};
use config::{env::get_config_path, load_and_validate};
use discord::client::build_http;
use discord::{BridgeHandler, CommandHandler, DiscordBot, DiscordSink};
use host::{HostHooks, HostServer, OnlinePlayers};
use relay::{ChatRelay, MessageFilter, MessageFormatter, RelayFormats, RelayWorker};
use whitelist::{LinkStore, WhitelistArbiter, WhitelistTemplate};

/// Discord messages buffered per host connection before it starts skipping.
const INBOUND_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Astralbridge v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = get_config_path();
    info!("Loading configuration from {}...", config_path);

    let config = load_and_validate(&config_path).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        error!("Please ensure {} exists and is properly formatted.", config_path);
        e
    })?;

    info!("Configuration loaded successfully");
    info!("  Discord channel: {}", config.discord.channel);
    info!("  Host endpoint: {} ({:?})", config.host.bind, config.host.loader);
    info!("  Whitelist mode: {:?}", config.whitelist.mode);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let channel = ChannelId::new(config.discord.channel);

    // Whitelist
    let template = config
        .whitelist
        .template
        .clone()
        .map(WhitelistTemplate::new)
        .unwrap_or_default();
    let store = Arc::new(
        LinkStore::load(&config.whitelist.store, template, config.discord.invite_link.clone()).await?,
    );
    let arbiter = Arc::new(WhitelistArbiter::from_config(store.clone(), &config.whitelist));

    // Game -> Discord relay
    let filter = MessageFilter::from_config(config.filters.as_ref());
    let (relay_tx, relay_rx) = mpsc::channel::<RelayMessage>(config.relay.queue_capacity);
    let relay = Arc::new(ChatRelay::from_config(relay_tx, &config.relay, filter.clone()));

    let sink = Arc::new(DiscordSink::new(
        Arc::new(build_http(&config.discord.token)?),
        channel,
        RelayFormats::from_config(&config.relay.formats),
    ));
    let worker = RelayWorker::new(relay_rx, sink, config.relay.retry.clone(), shutdown_rx.clone());
    let mut worker_task = tokio::spawn(worker.run());

    // Discord -> game
    let players = Arc::new(OnlinePlayers::new());
    let (inbound_tx, _) = broadcast::channel::<InboundMessage>(INBOUND_CAPACITY);

    let commands = config
        .discord
        .enable_commands
        .then(|| CommandHandler::new(store.clone(), players.clone(), config.discord.link_role));
    let handler = Arc::new(BridgeHandler::new(
        channel,
        inbound_tx.clone(),
        filter,
        MessageFormatter::new(&config.relay.formats.discord),
        commands,
        players.clone(),
        store,
    ));

    info!("Starting Discord bot...");
    let bot = DiscordBot::new(config.discord.token.clone(), handler, shutdown_rx.clone()).await?;
    let mut discord_task = tokio::spawn(bot.run());

    // Host plugin endpoint
    let hooks = Arc::new(HostHooks::new(arbiter, relay, players));
    let server = HostServer::bind(
        &config.host.bind,
        hooks,
        config.host.loader,
        inbound_tx,
        shutdown_rx.clone(),
    )
    .await?;
    let host_task = tokio::spawn(server.run());

    let shutdown = tokio::select! {
        biased;
        _ = shutdown_signal() => {
            info!("Shutdown signal received - stopping...");
            true
        }
        _ = &mut discord_task => false,
        _ = &mut worker_task => false,
        _ = host_task => false,
    };

    if let Err(e) = shutdown_tx.send(true) {
        debug!("Shutdown channel closed: {}", e);
    }

    if shutdown {
        let timeout = Duration::from_secs(5);
        match tokio::time::timeout(timeout, worker_task).await {
            Ok(Ok(())) => info!("Relay queue drained"),
            Ok(Err(e)) => warn!("Relay worker panicked: {}", e),
            Err(_) => warn!("Relay drain timed out, queued messages dropped"),
        }
        match tokio::time::timeout(timeout, discord_task).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Discord task panicked: {}", e),
            Err(_) => warn!("Discord shutdown timed out"),
        }
    }

    info!("Exiting...");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
