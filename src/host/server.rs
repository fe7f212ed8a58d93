//! TCP endpoint for the game-side plugin.
//!
//! Each plugin connection is a stream of JSON lines. Login checks are
//! answered on the connection task; broadcast hooks are handed to the
//! relay without waiting on Discord.

use std::collections::HashSet;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, watch};
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::common::error::HostError;
use crate::common::{Identity, InboundMessage};
use crate::config::types::Loader;
use crate::host::adapter::HostAdapter;
use crate::host::hooks::HostHooks;
use crate::host::wire::{HostFrame, ServiceFrame, MAX_LINE_LENGTH};

pub struct HostServer {
    listener: TcpListener,
    hooks: Arc<HostHooks>,
    loader: Loader,
    inbound_tx: broadcast::Sender<InboundMessage>,
    shutdown_rx: watch::Receiver<bool>,
}

impl HostServer {
    pub async fn bind(
        addr: &str,
        hooks: Arc<HostHooks>,
        loader: Loader,
        inbound_tx: broadcast::Sender<InboundMessage>,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Result<Self, HostError> {
        let listener = TcpListener::bind(addr).await?;
        info!("Host endpoint listening on {}", listener.local_addr()?);
        Ok(Self {
            listener,
            hooks,
            loader,
            inbound_tx,
            shutdown_rx,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, HostError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept plugin connections until shutdown.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            info!("Host plugin connected from {}", peer);
                            let connection = Connection::new(
                                self.hooks.clone(),
                                self.loader,
                                self.inbound_tx.subscribe(),
                                self.shutdown_rx.clone(),
                            );
                            tokio::spawn(async move {
                                match connection.run(stream).await {
                                    Ok(()) => info!("Host plugin {} disconnected", peer),
                                    Err(e) => warn!("Host plugin {} connection error: {}", peer, e),
                                }
                            });
                        }
                        Err(e) => error!("Failed to accept host connection: {}", e),
                    }
                }
                changed = self.shutdown_rx.changed() => {
                    if changed.is_err() || *self.shutdown_rx.borrow() {
                        info!("Host endpoint shutting down");
                        break;
                    }
                }
            }
        }
    }
}

/// One plugin connection.
pub struct Connection {
    hooks: Arc<HostHooks>,
    adapter: HostAdapter,
    inbound_rx: broadcast::Receiver<InboundMessage>,
    shutdown_rx: watch::Receiver<bool>,
    /// Players this plugin reported as joined and not yet left.
    joined: HashSet<Uuid>,
}

impl Connection {
    pub fn new(
        hooks: Arc<HostHooks>,
        loader: Loader,
        inbound_rx: broadcast::Receiver<InboundMessage>,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            hooks,
            adapter: HostAdapter::new(loader),
            inbound_rx,
            shutdown_rx,
            joined: HashSet::new(),
        }
    }

    pub async fn run<S>(mut self, stream: S) -> Result<(), HostError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut framed = Framed::new(stream, LinesCodec::new_with_max_length(MAX_LINE_LENGTH));
        // Framed yields one `None` after a decode error before it resumes reading.
        let mut resuming = false;

        let result = loop {
            tokio::select! {
                line = framed.next() => {
                    let reply = match line {
                        Some(Ok(line)) => self.handle_line(&line).await,
                        Some(Err(e)) => match rejected_line(e) {
                            Ok(message) => {
                                warn!("Discarded host line: {}", message);
                                resuming = true;
                                Some(ServiceFrame::Error { message })
                            }
                            Err(e) => break Err(e.into()),
                        },
                        None if resuming => {
                            resuming = false;
                            continue;
                        }
                        None => break Ok(()),
                    };
                    if let Some(reply) = reply {
                        if let Err(e) = send(&mut framed, &reply).await {
                            break Err(e);
                        }
                    }
                }

                inbound = self.inbound_rx.recv() => {
                    match inbound {
                        Ok(message) => {
                            let frame = ServiceFrame::DiscordMessage {
                                author: message.author,
                                content: message.content,
                            };
                            if let Err(e) = send(&mut framed, &frame).await {
                                break Err(e);
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!("Host connection lagging, skipped {} Discord messages", skipped);
                        }
                        Err(broadcast::error::RecvError::Closed) => break Ok(()),
                    }
                }

                changed = self.shutdown_rx.changed() => {
                    if changed.is_err() || *self.shutdown_rx.borrow() {
                        break Ok(());
                    }
                }
            }
        };

        // Whoever reconnects will report joins again.
        for uuid in self.joined.drain() {
            self.hooks.players().leave(uuid).await;
        }
        result
    }

    async fn handle_line(&mut self, line: &str) -> Option<ServiceFrame> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let frame = match serde_json::from_str::<HostFrame>(line) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Malformed host frame: {}", e);
                return Some(ServiceFrame::Error {
                    message: HostError::Malformed(e).to_string(),
                });
            }
        };

        match frame {
            HostFrame::Hello { loader } => {
                info!(?loader, "Host plugin announced loader");
                self.adapter = HostAdapter::new(loader);
                None
            }
            HostFrame::LoginCheck {
                id,
                uuid,
                name,
                prior,
            } => {
                let identity = Identity::new(uuid, name);
                let decision = self.hooks.login_check(&identity, prior).await;
                Some(ServiceFrame::decision(id, decision))
            }
            HostFrame::LoginMessage { id, uuid, name } => {
                let identity = Identity::new(uuid, name);
                let message = self.hooks.login_message(&identity).await;
                Some(ServiceFrame::LoginText {
                    id,
                    message: message.0,
                })
            }
            HostFrame::Hook(call) => {
                let hook = call.hook.clone();
                if let Some(outcome) = self.hooks.broadcast(&self.adapter, call) {
                    debug!(hook = %hook, ?outcome, "Broadcast hook handled");
                }
                None
            }
            HostFrame::PlayerJoin { uuid, name } => {
                self.joined.insert(uuid);
                self.hooks.player_join(Identity::new(uuid, name)).await;
                None
            }
            HostFrame::PlayerLeave { uuid, name } => {
                self.joined.remove(&uuid);
                self.hooks.player_leave(Identity::new(uuid, name)).await;
                None
            }
        }
    }
}

/// Decode errors that only spoil one line. Anything else is a transport failure.
fn rejected_line(e: LinesCodecError) -> Result<String, LinesCodecError> {
    match e {
        LinesCodecError::MaxLineLengthExceeded => {
            Ok(format!("line longer than {} bytes", MAX_LINE_LENGTH))
        }
        LinesCodecError::Io(e) if e.kind() == io::ErrorKind::InvalidData => {
            Ok(format!("line is not valid UTF-8: {}", e))
        }
        e => Err(e),
    }
}

async fn send<S>(framed: &mut Framed<S, LinesCodec>, frame: &ServiceFrame) -> Result<(), HostError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let line = serde_json::to_string(frame)?;
    framed.send(line).await?;
    Ok(())
}
