//! Broadcast intake.
//!
//! Host hooks call [`ChatRelay::on_broadcast`] from the game's call path,
//! so it never blocks: classify, drop echoes and duplicates, then hand the
//! message to the worker queue with `try_send`.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::common::{BroadcastEvent, BroadcastKind, RelayMessage};
use crate::config::types::RelayConfig;
use crate::relay::dedup::{Deduplicator, IdempotencyKey};
use crate::relay::filter::{FilterDirection, MessageFilter};

/// What happened to a broadcast handed to the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Accepted for delivery.
    Queued,
    /// Same broadcast already seen through another entry point.
    Duplicate,
    /// Echo of a Discord message, or blocked by a filter.
    Suppressed,
    /// Queue full; the message was discarded.
    Dropped,
    /// The worker has stopped.
    Closed,
}

pub struct ChatRelay {
    tx: mpsc::Sender<RelayMessage>,
    dedup: Deduplicator,
    filter: MessageFilter,
}

impl ChatRelay {
    pub fn new(tx: mpsc::Sender<RelayMessage>, dedup: Deduplicator, filter: MessageFilter) -> Self {
        Self { tx, dedup, filter }
    }

    pub fn from_config(
        tx: mpsc::Sender<RelayMessage>,
        config: &RelayConfig,
        filter: MessageFilter,
    ) -> Self {
        let dedup = Deduplicator::new(
            Duration::from_millis(config.dedup_window_ms),
            config.dedup_capacity,
        );
        Self::new(tx, dedup, filter)
    }

    pub fn on_broadcast(&self, event: BroadcastEvent) -> RelayOutcome {
        if event.from_discord {
            debug!(source = ?event.source, "Skipping echo of a Discord message");
            return RelayOutcome::Suppressed;
        }

        let stamp = event.stamp;
        let message = classify(event);

        if self
            .filter
            .should_filter(FilterDirection::HostToDiscord, &message.content)
        {
            debug!(kind = message.kind.name(), "Broadcast blocked by filter");
            return RelayOutcome::Suppressed;
        }

        if !self.dedup.first_seen(IdempotencyKey::new(&message, stamp)) {
            debug!(kind = message.kind.name(), "Duplicate broadcast ignored");
            return RelayOutcome::Duplicate;
        }

        match self.tx.try_send(message) {
            Ok(()) => RelayOutcome::Queued,
            Err(mpsc::error::TrySendError::Full(message)) => {
                warn!(
                    kind = message.kind.name(),
                    "Relay queue full, dropping broadcast"
                );
                RelayOutcome::Dropped
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("Relay worker stopped, broadcast not delivered");
                RelayOutcome::Closed
            }
        }
    }
}

/// Normalize an event into what the sink receives.
fn classify(event: BroadcastEvent) -> RelayMessage {
    match (event.kind, event.origin) {
        (BroadcastKind::Chat, Some(origin)) => RelayMessage {
            kind: BroadcastKind::Chat,
            content: event.content,
            origin: Some(origin),
        },
        (BroadcastKind::Chat, None) => {
            warn!(source = ?event.source, "Chat broadcast without a sender, relaying as system");
            RelayMessage {
                kind: BroadcastKind::System,
                content: event.content,
                origin: None,
            }
        }
        (kind, _) => RelayMessage {
            kind,
            content: event.content,
            origin: None,
        },
    }
}
