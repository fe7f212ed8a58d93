//! Named entry points the game-side plugin calls into.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::common::{DisplayMessage, Identity, LoginDecision};
use crate::host::adapter::HostAdapter;
use crate::host::wire::HookCall;
use crate::relay::{ChatRelay, RelayOutcome};
use crate::whitelist::WhitelistArbiter;

/// Players currently on the server, keyed by UUID.
#[derive(Debug, Default)]
pub struct OnlinePlayers {
    players: RwLock<BTreeMap<Uuid, String>>,
}

impl OnlinePlayers {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn join(&self, identity: Identity) {
        self.players.write().await.insert(identity.uuid, identity.name);
    }

    pub async fn leave(&self, uuid: Uuid) {
        self.players.write().await.remove(&uuid);
    }

    /// Online names, sorted case-insensitively.
    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.players.read().await.values().cloned().collect();
        names.sort_by_key(|n| n.to_lowercase());
        names
    }

    pub async fn count(&self) -> usize {
        self.players.read().await.len()
    }
}

/// The registrations a host plugin calls: `login_check`, `login_message`,
/// `broadcast`, `player_join` and `player_leave`.
pub struct HostHooks {
    arbiter: Arc<WhitelistArbiter>,
    relay: Arc<ChatRelay>,
    players: Arc<OnlinePlayers>,
}

impl HostHooks {
    pub fn new(
        arbiter: Arc<WhitelistArbiter>,
        relay: Arc<ChatRelay>,
        players: Arc<OnlinePlayers>,
    ) -> Self {
        Self {
            arbiter,
            relay,
            players,
        }
    }

    pub fn players(&self) -> &Arc<OnlinePlayers> {
        &self.players
    }

    pub async fn login_check(&self, identity: &Identity, prior: bool) -> LoginDecision {
        self.arbiter.decide(identity, prior).await
    }

    pub async fn login_message(&self, identity: &Identity) -> DisplayMessage {
        self.arbiter.write_message(identity).await
    }

    /// Returns `None` when the loader does not relay this hook.
    pub fn broadcast(&self, adapter: &HostAdapter, call: HookCall) -> Option<RelayOutcome> {
        adapter
            .translate(call)
            .map(|event| self.relay.on_broadcast(event))
    }

    pub async fn player_join(&self, identity: Identity) {
        info!(uuid = %identity.uuid, "{} joined", identity.name);
        self.players.join(identity).await;
    }

    pub async fn player_leave(&self, identity: Identity) {
        info!(uuid = %identity.uuid, "{} left", identity.name);
        self.players.leave(identity.uuid).await;
    }
}
