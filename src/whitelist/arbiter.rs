//! Login arbitration.
//!
//! Combines the engine's own whitelist answer with an external authority.
//! The authority is consulted under a timeout; when it is slow, failing or
//! has no opinion the engine's answer stands unchanged.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::common::{AllowState, DisplayMessage, Identity, LoginDecision};
use crate::config::types::{PolicyMode, WhitelistConfig};
use crate::whitelist::authority::WhitelistAuthority;

/// Decides logins on behalf of the host.
pub struct WhitelistArbiter {
    authority: Arc<dyn WhitelistAuthority>,
    mode: PolicyMode,
    lookup_timeout: Duration,
    fallback_message: DisplayMessage,
}

impl WhitelistArbiter {
    pub fn new(
        authority: Arc<dyn WhitelistAuthority>,
        mode: PolicyMode,
        lookup_timeout: Duration,
        fallback_message: DisplayMessage,
    ) -> Self {
        Self {
            authority,
            mode,
            lookup_timeout,
            fallback_message,
        }
    }

    pub fn from_config(authority: Arc<dyn WhitelistAuthority>, config: &WhitelistConfig) -> Self {
        Self::new(
            authority,
            config.mode,
            Duration::from_millis(config.lookup_timeout_ms),
            DisplayMessage::new(config.fallback_message.clone()),
        )
    }

    pub fn mode(&self) -> PolicyMode {
        self.mode
    }

    /// Decide a login attempt. `prior` is what the engine would have answered.
    pub async fn decide(&self, identity: &Identity, prior: bool) -> LoginDecision {
        let allowed = match self.lookup(identity).await {
            Some(state) => self.combine(prior, state),
            None => prior,
        };

        debug!(
            uuid = %identity.uuid,
            prior,
            allowed,
            mode = ?self.mode,
            "Login decision for {}",
            identity.name
        );

        if !allowed {
            return LoginDecision::deny(self.write_message(identity).await);
        }

        if self.mode == PolicyMode::Override && !prior {
            return LoginDecision {
                allowed: true,
                reason: Some(DisplayMessage::new(format!(
                    "Welcome {}, access granted through your linked Discord account.",
                    identity.name
                ))),
            };
        }

        LoginDecision::allow()
    }

    /// Message for a rejected player, or the fallback text when the
    /// authority cannot produce one in time.
    pub async fn write_message(&self, identity: &Identity) -> DisplayMessage {
        match tokio::time::timeout(self.lookup_timeout, self.authority.message(identity)).await {
            Ok(Ok(message)) => message,
            Ok(Err(e)) => {
                warn!(uuid = %identity.uuid, "Whitelist message unavailable: {}", e);
                self.fallback_message.clone()
            }
            Err(_) => {
                warn!(
                    uuid = %identity.uuid,
                    "Whitelist message timed out after {}ms",
                    self.lookup_timeout.as_millis()
                );
                self.fallback_message.clone()
            }
        }
    }

    fn combine(&self, prior: bool, state: AllowState) -> bool {
        let external = state.is_allowed();
        match self.mode {
            PolicyMode::GrantOnly => prior || external,
            PolicyMode::Override => external,
            PolicyMode::RequireLink => prior && external,
        }
    }

    async fn lookup(&self, identity: &Identity) -> Option<AllowState> {
        match tokio::time::timeout(self.lookup_timeout, self.authority.lookup(identity)).await {
            Ok(Ok(state)) => state,
            Ok(Err(e)) => {
                warn!(uuid = %identity.uuid, "Whitelist lookup failed, using engine decision: {}", e);
                None
            }
            Err(_) => {
                warn!(
                    uuid = %identity.uuid,
                    "Whitelist lookup timed out after {}ms, using engine decision",
                    self.lookup_timeout.as_millis()
                );
                None
            }
        }
    }
}
