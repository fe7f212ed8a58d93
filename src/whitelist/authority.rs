//! External whitelist authority seam.

use async_trait::async_trait;

use crate::common::error::AuthorityError;
use crate::common::{AllowState, DisplayMessage, Identity};

/// Something outside the game engine that has an opinion on who may join.
///
/// `lookup` must be read-only; a login attempt never changes whitelist state.
#[async_trait]
pub trait WhitelistAuthority: Send + Sync {
    /// `Ok(None)` means the authority has no opinion on this identity.
    async fn lookup(&self, identity: &Identity) -> Result<Option<AllowState>, AuthorityError>;

    /// Message shown to the player when they are turned away.
    async fn message(&self, identity: &Identity) -> Result<DisplayMessage, AuthorityError>;
}
