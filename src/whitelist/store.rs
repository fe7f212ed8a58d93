//! Persisted Discord <-> Minecraft link table.
//!
//! The table is a small JSON file rewritten after every change. It is the
//! default [`WhitelistAuthority`]: a linked account is allowed, anything
//! else is denied and gets a link code on its kick screen.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::common::error::{AuthorityError, StoreError, StoreResult};
use crate::common::{AllowState, DiscordId, DisplayMessage, Identity};
use crate::whitelist::authority::WhitelistAuthority;
use crate::whitelist::codes::LinkCodes;
use crate::whitelist::template::WhitelistTemplate;

/// One linked account pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub discord_id: DiscordId,
    pub minecraft_id: Uuid,
    pub name: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredLinks {
    links: Vec<Link>,
}

/// Link table plus the in-memory codes waiting to be redeemed.
#[derive(Debug)]
pub struct LinkStore {
    path: PathBuf,
    links: RwLock<Vec<Link>>,
    codes: Mutex<LinkCodes>,
    template: WhitelistTemplate,
    invite_link: String,
}

impl LinkStore {
    /// Open the store at `path`, starting empty when the file does not exist.
    pub async fn load(
        path: impl AsRef<Path>,
        template: WhitelistTemplate,
        invite_link: impl Into<String>,
    ) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let links = match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                let stored: StoredLinks =
                    serde_json::from_str(&content).map_err(|source| StoreError::Corrupt {
                        path: path.display().to_string(),
                        source,
                    })?;
                stored.links
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No link store at {}, starting empty", path.display());
                Vec::new()
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.display().to_string(),
                    source,
                })
            }
        };

        info!("Loaded {} linked accounts from {}", links.len(), path.display());

        Ok(Self {
            path,
            links: RwLock::new(links),
            codes: Mutex::new(LinkCodes::new()),
            template,
            invite_link: invite_link.into(),
        })
    }

    /// Redeem a link code for a Discord user.
    pub async fn link(&self, discord_id: DiscordId, code: u32) -> StoreResult<Link> {
        let identity = self
            .with_codes(|codes| codes.get(code).cloned())
            .ok_or(StoreError::UnknownCode { code })?;

        let mut links = self.links.write().await;
        if links.iter().any(|l| l.minecraft_id == identity.uuid) {
            return Err(StoreError::MinecraftTaken {
                name: identity.name,
            });
        }
        if links.iter().any(|l| l.discord_id == discord_id) {
            return Err(StoreError::DiscordTaken { discord_id });
        }

        let link = Link {
            discord_id,
            minecraft_id: identity.uuid,
            name: identity.name.clone(),
        };
        links.push(link.clone());
        if let Err(e) = self.persist(&links).await {
            links.pop();
            return Err(e);
        }
        drop(links);

        self.with_codes(|codes| codes.remove(code));
        info!(discord_id, uuid = %link.minecraft_id, "Linked {}", link.name);
        Ok(link)
    }

    /// Remove a Discord user's link, returning it if there was one.
    pub async fn unlink(&self, discord_id: DiscordId) -> StoreResult<Option<Link>> {
        let mut links = self.links.write().await;
        let Some(index) = links.iter().position(|l| l.discord_id == discord_id) else {
            return Ok(None);
        };

        let removed = links.remove(index);
        if let Err(e) = self.persist(&links).await {
            links.insert(index, removed);
            return Err(e);
        }

        info!(discord_id, uuid = %removed.minecraft_id, "Unlinked {}", removed.name);
        Ok(Some(removed))
    }

    pub async fn by_minecraft(&self, uuid: Uuid) -> Option<Link> {
        self.links
            .read()
            .await
            .iter()
            .find(|l| l.minecraft_id == uuid)
            .cloned()
    }

    pub async fn by_discord(&self, discord_id: DiscordId) -> Option<Link> {
        self.links
            .read()
            .await
            .iter()
            .find(|l| l.discord_id == discord_id)
            .cloned()
    }

    /// Case-insensitive lookup by the Minecraft name recorded at link time.
    pub async fn by_name(&self, name: &str) -> Option<Link> {
        self.links
            .read()
            .await
            .iter()
            .find(|l| l.name.eq_ignore_ascii_case(name))
            .cloned()
    }

    pub async fn all(&self) -> Vec<Link> {
        self.links.read().await.clone()
    }

    /// Existing or freshly issued link code for an identity.
    pub fn code_for(&self, identity: &Identity) -> u32 {
        self.with_codes(|codes| codes.code_for(identity))
    }

    fn with_codes<R>(&self, f: impl FnOnce(&mut LinkCodes) -> R) -> R {
        let mut codes = match self.codes.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut codes)
    }

    /// Write the table next to its final path, then rename over it.
    async fn persist(&self, links: &[Link]) -> StoreResult<()> {
        let io_error = |source| StoreError::Io {
            path: self.path.display().to_string(),
            source,
        };

        let stored = StoredLinks {
            links: links.to_vec(),
        };
        let content = serde_json::to_string_pretty(&stored).map_err(|source| StoreError::Corrupt {
            path: self.path.display().to_string(),
            source,
        })?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content).await.map_err(io_error)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(io_error)?;
        debug!("Persisted {} links to {}", links.len(), self.path.display());
        Ok(())
    }
}

#[async_trait]
impl WhitelistAuthority for LinkStore {
    async fn lookup(&self, identity: &Identity) -> Result<Option<AllowState>, AuthorityError> {
        let linked = self.by_minecraft(identity.uuid).await.is_some();
        Ok(Some(if linked {
            AllowState::Allowed
        } else {
            AllowState::Denied
        }))
    }

    async fn message(&self, identity: &Identity) -> Result<DisplayMessage, AuthorityError> {
        let code = if self.by_minecraft(identity.uuid).await.is_some() {
            None
        } else {
            Some(self.code_for(identity))
        };
        Ok(self.template.render(&identity.name, code, &self.invite_link))
    }
}
