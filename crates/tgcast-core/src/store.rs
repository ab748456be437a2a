//! Recipient registry: port + JSON-file implementation.
//!
//! On-disk layout is `<root>/<channel>/user.json` holding `{"users": [...]}`.
//! Registration treats a missing registry as empty; listing treats it as an
//! unknown channel.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{
    domain::{ChannelId, RecipientId, RecipientSet},
    errors::StoreError,
    locks::ChannelLocks,
    Result,
};

const REGISTRY_FILE: &str = "user.json";

/// Result of a registration call. Both variants are a success.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Registration {
    Added,
    AlreadyPresent,
}

#[async_trait]
pub trait RecipientStore: Send + Sync {
    async fn register(&self, channel: &ChannelId, recipient: &RecipientId)
        -> Result<Registration>;

    async fn list(&self, channel: &ChannelId) -> Result<RecipientSet>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    users: RecipientSet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<String>,
}

pub struct JsonFileStore {
    root: PathBuf,
    write_locks: ChannelLocks,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_locks: ChannelLocks::new(),
        }
    }

    fn channel_dir(&self, channel: &ChannelId) -> PathBuf {
        self.root.join(channel.as_str())
    }

    fn registry_path(&self, channel: &ChannelId) -> PathBuf {
        self.channel_dir(channel).join(REGISTRY_FILE)
    }

    async fn read_registry(path: &Path) -> std::result::Result<Option<RegistryFile>, StoreError> {
        let bytes = match tokio::fs::read(path).await {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StoreError::Corrupt {
                path: path.to_path_buf(),
                source,
            })
    }

    async fn write_registry(
        path: &Path,
        data: &RegistryFile,
    ) -> std::result::Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        };

        let body = serde_json::to_vec(data).map_err(|source| StoreError::Corrupt {
            path: path.to_path_buf(),
            source,
        })?;

        // Write-then-rename so readers never observe a truncated file.
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, path).await.map_err(io_err)?;
        Ok(())
    }
}

#[async_trait]
impl RecipientStore for JsonFileStore {
    async fn register(
        &self,
        channel: &ChannelId,
        recipient: &RecipientId,
    ) -> Result<Registration> {
        channel.validate()?;
        let _guard = self.write_locks.lock_channel(channel).await;

        let dir = self.channel_dir(channel);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| StoreError::Io {
                path: dir.clone(),
                source,
            })?;

        let path = self.registry_path(channel);
        let mut data = Self::read_registry(&path).await?.unwrap_or_default();

        if !data.users.insert(recipient.clone()) {
            tracing::debug!(%channel, %recipient, "recipient already registered");
            return Ok(Registration::AlreadyPresent);
        }

        data.updated_at = Some(Utc::now().to_rfc3339());
        Self::write_registry(&path, &data).await?;
        tracing::info!(%channel, %recipient, total = data.users.len(), "recipient registered");
        Ok(Registration::Added)
    }

    async fn list(&self, channel: &ChannelId) -> Result<RecipientSet> {
        channel.validate()?;
        let path = self.registry_path(channel);
        match Self::read_registry(&path).await? {
            Some(data) => Ok(data.users),
            None => Err(StoreError::NotFound(channel.clone()).into()),
        }
    }
}
