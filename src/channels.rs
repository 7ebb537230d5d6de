use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::sync::RwLock;
use tracing::{error, info};

use crate::error::BotError;

/// Leading character of every channel reference.
pub const CHANNEL_MARKER: char = '@';

/// Required-channel list mirrored to a JSON file.
///
/// The lock only guards the vector itself. It is never held across a
/// network call, so two admins updating at once race and the last
/// `replace` wins.
pub struct ChannelStore {
    path: PathBuf,
    channels: RwLock<Vec<String>>,
}

impl ChannelStore {
    /// Read the persisted list. A missing file is a first run and gets an
    /// empty list written back; any other failure leaves the list empty for
    /// this session without touching the file.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let store = Self {
            path: path.into(),
            channels: RwLock::new(Vec::new()),
        };

        match read_channels(&store.path).await {
            Ok(channels) => {
                info!(
                    "Loaded channels from {}: {:?}",
                    store.path.display(),
                    channels
                );
                *store.channels.write().await = channels;
            }
            Err(BotError::Persistence { source, .. }) if source.kind() == ErrorKind::NotFound => {
                info!(
                    "No {} found; starting with empty channels",
                    store.path.display()
                );
                // Result is logged inside save
                let _ = store.save(&[]).await;
            }
            Err(e) => {
                error!("Failed to load channels: {}", e);
            }
        }

        store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of the current list.
    pub async fn list(&self) -> Vec<String> {
        self.channels.read().await.clone()
    }

    /// Write `channels` to disk, pretty-printed.
    pub async fn save(&self, channels: &[String]) -> Result<(), BotError> {
        let result = write_channels(&self.path, channels).await;
        match &result {
            Ok(()) => info!("Saved channels to {}: {:?}", self.path().display(), channels),
            Err(e) => error!("Failed to save channels: {}", e),
        }
        result
    }

    /// Swap in a new list and persist it, returning the previous one.
    /// A failed save is logged; memory keeps the new list regardless.
    pub async fn replace(&self, channels: Vec<String>) -> Vec<String> {
        let previous = {
            let mut current = self.channels.write().await;
            std::mem::replace(&mut *current, channels.clone())
        };
        let _ = self.save(&channels).await;
        previous
    }
}

async fn read_channels(path: &Path) -> Result<Vec<String>, BotError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| BotError::persistence(path, e))?;
    serde_json::from_str(&content).map_err(|source| BotError::ChannelFile {
        path: path.to_path_buf(),
        source,
    })
}

async fn write_channels(path: &Path, channels: &[String]) -> Result<(), BotError> {
    let content = serde_json::to_string_pretty(channels).map_err(|source| BotError::ChannelFile {
        path: path.to_path_buf(),
        source,
    })?;
    tokio::fs::write(path, content)
        .await
        .map_err(|e| BotError::persistence(path, e))
}
