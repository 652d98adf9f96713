use std::io::ErrorKind;
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::*;

/// Serializable copy of the world state, values base64-encoded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    entries: BTreeMap<String, String>,
}

impl LedgerSnapshot {
    /// Returns the number of captured keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the snapshot is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl InMemoryLedgerStore {
    /// Restores a store from a snapshot.
    pub fn from_snapshot(snapshot: LedgerSnapshot) -> AppResult<Self> {
        let state = snapshot
            .entries
            .into_iter()
            .map(|(key, encoded)| {
                STANDARD
                    .decode(encoded.as_bytes())
                    .map(|value| (key.clone(), value))
                    .map_err(|error| {
                        AppError::Serialization(format!(
                            "invalid snapshot value for key '{}': {error}",
                            key.escape_debug()
                        ))
                    })
            })
            .collect::<AppResult<BTreeMap<String, Vec<u8>>>>()?;

        Ok(Self {
            state: RwLock::new(state),
        })
    }

    /// Captures the current world state.
    pub async fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            entries: self
                .state
                .read()
                .await
                .iter()
                .map(|(key, value)| (key.clone(), STANDARD.encode(value)))
                .collect(),
        }
    }

    /// Loads a store from a JSON snapshot file; a missing file yields an
    /// empty store.
    pub async fn load_from_file(path: &Path) -> AppResult<Self> {
        let contents = match tokio::fs::read(path).await {
            Ok(contents) => contents,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                info!(path = %path.display(), "ledger snapshot not found, starting empty");
                return Ok(Self::new());
            }
            Err(error) => {
                return Err(AppError::Store(format!(
                    "failed to read ledger snapshot '{}': {error}",
                    path.display()
                )));
            }
        };

        let snapshot: LedgerSnapshot = serde_json::from_slice(&contents).map_err(|error| {
            AppError::Serialization(format!(
                "failed to parse ledger snapshot '{}': {error}",
                path.display()
            ))
        })?;

        Self::from_snapshot(snapshot)
    }

    /// Writes the current world state to a JSON snapshot file.
    ///
    /// The file is replaced through a rename so readers never observe a
    /// partial write.
    pub async fn save_to_file(&self, path: &Path) -> AppResult<()> {
        let snapshot = self.snapshot().await;
        let contents = serde_json::to_vec_pretty(&snapshot).map_err(|error| {
            AppError::Serialization(format!("failed to encode ledger snapshot: {error}"))
        })?;

        let staging_path = path.with_extension("tmp");
        tokio::fs::write(&staging_path, contents)
            .await
            .map_err(|error| {
                AppError::Store(format!(
                    "failed to write ledger snapshot '{}': {error}",
                    staging_path.display()
                ))
            })?;
        tokio::fs::rename(&staging_path, path)
            .await
            .map_err(|error| {
                AppError::Store(format!(
                    "failed to replace ledger snapshot '{}': {error}",
                    path.display()
                ))
            })?;

        info!(path = %path.display(), keys = snapshot.len(), "ledger snapshot saved");
        Ok(())
    }
}
