//! Engine configuration, loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file) yields a working
//! in-memory board:
//!
//! ```toml
//! transition_policy = "append_to_tail"
//! notify_capacity = 256
//! intake_session_ttl_secs = 1800
//!
//! [storage]
//! backend = "file"
//! data_dir = "/var/lib/orderboard"
//! ```

use crate::{
    domain::BoardConfig,
    error::{BoardError, Result},
    storage::{BoardStore, MemoryStorage},
};
use serde::{Deserialize, Serialize};
use std::{path::Path, path::PathBuf, sync::Arc, time::Duration};

/// Where a lane transition without an explicit position lands the item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionPolicy {
    /// Tail of the destination lane (`max + 1`, or 0 when empty)
    #[default]
    AppendToTail,
    /// Keep the stored position verbatim; a collision fails the transition
    PreservePosition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    File,
    Sqlite,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            data_dir: PathBuf::from("."),
        }
    }
}

impl StorageConfig {
    /// Builds and initializes the configured backend
    pub async fn open(&self) -> Result<Arc<dyn BoardStore>> {
        let store: Arc<dyn BoardStore> = match self.backend {
            StorageBackend::Memory => Arc::new(MemoryStorage::new()),
            #[cfg(feature = "file-storage")]
            StorageBackend::File => Arc::new(crate::storage::FileStorage::new(&self.data_dir)),
            #[cfg(feature = "sqlite-storage")]
            StorageBackend::Sqlite => {
                tokio::fs::create_dir_all(&self.data_dir).await?;
                Arc::new(crate::storage::SqliteStorage::open(
                    self.data_dir.join("orderboard.db"),
                )?)
            }
            #[allow(unreachable_patterns)]
            other => {
                return Err(BoardError::ConfigError(format!(
                    "storage backend {:?} is not compiled in",
                    other
                )))
            }
        };
        store.initialize().await?;
        Ok(store)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub board: BoardConfig,
    pub storage: StorageConfig,
    pub transition_policy: TransitionPolicy,
    /// Buffered events per subscriber before it starts lagging
    pub notify_capacity: usize,
    pub intake_session_ttl_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            board: BoardConfig::default(),
            storage: StorageConfig::default(),
            transition_policy: TransitionPolicy::default(),
            notify_capacity: 256,
            intake_session_ttl_secs: 30 * 60,
        }
    }
}

impl EngineConfig {
    /// Parses a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = tokio::fs::read_to_string(path.as_ref()).await?;
        Self::from_toml_str(&contents)
    }

    pub fn intake_session_ttl(&self) -> Duration {
        Duration::from_secs(self.intake_session_ttl_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.notify_capacity == 0 {
            return Err(BoardError::ConfigError(
                "notify_capacity must be greater than zero".to_string(),
            ));
        }
        if self.board.columns.is_empty() {
            return Err(BoardError::ConfigError(
                "board must define at least one column".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Lane;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.transition_policy, TransitionPolicy::AppendToTail);
    }

    #[test]
    fn test_parse_full_document() {
        let config = EngineConfig::from_toml_str(
            r#"
            transition_policy = "preserve_position"
            notify_capacity = 16
            intake_session_ttl_secs = 60

            [storage]
            backend = "file"
            data_dir = "/tmp/board"

            [board]
            name = "Workshop"

            [[board.columns]]
            name = "Inbox"
            lane = "NEW"
            "#,
        )
        .unwrap();

        assert_eq!(config.transition_policy, TransitionPolicy::PreservePosition);
        assert_eq!(config.storage.backend, StorageBackend::File);
        assert_eq!(config.storage.data_dir, PathBuf::from("/tmp/board"));
        assert_eq!(config.board.lane_name(Lane::New), "Inbox");
        assert_eq!(config.intake_session_ttl(), Duration::from_secs(60));
    }

    #[test]
    fn test_rejects_zero_capacity() {
        let err = EngineConfig::from_toml_str("notify_capacity = 0").unwrap_err();
        assert!(matches!(err, BoardError::ConfigError(_)));
    }

    #[test]
    fn test_rejects_malformed_toml() {
        let err = EngineConfig::from_toml_str("notify_capacity = \"lots\"").unwrap_err();
        assert!(matches!(err, BoardError::ConfigError(_)));
    }

    #[tokio::test]
    async fn test_open_memory_backend() {
        let store = StorageConfig::default().open().await.unwrap();
        assert!(store.is_initialized().await);
    }

    #[cfg(feature = "file-storage")]
    #[tokio::test]
    async fn test_open_file_backend() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config = StorageConfig {
            backend: StorageBackend::File,
            data_dir: temp_dir.path().to_path_buf(),
        };

        let store = config.open().await.unwrap();
        assert!(store.is_initialized().await);
    }
}
