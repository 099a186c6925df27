//! services/api/src/adapters/snapshot_file.rs
//!
//! This module contains the file adapter, which is the concrete implementation
//! of the `SnapshotStore` port from the `core` crate. The persisted envelope is
//! a single pretty-printed JSON document on local disk.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use hearth_core::domain::Snapshot;
use hearth_core::ports::{PortError, PortResult, SnapshotStore};
use serde_json::Value;
use tracing::debug;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// Keeps the snapshot at `path`, writing through a sibling temp file.
#[derive(Clone, Debug)]
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    /// Creates a new `FileSnapshotStore`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn io_error(action: &str, path: &Path, err: std::io::Error) -> PortError {
    PortError::Unexpected(format!("failed to {action} {}: {err}", path.display()))
}

//=========================================================================================
// SnapshotStore Trait Implementation
//=========================================================================================

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn load(&self) -> PortResult<Option<Value>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(io_error("read", &self.path, err)),
        };
        let value = serde_json::from_slice(&bytes).map_err(|e| {
            PortError::Unexpected(format!("{} is not valid JSON: {e}", self.path.display()))
        })?;
        Ok(Some(value))
    }

    async fn save(&self, snapshot: &Snapshot) -> PortResult<()> {
        let bytes = serde_json::to_vec_pretty(snapshot)
            .map_err(|e| PortError::Unexpected(format!("failed to encode snapshot: {e}")))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error("create", parent, e))?;
        }

        // Rename is atomic, so a crash mid-write never leaves a truncated snapshot.
        let temp = self.temp_path();
        tokio::fs::write(&temp, &bytes)
            .await
            .map_err(|e| io_error("write", &temp, e))?;
        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(|e| io_error("replace", &self.path, e))?;

        debug!(path = %self.path.display(), bytes = bytes.len(), "snapshot written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use hearth_core::seed::demo_store;
    use hearth_core::{normalize_snapshot, Env};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[tokio::test]
    async fn missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(dir.path().join("nested/store.json"));
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn saved_snapshot_loads_back_into_the_same_store() {
        let dir = tempfile::tempdir().unwrap();
        let files = FileSnapshotStore::new(dir.path().join("data/store.json"));
        let mut rng = StdRng::seed_from_u64(3);
        let mut env = Env::new(Utc::now(), &mut rng);
        let original = demo_store(&mut env);

        files.save(&original.snapshot()).await.unwrap();
        assert!(!files.temp_path().exists());

        let raw = files.load().await.unwrap().expect("snapshot was written");
        let restored = normalize_snapshot(raw, &mut env);
        assert_eq!(restored.db, original.db);
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, b"{ not json").unwrap();
        let err = FileSnapshotStore::new(&path).load().await.unwrap_err();
        assert!(matches!(err, PortError::Unexpected(_)));
    }
}
