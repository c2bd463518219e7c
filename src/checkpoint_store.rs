//! C5: durable persistence for the in-progress scrape's resume state.
//! Writes are atomic (write-to-temp, fsync, rename) so a crash mid-write
//! never leaves a torn checkpoint file behind; a corrupt or unreadable
//! checkpoint is treated as "no checkpoint", never as an error, since losing
//! resume state must never block a scrape from starting fresh.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::errors::StorageError;
use crate::models::Checkpoint;

pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Reads the checkpoint file. A missing file, unreadable JSON, or a
    /// checkpoint written by an incompatible version all return `None` with
    /// a WARN, never an error.
    pub fn load(&self) -> Option<Checkpoint> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to read checkpoint file");
                return None;
            }
        };

        let checkpoint: Checkpoint = match serde_json::from_slice(&bytes) {
            Ok(c) => c,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "checkpoint file is corrupt, discarding");
                return None;
            }
        };

        if checkpoint.version != Checkpoint::CURRENT_VERSION {
            warn!(
                found = %checkpoint.version,
                expected = %Checkpoint::CURRENT_VERSION,
                "checkpoint version mismatch, discarding"
            );
            return None;
        }

        Some(checkpoint)
    }

    pub fn save(&self, checkpoint: &Checkpoint) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| StorageError::CheckpointIo(e.to_string()))?;
        }

        let payload = serde_json::to_vec_pretty(checkpoint)?;

        let tmp_path = self.path.with_extension("json.tmp");
        let mut tmp_file =
            fs::File::create(&tmp_path).map_err(|e| StorageError::CheckpointIo(e.to_string()))?;
        tmp_file
            .write_all(&payload)
            .map_err(|e| StorageError::CheckpointIo(e.to_string()))?;
        tmp_file
            .sync_all()
            .map_err(|e| StorageError::CheckpointIo(e.to_string()))?;
        drop(tmp_file);

        fs::rename(&tmp_path, &self.path).map_err(|e| StorageError::CheckpointIo(e.to_string()))?;
        Ok(())
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::CheckpointIo(e.to_string())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn round_trips_a_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("checkpoint.json"));

        let checkpoint = Checkpoint::new(json!({"namespace": 0}));
        store.save(&checkpoint).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.version, Checkpoint::CURRENT_VERSION);
        assert_eq!(loaded.parameters, checkpoint.parameters);
    }

    #[test]
    fn missing_file_is_none_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("does-not-exist.json"));
        assert!(store.load().is_none());
    }

    #[test]
    fn corrupt_file_is_none_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkpoint.json");
        fs::write(&path, b"not valid json").unwrap();
        let store = CheckpointStore::new(path);
        assert!(store.load().is_none());
    }

    #[test]
    fn clear_removes_file_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("checkpoint.json"));
        store.save(&Checkpoint::new(json!({}))).unwrap();
        store.clear().unwrap();
        assert!(store.load().is_none());
        store.clear().unwrap();
    }
}
