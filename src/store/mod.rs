//! Snapshot store: last-seen rank and score per watched wallet.
//!
//! On-disk format is a single JSON object keyed by normalized wallet:
//!   { "0xabc": { "rank": 5, "score": 1.23 }, ... }
//! Unknown values are written as `null`.
//!
//! Reads never fail: a missing or corrupt file is "no history". Writes go to
//! a sibling temp file that is renamed over the target, so a crash leaves
//! either the previous snapshot or the new one.

use crate::leaderboard::{Rank, Score};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("snapshot I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("snapshot serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Last observed state of one wallet.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SnapshotEntry {
    #[serde(default)]
    pub rank: Rank,
    #[serde(default)]
    pub score: Score,
}

/// Normalized wallet → last observed entry.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(BTreeMap<String, SnapshotEntry>);

impl Snapshot {
    pub fn get(&self, wallet: &str) -> Option<&SnapshotEntry> {
        self.0.get(wallet)
    }

    /// Insert or overwrite. Returns the previous entry, if any.
    pub fn upsert(&mut self, wallet: String, entry: SnapshotEntry) -> Option<SnapshotEntry> {
        self.0.insert(wallet, entry)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Durable load/save of the full snapshot. No partial updates.
pub trait SnapshotStore {
    /// Current snapshot; empty when nothing usable is persisted.
    fn load(&self) -> Snapshot;

    /// Persist the whole snapshot, replacing what was there.
    fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError>;
}

/// File-backed store.
#[derive(Debug, Clone)]
pub struct JsonSnapshotStore {
    path: PathBuf,
}

impl JsonSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "snapshot".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_err(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl SnapshotStore for JsonSnapshotStore {
    fn load(&self) -> Snapshot {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no snapshot yet, starting empty");
                return Snapshot::default();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to read snapshot, starting empty");
                return Snapshot::default();
            }
        };

        match serde_json::from_str::<Snapshot>(&contents) {
            Ok(snapshot) => {
                debug!(path = %self.path.display(), wallets = snapshot.len(), "snapshot loaded");
                snapshot
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "corrupt snapshot, starting empty");
                Snapshot::default()
            }
        }
    }

    fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(snapshot)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
        }

        let tmp = self.tmp_path();
        if let Err(e) = write_synced(&tmp, &json).and_then(|()| fs::rename(&tmp, &self.path)) {
            if let Err(cleanup) = fs::remove_file(&tmp) {
                debug!(path = %tmp.display(), error = %cleanup, "temp snapshot not removed");
            }
            return Err(self.io_err(e));
        }

        debug!(path = %self.path.display(), wallets = snapshot.len(), "snapshot saved");
        Ok(())
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn entry(rank: i64, score: f64) -> SnapshotEntry {
        SnapshotEntry {
            rank: Rank::Known(rank),
            score: Score::Known(score),
        }
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempdir().expect("tmpdir");
        let store = JsonSnapshotStore::new(dir.path().join("rank_cache.json"));
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_corrupt_file_is_empty() {
        let dir = tempdir().expect("tmpdir");
        let path = dir.path().join("rank_cache.json");
        fs::write(&path, "{ not json").expect("write");
        let store = JsonSnapshotStore::new(&path);
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().expect("tmpdir");
        let store = JsonSnapshotStore::new(dir.path().join("nested/state/rank_cache.json"));

        let mut snapshot = Snapshot::default();
        snapshot.upsert("0xabc".to_string(), entry(5, 1.23));
        snapshot.upsert(
            "0xdef".to_string(),
            SnapshotEntry {
                rank: Rank::Unknown,
                score: Score::Unknown,
            },
        );
        store.save(&snapshot).expect("save");

        assert_eq!(store.load(), snapshot);
        assert!(!store.tmp_path().exists());
    }

    #[test]
    fn test_file_format_is_plain_object() {
        let dir = tempdir().expect("tmpdir");
        let path = dir.path().join("rank_cache.json");
        let store = JsonSnapshotStore::new(&path);

        let mut snapshot = Snapshot::default();
        snapshot.upsert("0xabc".to_string(), entry(5, 1.5));
        store.save(&snapshot).expect("save");

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).expect("read")).expect("json");
        assert_eq!(raw, serde_json::json!({"0xabc": {"rank": 5, "score": 1.5}}));
    }

    #[test]
    fn test_save_replaces_previous_snapshot() {
        let dir = tempdir().expect("tmpdir");
        let store = JsonSnapshotStore::new(dir.path().join("rank_cache.json"));

        let mut first = Snapshot::default();
        first.upsert("0xabc".to_string(), entry(5, 1.23));
        store.save(&first).expect("save");

        let mut second = Snapshot::default();
        second.upsert("0xabc".to_string(), entry(3, 1.5));
        store.save(&second).expect("save");

        assert_eq!(store.load().get("0xabc"), Some(&entry(3, 1.5)));
    }

    #[test]
    fn test_save_into_unwritable_location_fails() {
        let dir = tempdir().expect("tmpdir");
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "file, not a dir").expect("write");
        let store = JsonSnapshotStore::new(blocker.join("rank_cache.json"));
        assert!(matches!(
            store.save(&Snapshot::default()),
            Err(StoreError::Io { .. })
        ));
    }

    #[test]
    fn test_failed_save_removes_temp_file() {
        let dir = tempdir().expect("tmpdir");
        let path = dir.path().join("rank_cache.json");
        // A directory in the way makes the final rename fail after the temp write.
        fs::create_dir(&path).expect("mkdir");
        let store = JsonSnapshotStore::new(&path);

        let mut snapshot = Snapshot::default();
        snapshot.upsert("0xabc".to_string(), entry(5, 1.23));

        assert!(matches!(store.save(&snapshot), Err(StoreError::Io { .. })));
        assert!(!store.tmp_path().exists());
        assert!(path.is_dir());
    }
}
