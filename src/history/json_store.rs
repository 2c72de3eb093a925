// src/history/json_store.rs
// File-backed history: a single JSON snapshot rewritten on every mutation.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{
    insert_newest_first, remove_by_id, set_feedback, Feedback, HistoryError, HistoryRecord,
    HistoryResult, HistoryStore,
};

const SNAPSHOT_VERSION: u32 = 1;

/// On-disk layout of the history file
#[derive(Debug, Serialize, Deserialize)]
struct HistorySnapshot {
    version: u32,
    saved_at: i64,
    records: Vec<HistoryRecord>,
}

/// JSON file history store.
///
/// A missing file reads as an empty history. Writes go to a sibling
/// `.tmp` file which is then renamed over the original. The mutex only
/// serializes writers inside this process; other processes writing the
/// same file are not coordinated and the last write wins.
pub struct JsonHistoryStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonHistoryStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> HistoryResult<Vec<HistoryRecord>> {
        if !self.path.exists() {
            debug!(path = ?self.path, "History file absent, starting empty");
            return Ok(Vec::new());
        }

        let json = std::fs::read_to_string(&self.path).map_err(|e| HistoryError::Read {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        if json.trim().is_empty() {
            return Ok(Vec::new());
        }

        let snapshot: HistorySnapshot =
            serde_json::from_str(&json).map_err(|e| HistoryError::Corrupt {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;
        Ok(snapshot.records)
    }

    fn save(&self, records: Vec<HistoryRecord>) -> HistoryResult<()> {
        let write_err = |e: std::io::Error| HistoryError::Write {
            path: self.path.clone(),
            reason: e.to_string(),
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(write_err)?;
            }
        }

        let snapshot = HistorySnapshot {
            version: SNAPSHOT_VERSION,
            saved_at: chrono::Utc::now().timestamp(),
            records,
        };
        let json = serde_json::to_string_pretty(&snapshot)?;

        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, json).map_err(write_err)?;
        std::fs::rename(&tmp_path, &self.path).map_err(write_err)?;

        debug!(path = ?self.path, records = snapshot.records.len(), "History saved");
        Ok(())
    }

    /// Load, apply `f`, persist. Returns whatever `f` returns.
    fn mutate<T>(&self, f: impl FnOnce(&mut Vec<HistoryRecord>) -> HistoryResult<T>) -> HistoryResult<T> {
        let _guard = self.write_lock.lock();
        let mut records = self.load()?;
        let out = f(&mut records)?;
        self.save(records)?;
        Ok(out)
    }
}

impl HistoryStore for JsonHistoryStore {
    fn get(&self) -> HistoryResult<Vec<HistoryRecord>> {
        self.load()
    }

    fn append(&self, record: HistoryRecord) -> HistoryResult<()> {
        let id = record.id;
        self.mutate(|records| insert_newest_first(records, record))?;
        info!(id, path = ?self.path, "History record appended");
        Ok(())
    }

    fn update_feedback(&self, id: i64, feedback: Feedback) -> HistoryResult<bool> {
        let _guard = self.write_lock.lock();
        let mut records = self.load()?;
        if !set_feedback(&mut records, id, feedback) {
            return Ok(false);
        }
        self.save(records)?;
        Ok(true)
    }

    fn remove(&self, id: i64) -> HistoryResult<bool> {
        let _guard = self.write_lock.lock();
        let mut records = self.load()?;
        if !remove_by_id(&mut records, id) {
            return Ok(false);
        }
        self.save(records)?;
        Ok(true)
    }

    fn clear(&self) -> HistoryResult<usize> {
        let count = self.mutate(|records| {
            let count = records.len();
            records.clear();
            Ok(count)
        })?;
        info!(count, path = ?self.path, "History cleared");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::sample_record;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_reads_empty() {
        let dir = tempdir().unwrap();
        let store = JsonHistoryStore::new(dir.path().join("history.json"));
        assert!(store.get().unwrap().is_empty());
    }

    #[test]
    fn test_records_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("history.json");

        let store = JsonHistoryStore::new(&path);
        store.append(sample_record(1, "SELECT * FROM orders", None)).unwrap();
        store.append(sample_record(2, "SELECT * FROM users", None)).unwrap();
        assert!(store.update_feedback(1, Feedback::Helpful).unwrap());

        let reopened = JsonHistoryStore::new(&path);
        let records = reopened.get().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, 2);
        assert_eq!(records[1].feedback, Some(Feedback::Helpful));
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = JsonHistoryStore::new(&path);
        assert!(matches!(store.get(), Err(HistoryError::Corrupt { .. })));
        assert!(store.append(sample_record(1, "SELECT 1", None)).is_err());
    }

    #[test]
    fn test_unknown_id_leaves_file_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.json");
        let store = JsonHistoryStore::new(&path);

        assert!(!store.update_feedback(5, Feedback::Helpful).unwrap());
        assert!(!store.remove(5).unwrap());
        assert!(!path.exists());
    }

    #[test]
    fn test_clear_returns_count() {
        let dir = tempdir().unwrap();
        let store = JsonHistoryStore::new(dir.path().join("history.json"));
        store.append(sample_record(1, "SELECT 1", None)).unwrap();
        store.append(sample_record(2, "SELECT 2", None)).unwrap();

        assert_eq!(store.clear().unwrap(), 2);
        assert!(store.get().unwrap().is_empty());
    }
}
