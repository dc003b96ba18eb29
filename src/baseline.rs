//! Baseline snapshot persistence: per-query-hash history used by
//! regression detection.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::{Mutex, RwLock}
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppResult, file_read_error, file_write_error},
    plan::{AccessType, ComplexityClass}
};

/// One persisted measurement for a query, keyed by its fingerprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineSnapshot {
    pub query_hash:            String,
    pub timestamp:             DateTime<Utc>,
    pub composite_score:       f64,
    pub grade:                 String,
    pub execution_time_ms:     f64,
    pub rows_examined:         u64,
    pub time_per_row:          f64,
    pub complexity:            ComplexityClass,
    pub access_type:           AccessType,
    pub indexes_used:          Vec<String>,
    pub finding_counts:        HashMap<String, usize>,
    pub table_size:            Option<u64>,
    pub buffer_pool_utilization: Option<f64>,
    pub is_cold_cache:         Option<bool>
}

/// Persisted query history. `history` returns chronological order
/// (oldest first); `save` is atomic with respect to concurrent readers
/// and enforces FIFO retention internally.
pub trait BaselineStore: Send + Sync {
    fn history(&self, query_hash: &str, max: usize) -> AppResult<Vec<BaselineSnapshot>>;

    fn save(&self, query_hash: &str, snapshot: BaselineSnapshot) -> AppResult<()>;
}

/// In-memory store for tests and permissive/embedded use.
#[derive(Default)]
pub struct InMemoryBaselineStore {
    max_history: usize,
    data:        RwLock<HashMap<String, Vec<BaselineSnapshot>>>
}

impl InMemoryBaselineStore {
    pub fn new(max_history: usize) -> Self {
        Self {
            max_history,
            data: RwLock::new(HashMap::new())
        }
    }
}

impl BaselineStore for InMemoryBaselineStore {
    fn history(&self, query_hash: &str, max: usize) -> AppResult<Vec<BaselineSnapshot>> {
        let data = self.data.read().expect("baseline store lock poisoned");
        let snapshots = data.get(query_hash).cloned().unwrap_or_default();
        let skip = snapshots.len().saturating_sub(max);
        Ok(snapshots[skip..].to_vec())
    }

    fn save(&self, query_hash: &str, snapshot: BaselineSnapshot) -> AppResult<()> {
        let mut data = self.data.write().expect("baseline store lock poisoned");
        let entry = data.entry(query_hash.to_string()).or_default();
        entry.push(snapshot);
        if entry.len() > self.max_history {
            let drop_count = entry.len() - self.max_history;
            entry.drain(0..drop_count);
        }
        Ok(())
    }
}

/// On-disk store: one JSON object per line, appended to a per-query-hash
/// file under `base_dir`. A process-wide write mutex per store instance
/// serializes `save` calls so retention trimming never races.
pub struct FileBaselineStore {
    base_dir:    PathBuf,
    max_history: usize,
    write_lock:  Mutex<()>
}

impl FileBaselineStore {
    pub fn new(base_dir: impl Into<PathBuf>, max_history: usize) -> Self {
        Self {
            base_dir: base_dir.into(),
            max_history,
            write_lock: Mutex::new(())
        }
    }

    fn path_for(&self, query_hash: &str) -> PathBuf {
        self.base_dir.join(format!("{query_hash}.jsonl"))
    }

    fn read_all(&self, path: &Path) -> AppResult<Vec<BaselineSnapshot>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(path)
            .map_err(|e| file_read_error(&path.to_string_lossy(), e))?;
        let mut snapshots = Vec::new();
        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            if let Ok(snapshot) = serde_json::from_str::<BaselineSnapshot>(line) {
                snapshots.push(snapshot);
            }
        }
        Ok(snapshots)
    }
}

impl BaselineStore for FileBaselineStore {
    fn history(&self, query_hash: &str, max: usize) -> AppResult<Vec<BaselineSnapshot>> {
        let snapshots = self.read_all(&self.path_for(query_hash))?;
        let skip = snapshots.len().saturating_sub(max);
        Ok(snapshots[skip..].to_vec())
    }

    fn save(&self, query_hash: &str, snapshot: BaselineSnapshot) -> AppResult<()> {
        let _guard = self.write_lock.lock().expect("baseline store lock poisoned");
        fs::create_dir_all(&self.base_dir)
            .map_err(|e| file_write_error(&self.base_dir.to_string_lossy(), e))?;

        let path = self.path_for(query_hash);
        let mut snapshots = self.read_all(&path)?;
        snapshots.push(snapshot);
        if snapshots.len() > self.max_history {
            let drop_count = snapshots.len() - self.max_history;
            snapshots.drain(0..drop_count);
        }

        let mut content = String::new();
        for snapshot in &snapshots {
            let line = serde_json::to_string(snapshot)
                .map_err(|e| file_write_error(&path.to_string_lossy(), std::io::Error::other(e)))?;
            content.push_str(&line);
            content.push('\n');
        }
        fs::write(&path, content).map_err(|e| file_write_error(&path.to_string_lossy(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, FrozenClock};

    fn sample_snapshot(hash: &str, clock: &FrozenClock) -> BaselineSnapshot {
        BaselineSnapshot {
            query_hash: hash.to_string(),
            timestamp: clock.now(),
            composite_score: 80.0,
            grade: "B".to_string(),
            execution_time_ms: 100.0,
            rows_examined: 10_000,
            time_per_row: 0.01,
            complexity: ComplexityClass::Linear,
            access_type: AccessType::TableScan,
            indexes_used: Vec::new(),
            finding_counts: HashMap::new(),
            table_size: Some(10_000),
            buffer_pool_utilization: Some(0.6),
            is_cold_cache: Some(false)
        }
    }

    #[test]
    fn in_memory_store_enforces_fifo_retention() {
        let store = InMemoryBaselineStore::new(3);
        let clock = FrozenClock::at_epoch_plus_days(0);
        for i in 0..5 {
            store
                .save("abc", sample_snapshot(&format!("abc-{i}"), &clock))
                .unwrap();
        }
        let history = store.history("abc", 10).unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].query_hash, "abc-2");
    }

    #[test]
    fn file_store_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileBaselineStore::new(dir.path(), 10);
        let clock = FrozenClock::at_epoch_plus_days(1);
        store.save("q1", sample_snapshot("q1", &clock)).unwrap();
        store.save("q1", sample_snapshot("q1", &clock)).unwrap();
        let history = store.history("q1", 10).unwrap();
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn file_store_enforces_retention_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileBaselineStore::new(dir.path(), 2);
        let clock = FrozenClock::at_epoch_plus_days(2);
        for _ in 0..5 {
            store.save("q2", sample_snapshot("q2", &clock)).unwrap();
        }
        let history = store.history("q2", 10).unwrap();
        assert_eq!(history.len(), 2);
    }
}
