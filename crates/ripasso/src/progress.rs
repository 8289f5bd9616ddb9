//! Completion tracking for study tasks.
//!
//! The whole record lives as one JSON object under a single key, the same
//! shape the page keeps in `localStorage`: `{"<task id>": true, ...}`.

use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, warn};

use crate::plan::plan_tasks;
use crate::types::StudyDay;

/// Key the record is stored under, shared with the page script
pub const PROGRESS_KEY: &str = "h3exam_progress";

/// Completed task ids; only `true` entries are ever written
pub type ProgressRecord = BTreeMap<String, bool>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Minimal string key-value storage, the only durable state of the planner
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Volatile store, used in tests
#[cfg(test)]
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: std::collections::HashMap<String, String>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }
}

/// Completion counts for a plan
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Readiness {
    pub completed: usize,
    pub total: usize,
    pub percent: u8,
}

impl Readiness {
    pub fn of(days: &[StudyDay], record: &ProgressRecord) -> Self {
        let mut total = 0;
        let mut completed = 0;
        for task in plan_tasks(days) {
            total += 1;
            if record.get(&task.id).copied().unwrap_or(false) {
                completed += 1;
            }
        }

        let percent = if total == 0 {
            0
        } else {
            (completed as f64 / total as f64 * 100.0).round() as u8
        };

        Self {
            completed,
            total,
            percent,
        }
    }
}

/// Rounded percentage of completed tasks; 0 for an empty plan
pub fn compute_progress(days: &[StudyDay], record: &ProgressRecord) -> u8 {
    Readiness::of(days, record).percent
}

/// Parse a stored record.
///
/// Entries whose value is not `true` are skipped one by one; only a record
/// that is not a JSON object at all is treated as empty.
pub fn parse_record(raw: &str) -> ProgressRecord {
    match serde_json::from_str::<BTreeMap<String, serde_json::Value>>(raw) {
        Ok(values) => {
            let total = values.len();
            let record: ProgressRecord = values
                .into_iter()
                .filter(|(_, value)| value.as_bool() == Some(true))
                .map(|(id, _)| (id, true))
                .collect();
            if record.len() < total {
                debug!(skipped = total - record.len(), "Skipped non-true progress entries");
            }
            record
        }
        Err(e) => {
            warn!(error = %e, "Ignoring malformed progress record");
            ProgressRecord::new()
        }
    }
}

/// Reads and flips task completion in a key-value store
pub struct ProgressTracker<S> {
    store: S,
}

impl<S: KeyValueStore> ProgressTracker<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Load the record. Missing or malformed data yields an empty record;
    /// only a failing store is an error.
    pub fn load(&self) -> Result<ProgressRecord, StoreError> {
        let record = match self.store.get(PROGRESS_KEY)? {
            Some(raw) => parse_record(&raw),
            None => ProgressRecord::new(),
        };
        Ok(record)
    }

    #[cfg(test)]
    pub fn is_completed(&self, task_id: &str) -> Result<bool, StoreError> {
        Ok(self.load()?.get(task_id).copied().unwrap_or(false))
    }

    /// Flip a task and write the full record back. Returns the new state.
    pub fn toggle(&mut self, task_id: &str) -> Result<bool, StoreError> {
        let mut record = self.load()?;
        let completed = if record.get(task_id).copied().unwrap_or(false) {
            record.remove(task_id);
            false
        } else {
            record.insert(task_id.to_string(), true);
            true
        };

        self.save(&record)?;
        debug!(task_id, completed, "Toggled task");
        Ok(completed)
    }

    pub fn save(&mut self, record: &ProgressRecord) -> Result<(), StoreError> {
        let json = serde_json::to_string(record)?;
        self.store.set(PROGRESS_KEY, &json)
    }

    /// Forget every completed task. Returns how many were cleared.
    pub fn clear(&mut self) -> Result<usize, StoreError> {
        let cleared = self.load()?.len();
        self.save(&ProgressRecord::new())?;
        Ok(cleared)
    }

    pub fn readiness(&self, days: &[StudyDay]) -> Result<Readiness, StoreError> {
        Ok(Readiness::of(days, &self.load()?))
    }

    #[cfg(test)]
    pub fn into_store(self) -> S {
        self.store
    }
}
