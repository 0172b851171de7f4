//! Completed-workout hand-off.
//!
//! The tracker produces one flat `WorkoutRecord` per session; where it ends up
//! is up to the `WorkoutStore` implementation.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use uuid::Uuid;

use crate::error::StorageError;
use crate::models::WorkoutRecord;

/// Destination for completed workouts, keyed by user and session
pub trait WorkoutStore {
    /// Store `record`; saving the same `session_id` again replaces it
    fn save(&mut self, record: &WorkoutRecord) -> Result<(), StorageError>;

    /// All workouts of `user_id`, oldest first
    fn load_user(&self, user_id: &str) -> Result<Vec<WorkoutRecord>, StorageError>;
}

/// Keeps records in memory; for tests and ephemeral use
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: HashMap<String, Vec<WorkoutRecord>>,
}

impl WorkoutStore for MemoryStore {
    fn save(&mut self, record: &WorkoutRecord) -> Result<(), StorageError> {
        let records = self.records.entry(record.user_id.clone()).or_default();
        records.retain(|existing| existing.session_id != record.session_id);
        records.push(record.clone());
        Ok(())
    }

    fn load_user(&self, user_id: &str) -> Result<Vec<WorkoutRecord>, StorageError> {
        let mut records = self.records.get(user_id).cloned().unwrap_or_default();
        records.sort_by_key(|record| record.started_at);
        Ok(records)
    }
}

/// One JSON-lines file per user under a data directory.
///
/// The file is append-only; a re-saved session is written as a new line and
/// the latest line for each `session_id` wins on load.
#[derive(Debug, Clone)]
pub struct JsonLinesStore {
    data_dir: PathBuf,
}

impl JsonLinesStore {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    /// File holding `user_id`'s workouts
    pub fn user_file(&self, user_id: &str) -> PathBuf {
        let safe: String = user_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.data_dir.join(format!("workouts_{}.jsonl", safe))
    }
}

impl WorkoutStore for JsonLinesStore {
    fn save(&mut self, record: &WorkoutRecord) -> Result<(), StorageError> {
        let path = self.user_file(&record.user_id);
        let write_failed = |reason: String| StorageError::WriteFailed {
            path: path.clone(),
            reason,
        };

        fs::create_dir_all(&self.data_dir).map_err(|e| write_failed(e.to_string()))?;
        let line = serde_json::to_string(record).map_err(|e| write_failed(e.to_string()))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| write_failed(e.to_string()))?;
        writeln!(file, "{}", line).map_err(|e| write_failed(e.to_string()))?;

        info!(
            session_id = %record.session_id,
            path = %path.display(),
            "Workout saved"
        );
        Ok(())
    }

    fn load_user(&self, user_id: &str) -> Result<Vec<WorkoutRecord>, StorageError> {
        let path = self.user_file(user_id);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let file = fs::File::open(&path).map_err(|e| StorageError::ReadFailed {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        let mut records: Vec<WorkoutRecord> = Vec::new();
        let mut latest: HashMap<Uuid, usize> = HashMap::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| StorageError::ReadFailed {
                path: path.clone(),
                reason: e.to_string(),
            })?;
            if line.trim().is_empty() {
                continue;
            }
            let record: WorkoutRecord =
                serde_json::from_str(&line).map_err(|e| StorageError::CorruptRecord {
                    line: index + 1,
                    reason: e.to_string(),
                })?;
            if record.user_id != user_id {
                warn!(line = index + 1, "Skipping record of another user");
                continue;
            }
            // later lines supersede earlier ones for the same session
            match latest.get(&record.session_id).copied() {
                Some(slot) => records[slot] = record,
                None => {
                    latest.insert(record.session_id, records.len());
                    records.push(record);
                }
            }
        }

        records.sort_by_key(|record| record.started_at);
        Ok(records)
    }
}
