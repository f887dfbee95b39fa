//! Per-worker annotation store.
//!
//! Epistemic foundation:
//! - K_i: One JSON array per worker at `scripts_<worker>.json`
//! - K_i: Canonical order is insertion order; a position indexes into it
//! - K_i: Every mutation is persisted (full overwrite) before it returns
//! - B_i: The backing file may be hand-edited or corrupt → back it up, start empty
//! - I^B: Two processes writing the same worker file are not guarded against

use crate::checkpoint::write_json_atomic;
use crate::models::{CategoryCounts, CorpusError, Result, ScriptRecord};
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

const FILE_PREFIX: &str = "scripts_";
const FILE_SUFFIX: &str = ".json";

/// Check a worker name and return it trimmed.
pub fn validate_worker_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CorpusError::validation("worker name must not be empty"));
    }
    if name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(CorpusError::validation(format!(
            "worker name '{name}' must not contain path separators"
        )));
    }
    Ok(name)
}

/// Backing file name for a worker.
pub fn store_filename(worker: &str) -> String {
    format!("{FILE_PREFIX}{worker}{FILE_SUFFIX}")
}

/// Parse a JSON value as a list of valid records.
fn records_from_value(value: serde_json::Value) -> Result<Vec<ScriptRecord>> {
    let serde_json::Value::Array(items) = value else {
        return Err(CorpusError::validation("expected a JSON list of scripts"));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(idx, item)| {
            let record: ScriptRecord = serde_json::from_value(item)
                .map_err(|e| CorpusError::validation(format!("script #{idx}: {e}")))?;
            record
                .validate()
                .map_err(|e| CorpusError::validation(format!("script #{idx}: {e}")))?;
            Ok(record)
        })
        .collect()
}

/// One worker's labeled scripts, bound to their backing file.
#[derive(Debug)]
pub struct AnnotationStore {
    worker: String,
    path: PathBuf,
    records: Vec<ScriptRecord>,
}

impl AnnotationStore {
    /// Load `worker`'s store from `dir`.
    ///
    /// A missing file gives an empty store. A file that is not a JSON list is
    /// copied to `<file>.corrupt` and the store starts empty. A list holding
    /// malformed scripts is a validation error and the file is left alone.
    pub fn load(dir: &Path, worker: &str) -> Result<Self> {
        let worker = validate_worker_name(worker)?;
        let path = dir.join(store_filename(worker));

        let records = if path.exists() {
            Self::read_records(&path)?
        } else {
            debug!(worker = worker, "No store file yet, starting empty");
            Vec::new()
        };

        info!(worker = worker, scripts = records.len(), "Store loaded");
        Ok(Self {
            worker: worker.to_string(),
            path,
            records,
        })
    }

    fn read_records(path: &Path) -> Result<Vec<ScriptRecord>> {
        let content =
            fs::read_to_string(path).map_err(|e| CorpusError::io("reading store file", e))?;

        match serde_json::from_str::<serde_json::Value>(&content) {
            Ok(value) if value.is_array() => records_from_value(value).map_err(|e| {
                CorpusError::validation(format!("{}: {e}", path.display()))
            }),
            other => {
                let reason = match other {
                    Ok(_) => "top-level value is not a list".to_string(),
                    Err(e) => e.to_string(),
                };
                let backup = corrupt_path(path);
                fs::copy(path, &backup).map_err(|e| CorpusError::io("backing up corrupt store", e))?;
                warn!(
                    path = %path.display(),
                    backup = %backup.display(),
                    reason = %reason,
                    "Store file is corrupt, starting empty"
                );
                Ok(Vec::new())
            }
        }
    }

    /// Workers with an existing store file in `dir`, sorted.
    pub fn list_workers(dir: &Path) -> Result<Vec<String>> {
        let pattern = dir.join(format!("{FILE_PREFIX}*{FILE_SUFFIX}"));
        let pattern_str = pattern.to_string_lossy();

        let mut workers: Vec<String> = glob::glob(&pattern_str)
            .map_err(|e| CorpusError::Internal(format!("Invalid glob pattern: {e}")))?
            .filter_map(|r| r.ok())
            .filter_map(|p| {
                let name = p.file_name()?.to_str()?;
                let worker = name.strip_prefix(FILE_PREFIX)?.strip_suffix(FILE_SUFFIX)?;
                (!worker.is_empty()).then(|| worker.to_string())
            })
            .collect();
        workers.sort();
        Ok(workers)
    }

    pub fn worker(&self) -> &str {
        &self.worker
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Canonical insertion order.
    pub fn records(&self) -> &[ScriptRecord] {
        &self.records
    }

    /// Display view: newest first, each paired with its canonical position.
    pub fn list(&self) -> Vec<(usize, &ScriptRecord)> {
        self.records.iter().enumerate().rev().collect()
    }

    /// Append a record and persist. Returns the new count.
    pub fn append(&mut self, mut record: ScriptRecord) -> Result<usize> {
        record.validate()?;
        record.id.get_or_insert_with(|| Uuid::new_v4().to_string());
        record.created_at.get_or_insert_with(Utc::now);

        self.records.push(record);
        if let Err(e) = self.persist() {
            self.records.pop();
            return Err(e);
        }

        debug!(worker = %self.worker, count = self.records.len(), "Script appended");
        Ok(self.records.len())
    }

    /// Remove the record at canonical `position` and persist.
    pub fn delete_at(&mut self, position: usize) -> Result<ScriptRecord> {
        if position >= self.records.len() {
            return Err(CorpusError::IndexRange {
                index: position,
                len: self.records.len(),
            });
        }

        let removed = self.records.remove(position);
        if let Err(e) = self.persist() {
            self.records.insert(position, removed);
            return Err(e);
        }

        debug!(worker = %self.worker, position = position, "Script deleted");
        Ok(removed)
    }

    /// Counts over `labels`, with out-of-set categories counted separately.
    pub fn category_counts(&self, labels: &[String]) -> CategoryCounts {
        CategoryCounts::tally(labels, &self.records)
    }

    /// Replace the whole store with `value`, which must be a list of scripts.
    ///
    /// Invalid input leaves the store and its file untouched.
    pub fn bulk_replace(&mut self, value: serde_json::Value) -> Result<usize> {
        let records = records_from_value(value)?;
        write_json_atomic(&self.path, &records)?;
        self.records = records;

        info!(worker = %self.worker, scripts = self.records.len(), "Store replaced");
        Ok(self.records.len())
    }

    /// Read a JSON file and apply `bulk_replace`.
    pub fn import_file(&mut self, path: &Path) -> Result<usize> {
        let content =
            fs::read_to_string(path).map_err(|e| CorpusError::io("reading import file", e))?;
        let value: serde_json::Value = serde_json::from_str(&content)
            .map_err(|e| CorpusError::validation(format!("{}: {e}", path.display())))?;
        self.bulk_replace(value)
    }

    /// Write the canonical list to `path`. Returns the number written.
    pub fn export(&self, path: &Path) -> Result<usize> {
        write_json_atomic(path, &self.records)?;
        Ok(self.records.len())
    }

    fn persist(&self) -> Result<()> {
        write_json_atomic(&self.path, &self.records)
    }
}

fn corrupt_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".corrupt");
    PathBuf::from(name)
}
