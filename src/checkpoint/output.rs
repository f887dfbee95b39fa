//! Resumable batch output files.
//!
//! Epistemic foundation:
//! - K_i: The output file is a JSON list and is valid after every persist
//! - K_i: Persist rewrites the full accumulated collection (atomic)
//! - B_i: A prior output file may exist → resume from it
//! - I^B: Crash between persists → at most the in-flight group is lost

use super::write_json_atomic;
use crate::models::{CorpusError, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Accumulated batch results bound to their output file.
#[derive(Debug)]
pub struct BatchOutput<T> {
    path: PathBuf,
    records: Vec<T>,
    persists: usize,
}

impl<T: Serialize + DeserializeOwned> BatchOutput<T> {
    /// Start empty, ignoring whatever is on disk (overwritten at first persist).
    pub fn fresh(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            records: Vec::new(),
            persists: 0,
        }
    }

    /// Load prior results from `path` if it exists.
    ///
    /// An existing file that is not a list of records is a validation error;
    /// it is never silently overwritten.
    pub fn resume(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::fresh(path));
        }

        let content =
            fs::read_to_string(path).map_err(|e| CorpusError::io("reading prior output", e))?;
        let value: serde_json::Value = serde_json::from_str(&content).map_err(|e| {
            CorpusError::validation(format!(
                "prior output {} is not valid JSON ({e}); move it aside or run with --fresh",
                path.display()
            ))
        })?;
        if !value.is_array() {
            return Err(CorpusError::validation(format!(
                "prior output {} is not a JSON list; move it aside or run with --fresh",
                path.display()
            )));
        }
        let records: Vec<T> = serde_json::from_value(value).map_err(|e| {
            CorpusError::validation(format!(
                "prior output {} has malformed records: {e}",
                path.display()
            ))
        })?;

        info!(path = %path.display(), records = records.len(), "Resuming from prior output");
        Ok(Self {
            path: path.to_path_buf(),
            records,
            persists: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> &[T] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn push(&mut self, record: T) {
        self.records.push(record);
    }

    /// Replace the record at `position`, or append when there is none.
    pub fn upsert(&mut self, position: Option<usize>, record: T) {
        match position.and_then(|idx| self.records.get_mut(idx)) {
            Some(slot) => *slot = record,
            None => self.records.push(record),
        }
    }

    /// Number of persists issued by this handle.
    pub fn persists(&self) -> usize {
        self.persists
    }

    /// Write the full accumulated collection.
    pub fn persist(&mut self) -> Result<()> {
        write_json_atomic(&self.path, &self.records)?;
        self.persists += 1;
        debug!(path = %self.path.display(), records = self.records.len(), "Output persisted");
        Ok(())
    }
}
