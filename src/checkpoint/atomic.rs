//! Atomic whole-file JSON writes.
//!
//! K_i: Readers never observe a half-written file (write-then-rename).
//! K_i: Every write is the complete collection; there is no append mode.

use crate::models::{CorpusError, Result};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Sibling temp path in the same directory, so the rename stays on one filesystem.
fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    path.with_file_name(format!(".{name}.tmp"))
}

/// Serialize `value` as pretty JSON to `path`, replacing any previous content.
///
/// Non-ASCII text is written as-is. Parent directories are created on demand.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| CorpusError::io("creating output dir", e))?;
    }

    let temp = temp_path(path);
    {
        let file = File::create(&temp).map_err(|e| CorpusError::io("creating temp file", e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, value)
            .map_err(|e| CorpusError::Internal(format!("Serializing {}: {e}", path.display())))?;
        writer
            .flush()
            .map_err(|e| CorpusError::io("flushing temp file", e))?;
        writer
            .get_ref()
            .sync_all()
            .map_err(|e| CorpusError::io("syncing temp file", e))?;
    }

    fs::rename(&temp, path).map_err(|e| CorpusError::io("renaming temp file", e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_creates_parents_and_overwrites() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("out.json");

        write_json_atomic(&path, &vec!["a", "b"]).unwrap();
        write_json_atomic(&path, &vec!["김치"]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("김치"));
        let value: Vec<String> = serde_json::from_str(&content).unwrap();
        assert_eq!(value, vec!["김치"]);
        assert!(!temp_path(&path).exists());
    }
}
