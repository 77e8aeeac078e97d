//! Persistent storage for request history.
//!
//! Entries are kept in JSONL (JSON Lines) format: appending is a single
//! write, and a corrupted line only loses that one entry.

use super::models::{HistoryEntry, HistoryError};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// Appends entries to the history file, creating it (and its parent
/// directory) if needed. Entries are sanitized and truncated first.
pub fn append_entries(path: &Path, entries: &[HistoryEntry]) -> Result<(), HistoryError> {
    if entries.is_empty() {
        return Ok(());
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    for entry in entries {
        let json = serde_json::to_string(&entry.clone().prepare_for_storage())?;
        writeln!(file, "{}", json)?;
    }
    file.flush()?;

    log::debug!("Appended {} history entries to {}", entries.len(), path.display());
    Ok(())
}

/// Loads all history entries, oldest first.
///
/// A missing file is an empty history. Lines that fail to parse are skipped
/// with a warning.
pub fn load_history(path: &Path) -> Result<Vec<HistoryEntry>, HistoryError> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let reader = BufReader::new(File::open(path)?);
    let mut entries = Vec::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<HistoryEntry>(&line) {
            Ok(entry) => entries.push(entry),
            Err(e) => log::warn!(
                "Skipping corrupted history entry at line {}: {}",
                line_num + 1,
                e
            ),
        }
    }

    entries.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    Ok(entries)
}

/// Keeps only the newest `max_entries` entries.
///
/// Returns the number of entries removed. The file is rewritten through a
/// temporary file and renamed into place.
pub fn maintain_history_limit(path: &Path, max_entries: usize) -> Result<usize, HistoryError> {
    let entries = load_history(path)?;
    if entries.len() <= max_entries {
        return Ok(0);
    }

    let removed = entries.len() - max_entries;
    let temp_path = path.with_extension("json.tmp");
    let mut temp_file = File::create(&temp_path)?;
    for entry in &entries[removed..] {
        writeln!(temp_file, "{}", serde_json::to_string(entry)?)?;
    }
    temp_file.flush()?;
    drop(temp_file);

    fs::rename(&temp_path, path)?;
    log::debug!("Trimmed {} old history entries", removed);
    Ok(removed)
}

/// Deletes the history file. A missing file is not an error.
pub fn clear_history(path: &Path) -> Result<(), HistoryError> {
    if path.exists() {
        fs::remove_file(path)?;
    }
    Ok(())
}
