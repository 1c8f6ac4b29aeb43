//! Append-only NDJSON storage for collected log entries.
//!
//! The store owns the log file and the in-memory entry counter. Both are
//! guarded by a single mutex so that the counter increment and the
//! corresponding line append happen as one unit, keeping appends atomic at
//! line granularity under concurrent ingests.

use std::fs::{self, File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::debug;

use super::entry::{LogEntry, generate_id};

struct StoreInner {
    file: File,
    count: u64,
}

/// Thread-safe handle to the NDJSON log file.
///
/// Cloning is cheap; all clones share the same file handle and counter.
#[derive(Clone)]
pub struct LogStore {
    path: PathBuf,
    inner: Arc<Mutex<StoreInner>>,
}

impl LogStore {
    /// Open the store, creating the parent directory if needed and
    /// truncating any pre-existing file content. Entries from a previous
    /// run never leak into a new one.
    pub fn open(path: &Path) -> Result<Self, String> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| format!("Failed to create log directory: {e}"))?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .map_err(|e| format!("Failed to open log file {}: {e}", path.display()))?;

        debug!(path = %path.display(), "Log store opened");

        Ok(Self {
            path: path.to_path_buf(),
            inner: Arc::new(Mutex::new(StoreInner { file, count: 0 })),
        })
    }

    /// Assign server-side metadata and append the entry as one NDJSON line.
    ///
    /// `serverTimestamp` is always overwritten; `id` is filled only when the
    /// caller did not supply one. Returns the sequence number of the entry
    /// (1-based since the last start/clear) and the entry as persisted.
    pub fn append(&self, mut entry: LogEntry) -> Result<(u64, LogEntry), String> {
        let now_ms = chrono::Utc::now().timestamp_millis();
        entry.server_timestamp = Some(now_ms);
        if entry.id.is_none() {
            entry.id = Some(generate_id(now_ms));
        }

        let mut line = serde_json::to_string(&entry)
            .map_err(|e| format!("Failed to serialize log entry: {e}"))?;
        line.push('\n');

        let mut inner = self.inner.lock().map_err(|e| format!("Lock error: {e}"))?;
        inner
            .file
            .write_all(line.as_bytes())
            .map_err(|e| format!("Failed to append log entry: {e}"))?;
        inner.count += 1;

        Ok((inner.count, entry))
    }

    /// Read the full log file contents. Returns an empty string if the file
    /// does not exist. A read racing with in-flight appends is a best-effort
    /// snapshot; complete lines are never torn.
    pub fn read_all(&self) -> Result<String, String> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(format!("Failed to read log file: {e}")),
        }
    }

    /// Truncate the log file and reset the entry counter to zero.
    pub fn clear(&self) -> Result<(), String> {
        let mut inner = self.inner.lock().map_err(|e| format!("Lock error: {e}"))?;
        inner
            .file
            .set_len(0)
            .map_err(|e| format!("Failed to truncate log file: {e}"))?;
        // The write cursor must follow the truncation or the next append
        // would leave a hole of null bytes.
        inner
            .file
            .seek(SeekFrom::Start(0))
            .map_err(|e| format!("Failed to rewind log file: {e}"))?;
        inner.count = 0;
        debug!(path = %self.path.display(), "Log store cleared");
        Ok(())
    }

    /// Number of entries received since the last start/clear.
    pub fn count(&self) -> Result<u64, String> {
        let inner = self.inner.lock().map_err(|e| format!("Lock error: {e}"))?;
        Ok(inner.count)
    }

    /// Path of the backing NDJSON file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
