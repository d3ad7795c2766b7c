//! Append-only JSONL record store.
//!
//! One record per line, UTF-8, newline-terminated.  Lines are only ever
//! appended, never rewritten; each append is a single `write_all` of a
//! complete line so readers can only ever observe a torn *last* line (an
//! append in progress), never a torn interior line.
//!
//! The file is opened, written and closed per append — an interrupted run
//! leaves the store consistent up to the last completed append.  No
//! cross-process locking is attempted; usage is single-writer-per-file.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::record::Record;

// ---------------------------------------------------------------------------
// StoreError
// ---------------------------------------------------------------------------

/// Errors surfaced by the record store.
///
/// An `Io` or `Serialize` failure on append means acquired data was lost for
/// that item — callers must report it loudly, not swallow it.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("record serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// An interior line failed to parse.  A torn final line is tolerated
    /// (append in progress); a torn interior line means real corruption.
    #[error("corrupt store line {line}: {message}")]
    Corrupt { line: usize, message: String },
}

// ---------------------------------------------------------------------------
// JsonlStore
// ---------------------------------------------------------------------------

/// Handle to an append-only JSONL store file.
///
/// # Example
///
/// ```rust,no_run
/// use speech_ingest::store::JsonlStore;
/// # fn demo(record: speech_ingest::record::Record) -> Result<(), speech_ingest::store::StoreError> {
/// let store = JsonlStore::new("out/records.jsonl");
/// store.append(&record)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct JsonlStore {
    path: PathBuf,
}

impl JsonlStore {
    /// Create a handle.  The file itself is created lazily on first append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the underlying store file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serialize `record` to one line and append it.
    ///
    /// Parent directories are created as needed.  The file is opened in
    /// append mode so independent runs writing to the same file cannot
    /// clobber each other's bytes, and closed again before returning.
    pub fn append(&self, record: &Record) -> Result<(), StoreError> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        // One write call per record keeps line-level atomicity at the OS
        // write granularity.
        file.write_all(line.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    /// Read back every committed record.
    ///
    /// A final line without a trailing newline that fails to parse is
    /// treated as "last record not yet committed" and skipped.  A
    /// non-parsing interior line is [`StoreError::Corrupt`].
    pub fn read_records(&self) -> Result<Vec<Record>, StoreError> {
        read_records(&self.path)
    }
}

/// Free-function form of [`JsonlStore::read_records`] for consumers that
/// only hold a path.
pub fn read_records(path: &Path) -> Result<Vec<Record>, StoreError> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let terminated = content.ends_with('\n');
    let lines: Vec<&str> = content.lines().collect();
    let mut records = Vec::with_capacity(lines.len());

    for (i, raw) in lines.iter().enumerate() {
        if raw.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Record>(raw) {
            Ok(rec) => records.push(rec),
            Err(e) => {
                let is_last = i + 1 == lines.len();
                if is_last && !terminated {
                    // Append in progress when the snapshot was taken.
                    log::debug!("store: ignoring torn final line in {}", path.display());
                    continue;
                }
                return Err(StoreError::Corrupt {
                    line: i + 1,
                    message: e.to_string(),
                });
            }
        }
    }

    Ok(records)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
