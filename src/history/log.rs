//! Durable append-only storage for history records
//!
//! One JSONL file is the entire durable state. Appends add one line; the only
//! deletion mechanism is a whole-file rewrite. Every mutation goes through the
//! instance's writer lock so a delete's read-filter-rewrite can never lose a
//! concurrent append.

use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use tokio::sync::Mutex;

use crate::error::{DeckError, Result};

use super::record::MessageRecord;

/// Append-only JSONL store over a single history file
pub struct MessageLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl MessageLog {
    /// Create a log over the given file path; nothing is touched on disk
    /// until the first append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the underlying log file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the log file exists on disk
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Append one record, creating the file and its parent directory lazily.
    ///
    /// The line is flushed before this returns.
    pub async fn append(&self, record: &MessageRecord) -> Result<()> {
        let line = serde_json::to_string(record)?;
        let _guard = self.write_lock.lock().await;
        let path = self.path.clone();
        run_blocking(move || append_line_sync(&path, &line)).await
    }

    /// Read and parse every record in append order.
    ///
    /// A missing file reads as empty. Any malformed non-empty line fails the
    /// whole read with [`DeckError::CorruptRecord`].
    pub async fn read_all(&self) -> Result<Vec<MessageRecord>> {
        let path = self.path.clone();
        run_blocking(move || read_records_sync(&path)).await
    }

    /// Remove every record of one session and rewrite the file.
    ///
    /// Returns the number of removed records. Fails with `NotFound` when the
    /// log file does not exist.
    pub async fn delete_session(&self, session_id: &str) -> Result<usize> {
        let _guard = self.write_lock.lock().await;
        if !self.path.exists() {
            return Err(DeckError::not_found(format!(
                "history file {}",
                self.path.display()
            )));
        }

        let path = self.path.clone();
        let session_id = session_id.to_string();
        run_blocking(move || {
            let records = read_records_sync(&path)?;
            let before = records.len();
            let kept: Vec<MessageRecord> = records
                .into_iter()
                .filter(|record| record.session() != session_id)
                .collect();
            let removed = before - kept.len();
            rewrite_sync(&path, &kept)?;
            Ok(removed)
        })
        .await
    }
}

async fn run_blocking<T, F>(work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| DeckError::Io(std::io::Error::other(format!("task join error: {e}"))))?
}

fn read_records_sync(path: &Path) -> Result<Vec<MessageRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = fs::File::open(path)?;
    let reader = BufReader::with_capacity(64 * 1024, file);
    let mut records = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line)
            .map_err(|e| DeckError::corrupt_record(index + 1, e))?;
        records.push(record);
    }

    Ok(records)
}

fn append_line_sync(path: &Path, line: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut file = fs::OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(line.as_bytes())?;
    file.write_all(b"\n")?;
    file.flush()?;
    Ok(())
}

fn rewrite_sync(path: &Path, records: &[MessageRecord]) -> Result<()> {
    // Trailing newline only when the file is non-empty.
    let mut out = String::new();
    for record in records {
        out.push_str(&serde_json::to_string(record)?);
        out.push('\n');
    }
    fs::write(path, out)?;
    Ok(())
}
