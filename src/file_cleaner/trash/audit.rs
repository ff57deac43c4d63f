use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use lazy_static::lazy_static;
use log::warn;

use super::record::TrashRecord;
use crate::file_cleaner::errors::Result;

const AUDIT_FILE: &str = "audit.log";

lazy_static! {
    /// One writer lock per log file, shared by every `AuditLog` opened on it.
    static ref WRITER_LOCKS: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>> = Mutex::new(HashMap::new());
}

/// Append-only JSON-lines log of every trash and undo attempt.
///
/// Each line is an independently parseable record. Existing lines are never
/// rewritten, and a line left incomplete by a crash cannot hide the ones
/// before it.
#[derive(Debug)]
pub struct AuditLog {
    path: PathBuf,
    writer: Arc<Mutex<()>>,
}

impl AuditLog {
    /// The process-wide log in the application data directory.
    pub fn open_default() -> Result<Self> {
        Ok(Self::at(crate::config::app_data_dir()?.join(AUDIT_FILE)))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let writer = writer_lock_for(&path);
        AuditLog { path, writer }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, record: &TrashRecord) -> Result<()> {
        let _guard = self.lock_writer();

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&self.path)?;

        // a torn final line must not swallow the next record
        if file.metadata()?.len() > 0 {
            let mut last = [0u8; 1];
            file.seek(SeekFrom::End(-1))?;
            file.read_exact(&mut last)?;
            if last[0] != b'\n' {
                line.insert(0, b'\n');
            }
        }

        file.write_all(&line)?;
        file.sync_data()?;
        Ok(())
    }

    /// Up to `limit` of the newest lines, newest first. Lines that fail to
    /// parse are skipped.
    pub fn read_recent(&self, limit: usize) -> Vec<TrashRecord> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == ErrorKind::NotFound => return Vec::new(),
            Err(err) => {
                warn!(target: "audit", "Failed to read audit log {}: {}", self.path.display(), err);
                return Vec::new();
            }
        };
        let text = String::from_utf8_lossy(&data);
        let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
        let start = lines.len().saturating_sub(limit);

        lines[start..]
            .iter()
            .rev()
            .filter_map(|line| serde_json::from_str::<TrashRecord>(line).ok())
            .collect()
    }

    fn lock_writer(&self) -> MutexGuard<'_, ()> {
        self.writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn writer_lock_for(path: &Path) -> Arc<Mutex<()>> {
    // the file may not exist yet, so key by the canonical parent when possible
    let key = match (path.parent().and_then(|p| fs::canonicalize(p).ok()), path.file_name()) {
        (Some(parent), Some(name)) => parent.join(name),
        _ => path.to_path_buf(),
    };
    let mut locks = WRITER_LOCKS
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    Arc::clone(locks.entry(key).or_default())
}
