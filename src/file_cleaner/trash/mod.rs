//! Moves selected items to the trash, re-validating each one, and keeps the
//! last batch around for a best-effort undo.

mod audit;
mod backend;
mod record;

use std::fs;
use std::path::Path;
use std::sync::Arc;

use log::{error, info, warn};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use super::errors::{CleanerError, Result};
use super::protection::{canonical_path, is_protected_for_mutation};
use super::types::CandidateItem;
use super::volume::VolumeTable;
use crate::config::CleanerSettings;

pub use audit::AuditLog;
pub use backend::{HomeTrash, TrashBackend};
pub use record::{BatchSummary, TrashRecord};

const PROTECTED_PATH_MESSAGE: &str = "Protected system path";
const NON_LOCAL_MESSAGE: &str = "Non-local volume (no Trash support)";

pub struct TrashManager {
    audit: Arc<AuditLog>,
    backend: Box<dyn TrashBackend>,
    /// Persisted safety setting; when set, no caller can force a real move.
    enforce_dry_run: bool,
    /// Holding this lock for a whole operation keeps trash and undo calls
    /// on one manager from interleaving.
    last_batch: Mutex<Vec<TrashRecord>>,
}

impl std::fmt::Debug for TrashManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrashManager")
            .field("audit", &self.audit.path())
            .field("enforce_dry_run", &self.enforce_dry_run)
            .finish()
    }
}

impl TrashManager {
    pub fn new(
        audit: Arc<AuditLog>,
        backend: Box<dyn TrashBackend>,
        settings: &CleanerSettings,
    ) -> Self {
        TrashManager {
            audit,
            backend,
            enforce_dry_run: settings.dry_run,
            last_batch: Mutex::new(Vec::new()),
        }
    }

    /// Default audit log location and the user's home trash.
    pub fn open_default(settings: &CleanerSettings) -> Result<Self> {
        Ok(Self::new(
            Arc::new(AuditLog::open_default()?),
            Box::new(HomeTrash::new()?),
            settings,
        ))
    }

    /// Trash `items` one by one. Failures are recorded and the batch goes on;
    /// cancellation stops before the next unprocessed item. Every record is
    /// in the audit log before this returns, and the batch becomes the new
    /// undo target.
    pub async fn trash(
        &self,
        items: &[CandidateItem],
        dry_run: bool,
        cancel: &CancellationToken,
    ) -> Vec<TrashRecord> {
        let mut last_batch = self.last_batch.lock().await;
        let dry_run = dry_run || self.enforce_dry_run;
        let volumes = VolumeTable::snapshot();
        let mut records = Vec::with_capacity(items.len());

        for item in items {
            if cancel.is_cancelled() {
                info!(
                    target: "trash",
                    "Trash batch cancelled after {} of {} items",
                    records.len(),
                    items.len()
                );
                break;
            }
            let record = self.trash_one(item, dry_run, &volumes);
            self.record(&record);
            records.push(record);
        }

        *last_batch = records.clone();
        records
    }

    fn trash_one(&self, item: &CandidateItem, dry_run: bool, volumes: &VolumeTable) -> TrashRecord {
        let path = item.path.as_path();
        let record = TrashRecord::for_candidate(item, dry_run);

        // re-checked on the resolved path: a link swapped in since the scan
        // must not redirect the move
        if is_protected_for_mutation(path) {
            warn!(target: "trash", "Refusing to trash protected path {}", path.display());
            return record.failed(PROTECTED_PATH_MESSAGE);
        }

        let resolved = canonical_path(path).unwrap_or_else(|| path.to_path_buf());
        if !volumes.is_local(&resolved) {
            return record.failed(NON_LOCAL_MESSAGE);
        }

        if dry_run {
            return record.succeeded(None);
        }

        match self.backend.move_to_trash(path) {
            Ok(trashed) => {
                info!(target: "trash", "Moved {} to {}", path.display(), trashed.display());
                record.succeeded(Some(trashed.to_string_lossy().to_string()))
            }
            Err(err) => {
                let err = CleanerError::from_move_error(path.to_path_buf(), err);
                warn!(target: "trash", "{}", err);
                record.failed(err.to_string())
            }
        }
    }

    /// Move every real, successful item of the last batch back. Items whose
    /// original path is occupied again are skipped, never overwritten, and
    /// stay in the batch so a later undo can retry them.
    pub async fn undo_last_batch(&self) -> Vec<TrashRecord> {
        let mut last_batch = self.last_batch.lock().await;
        let batch = std::mem::take(&mut *last_batch);
        let mut results = Vec::new();

        for original in batch.into_iter().filter(|r| r.success && !r.dry_run) {
            let Some(trashed) = original.trashed_path.clone() else {
                continue;
            };
            let destination = Path::new(&original.original_path);
            if fs::symlink_metadata(destination).is_ok() {
                info!(
                    target: "trash",
                    "Not restoring {}: something already exists there",
                    destination.display()
                );
                last_batch.push(original);
                continue;
            }

            let undo = TrashRecord::undo_of(&original);
            let undo = match self.backend.restore(Path::new(&trashed), destination) {
                Ok(()) => undo.succeeded(Some(trashed)),
                Err(err) => {
                    warn!(target: "trash", "Undo of {} failed: {}", destination.display(), err);
                    undo.failed(err.to_string())
                }
            };
            self.record(&undo);
            results.push(undo);
        }

        results
    }

    pub fn recent_audit(&self, limit: usize) -> Vec<TrashRecord> {
        self.audit.read_recent(limit)
    }

    pub fn audit_log_path(&self) -> &Path {
        self.audit.path()
    }

    fn record(&self, record: &TrashRecord) {
        if let Err(err) = self.audit.append(record) {
            error!(target: "audit", "AuditLog append failed: {}", err);
        }
    }
}
