use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::file_cleaner::{standardize_path, CleanerError, Result};

pub type OperationId = String;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum OperationStatus {
    Running,
    Completed,
    Canceled,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Scan,
    Trash,
    Undo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpState {
    pub id: OperationId,
    pub kind: OperationKind,
    pub root: Option<PathBuf>,
    pub started_at_ms: u128,
    pub status: OperationStatus,
    pub details: Option<String>,
}

/// Live operations keyed by id, each with its own cancellation token.
///
/// Scans are additionally keyed by root: a scan whose root equals, contains
/// or lies inside the root of a running scan is refused.
#[derive(Clone, Default)]
pub struct OperationRegistry {
    inner: Arc<DashMap<OperationId, (OpState, CancellationToken)>>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, kind: OperationKind) -> (OperationId, CancellationToken) {
        self.insert(kind, None)
    }

    pub fn register_scan(&self, root: &Path) -> Result<(OperationId, CancellationToken)> {
        let root = PathBuf::from(standardize_path(&root.to_string_lossy()));
        let overlapping = self.inner.iter().any(|entry| {
            let state = &entry.value().0;
            state.kind == OperationKind::Scan
                && state.status == OperationStatus::Running
                && state
                    .root
                    .as_deref()
                    .map_or(false, |active| active.starts_with(&root) || root.starts_with(active))
        });
        if overlapping {
            warn!(target: "scanner", "Refusing overlapping scan of {}", root.display());
            return Err(CleanerError::OverlappingScan(root));
        }
        Ok(self.insert(OperationKind::Scan, Some(root)))
    }

    fn insert(&self, kind: OperationKind, root: Option<PathBuf>) -> (OperationId, CancellationToken) {
        let id = uuid::Uuid::new_v4().to_string();
        let token = CancellationToken::new();
        let state = OpState {
            id: id.clone(),
            kind,
            root,
            started_at_ms: now_ms(),
            status: OperationStatus::Running,
            details: None,
        };
        debug!(target: "system", "Registered {:?} operation {}", state.kind, id);
        self.inner.insert(id.clone(), (state, token.clone()));
        (id, token)
    }

    pub fn get(&self, id: &str) -> Option<OpState> {
        self.inner.get(id).map(|e| e.0.clone())
    }

    pub fn active(&self) -> Vec<OpState> {
        self.inner.iter().map(|e| e.value().0.clone()).collect()
    }

    pub fn cancel(&self, id: &str) -> bool {
        if let Some(entry) = self.inner.get(id) {
            entry.1.cancel();
            true
        } else {
            false
        }
    }

    /// Remove the operation and return its final state. The outcome decides
    /// the status: cancellation errors count as `Canceled`.
    pub fn finish<T>(&self, id: &str, outcome: &Result<T>) -> Option<OpState> {
        let (_, (mut state, _)) = self.inner.remove(id)?;
        state.status = match outcome {
            Ok(_) => OperationStatus::Completed,
            Err(CleanerError::ScanCancelled) => OperationStatus::Canceled,
            Err(err) => {
                state.details = Some(err.to_string());
                OperationStatus::Failed
            }
        };
        Some(state)
    }
}

fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_scan_roots_are_refused() {
        let ops = OperationRegistry::new();
        let (id, _) = ops.register_scan(Path::new("/tmp/work/projects")).unwrap();

        assert!(matches!(
            ops.register_scan(Path::new("/tmp/work")),
            Err(CleanerError::OverlappingScan(_))
        ));
        assert!(matches!(
            ops.register_scan(Path::new("/tmp/work/projects/app/")),
            Err(CleanerError::OverlappingScan(_))
        ));
        let (sibling, _) = ops.register_scan(Path::new("/tmp/work/projects-old")).unwrap();

        ops.finish(&id, &Ok(()));
        assert!(matches!(
            ops.register_scan(Path::new("/tmp/work")),
            Err(CleanerError::OverlappingScan(_))
        ));
        ops.finish(&sibling, &Ok(()));
        assert!(ops.register_scan(Path::new("/tmp/work")).is_ok());
    }

    #[test]
    fn cancel_trips_the_token_and_finish_reports_status() {
        let ops = OperationRegistry::new();
        let (id, token) = ops.register(OperationKind::Trash);
        assert!(ops.cancel(&id));
        assert!(token.is_cancelled());

        let state = ops.finish::<()>(&id, &Err(CleanerError::ScanCancelled)).unwrap();
        assert_eq!(state.status, OperationStatus::Canceled);
        assert!(ops.get(&id).is_none());
        assert!(!ops.cancel(&id));
    }

    #[test]
    fn failures_keep_the_error_message() {
        let ops = OperationRegistry::new();
        let (id, _) = ops.register(OperationKind::Undo);
        let state = ops
            .finish::<()>(&id, &Err(CleanerError::RuleNotFound("x".into())))
            .unwrap();
        assert_eq!(state.status, OperationStatus::Failed);
        assert!(state.details.unwrap().contains('x'));
    }
}
