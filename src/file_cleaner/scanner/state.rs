use serde::Serialize;

use crate::file_cleaner::errors::{CleanerError, Result};

/// Lifecycle of one scan invocation. Terminal states never change again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "message")]
pub enum ScanState {
    NotStarted,
    Scanning,
    Finished,
    Cancelled,
    Failed(String),
}

impl ScanState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ScanState::Finished | ScanState::Cancelled | ScanState::Failed(_)
        )
    }

    /// Apply a transition if it is legal; returns whether it was applied.
    pub(crate) fn advance(&mut self, next: ScanState) -> bool {
        let legal = match (&*self, &next) {
            (ScanState::NotStarted, ScanState::Scanning) => true,
            (ScanState::NotStarted, ScanState::Failed(_)) => true,
            (ScanState::Scanning, next) => next.is_terminal(),
            _ => false,
        };
        if legal {
            *self = next;
        }
        legal
    }

    pub(crate) fn from_outcome(outcome: &Result<()>) -> ScanState {
        match outcome {
            Ok(()) => ScanState::Finished,
            Err(CleanerError::ScanCancelled) => ScanState::Cancelled,
            Err(err) => ScanState::Failed(err.to_string()),
        }
    }
}
