use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CleanerError>;

#[derive(Debug, Error)]
pub enum CleanerError {
    #[error("Access denied to path: {0}. Please grant Full Disk Access.")]
    PermissionDenied(String),

    #[error("Disk scan was cancelled by the user.")]
    ScanCancelled,

    #[error("File is currently in use: {}", .0.display())]
    FileInUse(PathBuf),

    #[error("Failed to move {} to Trash: {source}", .path.display())]
    TrashFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Rejected pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Built-in rule {0} cannot be modified")]
    CannotModifyBuiltIn(String),

    #[error("A rule with id {0} already exists")]
    DuplicateRuleId(String),

    #[error("No user rule with id {0}")]
    RuleNotFound(String),

    #[error("A scan overlapping {} is already running", .0.display())]
    OverlappingScan(PathBuf),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("Failed to (de)serialize: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CleanerError {
    /// Classify a failed move so callers can tell a busy file from other failures.
    pub fn from_move_error(path: PathBuf, err: io::Error) -> Self {
        if is_busy(&err) {
            CleanerError::FileInUse(path)
        } else {
            CleanerError::TrashFailed { path, source: err }
        }
    }
}

#[cfg(unix)]
fn is_busy(err: &io::Error) -> bool {
    matches!(err.raw_os_error(), Some(code) if code == libc::EBUSY || code == libc::ETXTBSY)
}

#[cfg(not(unix))]
fn is_busy(_err: &io::Error) -> bool {
    false
}
