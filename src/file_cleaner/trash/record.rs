use bytesize::ByteSize;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::file_cleaner::types::CandidateItem;

pub const DECISION_MANUAL: &str = "manual";
pub const DECISION_UNDO: &str = "undo";

/// One attempted trash or undo operation. Written once, never changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrashRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub original_path: String,
    pub trashed_path: Option<String>,
    pub size_bytes: u64,
    pub decision_source: String,
    pub matched_rule_id: Option<String>,
    pub ai_recommended_action: Option<String>,
    pub dry_run: bool,
    pub success: bool,
    pub error_message: Option<String>,
}

impl TrashRecord {
    pub(crate) fn for_candidate(item: &CandidateItem, dry_run: bool) -> Self {
        TrashRecord {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            original_path: item.path.to_string_lossy().to_string(),
            trashed_path: None,
            size_bytes: item.size_bytes,
            decision_source: DECISION_MANUAL.to_string(),
            matched_rule_id: item.rule_match.as_ref().map(|m| m.rule.id.clone()),
            ai_recommended_action: item
                .ai_analysis
                .as_ref()
                .map(|a| a.recommended_action.as_str().to_string()),
            dry_run,
            success: false,
            error_message: None,
        }
    }

    /// A fresh record describing an attempt to move `original` back.
    pub(crate) fn undo_of(original: &TrashRecord) -> Self {
        TrashRecord {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            decision_source: DECISION_UNDO.to_string(),
            dry_run: false,
            success: false,
            error_message: None,
            ..original.clone()
        }
    }

    pub(crate) fn succeeded(mut self, trashed_path: Option<String>) -> Self {
        self.success = true;
        self.trashed_path = trashed_path;
        self.error_message = None;
        self
    }

    pub(crate) fn failed(mut self, message: impl Into<String>) -> Self {
        self.success = false;
        self.error_message = Some(message.into());
        self
    }

    pub fn is_undo(&self) -> bool {
        self.decision_source == DECISION_UNDO
    }
}

/// Aggregate outcome of a batch, for user-facing summaries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub dry_run: bool,
    pub bytes: u64,
}

impl BatchSummary {
    pub fn from_records(records: &[TrashRecord]) -> Self {
        let mut summary = BatchSummary {
            total: records.len(),
            dry_run: !records.is_empty() && records.iter().all(|r| r.dry_run),
            ..BatchSummary::default()
        };
        for record in records {
            if record.success {
                summary.succeeded += 1;
                summary.bytes += record.size_bytes;
            } else {
                summary.failed += 1;
            }
        }
        summary
    }

    pub fn message(&self) -> String {
        if self.dry_run {
            format!(
                "Dry run: {} item(s) ({}) would be moved to Trash, {} blocked",
                self.succeeded,
                ByteSize(self.bytes),
                self.failed
            )
        } else {
            format!(
                "Moved {} item(s) ({}) to Trash, {} failed",
                self.succeeded,
                ByteSize(self.bytes),
                self.failed
            )
        }
    }
}
