use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::rules::{RiskLevel, RuleMatch};

/// One top-level aggregate under a scan root. Later updates for the same
/// path supersede earlier ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannedItem {
    pub path: PathBuf,
    pub is_directory: bool,
    pub size_bytes: u64,
}

impl ScannedItem {
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.to_string_lossy().to_string())
    }
}

/// Running counters for a single scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanProgress {
    pub visited_entries: u64,
    pub counted_files: u64,
    pub counted_bytes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendedAction {
    Keep,
    Review,
    Delete,
}

impl RecommendedAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendedAction::Keep => "keep",
            RecommendedAction::Review => "review",
            RecommendedAction::Delete => "delete",
        }
    }
}

/// Verdict returned by the external AI collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiAnalysis {
    pub summary: String,
    pub recommended_action: RecommendedAction,
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub reasons: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    pub confidence: f64,
}

/// What the core hands to the AI collaborator for one item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRequest {
    pub path: String,
    pub is_directory: bool,
    pub size_bytes: u64,
    pub matched_rule_id: Option<String>,
    pub matched_rule_name: Option<String>,
    pub risk_level: Option<RiskLevel>,
    pub is_active_project: Option<bool>,
}

/// A scanned item enriched with its classification and provenance.
#[derive(Debug, Clone)]
pub struct CandidateItem {
    pub path: PathBuf,
    pub is_directory: bool,
    pub size_bytes: u64,
    pub rule_match: Option<RuleMatch>,
    pub ai_analysis: Option<AiAnalysis>,
    pub source_category_id: String,
    pub scan_session_id: Uuid,
    pub scanned_at: DateTime<Utc>,
}

impl CandidateItem {
    pub fn from_scanned(
        item: ScannedItem,
        rule_match: Option<RuleMatch>,
        source_category_id: impl Into<String>,
        scan_session_id: Uuid,
    ) -> Self {
        Self {
            path: item.path,
            is_directory: item.is_directory,
            size_bytes: item.size_bytes,
            rule_match,
            ai_analysis: None,
            source_category_id: source_category_id.into(),
            scan_session_id,
            scanned_at: Utc::now(),
        }
    }

    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.to_string_lossy().to_string())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// AI verdict wins over the rule's risk level when both exist.
    pub fn effective_risk_level(&self) -> Option<RiskLevel> {
        self.ai_analysis
            .as_ref()
            .map(|analysis| analysis.risk_level)
            .or_else(|| self.rule_match.as_ref().map(|m| m.rule.risk_level))
    }

    pub fn analysis_request(&self) -> AnalysisRequest {
        AnalysisRequest {
            path: self.path.to_string_lossy().to_string(),
            is_directory: self.is_directory,
            size_bytes: self.size_bytes,
            matched_rule_id: self.rule_match.as_ref().map(|m| m.rule.id.clone()),
            matched_rule_name: self.rule_match.as_ref().map(|m| m.rule.name.clone()),
            risk_level: self.rule_match.as_ref().map(|m| m.rule.risk_level),
            is_active_project: self.rule_match.as_ref().map(|m| m.is_active_project),
        }
    }
}
