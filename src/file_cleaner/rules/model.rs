use std::sync::Arc;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternKind {
    Glob,
    Regex,
}

/// A named pattern with a risk level and priority. Higher priority wins.
/// Suggested bands: user rules 1000+, specific built-ins 500+, generic 100+.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupRule {
    pub id: String,
    pub name: String,
    pub kind: PatternKind,
    pub pattern: String,
    pub risk_level: RiskLevel,
    pub priority: i32,
    #[serde(default)]
    pub is_user_defined: bool,
}

impl CleanupRule {
    pub fn glob(
        id: impl Into<String>,
        name: impl Into<String>,
        pattern: impl Into<String>,
        risk_level: RiskLevel,
        priority: i32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: PatternKind::Glob,
            pattern: pattern.into(),
            risk_level,
            priority,
            is_user_defined: false,
        }
    }

    pub fn regex(
        id: impl Into<String>,
        name: impl Into<String>,
        pattern: impl Into<String>,
        risk_level: RiskLevel,
        priority: i32,
    ) -> Self {
        Self {
            kind: PatternKind::Regex,
            ..Self::glob(id, name, pattern, risk_level, priority)
        }
    }

    pub fn user_defined(mut self) -> Self {
        self.is_user_defined = true;
        self
    }
}

/// Result of matching one path. The rule is shared with the matcher snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch {
    pub rule: Arc<CleanupRule>,
    pub is_active_project: bool,
    pub note: Option<String>,
}
