use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use super::builtin::builtin_rules;
use super::glob::{compile, compile_glob, CompiledPattern};
use super::model::{CleanupRule, PatternKind, RiskLevel, RuleMatch};
use crate::file_cleaner::protection::standardize_path;

pub const ALLOWLIST_RULE_ID: &str = "user.allowlist";
const ALLOWLIST_PRIORITY: i32 = 2000;

/// Rules that represent developer caches whose project may still be in use.
const ACTIVE_SENSITIVE_RULES: &[&str] = &["node_modules", "xcode.deriveddata"];
const PROJECT_ACTIVITY_MARKERS: &[&str] = &[
    ".git/logs/HEAD",
    "package-lock.json",
    "pnpm-lock.yaml",
    "yarn.lock",
];
const PROJECT_ROOT_SEARCH_DEPTH: usize = 12;
const MAX_ACTIVE_PROJECT_DAYS: i64 = 36_500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatcherOptions {
    /// Lockfile/VCS activity newer than this many days marks a project active.
    pub active_project_days: i64,
    /// Never clean, never suggest. Wins over everything.
    pub denylist_patterns: Vec<String>,
    /// Always suggest as low risk, bypassing the rule set.
    pub allowlist_patterns: Vec<String>,
}

impl Default for MatcherOptions {
    fn default() -> Self {
        MatcherOptions {
            active_project_days: 30,
            denylist_patterns: Vec::new(),
            allowlist_patterns: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
struct CompiledRule {
    rule: Arc<CleanupRule>,
    pattern: Option<CompiledPattern>,
}

/// Immutable snapshot of a rule set plus user overrides. Take one per scan.
#[derive(Debug, Clone)]
pub struct RuleMatcher {
    rules: Vec<CompiledRule>,
    denylist: Vec<CompiledPattern>,
    allowlist: Vec<CompiledPattern>,
    allowlist_rule: Arc<CleanupRule>,
    options: MatcherOptions,
}

impl RuleMatcher {
    pub fn new<I>(rules: I, options: MatcherOptions) -> Self
    where
        I: IntoIterator<Item = CleanupRule>,
    {
        let rules = rules
            .into_iter()
            .map(|rule| {
                let pattern = compile(rule.kind, &rule.pattern).ok();
                CompiledRule {
                    rule: Arc::new(rule),
                    pattern,
                }
            })
            .collect();

        let compile_all = |patterns: &[String]| -> Vec<CompiledPattern> {
            patterns
                .iter()
                .filter(|p| !p.trim().is_empty())
                .filter_map(|p| compile_glob(p).ok())
                .collect()
        };

        RuleMatcher {
            rules,
            denylist: compile_all(&options.denylist_patterns),
            allowlist: compile_all(&options.allowlist_patterns),
            allowlist_rule: Arc::new(CleanupRule {
                id: ALLOWLIST_RULE_ID.to_string(),
                name: "User allowlist".to_string(),
                kind: PatternKind::Glob,
                pattern: "*".to_string(),
                risk_level: RiskLevel::Low,
                priority: ALLOWLIST_PRIORITY,
                is_user_defined: true,
            }),
            options,
        }
    }

    pub fn with_builtins(options: MatcherOptions) -> Self {
        Self::new(builtin_rules(), options)
    }

    pub fn options(&self) -> &MatcherOptions {
        &self.options
    }

    pub fn rules(&self) -> impl Iterator<Item = &CleanupRule> {
        self.rules.iter().map(|compiled| compiled.rule.as_ref())
    }

    /// Classify a path. Denylist vetoes, allowlist forces a low-risk match,
    /// otherwise the highest-priority rule wins (first one on ties).
    pub fn match_path(&self, path: &str) -> Option<RuleMatch> {
        let standardized = standardize_path(path);

        if self.denylist.iter().any(|p| p.matches(&standardized)) {
            debug!(target: "rule_engine", "{} vetoed by denylist", standardized);
            return None;
        }

        if self.allowlist.iter().any(|p| p.matches(&standardized)) {
            return Some(RuleMatch {
                rule: Arc::clone(&self.allowlist_rule),
                is_active_project: false,
                note: Some("Matched user allowlist".to_string()),
            });
        }

        let mut best: Option<&CompiledRule> = None;
        for candidate in &self.rules {
            let Some(pattern) = candidate.pattern.as_ref() else {
                continue;
            };
            if !pattern.matches(&standardized) {
                continue;
            }
            if best.map_or(true, |b| candidate.rule.priority > b.rule.priority) {
                best = Some(candidate);
            }
        }
        let chosen = best?;

        let is_active = self.is_likely_active_project(&standardized, &chosen.rule);
        let note = is_active.then(|| {
            format!(
                "Project seems active (<{}d); treat as needs-review.",
                self.options.active_project_days
            )
        });

        Some(RuleMatch {
            rule: Arc::clone(&chosen.rule),
            is_active_project: is_active,
            note,
        })
    }

    fn is_likely_active_project(&self, path: &str, rule: &CleanupRule) -> bool {
        if !ACTIVE_SENSITIVE_RULES.contains(&rule.id.as_str()) {
            return false;
        }
        let days = self.options.active_project_days.clamp(0, MAX_ACTIVE_PROJECT_DAYS);
        let cutoff = Utc::now() - ChronoDuration::days(days);
        let path = Path::new(path);

        if rule.id == "node_modules" {
            let Some(root) = node_project_root(path) else {
                return false;
            };
            PROJECT_ACTIVITY_MARKERS
                .iter()
                .any(|marker| modified_since(&root.join(marker), cutoff))
        } else {
            modified_since(path, cutoff)
        }
    }
}

/// Parent of the nearest enclosing `node_modules`, falling back to two
/// levels above the matched path.
fn node_project_root(path: &Path) -> Option<PathBuf> {
    let mut current = Some(path);
    for _ in 0..PROJECT_ROOT_SEARCH_DEPTH {
        let Some(dir) = current else { break };
        if dir.file_name().map_or(false, |name| name == "node_modules") {
            return dir.parent().map(Path::to_path_buf);
        }
        current = dir.parent();
    }
    path.parent()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
}

/// Timestamp read failures count as "not recent".
fn modified_since(path: &Path, cutoff: DateTime<Utc>) -> bool {
    fs::metadata(path)
        .and_then(|md| md.modified())
        .map(|modified| DateTime::<Utc>::from(modified) >= cutoff)
        .unwrap_or(false)
}
