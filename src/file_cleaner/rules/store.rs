use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use super::builtin::builtin_rules;
use super::matcher::{MatcherOptions, RuleMatcher};
use super::model::CleanupRule;
use crate::file_cleaner::errors::{CleanerError, Result};

const USER_RULES_FILE: &str = "user_rules.json";

/// Built-in rules plus user rules persisted as JSON. Built-ins are read-only.
#[derive(Debug)]
pub struct RuleStore {
    builtins: Vec<CleanupRule>,
    user_rules: Vec<CleanupRule>,
    storage_path: PathBuf,
}

impl RuleStore {
    /// Load from the application data directory.
    pub fn open_default() -> Result<Self> {
        let dir = crate::config::app_data_dir()?;
        Self::load(dir.join(USER_RULES_FILE))
    }

    /// Load user rules from `path`. A missing file means no user rules.
    /// User rules reusing a built-in id, or repeating an earlier id, are dropped.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let storage_path = path.into();
        let builtins = builtin_rules();

        let mut user_rules: Vec<CleanupRule> = if storage_path.exists() {
            let raw = fs::read_to_string(&storage_path)?;
            serde_json::from_str(&raw)?
        } else {
            Vec::new()
        };

        user_rules.retain(|rule| {
            let clash = builtins.iter().any(|b| b.id == rule.id);
            if clash {
                warn!(target: "rule_engine", "Dropping user rule {} that shadows a built-in id", rule.id);
            }
            !clash
        });
        for rule in &mut user_rules {
            rule.is_user_defined = true;
        }
        let mut seen = std::collections::HashSet::new();
        user_rules.retain(|rule| seen.insert(rule.id.clone()));

        Ok(RuleStore {
            builtins,
            user_rules,
            storage_path,
        })
    }

    pub fn storage_path(&self) -> &Path {
        &self.storage_path
    }

    pub fn all_rules(&self) -> Vec<CleanupRule> {
        self.builtins
            .iter()
            .chain(self.user_rules.iter())
            .cloned()
            .collect()
    }

    pub fn user_rules(&self) -> &[CleanupRule] {
        &self.user_rules
    }

    pub fn add_user_rule(&mut self, rule: CleanupRule) -> Result<()> {
        if !rule.is_user_defined {
            return Err(CleanerError::CannotModifyBuiltIn(rule.id));
        }
        if self.contains_id(&rule.id) {
            return Err(CleanerError::DuplicateRuleId(rule.id));
        }
        info!(target: "rule_engine", "Adding user rule {}", rule.id);
        self.user_rules.push(rule);
        self.persist()
    }

    pub fn delete_user_rule(&mut self, id: &str) -> Result<()> {
        if self.builtins.iter().any(|b| b.id == id) {
            return Err(CleanerError::CannotModifyBuiltIn(id.to_string()));
        }
        let index = self
            .user_rules
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| CleanerError::RuleNotFound(id.to_string()))?;
        self.user_rules.remove(index);
        self.persist()
    }

    /// Immutable matcher over the current rule set.
    pub fn matcher(&self, options: MatcherOptions) -> RuleMatcher {
        RuleMatcher::new(self.all_rules(), options)
    }

    fn contains_id(&self, id: &str) -> bool {
        self.builtins
            .iter()
            .chain(self.user_rules.iter())
            .any(|r| r.id == id)
    }

    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.storage_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(&self.user_rules)?;
        fs::write(&self.storage_path, data)?;
        Ok(())
    }
}
