// src/config.rs

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::file_cleaner::{CleanerError, MatcherOptions, Result, ScanOptions};

/// Overrides the application data directory (tests, portable installs).
pub const DATA_DIR_ENV: &str = "AI_DISK_CLEANER_DATA_DIR";
const APP_DIR_NAME: &str = "MacOSAIDiskCleaner";
const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanerSettings {
    pub active_project_days: i64,       // Default: 30
    pub denylist_patterns: Vec<String>, // never clean
    pub allowlist_patterns: Vec<String>, // always suggest
    pub dry_run: bool,                  // Default: false; OR-ed with the caller's flag
    pub skip_icloud_placeholders: bool, // Default: true
    pub require_local_volume: bool,     // Default: true
}

impl Default for CleanerSettings {
    fn default() -> Self {
        CleanerSettings {
            active_project_days: 30,
            denylist_patterns: Vec::new(),
            allowlist_patterns: Vec::new(),
            dry_run: false,
            skip_icloud_placeholders: true,
            require_local_volume: true,
        }
    }
}

impl CleanerSettings {
    /// Load from the data directory, defaulting when nothing was saved yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&app_data_dir()?.join(SETTINGS_FILE))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(CleanerError::from)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&app_data_dir()?.join(SETTINGS_FILE))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }

    pub fn matcher_options(&self) -> MatcherOptions {
        MatcherOptions {
            active_project_days: self.active_project_days,
            denylist_patterns: self.denylist_patterns.clone(),
            allowlist_patterns: self.allowlist_patterns.clone(),
        }
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            skip_icloud_placeholders: self.skip_icloud_placeholders,
            require_local_volume: self.require_local_volume,
        }
    }
}

/// Per-user application data directory, created on demand.
pub fn app_data_dir() -> Result<PathBuf> {
    let dir = match env::var_os(DATA_DIR_ENV) {
        Some(custom) if !custom.is_empty() => PathBuf::from(custom),
        _ => dirs::data_dir()
            .ok_or_else(|| {
                CleanerError::PermissionDenied("Could not find application data directory".into())
            })?
            .join(APP_DIR_NAME),
    };
    fs::create_dir_all(&dir)?;
    Ok(dir)
}
