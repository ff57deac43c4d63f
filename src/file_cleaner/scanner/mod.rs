//! Defensive directory walker that aggregates sizes per top-level child.
//!
//! Safety rules applied to every entry:
//! - protected system paths are skipped and never descended
//! - symbolic links are never followed
//! - undownloaded iCloud items are left alone so scanning does not trigger downloads
//! - entries on another volume than the root are skipped
//! - hard-linked files are counted once

mod state;
mod task;

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use bytesize::ByteSize;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use walkdir::WalkDir;

use super::errors::{CleanerError, Result};
use super::protection::{is_protected_for_mutation, is_protected_system_path, standardize_path};
use super::types::{ScanProgress, ScannedItem};
use super::volume::{
    allocated_size, is_icloud_placeholder, is_local_volume, resource_id, volume_id,
};

pub use state::ScanState;
pub use task::{ScanEvent, ScanTask};

/// Progress is reported once every this many visited entries, plus once at the end.
pub const PROGRESS_INTERVAL: u64 = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanOptions {
    pub skip_icloud_placeholders: bool,
    pub require_local_volume: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        ScanOptions {
            skip_icloud_placeholders: true,
            require_local_volume: true,
        }
    }
}

/// Single-threaded scanner. Each call to [`FileScanner::scan`] is one
/// independent invocation; do not run overlapping roots concurrently.
#[derive(Debug, Default, Clone)]
pub struct FileScanner;

impl FileScanner {
    pub fn new() -> Self {
        FileScanner
    }

    /// Walk `root`, streaming an updated [`ScannedItem`] for the affected
    /// top-level child on every counted file.
    ///
    /// Fails fast with `PermissionDenied` for protected, non-local or
    /// unreadable roots, and with `ScanCancelled` once `cancel` fires.
    /// Errors on individual entries are logged and skipped.
    pub fn scan<P, I>(
        &self,
        root: &Path,
        options: &ScanOptions,
        cancel: &CancellationToken,
        mut on_progress: P,
        mut on_item: I,
    ) -> Result<()>
    where
        P: FnMut(ScanProgress),
        I: FnMut(ScannedItem),
    {
        let root_str = standardize_path(&root.to_string_lossy());
        // a symlinked root is judged by where it leads, not by its name
        if is_protected_for_mutation(Path::new(&root_str)) {
            warn!(target: "scanner", "Refusing to scan protected path {}", root_str);
            return Err(CleanerError::PermissionDenied(root_str));
        }
        let root_path = PathBuf::from(&root_str);

        let root_metadata = fs::metadata(&root_path).map_err(|err| {
            warn!(target: "scanner", "Cannot stat scan root {}: {}", root_str, err);
            CleanerError::PermissionDenied(root_str.clone())
        })?;
        if options.require_local_volume && !is_local_volume(&root_path) {
            return Err(CleanerError::PermissionDenied(format!(
                "Non-local volume: {}",
                root_str
            )));
        }
        if root_metadata.is_dir() {
            fs::read_dir(&root_path).map_err(|err| {
                warn!(target: "scanner", "Cannot enumerate {}: {}", root_str, err);
                CleanerError::PermissionDenied(root_str.clone())
            })?;
        }
        let root_volume = volume_id(&root_metadata);

        info!(target: "scanner", "Scanning {}", root_str);

        let mut progress = ScanProgress::default();
        let mut top_level_sizes: HashMap<PathBuf, u64> = HashMap::new();
        let mut top_level_is_dir: HashMap<PathBuf, bool> = HashMap::new();
        let mut seen_resources: HashSet<(u64, u64)> = HashSet::new();

        let mut walker = WalkDir::new(&root_path)
            .follow_links(false)
            .min_depth(1)
            .into_iter();

        loop {
            if cancel.is_cancelled() {
                info!(target: "scanner", "Scan of {} cancelled", root_str);
                return Err(CleanerError::ScanCancelled);
            }

            let entry = match walker.next() {
                None => break,
                Some(Ok(entry)) => entry,
                Some(Err(err)) => {
                    let where_ = err
                        .path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| root_str.clone());
                    warn!(target: "scanner", "Error accessing {}: {}", where_, err);
                    continue;
                }
            };

            progress.visited_entries += 1;
            if progress.visited_entries % PROGRESS_INTERVAL == 0 {
                on_progress(progress);
            }

            let is_dir = entry.file_type().is_dir();
            let standardized = standardize_path(&entry.path().to_string_lossy());

            if is_protected_system_path(&standardized) {
                debug!(target: "scanner", "Skipping protected {}", standardized);
                if is_dir {
                    walker.skip_current_dir();
                }
                continue;
            }

            // never followed, never reported
            if entry.path_is_symlink() {
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(md) => md,
                Err(err) => {
                    warn!(target: "scanner", "Error reading attributes of {}: {}", standardized, err);
                    if is_dir {
                        walker.skip_current_dir();
                    }
                    continue;
                }
            };

            if options.skip_icloud_placeholders && is_icloud_placeholder(entry.path(), &metadata) {
                debug!(target: "scanner", "Skipping iCloud placeholder {}", standardized);
                if is_dir {
                    walker.skip_current_dir();
                }
                continue;
            }

            if let (Some(root_vol), Some(entry_vol)) = (root_volume, volume_id(&metadata)) {
                if root_vol != entry_vol {
                    debug!(target: "scanner", "Not crossing into another volume at {}", standardized);
                    if is_dir {
                        walker.skip_current_dir();
                    }
                    continue;
                }
            }

            if is_dir || !metadata.is_file() {
                continue;
            }

            if let Some(rid) = resource_id(&metadata) {
                if !seen_resources.insert(rid) {
                    continue;
                }
            }

            let size = allocated_size(&metadata);
            if size == 0 {
                continue;
            }
            progress.counted_files += 1;
            progress.counted_bytes += size;

            let Some(top) = top_level_child(&root_path, entry.path()) else {
                continue;
            };
            let top_is_dir = *top_level_is_dir.entry(top.clone()).or_insert_with(|| {
                fs::symlink_metadata(&top)
                    .map(|md| md.is_dir())
                    .unwrap_or(false)
            });
            let total = top_level_sizes.entry(top.clone()).or_insert(0);
            *total += size;

            on_item(ScannedItem {
                path: top,
                is_directory: top_is_dir,
                size_bytes: *total,
            });
        }

        on_progress(progress);
        info!(
            target: "scanner",
            "Scan of {} finished: {} entries, {} files, {}",
            root_str,
            progress.visited_entries,
            progress.counted_files,
            ByteSize(progress.counted_bytes)
        );
        Ok(())
    }

    /// Convenience wrapper collecting the final aggregate per top-level child.
    pub fn scan_collect(
        &self,
        root: &Path,
        options: &ScanOptions,
        cancel: &CancellationToken,
    ) -> Result<(Vec<ScannedItem>, ScanProgress)> {
        let mut latest: HashMap<PathBuf, ScannedItem> = HashMap::new();
        let mut last_progress = ScanProgress::default();
        self.scan(
            root,
            options,
            cancel,
            |p| last_progress = p,
            |item| {
                latest.insert(item.path.clone(), item);
            },
        )?;
        let mut items: Vec<ScannedItem> = latest.into_values().collect();
        items.sort_by(|a, b| b.size_bytes.cmp(&a.size_bytes).then(a.path.cmp(&b.path)));
        Ok((items, last_progress))
    }
}

/// First path component of `path` below `root`, joined back onto `root`.
fn top_level_child(root: &Path, path: &Path) -> Option<PathBuf> {
    let relative = path.strip_prefix(root).ok()?;
    let first = relative.components().next()?;
    Some(root.join(first.as_os_str()))
}
