use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::file_cleaner::errors::{CleanerError, Result};

/// Where trashed items go and how they come back. Both directions must be
/// a single rename, never copy-then-delete.
pub trait TrashBackend: Send + Sync {
    /// Move `path` into the trash and return its new location.
    fn move_to_trash(&self, path: &Path) -> io::Result<PathBuf>;

    /// Move a trashed item back to where it came from.
    fn restore(&self, trashed: &Path, original: &Path) -> io::Result<()> {
        fs::rename(trashed, original)
    }
}

/// The user's `~/.Trash`, with collision-free names.
#[derive(Debug, Clone)]
pub struct HomeTrash {
    dir: PathBuf,
}

impl HomeTrash {
    pub fn new() -> Result<Self> {
        let home = dirs::home_dir().ok_or_else(|| {
            CleanerError::PermissionDenied("Could not find home directory".to_string())
        })?;
        Ok(Self::at(home.join(".Trash")))
    }

    pub fn at(dir: impl Into<PathBuf>) -> Self {
        HomeTrash { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn unique_target(&self, original_name: &str) -> PathBuf {
        let mut target = self.dir.join(original_name);
        if fs::symlink_metadata(&target).is_err() {
            return target;
        }
        let (base, ext) = split_name_ext(original_name);
        let ts = Local::now().format("%Y%m%d-%H%M%S").to_string();
        let mut counter = 1u32;
        loop {
            let candidate = if ext.is_empty() {
                format!("{} ({}-{})", base, ts, counter)
            } else {
                format!("{} ({}-{}).{}", base, ts, counter, ext)
            };
            target = self.dir.join(candidate);
            if fs::symlink_metadata(&target).is_err() {
                return target;
            }
            counter += 1;
        }
    }
}

impl TrashBackend for HomeTrash {
    fn move_to_trash(&self, path: &Path) -> io::Result<PathBuf> {
        let original_name = path
            .file_name()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Invalid filename"))?
            .to_string_lossy()
            .to_string();
        fs::create_dir_all(&self.dir)?;
        let target = self.unique_target(&original_name);
        fs::rename(path, &target)?;
        Ok(target)
    }
}

/// Split a name into (base, ext) without touching the filesystem.
fn split_name_ext(name: &str) -> (String, String) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => {
            let (base, ext) = name.split_at(idx);
            (base.to_string(), ext.trim_start_matches('.').to_string())
        }
        _ => (name.to_string(), String::new()),
    }
}
