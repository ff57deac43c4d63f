use std::fs::Metadata;
use std::path::Path;

use sysinfo::Disks;

/// Filesystem types that live on another machine; trash and scan semantics
/// do not hold for these.
const NETWORK_FILESYSTEMS: &[&str] = &[
    "nfs", "nfs4", "smbfs", "smb", "smb2", "smb3", "cifs", "afpfs", "webdav", "davfs",
    "fuse.sshfs", "sshfs", "9p", "ncpfs", "ftp",
];

/// Volume identifier of an entry (`st_dev` on unix).
#[cfg(unix)]
pub(crate) fn volume_id(metadata: &Metadata) -> Option<u64> {
    use std::os::unix::fs::MetadataExt;
    Some(metadata.dev())
}

#[cfg(not(unix))]
pub(crate) fn volume_id(_metadata: &Metadata) -> Option<u64> {
    None
}

/// Inode-equivalent identity used to avoid counting hard links and clones twice.
#[cfg(unix)]
pub(crate) fn resource_id(metadata: &Metadata) -> Option<(u64, u64)> {
    use std::os::unix::fs::MetadataExt;
    Some((metadata.dev(), metadata.ino()))
}

#[cfg(not(unix))]
pub(crate) fn resource_id(_metadata: &Metadata) -> Option<(u64, u64)> {
    None
}

/// Bytes the file occupies on disk. Falls back to the nominal length when
/// the allocation size is unavailable.
#[cfg(unix)]
pub(crate) fn allocated_size(metadata: &Metadata) -> u64 {
    use std::os::unix::fs::MetadataExt;
    let allocated = metadata.blocks().saturating_mul(512);
    if allocated > 0 {
        allocated
    } else {
        metadata.len()
    }
}

#[cfg(not(unix))]
pub(crate) fn allocated_size(metadata: &Metadata) -> u64 {
    metadata.len()
}

/// Snapshot of mounted volumes, taken once per scan or trash batch.
pub(crate) struct VolumeTable {
    disks: Disks,
}

impl VolumeTable {
    pub(crate) fn snapshot() -> Self {
        VolumeTable {
            disks: Disks::new_with_refreshed_list(),
        }
    }

    /// Whether `path` sits on a local volume. Unknown mounts count as local.
    pub(crate) fn is_local(&self, path: &Path) -> bool {
        let mount = self
            .disks
            .list()
            .iter()
            .filter(|disk| path.starts_with(disk.mount_point()))
            .max_by_key(|disk| disk.mount_point().as_os_str().len());

        let Some(disk) = mount else {
            return true;
        };
        let fs_name = disk.file_system().to_string_lossy().to_lowercase();
        let local = !NETWORK_FILESYSTEMS.iter().any(|net| fs_name == *net);
        if !local {
            log::debug!(
                target: "system",
                "{} is on network filesystem {}",
                path.display(),
                fs_name
            );
        }
        local
    }
}

pub(crate) fn is_local_volume(path: &Path) -> bool {
    VolumeTable::snapshot().is_local(path)
}

/// Undownloaded iCloud items: legacy `.name.icloud` stubs everywhere, and
/// dataless files (`SF_DATALESS`) on macOS.
pub(crate) fn is_icloud_placeholder(path: &Path, metadata: &Metadata) -> bool {
    let stub_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .map_or(false, |name| name.starts_with('.') && name.ends_with(".icloud"));
    stub_name || is_dataless(metadata)
}

#[cfg(target_os = "macos")]
fn is_dataless(metadata: &Metadata) -> bool {
    use std::os::macos::fs::MetadataExt;
    const SF_DATALESS: u32 = 0x4000_0000;
    metadata.st_flags() & SF_DATALESS != 0
}

#[cfg(not(target_os = "macos"))]
fn is_dataless(_metadata: &Metadata) -> bool {
    false
}
