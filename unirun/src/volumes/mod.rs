//! Volume discovery.
//!
//! Every plain file in the volume directory becomes one virtio block device
//! in the guest, mounted at `/<name>` where `name` is the file name without
//! its last extension.

mod block_device;
pub mod constants;

pub use block_device::{BlockDeviceAllocator, device_path, is_reserved};

use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use unirun_shared::errors::{UnirunError, UnirunResult};

/// A disk image to attach to the guest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VolumeConfig {
    pub name: String,
    pub path: PathBuf,
}

/// List the disk images in `dir`, in directory enumeration order.
///
/// A missing directory means no volumes. Entries that are not regular files
/// (after following symlinks) are skipped.
pub fn enumerate_volumes(dir: &Path) -> UnirunResult<Vec<VolumeConfig>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!(dir = %dir.display(), "No volume directory");
            return Ok(Vec::new());
        }
        Err(e) => {
            return Err(UnirunError::Storage(format!(
                "Failed to read volume directory {}: {}",
                dir.display(),
                e
            )));
        }
    };

    let mut volumes = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| {
            UnirunError::Storage(format!(
                "Failed to read volume directory {}: {}",
                dir.display(),
                e
            ))
        })?;
        let path = entry.path();

        let metadata = fs::metadata(&path).map_err(|e| {
            UnirunError::Storage(format!("Failed to stat volume {}: {}", path.display(), e))
        })?;
        if !metadata.is_file() {
            tracing::debug!(path = %path.display(), "Skipping non-file volume entry");
            continue;
        }

        let file_name = entry.file_name().to_string_lossy().into_owned();
        let volume = VolumeConfig {
            name: volume_name(&file_name).to_string(),
            path,
        };
        tracing::debug!(name = %volume.name, path = %volume.path.display(), "Found volume");
        volumes.push(volume);
    }

    Ok(volumes)
}

/// Strip the last extension; dot-files and extensionless names stay whole.
fn volume_name(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(dot) if dot > 0 => &file_name[..dot],
        _ => file_name,
    }
}
