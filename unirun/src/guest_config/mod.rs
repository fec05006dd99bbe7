//! Guest configuration document: loading, merging host facts, saving.
//!
//! The guest image may ship its own JSON configuration. Host-discovered
//! network settings and volumes are merged into it without overriding
//! anything the guest declared, and the result is written for the
//! hypervisor to pass to the guest at boot.

mod merge;
mod tree;

pub use merge::{merge_network, merge_volumes};
pub use tree::{GuestConfig, ensure_object_in_array};

use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use unirun_shared::errors::{UnirunError, UnirunResult};

/// Load the guest configuration at `path`; an absent file is an empty document.
pub fn load_or_create(path: &Path) -> UnirunResult<GuestConfig> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "No guest configuration, starting empty");
            return Ok(GuestConfig::new());
        }
        Err(e) => {
            return Err(UnirunError::Storage(format!(
                "Failed to read guest configuration {}: {}",
                path.display(),
                e
            )));
        }
    };

    GuestConfig::from_slice(&bytes).map_err(|e| {
        UnirunError::Config(format!(
            "Invalid guest configuration {}: {}",
            path.display(),
            e
        ))
    })
}

/// Serialize `config` to `path`, replacing any existing file.
pub fn save(config: &GuestConfig, path: &Path) -> UnirunResult<()> {
    let bytes = config.to_vec()?;
    fs::write(path, bytes).map_err(|e| {
        UnirunError::Storage(format!(
            "Failed to write guest configuration {}: {}",
            path.display(),
            e
        ))
    })?;

    tracing::debug!(path = %path.display(), "Wrote guest configuration");
    Ok(())
}
