//! Block device slot allocation.

use super::constants::{DEVICE_PREFIX, DEVICE_SUFFIX};

/// Hands out guest device paths in attach order.
///
/// The n-th volume attached to the hypervisor shows up as `/dev/ld<n>a`, so
/// allocation order must match the order the drives are put on the command
/// line.
#[derive(Debug, Default)]
pub struct BlockDeviceAllocator {
    next_index: usize,
}

impl BlockDeviceAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Device path for the next attached disk.
    pub fn next_path(&mut self) -> String {
        let path = device_path(self.next_index);
        self.next_index += 1;
        path
    }

    pub fn allocated(&self) -> usize {
        self.next_index
    }
}

pub fn device_path(index: usize) -> String {
    format!("{DEVICE_PREFIX}{index}{DEVICE_SUFFIX}")
}

/// True when `path` is in the auto-assigned device namespace.
pub fn is_reserved(path: &str) -> bool {
    path.starts_with(DEVICE_PREFIX)
}
