//! Block device naming constants.
//!
//! Volumes are exposed to the guest as virtio disks whose device nodes
//! follow the guest kernel's `ld` driver naming: `/dev/ld0a`, `/dev/ld1a`, ...

/// Mount `source` value for block-device backed mounts
pub const BLOCK_SOURCE: &str = "blk";

/// Device path prefix reserved for auto-assigned volumes
pub const DEVICE_PREFIX: &str = "/dev/ld";

/// Partition suffix appended after the device index
pub const DEVICE_SUFFIX: &str = "a";
