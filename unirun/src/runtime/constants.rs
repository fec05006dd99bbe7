//! Well-known paths and names used by a provisioning run.
//!
//! Centralized location for the container layout the runner expects.

/// Files shipped inside the container image alongside the guest.
pub mod container_paths {
    /// Guest-declared configuration (optional)
    pub const GUEST_CONFIG: &str = "/unikernel/config.json";

    /// Merged configuration handed to the hypervisor as its initrd
    pub const RUN_CONFIG: &str = "/unikernel/run.json";

    /// Directory of disk images, one block device per file
    pub const VOLUME_DIR: &str = "/unikernel/fs";

    /// Guest kernel image
    pub const KERNEL_IMAGE: &str = "/unikernel/unikernel.bin";

    /// Hypervisor binary, exec'd at the end of the run
    pub const HYPERVISOR: &str = "/runtime/qemu/bin/qemu-system-x86_64";
}

/// Host files and device nodes.
pub mod host_paths {
    pub const RESOLV_CONF: &str = "/etc/resolv.conf";

    pub const KVM_DEVICE: &str = "/dev/kvm";

    pub const TUN_DEVICE: &str = "/dev/net/tun";
}

/// Link names for the bridged topology.
pub mod link_names {
    /// The container's pre-existing uplink
    pub const PRIMARY: &str = "eth0";

    /// Tap link handed to the hypervisor
    pub const TAP: &str = "tap0";

    pub const BRIDGE: &str = "br0";

    /// Kernel limit on interface names, including the trailing NUL
    pub const MAX_NAME_LEN: usize = 16;
}

/// Default route discovery.
pub mod probes {
    use std::net::Ipv4Addr;

    /// Address assumed to sit past the default router. Probing the route
    /// towards it stands in for reading the default route directly, which
    /// is only correct for the single-uplink container case.
    pub const DEFAULT_ROUTE_PROBE: Ipv4Addr = Ipv4Addr::new(8, 8, 8, 8);
}

/// Hypervisor process identity and launch settings.
pub mod hypervisor {
    /// The hypervisor runs as this user, without capabilities
    pub const RUNAS_UID: u32 = 1;

    pub const RUNAS_GID: u32 = 1;

    /// argv[0] for the exec'd process
    pub const PROGRAM_NAME: &str = "qemu-system-x86_64";
}
