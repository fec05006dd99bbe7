//! Hypervisor command line and process hand-off.
//!
//! The runner does not supervise the guest: once provisioning is done it
//! replaces itself with the hypervisor, which then owns the container's
//! lifetime.

mod launch;

pub use launch::{HypervisorInstance, kvm_available, prepare_privileges};

use crate::net::HardwareAddr;
use crate::provision::ProvisionOutput;
use crate::runtime::RunnerOptions;
use crate::runtime::constants::hypervisor::PROGRAM_NAME;
use std::ffi::OsString;
use std::path::PathBuf;

/// CPU model when running under KVM. `migratable=no` exposes the invariant
/// TSC, which the guest uses as its clock source.
const KVM_CPU_MODEL: &str = "host,migratable=no,+invtsc";

/// Virtio NIC bound to a host tap link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NicSpec {
    pub hardware_address: HardwareAddr,
    pub tap_name: String,
}

/// Everything needed to launch the hypervisor for one guest.
#[derive(Debug, Clone)]
pub struct HypervisorSpec {
    pub binary: PathBuf,
    pub kernel: PathBuf,
    /// Merged guest configuration, passed as the initial ramdisk
    pub initrd: PathBuf,
    pub kvm: bool,
    pub memory_mib: Option<u32>,
    pub nic: NicSpec,
    /// Raw virtio disks; the n-th one is `/dev/ld<n>a` in the guest
    pub drives: Vec<PathBuf>,
    /// Guest kernel command line
    pub append: Vec<String>,
}

impl HypervisorSpec {
    /// Build the launch spec from a completed provisioning run.
    ///
    /// The guest NIC takes over the hardware address the primary link had
    /// before it was randomized, so the guest keeps the container's L2
    /// identity along with its IP address.
    pub fn from_provision(options: &RunnerOptions, output: &ProvisionOutput, kvm: bool) -> Self {
        let hardware_address = output
            .host
            .hardware_address
            .parse()
            .unwrap_or(output.topology.primary_hardware_address);

        Self {
            binary: options.hypervisor.clone(),
            kernel: options.kernel.clone(),
            initrd: output.run_config.clone(),
            kvm,
            memory_mib: options.memory_mib,
            nic: NicSpec {
                hardware_address,
                tap_name: output.topology.tap_name.clone(),
            },
            drives: output.volumes.iter().map(|v| v.path.clone()).collect(),
            append: options.guest_args.clone(),
        }
    }

    /// Hypervisor arguments, excluding argv[0].
    pub fn command_line(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-kernel".into(),
            self.kernel.clone().into_os_string(),
            "-initrd".into(),
            self.initrd.clone().into_os_string(),
            "-vga".into(),
            "none".into(),
            "-nographic".into(),
        ];

        if self.kvm {
            args.extend(["-enable-kvm", "-cpu", KVM_CPU_MODEL].map(OsString::from));
        }
        if let Some(memory_mib) = self.memory_mib {
            args.extend([OsString::from("-m"), memory_mib.to_string().into()]);
        }

        args.push("-net".into());
        args.push(format!("nic,macaddr={},model=virtio", self.nic.hardware_address).into());
        args.push("-net".into());
        args.push(format!("tap,ifname={},script=no,downscript=no", self.nic.tap_name).into());

        for drive in &self.drives {
            let mut value = OsString::from("file=");
            value.push(drive);
            value.push(",if=virtio,format=raw");
            args.extend([OsString::from("-drive"), value]);
        }

        if !self.append.is_empty() {
            args.extend([OsString::from("-append"), self.append.join(" ").into()]);
        }

        args
    }

    /// argv[0] for the exec'd process.
    pub fn program_name(&self) -> &str {
        PROGRAM_NAME
    }
}
