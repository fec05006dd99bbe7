//! Hypervisor hand-off: device access, privilege drop and exec.

use super::HypervisorSpec;
use nix::unistd::{Gid, Uid, chown};
use std::fs::OpenOptions;
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::Command;
use unirun_shared::errors::{UnirunError, UnirunResult};

/// True when the KVM device can be opened for read and write.
pub fn kvm_available(kvm_device: &Path) -> bool {
    match OpenOptions::new().read(true).write(true).open(kvm_device) {
        Ok(_) => true,
        Err(e) => {
            tracing::info!(
                device = %kvm_device.display(),
                "KVM unavailable, falling back to emulation: {}",
                e
            );
            false
        }
    }
}

/// Give the unprivileged hypervisor user the devices and disks it opens.
pub fn prepare_privileges(
    spec: &HypervisorSpec,
    kvm_device: &Path,
    tun_device: &Path,
    uid: u32,
    gid: u32,
) -> UnirunResult<()> {
    let owner = (Uid::from_raw(uid), Gid::from_raw(gid));

    if spec.kvm {
        change_owner(kvm_device, owner)?;
    }
    change_owner(tun_device, owner)?;
    for drive in &spec.drives {
        change_owner(drive, owner)?;
    }

    Ok(())
}

fn change_owner(path: &Path, (uid, gid): (Uid, Gid)) -> UnirunResult<()> {
    chown(path, Some(uid), Some(gid)).map_err(|e| {
        UnirunError::Engine(format!(
            "Could not chown {} to {}:{}: {}",
            path.display(),
            uid,
            gid,
            e
        ))
    })?;
    tracing::debug!(path = %path.display(), uid = uid.as_raw(), gid = gid.as_raw(), "Changed owner");
    Ok(())
}

/// A configured hypervisor, ready to take over the process.
#[derive(Debug)]
pub struct HypervisorInstance {
    spec: HypervisorSpec,
    uid: u32,
    gid: u32,
}

impl HypervisorInstance {
    pub fn new(spec: HypervisorSpec, uid: u32, gid: u32) -> Self {
        Self { spec, uid, gid }
    }

    pub fn spec(&self) -> &HypervisorSpec {
        &self.spec
    }

    /// The exec'd command: empty environment, unprivileged identity.
    ///
    /// Switching to `uid` drops every capability the runner held, including
    /// `CAP_NET_ADMIN`; supplementary groups are cleared along with it.
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.spec.binary);
        cmd.arg0(self.spec.program_name())
            .args(self.spec.command_line())
            .env_clear()
            .uid(self.uid)
            .gid(self.gid);
        cmd
    }

    /// Replace the current process with the hypervisor.
    ///
    /// Only returns when exec fails.
    pub fn enter(self) -> UnirunError {
        let err = self.command().exec();
        let msg = format!("exec {} failed: {}", self.spec.binary.display(), err);
        tracing::error!("{}", msg);
        UnirunError::Engine(msg)
    }
}
