//! Runner options.
//!
//! Every option defaults to the container layout in [`constants`], so a
//! runner started with no arguments provisions the standard image.
//!
//! [`constants`]: crate::runtime::constants

use crate::runtime::constants::{container_paths, host_paths, hypervisor, link_names, probes};
use clap::Parser;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use unirun_shared::errors::{UnirunError, UnirunResult};

/// Provision networking, volumes and guest configuration, then exec the hypervisor.
#[derive(Debug, Clone, Parser)]
#[command(name = "unirun-runner", version)]
pub struct RunnerOptions {
    /// Guest-declared JSON configuration (absent means empty)
    #[arg(long, env = "RUNNER_GUEST_CONFIG", default_value = container_paths::GUEST_CONFIG)]
    pub guest_config: PathBuf,

    /// Where the merged configuration is written
    #[arg(long, env = "RUNNER_RUN_CONFIG", default_value = container_paths::RUN_CONFIG)]
    pub run_config: PathBuf,

    /// Directory of volume images
    #[arg(long, env = "RUNNER_VOLUME_DIR", default_value = container_paths::VOLUME_DIR)]
    pub volume_dir: PathBuf,

    #[arg(long, env = "RUNNER_KERNEL", default_value = container_paths::KERNEL_IMAGE)]
    pub kernel: PathBuf,

    #[arg(long, env = "RUNNER_HYPERVISOR", default_value = container_paths::HYPERVISOR)]
    pub hypervisor: PathBuf,

    #[arg(long, default_value = host_paths::RESOLV_CONF)]
    pub resolv_conf: PathBuf,

    #[arg(long, default_value = host_paths::KVM_DEVICE)]
    pub kvm_device: PathBuf,

    #[arg(long, default_value = host_paths::TUN_DEVICE)]
    pub tun_device: PathBuf,

    #[arg(long, default_value = link_names::PRIMARY)]
    pub primary_link: String,

    #[arg(long, default_value = link_names::TAP)]
    pub tap_link: String,

    #[arg(long, default_value = link_names::BRIDGE)]
    pub bridge_link: String,

    /// Destination whose route is taken as the default route
    #[arg(long, default_value_t = probes::DEFAULT_ROUTE_PROBE)]
    pub route_probe: Ipv4Addr,

    #[arg(long, default_value_t = hypervisor::RUNAS_UID)]
    pub runas_uid: u32,

    #[arg(long, default_value_t = hypervisor::RUNAS_GID)]
    pub runas_gid: u32,

    /// Guest memory in MiB (hypervisor default when unset)
    #[arg(long)]
    pub memory_mib: Option<u32>,

    /// Dump intermediate records before hand-off
    #[arg(
        long,
        env = "RUNNER_VERBOSE",
        action = clap::ArgAction::SetTrue,
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    pub verbose: bool,

    /// Extra arguments appended to the guest kernel command line
    #[arg(trailing_var_arg = true)]
    pub guest_args: Vec<String>,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            guest_config: PathBuf::from(container_paths::GUEST_CONFIG),
            run_config: PathBuf::from(container_paths::RUN_CONFIG),
            volume_dir: PathBuf::from(container_paths::VOLUME_DIR),
            kernel: PathBuf::from(container_paths::KERNEL_IMAGE),
            hypervisor: PathBuf::from(container_paths::HYPERVISOR),
            resolv_conf: PathBuf::from(host_paths::RESOLV_CONF),
            kvm_device: PathBuf::from(host_paths::KVM_DEVICE),
            tun_device: PathBuf::from(host_paths::TUN_DEVICE),
            primary_link: link_names::PRIMARY.to_string(),
            tap_link: link_names::TAP.to_string(),
            bridge_link: link_names::BRIDGE.to_string(),
            route_probe: probes::DEFAULT_ROUTE_PROBE,
            runas_uid: hypervisor::RUNAS_UID,
            runas_gid: hypervisor::RUNAS_GID,
            memory_mib: None,
            verbose: false,
            guest_args: Vec::new(),
        }
    }
}

impl RunnerOptions {
    /// Reject options that would only fail halfway through network mutation.
    pub fn sanitize(&self) -> UnirunResult<()> {
        let names = [
            ("primary link", &self.primary_link),
            ("tap link", &self.tap_link),
            ("bridge link", &self.bridge_link),
        ];

        for (what, name) in names {
            if name.is_empty() || name.len() >= link_names::MAX_NAME_LEN {
                return Err(UnirunError::Config(format!(
                    "{} name '{}' must be 1-{} bytes",
                    what,
                    name,
                    link_names::MAX_NAME_LEN - 1
                )));
            }
        }

        if self.tap_link == self.bridge_link
            || self.tap_link == self.primary_link
            || self.bridge_link == self.primary_link
        {
            return Err(UnirunError::Config(
                "primary, tap and bridge link names must differ".into(),
            ));
        }

        if self.guest_config == self.run_config {
            return Err(UnirunError::Config(format!(
                "run config would overwrite guest config at {}",
                self.guest_config.display()
            )));
        }

        if self.memory_mib == Some(0) {
            return Err(UnirunError::Config("memory_mib must be non-zero".into()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_container_layout() {
        let options = RunnerOptions::try_parse_from(["unirun-runner"]).unwrap();
        assert_eq!(options.guest_config, PathBuf::from("/unikernel/config.json"));
        assert_eq!(options.run_config, PathBuf::from("/unikernel/run.json"));
        assert_eq!(options.primary_link, "eth0");
        assert_eq!(options.route_probe, Ipv4Addr::new(8, 8, 8, 8));
        assert!(options.guest_args.is_empty());
        assert!(options.sanitize().is_ok());
    }

    #[test]
    fn test_trailing_args_go_to_guest() {
        let options = RunnerOptions::try_parse_from([
            "unirun-runner",
            "--memory-mib",
            "512",
            "--",
            "-v",
            "--debug",
        ])
        .unwrap();
        assert_eq!(options.memory_mib, Some(512));
        assert_eq!(options.guest_args, vec!["-v", "--debug"]);
    }

    #[test]
    fn test_sanitize_rejects_long_link_name() {
        let options = RunnerOptions {
            bridge_link: "a-very-long-bridge-name".into(),
            ..Default::default()
        };
        assert!(matches!(options.sanitize(), Err(UnirunError::Config(_))));
    }

    #[test]
    fn test_sanitize_rejects_duplicate_link_names() {
        let options = RunnerOptions {
            tap_link: "br0".into(),
            ..Default::default()
        };
        assert!(options.sanitize().is_err());
    }

    #[test]
    fn test_sanitize_rejects_overwriting_guest_config() {
        let options = RunnerOptions {
            run_config: PathBuf::from("/unikernel/config.json"),
            ..Default::default()
        };
        assert!(options.sanitize().is_err());
    }
}
