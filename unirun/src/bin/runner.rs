//! unirun-runner: provision the container for a unikernel guest, then exec
//! the hypervisor.
//!
//! Expects `CAP_NET_ADMIN` and exclusive ownership of the network namespace.
//! Any failure before the hand-off is logged and exits with status 1.

use clap::Parser;
use std::process::ExitCode;
use unirun::{RunnerOptions, init_logging};

#[cfg(target_os = "linux")]
fn main() -> ExitCode {
    let options = RunnerOptions::parse();
    init_logging(options.verbose);

    match run(options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(not(target_os = "linux"))]
fn main() -> ExitCode {
    let options = RunnerOptions::parse();
    init_logging(options.verbose);
    tracing::error!("unirun-runner requires Linux network namespaces");
    ExitCode::FAILURE
}

#[cfg(target_os = "linux")]
fn run(options: RunnerOptions) -> anyhow::Result<()> {
    use anyhow::Context;
    use std::sync::Arc;
    use unirun::Provisioner;
    use unirun::net::RtnlLinkControl;
    use unirun::vmm::{HypervisorInstance, HypervisorSpec, kvm_available, prepare_privileges};

    options.sanitize().context("invalid options")?;
    unirun::util::ensure_net_admin()?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let output = runtime.block_on(async {
        let links = Arc::new(
            RtnlLinkControl::connect(&options.tun_device).context("failed to open netlink")?,
        );
        Provisioner::new(options.clone(), links)
            .run()
            .await
            .context("provisioning failed")
    })?;
    // Stops the netlink connection task before the process image is replaced.
    drop(runtime);

    let kvm = kvm_available(&options.kvm_device);
    let spec = HypervisorSpec::from_provision(&options, &output, kvm);

    if options.verbose {
        let report = output.report().context("failed to encode provisioning report")?;
        tracing::info!("Provisioned: {:#}", report);
        tracing::info!("Hypervisor arguments: {:#?}", spec.command_line());
    }

    prepare_privileges(
        &spec,
        &options.kvm_device,
        &options.tun_device,
        options.runas_uid,
        options.runas_gid,
    )
    .context("failed to prepare hypervisor privileges")?;

    tracing::info!(
        binary = %spec.binary.display(),
        kvm,
        tap = %spec.nic.tap_name,
        "Starting hypervisor"
    );
    Err(HypervisorInstance::new(spec, options.runas_uid, options.runas_gid).enter())
        .context("hypervisor hand-off failed")
}
