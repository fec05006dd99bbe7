//! Provisioning orchestration.
//!
//! ## Architecture
//!
//! One fixed, strictly sequential execution plan:
//!
//! ```text
//!   network:  1. HostDiscovery      (read uplink address, gateway, DNS)
//!             2. LinkTopology       (bridge primary link with a new tap)
//!   storage:  3. VolumeScan         (list disk images)
//!   guest:    4. GuestConfigMerge   (load, merge network + volumes, save)
//! ```
//!
//! Discovery must precede the topology step, which strips the addresses it
//! reads. A failing task ends the run; nothing is rolled back.

mod tasks;
mod types;

pub use types::{GuestConfigInput, ProvisionContext, ProvisionOutput};

use crate::net::LinkControl;
use crate::pipeline::{BoxedTask, ExecutionPlan, PipelineExecutor, PipelineMetrics, Stage};
use crate::runtime::RunnerOptions;
use std::sync::Arc;
use tasks::{GuestConfigTask, HostDiscoveryTask, LinkTopologyTask, ProvisionCtx, VolumeScanTask};
use tokio::sync::Mutex;
use unirun_shared::errors::{UnirunError, UnirunResult};

fn execution_plan() -> ExecutionPlan<ProvisionCtx> {
    let stages: Vec<Stage<BoxedTask<ProvisionCtx>>> = vec![
        Stage::new(
            "network",
            vec![Box::new(HostDiscoveryTask), Box::new(LinkTopologyTask)],
        ),
        Stage::new("storage", vec![Box::new(VolumeScanTask)]),
        Stage::new("guest", vec![Box::new(GuestConfigTask)]),
    ];

    ExecutionPlan::new(stages)
}

fn log_metrics(run_id: &str, metrics: &PipelineMetrics) {
    for task in metrics.tasks() {
        tracing::debug!(
            run_id = %run_id,
            task = %task.name,
            duration_ms = task.duration_ms as u64,
            "Task timing"
        );
    }
    tracing::info!(
        run_id = %run_id,
        duration_ms = metrics.total_duration_ms as u64,
        "Provisioning complete"
    );
}

/// Runs the provisioning pipeline against a link-control backend.
///
/// # Example
///
/// ```ignore
/// let links = Arc::new(RtnlLinkControl::connect(&options.tun_device)?);
/// let output = Provisioner::new(options, links).run().await?;
/// ```
pub struct Provisioner {
    options: RunnerOptions,
    links: Arc<dyn LinkControl>,
}

impl Provisioner {
    pub fn new(options: RunnerOptions, links: Arc<dyn LinkControl>) -> Self {
        Self { options, links }
    }

    pub async fn run(self) -> UnirunResult<ProvisionOutput> {
        let run_id = crate::net::read_hostname();
        tracing::info!(run_id = %run_id, "Provisioning guest");

        let ctx: ProvisionCtx = Arc::new(Mutex::new(ProvisionContext::new(
            run_id.clone(),
            self.options,
            self.links,
        )));

        let metrics = PipelineExecutor::execute(execution_plan(), ctx.clone()).await?;
        log_metrics(&run_id, &metrics);

        let mut ctx = ctx.lock().await;
        let incomplete = |what: &str| UnirunError::Internal(format!("pipeline finished without {what}"));
        Ok(ProvisionOutput {
            host: ctx.host.take().ok_or_else(|| incomplete("host network"))?,
            topology: ctx.topology.take().ok_or_else(|| incomplete("link topology"))?,
            volumes: ctx.volumes.take().ok_or_else(|| incomplete("volume list"))?,
            run_config: ctx.run_config.take().ok_or_else(|| incomplete("run config"))?,
            metrics,
        })
    }
}
