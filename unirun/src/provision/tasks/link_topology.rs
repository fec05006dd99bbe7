//! Task: Link topology.
//!
//! Moves the primary link into a new bridge next to the guest's tap link.
//! Runs only after discovery, since it destroys the addresses discovery reads.

use super::{ProvisionCtx, log_task_error, missing, task_start};
use crate::net::{TopologySpec, build_topology};
use crate::pipeline::PipelineTask;
use async_trait::async_trait;
use unirun_shared::errors::UnirunResult;

pub struct LinkTopologyTask;

#[async_trait]
impl PipelineTask<ProvisionCtx> for LinkTopologyTask {
    async fn run(self: Box<Self>, ctx: ProvisionCtx) -> UnirunResult<()> {
        let task_name = self.name();
        let run_id = task_start(&ctx, task_name).await;

        let (links, options, host) = {
            let ctx = ctx.lock().await;
            let host = ctx
                .host
                .clone()
                .ok_or_else(|| missing("host network", "host_discovery"))?;
            (ctx.links.clone(), ctx.options.clone(), host)
        };

        let spec = TopologySpec {
            primary_link: &options.primary_link,
            tap_link: &options.tap_link,
            bridge_link: &options.bridge_link,
        };
        let topology = build_topology(links.as_ref(), spec, &host)
            .await
            .inspect_err(|e| log_task_error(&run_id, task_name, e))?;

        ctx.lock().await.topology = Some(topology);
        Ok(())
    }

    fn name(&self) -> &str {
        "link_topology"
    }
}
