//! Task: Host discovery.
//!
//! Reads the primary link's address, the default gateway, the resolver
//! configuration and the hostname before anything is changed.

use super::{ProvisionCtx, log_task_error, task_start};
use crate::net::{DiscoveryInput, discover};
use crate::pipeline::PipelineTask;
use async_trait::async_trait;
use unirun_shared::errors::UnirunResult;

pub struct HostDiscoveryTask;

#[async_trait]
impl PipelineTask<ProvisionCtx> for HostDiscoveryTask {
    async fn run(self: Box<Self>, ctx: ProvisionCtx) -> UnirunResult<()> {
        let task_name = self.name();
        let run_id = task_start(&ctx, task_name).await;

        let (links, options) = {
            let ctx = ctx.lock().await;
            (ctx.links.clone(), ctx.options.clone())
        };

        let host = discover(DiscoveryInput {
            links: links.as_ref(),
            primary_link: &options.primary_link,
            route_probe: options.route_probe,
            resolv_conf: &options.resolv_conf,
        })
        .await
        .inspect_err(|e| log_task_error(&run_id, task_name, e))?;

        ctx.lock().await.host = Some(host);
        Ok(())
    }

    fn name(&self) -> &str {
        "host_discovery"
    }
}
