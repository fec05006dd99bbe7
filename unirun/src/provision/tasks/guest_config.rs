//! Task: Guest configuration merge.
//!
//! Loads the guest-declared document, merges host network facts and the
//! discovered volumes into it, and writes the result for the hypervisor.
//! A conflict fails the task before the output file is written.

use super::{ProvisionCtx, log_task_error, missing, task_start};
use crate::guest_config::{load_or_create, merge_network, merge_volumes, save};
use crate::pipeline::PipelineTask;
use crate::provision::types::GuestConfigInput;
use async_trait::async_trait;
use unirun_shared::errors::UnirunResult;

pub struct GuestConfigTask;

#[async_trait]
impl PipelineTask<ProvisionCtx> for GuestConfigTask {
    async fn run(self: Box<Self>, ctx: ProvisionCtx) -> UnirunResult<()> {
        let task_name = self.name();
        let run_id = task_start(&ctx, task_name).await;

        let (options, host, volumes) = {
            let ctx = ctx.lock().await;
            let host = ctx
                .host
                .clone()
                .ok_or_else(|| missing("host network", "host_discovery"))?;
            let volumes = ctx
                .volumes
                .clone()
                .ok_or_else(|| missing("volume list", "volume_scan"))?;
            (ctx.options.clone(), host, volumes)
        };

        run_guest_config(GuestConfigInput {
            guest_config: &options.guest_config,
            run_config: &options.run_config,
            host: &host,
            volumes: &volumes,
        })
        .inspect_err(|e| log_task_error(&run_id, task_name, e))?;

        ctx.lock().await.run_config = Some(options.run_config);
        Ok(())
    }

    fn name(&self) -> &str {
        "guest_config_merge"
    }
}

fn run_guest_config(input: GuestConfigInput<'_>) -> UnirunResult<()> {
    let mut config = load_or_create(input.guest_config)?;
    merge_network(&mut config, input.host)?;
    merge_volumes(&mut config, input.volumes)?;
    save(&config, input.run_config)?;

    tracing::info!(
        path = %input.run_config.display(),
        volumes = input.volumes.len(),
        "Guest configuration written"
    );
    Ok(())
}
