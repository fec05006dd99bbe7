//! Task: Volume scan.

use super::{ProvisionCtx, log_task_error, task_start};
use crate::pipeline::PipelineTask;
use crate::volumes::enumerate_volumes;
use async_trait::async_trait;
use unirun_shared::errors::UnirunResult;

pub struct VolumeScanTask;

#[async_trait]
impl PipelineTask<ProvisionCtx> for VolumeScanTask {
    async fn run(self: Box<Self>, ctx: ProvisionCtx) -> UnirunResult<()> {
        let task_name = self.name();
        let run_id = task_start(&ctx, task_name).await;

        let volume_dir = ctx.lock().await.options.volume_dir.clone();
        let volumes = enumerate_volumes(&volume_dir)
            .inspect_err(|e| log_task_error(&run_id, task_name, e))?;

        tracing::info!(
            dir = %volume_dir.display(),
            count = volumes.len(),
            "Found volumes"
        );

        ctx.lock().await.volumes = Some(volumes);
        Ok(())
    }

    fn name(&self) -> &str {
        "volume_scan"
    }
}
