//! Provisioning tasks.

mod guest_config;
mod host_discovery;
mod link_topology;
mod volume_scan;

pub use guest_config::GuestConfigTask;
pub use host_discovery::HostDiscoveryTask;
pub use link_topology::LinkTopologyTask;
pub use volume_scan::VolumeScanTask;

use super::types::ProvisionContext;
use std::sync::Arc;
use tokio::sync::Mutex;
use unirun_shared::errors::UnirunError;

pub type ProvisionCtx = Arc<Mutex<ProvisionContext>>;

/// Log the start of a task and return the run id for later log records.
async fn task_start(ctx: &ProvisionCtx, task_name: &str) -> String {
    let run_id = ctx.lock().await.run_id.clone();
    tracing::debug!(run_id = %run_id, task = task_name, "Task started");
    run_id
}

fn log_task_error(run_id: &str, task_name: &str, err: &UnirunError) {
    tracing::error!(run_id = %run_id, task = task_name, "Task failed: {}", err);
}

fn missing(what: &str, task: &str) -> UnirunError {
    UnirunError::Internal(format!("{task} task must run before {what} is needed"))
}
