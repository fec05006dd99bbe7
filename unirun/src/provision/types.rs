//! Type definitions for the provisioning pipeline.

use crate::net::{HostNetworkConfig, LinkControl, TopologyOutput};
use crate::pipeline::PipelineMetrics;
use crate::runtime::RunnerOptions;
use crate::volumes::VolumeConfig;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use unirun_shared::errors::UnirunResult;

/// State shared by the provisioning tasks.
///
/// Each task reads what earlier tasks stored and fills in its own output.
pub struct ProvisionContext {
    /// Identifies the run in logs (the container hostname)
    pub run_id: String,
    pub options: RunnerOptions,
    pub links: Arc<dyn LinkControl>,

    pub host: Option<HostNetworkConfig>,
    pub topology: Option<TopologyOutput>,
    pub volumes: Option<Vec<VolumeConfig>>,
    pub run_config: Option<PathBuf>,
}

impl ProvisionContext {
    pub fn new(run_id: String, options: RunnerOptions, links: Arc<dyn LinkControl>) -> Self {
        Self {
            run_id,
            options,
            links,
            host: None,
            topology: None,
            volumes: None,
            run_config: None,
        }
    }
}

/// Everything the hypervisor launch needs from a completed run.
#[derive(Debug, Clone)]
pub struct ProvisionOutput {
    pub host: HostNetworkConfig,
    pub topology: TopologyOutput,
    pub volumes: Vec<VolumeConfig>,
    /// Merged guest configuration, passed to the guest at boot
    pub run_config: PathBuf,
    pub metrics: PipelineMetrics,
}

impl ProvisionOutput {
    /// Discovered host network and volumes as JSON, for verbose dumps.
    pub fn report(&self) -> UnirunResult<Value> {
        Ok(json!({
            "host": serde_json::to_value(&self.host)?,
            "volumes": serde_json::to_value(&self.volumes)?,
            "tap": self.topology.tap_name,
            "bridge": self.topology.bridge_name,
        }))
    }
}

/// Input for the guest configuration merge.
pub struct GuestConfigInput<'a> {
    pub guest_config: &'a Path,
    pub run_config: &'a Path,
    pub host: &'a HostNetworkConfig,
    pub volumes: &'a [VolumeConfig],
}
