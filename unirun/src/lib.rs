//! unirun: run a unikernel guest inside a container.
//!
//! The runner discovers the container's network identity, rebuilds the
//! network as a bridge shared with a tap link, merges host facts and disk
//! images into the guest's JSON configuration, and finally replaces itself
//! with the hypervisor.

pub mod guest_config;
pub mod logging;
pub mod net;
pub mod pipeline;
pub mod provision;
pub mod runtime;
pub mod util;
pub mod vmm;
pub mod volumes;

pub use logging::init_logging;
pub use provision::{ProvisionOutput, Provisioner};
pub use runtime::RunnerOptions;
pub use unirun_shared::errors::{UnirunError, UnirunResult};
