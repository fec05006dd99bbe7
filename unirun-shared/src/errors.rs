//! Error taxonomy for a provisioning run.
//!
//! Every variant except the ones produced by absorbed conditions is fatal:
//! it travels up to the binary's top-level handler, which logs it and exits
//! non-zero before the hypervisor hand-off.

use thiserror::Error;

pub type UnirunResult<T> = Result<T, UnirunError>;

#[derive(Debug, Error)]
pub enum UnirunError {
    /// Host network state could not be read or is ambiguous.
    #[error("network discovery failed: {0}")]
    Discovery(String),

    /// A kernel link, address or bridge mutation failed.
    #[error("network operation failed: {0}")]
    Network(String),

    /// Guest-declared configuration collides with host-provided facts.
    #[error("guest configuration conflict: {0}")]
    Conflict(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Storage(String),

    /// Hypervisor preparation or exec failed.
    #[error("hypervisor launch failed: {0}")]
    Engine(String),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl UnirunError {
    /// True for guest configuration conflicts.
    pub fn is_conflict(&self) -> bool {
        matches!(self, UnirunError::Conflict(_))
    }
}
