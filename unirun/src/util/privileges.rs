//! Capability checks.

use unirun_shared::errors::{UnirunError, UnirunResult};

pub fn has_cap_net_admin() -> bool {
    caps::has_cap(
        None,
        caps::CapSet::Effective,
        caps::Capability::CAP_NET_ADMIN,
    )
    .unwrap_or(false)
}

/// Fail early when link mutation would be refused by the kernel.
pub fn ensure_net_admin() -> UnirunResult<()> {
    if has_cap_net_admin() {
        tracing::debug!("CAP_NET_ADMIN available");
        Ok(())
    } else {
        Err(UnirunError::Unsupported(
            "CAP_NET_ADMIN is required (run the container with --cap-add=NET_ADMIN)".into(),
        ))
    }
}
