//! Process-level helpers.

#[cfg(target_os = "linux")]
mod privileges;

#[cfg(target_os = "linux")]
pub use privileges::{ensure_net_admin, has_cap_net_admin};
