//! Host networking: discovery of the container uplink and the bridged tap
//! topology that hands it to the guest.
//!
//! All kernel access goes through [`LinkControl`]. On Linux the backend is
//! [`RtnlLinkControl`]; tests use an in-memory fake.

mod host;
mod hwaddr;
mod link;
mod resolv;
mod topology;

#[cfg(target_os = "linux")]
mod rtnl;
#[cfg(target_os = "linux")]
mod tap;

#[cfg(test)]
pub(crate) mod fake;

pub use host::{DiscoveryInput, HostNetworkConfig, discover, read_hostname};
pub use hwaddr::HardwareAddr;
pub use link::{AddressFamily, LinkAddress, LinkControl, LinkInfo, LinkKind, RouteInfo};
pub use resolv::{MAX_NAMESERVERS, ResolverConfig, dtoi};
pub use topology::{TopologyOutput, TopologySpec, build_topology};

#[cfg(target_os = "linux")]
pub use rtnl::RtnlLinkControl;
