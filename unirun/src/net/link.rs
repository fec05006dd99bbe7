//! Link-control capability.
//!
//! Everything the runner does to kernel network state goes through
//! [`LinkControl`], so discovery and topology construction can run against
//! an in-memory fake as well as the real rtnetlink backend.

use super::HardwareAddr;
use async_trait::async_trait;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use unirun_shared::errors::UnirunResult;

/// A network link as seen by the kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkInfo {
    pub index: u32,
    pub name: String,
    pub hardware_address: Option<HardwareAddr>,
}

/// An L3 address bound to a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkAddress {
    pub address: IpAddr,
    pub prefix_len: u8,
}

impl LinkAddress {
    pub fn new(address: IpAddr, prefix_len: u8) -> Self {
        Self {
            address,
            prefix_len,
        }
    }
}

impl fmt::Display for LinkAddress {
    /// CIDR notation, e.g. `172.17.0.2/16`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_len)
    }
}

/// Address families understood by [`LinkControl::addresses`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFamily {
    /// Every family
    Any,
    /// IPv4 only
    Inet,
}

impl AddressFamily {
    pub fn matches(self, address: &IpAddr) -> bool {
        match self {
            AddressFamily::Any => true,
            AddressFamily::Inet => address.is_ipv4(),
        }
    }
}

/// An IPv4 route that would carry traffic to some destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    pub destination: Ipv4Addr,
    pub prefix_len: u8,
    pub gateway: Option<IpAddr>,
    pub output_link: Option<u32>,
}

impl RouteInfo {
    /// True when `addr` falls inside this route's destination prefix.
    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        if self.prefix_len == 0 {
            return true;
        }
        let shift = 32u32.saturating_sub(u32::from(self.prefix_len.min(32)));
        let mask = u32::MAX.checked_shl(shift).unwrap_or(0);
        u32::from(self.destination) & mask == u32::from(addr) & mask
    }
}

/// Virtual link types the runner creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Tap,
    Bridge,
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkKind::Tap => write!(f, "tap"),
            LinkKind::Bridge => write!(f, "bridge"),
        }
    }
}

/// Operations on the host's network namespace.
///
/// Implementations report failures as [`UnirunError::Network`] naming the
/// operation and link. None of the mutating operations are idempotent.
///
/// [`UnirunError::Network`]: unirun_shared::errors::UnirunError::Network
#[async_trait]
pub trait LinkControl: Send + Sync {
    /// Look up a link by name; `Ok(None)` when it does not exist.
    async fn link_by_name(&self, name: &str) -> UnirunResult<Option<LinkInfo>>;

    /// Addresses bound to `link`, filtered by family.
    async fn addresses(
        &self,
        link: &LinkInfo,
        family: AddressFamily,
    ) -> UnirunResult<Vec<LinkAddress>>;

    async fn delete_address(&self, link: &LinkInfo, address: &LinkAddress) -> UnirunResult<()>;

    /// Routes the kernel would pick to reach `destination`.
    async fn routes_to(&self, destination: Ipv4Addr) -> UnirunResult<Vec<RouteInfo>>;

    async fn set_hardware_address(
        &self,
        link: &LinkInfo,
        address: HardwareAddr,
    ) -> UnirunResult<()>;

    /// Create a new link and return it as the kernel reports it.
    async fn create_link(&self, name: &str, kind: LinkKind) -> UnirunResult<LinkInfo>;

    /// Make `link` a member of `bridge`.
    async fn set_controller(&self, link: &LinkInfo, bridge: &LinkInfo) -> UnirunResult<()>;

    async fn set_up(&self, link: &LinkInfo) -> UnirunResult<()>;

    async fn set_down(&self, link: &LinkInfo) -> UnirunResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(destination: [u8; 4], prefix_len: u8) -> RouteInfo {
        RouteInfo {
            destination: Ipv4Addr::from(destination),
            prefix_len,
            gateway: None,
            output_link: None,
        }
    }

    #[test]
    fn test_default_route_contains_everything() {
        assert!(route([0, 0, 0, 0], 0).contains(Ipv4Addr::new(8, 8, 8, 8)));
    }

    #[test]
    fn test_prefix_containment() {
        let r = route([172, 17, 0, 0], 16);
        assert!(r.contains(Ipv4Addr::new(172, 17, 3, 4)));
        assert!(!r.contains(Ipv4Addr::new(172, 18, 0, 1)));

        let host = route([8, 8, 8, 8], 32);
        assert!(host.contains(Ipv4Addr::new(8, 8, 8, 8)));
        assert!(!host.contains(Ipv4Addr::new(8, 8, 8, 9)));
    }

    #[test]
    fn test_link_address_cidr() {
        let addr = LinkAddress::new(IpAddr::V4(Ipv4Addr::new(172, 17, 0, 2)), 16);
        assert_eq!(addr.to_string(), "172.17.0.2/16");
        assert!(AddressFamily::Inet.matches(&addr.address));
        assert!(!AddressFamily::Inet.matches(&"::1".parse().unwrap()));
        assert!(AddressFamily::Any.matches(&"::1".parse().unwrap()));
    }
}
