//! Host network discovery.
//!
//! Reads the container's uplink identity before the topology step destroys
//! it. Any ambiguity is fatal: a host whose networking cannot be pinned down
//! to one address and one default route cannot be safely handed to a guest.

use super::{AddressFamily, LinkControl, ResolverConfig};
use serde::Serialize;
use std::net::Ipv4Addr;
use std::path::Path;
use unirun_shared::errors::{UnirunError, UnirunResult};

/// The host's single uplink, as discovered at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostNetworkConfig {
    pub hostname: String,
    /// Primary link address in CIDR form, e.g. `172.17.0.2/16`
    pub ip_address: String,
    /// Next hop of the default route
    pub gateway: String,
    /// Burned-in address of the primary link, before randomization
    pub hardware_address: String,
    pub dns_servers: Vec<String>,
    pub dns_search: Vec<String>,
}

/// Input for host discovery.
pub struct DiscoveryInput<'a> {
    pub links: &'a dyn LinkControl,
    pub primary_link: &'a str,
    /// Destination whose route is taken as the default route
    pub route_probe: Ipv4Addr,
    pub resolv_conf: &'a Path,
}

/// Discover the host's uplink configuration.
///
/// The default route is found by asking which route reaches `route_probe`.
/// That is a heuristic: on hosts with more specific routes towards the
/// probe it finds those instead of the real default route.
pub async fn discover(input: DiscoveryInput<'_>) -> UnirunResult<HostNetworkConfig> {
    let link = input
        .links
        .link_by_name(input.primary_link)
        .await?
        .ok_or_else(|| {
            UnirunError::Discovery(format!("link {} not found", input.primary_link))
        })?;

    let addresses = input.links.addresses(&link, AddressFamily::Inet).await?;
    let [address] = addresses.as_slice() else {
        return Err(UnirunError::Discovery(format!(
            "{}: expected a single IPv4 address, found {}",
            link.name,
            addresses.len()
        )));
    };

    let routes = input.links.routes_to(input.route_probe).await?;
    let [route] = routes.as_slice() else {
        return Err(UnirunError::Discovery(format!(
            "could not determine single default route (got {})",
            routes.len()
        )));
    };
    let gateway = route.gateway.ok_or_else(|| {
        UnirunError::Discovery(format!(
            "route towards {} has no gateway",
            input.route_probe
        ))
    })?;

    let hardware_address = link.hardware_address.ok_or_else(|| {
        UnirunError::Discovery(format!("{} has no hardware address", link.name))
    })?;

    let dns = ResolverConfig::parse(input.resolv_conf);
    if let Some(ref err) = dns.open_error {
        tracing::warn!(
            path = %input.resolv_conf.display(),
            "Could not read resolver configuration, guest gets no DNS: {}",
            err
        );
    }

    let config = HostNetworkConfig {
        hostname: read_hostname(),
        ip_address: address.to_string(),
        gateway: gateway.to_string(),
        hardware_address: hardware_address.to_string(),
        dns_servers: dns.servers,
        dns_search: dns.search,
    };

    tracing::info!(
        link = %link.name,
        address = %config.ip_address,
        gateway = %config.gateway,
        "Discovered host network"
    );

    Ok(config)
}

/// Local hostname, or empty when it cannot be read.
pub fn read_hostname() -> String {
    match nix::unistd::gethostname() {
        Ok(name) => name.to_string_lossy().into_owned(),
        Err(e) => {
            tracing::debug!("gethostname failed: {}", e);
            String::new()
        }
    }
}
