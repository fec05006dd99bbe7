//! Bridged tap topology.
//!
//! ```text
//!   before:  eth0 (172.17.0.2/16, burned-in MAC)
//!
//!   after:   br0 ─┬─ eth0 (no address, random local MAC)
//!                 └─ tap0 ── guest NIC (burned-in MAC, 172.17.0.2/16)
//! ```
//!
//! The guest takes over the container's L2/L3 identity; the host link
//! becomes a plain bridge port. Addresses come off the primary link before it
//! is enslaved, and the bridge comes up last so it never runs without
//! members. The sequence is not idempotent and nothing is rolled back on
//! failure.

use super::{AddressFamily, HardwareAddr, HostNetworkConfig, LinkControl, LinkInfo, LinkKind};
use unirun_shared::errors::{UnirunError, UnirunResult};

/// Link names for the topology.
#[derive(Debug, Clone, Copy)]
pub struct TopologySpec<'a> {
    pub primary_link: &'a str,
    pub tap_link: &'a str,
    pub bridge_link: &'a str,
}

/// Result of building the topology.
#[derive(Debug, Clone)]
pub struct TopologyOutput {
    /// Tap link the hypervisor attaches its NIC to
    pub tap_name: String,
    pub bridge_name: String,
    /// Address now carried by the primary link
    pub primary_hardware_address: HardwareAddr,
}

/// Build the bridge/tap topology around the primary link.
pub async fn build_topology(
    links: &dyn LinkControl,
    spec: TopologySpec<'_>,
    host: &HostNetworkConfig,
) -> UnirunResult<TopologyOutput> {
    let primary = links
        .link_by_name(spec.primary_link)
        .await?
        .ok_or_else(|| UnirunError::Network(format!("link {} not found", spec.primary_link)))?;

    tracing::info!(
        link = %primary.name,
        address = %host.ip_address,
        "Handing primary link over to bridge"
    );

    disable_link(links, &primary).await?;
    flush_addresses(links, &primary).await?;
    let primary_hardware_address = randomize_hardware_address(links, &primary).await?;

    let tap = create_tap(links, spec.tap_link).await?;
    let bridge = create_bridge(links, spec.bridge_link).await?;

    attach_to_bridge(links, &primary, &bridge).await?;
    attach_to_bridge(links, &tap, &bridge).await?;

    for link in [&tap, &primary, &bridge] {
        bring_up(links, link).await?;
    }

    tracing::info!(
        tap = %tap.name,
        bridge = %bridge.name,
        primary_mac = %primary_hardware_address,
        "Link topology ready"
    );

    Ok(TopologyOutput {
        tap_name: tap.name,
        bridge_name: bridge.name,
        primary_hardware_address,
    })
}

/// Administratively disable `link`.
pub async fn disable_link(links: &dyn LinkControl, link: &LinkInfo) -> UnirunResult<()> {
    links.set_down(link).await
}

/// Delete every L3 address bound to `link`.
pub async fn flush_addresses(links: &dyn LinkControl, link: &LinkInfo) -> UnirunResult<()> {
    let addresses = links.addresses(link, AddressFamily::Any).await?;
    for address in &addresses {
        tracing::debug!(link = %link.name, address = %address, "Deleting address");
        links.delete_address(link, address).await?;
    }
    Ok(())
}

/// Replace the burned-in address of `link` with a random local unicast one.
pub async fn randomize_hardware_address(
    links: &dyn LinkControl,
    link: &LinkInfo,
) -> UnirunResult<HardwareAddr> {
    let address = HardwareAddr::random();
    links.set_hardware_address(link, address).await?;
    Ok(address)
}

pub async fn create_tap(links: &dyn LinkControl, name: &str) -> UnirunResult<LinkInfo> {
    links.create_link(name, LinkKind::Tap).await
}

pub async fn create_bridge(links: &dyn LinkControl, name: &str) -> UnirunResult<LinkInfo> {
    links.create_link(name, LinkKind::Bridge).await
}

pub async fn attach_to_bridge(
    links: &dyn LinkControl,
    link: &LinkInfo,
    bridge: &LinkInfo,
) -> UnirunResult<()> {
    links.set_controller(link, bridge).await
}

pub async fn bring_up(links: &dyn LinkControl, link: &LinkInfo) -> UnirunResult<()> {
    links.set_up(link).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::fake::FakeLinkControl;

    const SPEC: TopologySpec<'static> = TopologySpec {
        primary_link: "eth0",
        tap_link: "tap0",
        bridge_link: "br0",
    };

    fn host() -> HostNetworkConfig {
        HostNetworkConfig {
            hostname: "box".into(),
            ip_address: "172.17.0.2/16".into(),
            gateway: "172.17.0.1".into(),
            hardware_address: "02:42:ac:11:00:02".into(),
            dns_servers: vec![],
            dns_search: vec![],
        }
    }

    #[tokio::test]
    async fn test_builds_topology_in_order() {
        let links = FakeLinkControl::container_host();

        let output = build_topology(&links, SPEC, &host()).await.unwrap();

        assert_eq!(output.tap_name, "tap0");
        assert_eq!(output.bridge_name, "br0");
        assert_eq!(
            links.calls(),
            vec![
                "set_down eth0",
                "delete_address eth0 172.17.0.2/16",
                "delete_address eth0 fe80::42:acff:fe11:2/64",
                "set_hardware_address eth0",
                "create_link tap0 tap",
                "create_link br0 bridge",
                "set_controller eth0 br0",
                "set_controller tap0 br0",
                "set_up tap0",
                "set_up eth0",
                "set_up br0",
            ]
        );
    }

    #[tokio::test]
    async fn test_final_link_state() {
        let links = FakeLinkControl::container_host();

        let output = build_topology(&links, SPEC, &host()).await.unwrap();

        let eth0 = links.link("eth0").unwrap();
        let tap0 = links.link("tap0").unwrap();
        let br0 = links.link("br0").unwrap();

        assert!(eth0.addresses.is_empty());
        assert_eq!(eth0.info.hardware_address, Some(output.primary_hardware_address));
        assert_ne!(
            eth0.info.hardware_address.unwrap().to_string(),
            "02:42:ac:11:00:02"
        );
        assert!(output.primary_hardware_address.is_unicast());
        assert!(output.primary_hardware_address.is_locally_administered());

        assert_eq!(eth0.controller, Some(br0.info.index));
        assert_eq!(tap0.controller, Some(br0.info.index));
        assert_eq!(tap0.kind, Some(LinkKind::Tap));
        assert_eq!(br0.kind, Some(LinkKind::Bridge));
        assert!(eth0.up && tap0.up && br0.up);
    }

    #[tokio::test]
    async fn test_second_run_fails_on_existing_links() {
        let links = FakeLinkControl::container_host();
        build_topology(&links, SPEC, &host()).await.unwrap();

        let err = build_topology(&links, SPEC, &host()).await.unwrap_err();
        assert!(matches!(err, UnirunError::Network(_)));
    }

    #[tokio::test]
    async fn test_failure_stops_sequence() {
        let links = FakeLinkControl::container_host();
        links.fail_on("create_link br0");

        let err = build_topology(&links, SPEC, &host()).await.unwrap_err();
        assert!(matches!(err, UnirunError::Network(_)));

        let calls = links.calls();
        assert_eq!(calls.last().map(String::as_str), Some("create_link br0 bridge"));
        assert!(!calls.iter().any(|c| c.starts_with("set_controller")));
        assert!(!calls.iter().any(|c| c.starts_with("set_up")));
    }

    #[tokio::test]
    async fn test_missing_primary_link_fails_before_mutation() {
        let links = FakeLinkControl::new();

        let err = build_topology(&links, SPEC, &host()).await.unwrap_err();
        assert!(matches!(err, UnirunError::Network(_)));
        assert!(links.calls().is_empty());
    }
}
