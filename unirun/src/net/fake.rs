//! In-memory [`LinkControl`] for tests.
//!
//! Models just enough kernel state (links, addresses, bridge membership,
//! routes) to check discovery and topology sequencing, and records every
//! mutating call in order.

use super::{AddressFamily, HardwareAddr, LinkAddress, LinkControl, LinkInfo, LinkKind, RouteInfo};
use async_trait::async_trait;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Mutex;
use unirun_shared::errors::{UnirunError, UnirunResult};

#[derive(Debug, Clone)]
pub struct FakeLink {
    pub info: LinkInfo,
    pub kind: Option<LinkKind>,
    pub up: bool,
    pub controller: Option<u32>,
    pub addresses: Vec<LinkAddress>,
}

#[derive(Debug, Default)]
struct FakeState {
    links: Vec<FakeLink>,
    routes: Vec<RouteInfo>,
    calls: Vec<String>,
    fail_on: Option<String>,
    next_index: u32,
}

#[derive(Debug, Default)]
pub struct FakeLinkControl {
    state: Mutex<FakeState>,
}

impl FakeLinkControl {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                next_index: 1,
                ..Default::default()
            }),
        }
    }

    /// A typical container: `eth0` with one IPv4 address and a default route.
    pub fn container_host() -> Self {
        let fake = Self::new();
        let eth0 = fake.add_link("eth0", HardwareAddr::new([0x02, 0x42, 0xac, 0x11, 0x00, 0x02]));
        fake.add_address("eth0", LinkAddress::new(IpAddr::V4(Ipv4Addr::new(172, 17, 0, 2)), 16));
        fake.add_address("eth0", LinkAddress::new("fe80::42:acff:fe11:2".parse().unwrap(), 64));
        fake.add_route(RouteInfo {
            destination: Ipv4Addr::UNSPECIFIED,
            prefix_len: 0,
            gateway: Some(IpAddr::V4(Ipv4Addr::new(172, 17, 0, 1))),
            output_link: Some(eth0.index),
        });
        fake.add_route(RouteInfo {
            destination: Ipv4Addr::new(172, 17, 0, 0),
            prefix_len: 16,
            gateway: None,
            output_link: Some(eth0.index),
        });
        fake
    }

    pub fn add_link(&self, name: &str, hardware_address: HardwareAddr) -> LinkInfo {
        let mut state = self.state.lock().unwrap();
        let info = LinkInfo {
            index: state.next_index,
            name: name.to_string(),
            hardware_address: Some(hardware_address),
        };
        state.next_index += 1;
        state.links.push(FakeLink {
            info: info.clone(),
            kind: None,
            up: true,
            controller: None,
            addresses: Vec::new(),
        });
        info
    }

    pub fn add_address(&self, name: &str, address: LinkAddress) {
        let mut state = self.state.lock().unwrap();
        let link = state
            .links
            .iter_mut()
            .find(|l| l.info.name == name)
            .expect("link must exist");
        link.addresses.push(address);
    }

    pub fn add_route(&self, route: RouteInfo) {
        self.state.lock().unwrap().routes.push(route);
    }

    /// Make the first call whose record starts with `prefix` fail.
    pub fn fail_on(&self, prefix: &str) {
        self.state.lock().unwrap().fail_on = Some(prefix.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn link(&self, name: &str) -> Option<FakeLink> {
        let state = self.state.lock().unwrap();
        state.links.iter().find(|l| l.info.name == name).cloned()
    }

    fn record(&self, call: String) -> UnirunResult<()> {
        let mut state = self.state.lock().unwrap();
        let failing = state
            .fail_on
            .as_ref()
            .is_some_and(|prefix| call.starts_with(prefix.as_str()));
        state.calls.push(call.clone());
        if failing {
            state.fail_on = None;
            return Err(UnirunError::Network(format!("{call}: operation not permitted")));
        }
        Ok(())
    }

    fn with_link<T>(
        &self,
        index: u32,
        f: impl FnOnce(&mut FakeLink) -> T,
    ) -> UnirunResult<T> {
        let mut state = self.state.lock().unwrap();
        state
            .links
            .iter_mut()
            .find(|l| l.info.index == index)
            .map(f)
            .ok_or_else(|| UnirunError::Network(format!("no link with index {index}")))
    }
}

#[async_trait]
impl LinkControl for FakeLinkControl {
    async fn link_by_name(&self, name: &str) -> UnirunResult<Option<LinkInfo>> {
        Ok(self.link(name).map(|l| l.info))
    }

    async fn addresses(
        &self,
        link: &LinkInfo,
        family: AddressFamily,
    ) -> UnirunResult<Vec<LinkAddress>> {
        self.with_link(link.index, |l| {
            l.addresses
                .iter()
                .filter(|a| family.matches(&a.address))
                .copied()
                .collect()
        })
    }

    async fn delete_address(&self, link: &LinkInfo, address: &LinkAddress) -> UnirunResult<()> {
        self.record(format!("delete_address {} {}", link.name, address))?;
        self.with_link(link.index, |l| l.addresses.retain(|a| a != address))
    }

    async fn routes_to(&self, destination: Ipv4Addr) -> UnirunResult<Vec<RouteInfo>> {
        let state = self.state.lock().unwrap();
        let matching: Vec<&RouteInfo> =
            state.routes.iter().filter(|r| r.contains(destination)).collect();
        let longest = matching.iter().map(|r| r.prefix_len).max();
        Ok(matching
            .into_iter()
            .filter(|r| Some(r.prefix_len) == longest)
            .cloned()
            .collect())
    }

    async fn set_hardware_address(
        &self,
        link: &LinkInfo,
        address: HardwareAddr,
    ) -> UnirunResult<()> {
        self.record(format!("set_hardware_address {}", link.name))?;
        self.with_link(link.index, |l| l.info.hardware_address = Some(address))
    }

    async fn create_link(&self, name: &str, kind: LinkKind) -> UnirunResult<LinkInfo> {
        self.record(format!("create_link {name} {kind}"))?;
        if self.link(name).is_some() {
            return Err(UnirunError::Network(format!(
                "LinkAdd({name}): file exists"
            )));
        }
        let info = self.add_link(name, HardwareAddr::random());
        self.with_link(info.index, |l| {
            l.kind = Some(kind);
            l.up = false;
        })?;
        Ok(info)
    }

    async fn set_controller(&self, link: &LinkInfo, bridge: &LinkInfo) -> UnirunResult<()> {
        self.record(format!("set_controller {} {}", link.name, bridge.name))?;
        self.with_link(link.index, |l| l.controller = Some(bridge.index))
    }

    async fn set_up(&self, link: &LinkInfo) -> UnirunResult<()> {
        self.record(format!("set_up {}", link.name))?;
        self.with_link(link.index, |l| l.up = true)
    }

    async fn set_down(&self, link: &LinkInfo) -> UnirunResult<()> {
        self.record(format!("set_down {}", link.name))?;
        self.with_link(link.index, |l| l.up = false)
    }
}
