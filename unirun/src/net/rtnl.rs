//! rtnetlink backend for [`LinkControl`].

use super::tap::create_persistent_tap;
use super::{AddressFamily, HardwareAddr, LinkAddress, LinkControl, LinkInfo, LinkKind, RouteInfo};
use async_trait::async_trait;
use futures::TryStreamExt;
use netlink_packet_route::nlas::address::Nla as AddressNla;
use netlink_packet_route::nlas::link::Nla as LinkNla;
use netlink_packet_route::nlas::route::Nla as RouteNla;
use netlink_packet_route::{AddressMessage, LinkMessage, RouteMessage};
use netlink_packet_route::{AF_INET, AF_INET6, RT_TABLE_MAIN, RTN_UNICAST};
use rtnetlink::{Handle, IpVersion};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::path::PathBuf;
use unirun_shared::errors::{UnirunError, UnirunResult};

/// Link control over a route netlink socket in the current namespace.
pub struct RtnlLinkControl {
    handle: Handle,
    tun_device: PathBuf,
}

impl RtnlLinkControl {
    /// Open a netlink connection and drive it on the current runtime.
    pub fn connect(tun_device: impl Into<PathBuf>) -> UnirunResult<Self> {
        let (conn, handle, _) = rtnetlink::new_connection()
            .map_err(|e| UnirunError::Network(format!("netlink connect: {e}")))?;
        tokio::spawn(conn);

        Ok(Self {
            handle,
            tun_device: tun_device.into(),
        })
    }

    async fn find_link(&self, name: &str) -> UnirunResult<Option<LinkInfo>> {
        let mut links = self.handle.link().get().execute();
        while let Some(msg) = links
            .try_next()
            .await
            .map_err(|e| netlink_error("LinkList", None, e))?
        {
            let info = link_info(&msg);
            if info.name == name {
                return Ok(Some(info));
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl LinkControl for RtnlLinkControl {
    async fn link_by_name(&self, name: &str) -> UnirunResult<Option<LinkInfo>> {
        self.find_link(name).await
    }

    async fn addresses(
        &self,
        link: &LinkInfo,
        family: AddressFamily,
    ) -> UnirunResult<Vec<LinkAddress>> {
        let mut stream = self
            .handle
            .address()
            .get()
            .set_link_index_filter(link.index)
            .execute();

        let mut addresses = Vec::new();
        while let Some(msg) = stream
            .try_next()
            .await
            .map_err(|e| netlink_error("AddrList", Some(&link.name), e))?
        {
            if let Some(address) = link_address(&msg)
                && family.matches(&address.address)
            {
                addresses.push(address);
            }
        }
        Ok(addresses)
    }

    async fn delete_address(&self, link: &LinkInfo, address: &LinkAddress) -> UnirunResult<()> {
        let mut msg = AddressMessage::default();
        msg.header.index = link.index;
        msg.header.prefix_len = address.prefix_len;
        let bytes = match address.address {
            IpAddr::V4(v4) => {
                msg.header.family = AF_INET as u8;
                v4.octets().to_vec()
            }
            IpAddr::V6(v6) => {
                msg.header.family = AF_INET6 as u8;
                v6.octets().to_vec()
            }
        };
        if address.address.is_ipv4() {
            msg.nlas.push(AddressNla::Local(bytes.clone()));
        }
        msg.nlas.push(AddressNla::Address(bytes));

        self.handle
            .address()
            .del(msg)
            .execute()
            .await
            .map_err(|e| netlink_error(&format!("AddrDel({address})"), Some(&link.name), e))
    }

    /// Longest-prefix match over the main table. The dump is filtered here
    /// since rtnetlink has no route lookup request.
    async fn routes_to(&self, destination: Ipv4Addr) -> UnirunResult<Vec<RouteInfo>> {
        let mut stream = self.handle.route().get(IpVersion::V4).execute();

        let mut matching = Vec::new();
        while let Some(msg) = stream
            .try_next()
            .await
            .map_err(|e| netlink_error("RouteList", None, e))?
        {
            if msg.header.table != RT_TABLE_MAIN || msg.header.kind != RTN_UNICAST {
                continue;
            }
            let route = route_info(&msg);
            if route.contains(destination) {
                matching.push(route);
            }
        }

        let longest = matching.iter().map(|r| r.prefix_len).max();
        matching.retain(|r| Some(r.prefix_len) == longest);
        Ok(matching)
    }

    async fn set_hardware_address(
        &self,
        link: &LinkInfo,
        address: HardwareAddr,
    ) -> UnirunResult<()> {
        self.handle
            .link()
            .set(link.index)
            .address(address.octets().to_vec())
            .execute()
            .await
            .map_err(|e| netlink_error("LinkSetHardwareAddr", Some(&link.name), e))
    }

    async fn create_link(&self, name: &str, kind: LinkKind) -> UnirunResult<LinkInfo> {
        if self.find_link(name).await?.is_some() {
            return Err(UnirunError::Network(format!("LinkAdd({name}): file exists")));
        }

        match kind {
            LinkKind::Tap => create_persistent_tap(&self.tun_device, name)?,
            LinkKind::Bridge => self
                .handle
                .link()
                .add()
                .bridge(name.to_string())
                .execute()
                .await
                .map_err(|e| netlink_error("LinkAdd", Some(name), e))?,
        }

        tracing::debug!(link = %name, kind = %kind, "Created link");

        self.find_link(name).await?.ok_or_else(|| {
            UnirunError::Network(format!("LinkAdd({name}): link missing after creation"))
        })
    }

    async fn set_controller(&self, link: &LinkInfo, bridge: &LinkInfo) -> UnirunResult<()> {
        self.handle
            .link()
            .set(link.index)
            .master(bridge.index)
            .execute()
            .await
            .map_err(|e| netlink_error(&format!("LinkSetMaster({})", bridge.name), Some(&link.name), e))
    }

    async fn set_up(&self, link: &LinkInfo) -> UnirunResult<()> {
        self.handle
            .link()
            .set(link.index)
            .up()
            .execute()
            .await
            .map_err(|e| netlink_error("LinkSetUp", Some(&link.name), e))
    }

    async fn set_down(&self, link: &LinkInfo) -> UnirunResult<()> {
        self.handle
            .link()
            .set(link.index)
            .down()
            .execute()
            .await
            .map_err(|e| netlink_error("LinkSetDown", Some(&link.name), e))
    }
}

fn netlink_error(op: &str, link: Option<&str>, e: rtnetlink::Error) -> UnirunError {
    match link {
        Some(link) => UnirunError::Network(format!("{op}({link}): {e}")),
        None => UnirunError::Network(format!("{op}: {e}")),
    }
}

fn link_info(msg: &LinkMessage) -> LinkInfo {
    let mut name = String::new();
    let mut hardware_address = None;
    for nla in &msg.nlas {
        match nla {
            LinkNla::IfName(n) => name = n.clone(),
            LinkNla::Address(bytes) => hardware_address = HardwareAddr::from_slice(bytes),
            _ => {}
        }
    }
    LinkInfo {
        index: msg.header.index,
        name,
        hardware_address,
    }
}

fn link_address(msg: &AddressMessage) -> Option<LinkAddress> {
    // IFA_LOCAL is the interface's own address on point-to-point links;
    // otherwise it equals IFA_ADDRESS.
    let mut local = None;
    let mut address = None;
    for nla in &msg.nlas {
        match nla {
            AddressNla::Local(bytes) => local = ip_from_bytes(bytes),
            AddressNla::Address(bytes) => address = ip_from_bytes(bytes),
            _ => {}
        }
    }
    local
        .or(address)
        .map(|ip| LinkAddress::new(ip, msg.header.prefix_len))
}

fn route_info(msg: &RouteMessage) -> RouteInfo {
    let mut destination = Ipv4Addr::UNSPECIFIED;
    let mut gateway = None;
    let mut output_link = None;
    for nla in &msg.nlas {
        match nla {
            RouteNla::Destination(bytes) => {
                if let Some(IpAddr::V4(v4)) = ip_from_bytes(bytes) {
                    destination = v4;
                }
            }
            RouteNla::Gateway(bytes) => gateway = ip_from_bytes(bytes),
            RouteNla::Oif(index) => output_link = Some(*index),
            _ => {}
        }
    }
    RouteInfo {
        destination,
        prefix_len: msg.header.destination_prefix_length,
        gateway,
        output_link,
    }
}

fn ip_from_bytes(bytes: &[u8]) -> Option<IpAddr> {
    match bytes.len() {
        4 => <[u8; 4]>::try_from(bytes)
            .ok()
            .map(|b| IpAddr::V4(Ipv4Addr::from(b))),
        16 => <[u8; 16]>::try_from(bytes)
            .ok()
            .map(|b| IpAddr::V6(Ipv6Addr::from(b))),
        _ => None,
    }
}
