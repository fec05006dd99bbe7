//! Merging host facts into the guest document.
//!
//! Guest-declared settings always win or fail the run: `hostname` is kept
//! when present, while a guest-declared `net` section or block-device mount
//! in the auto-assigned namespace is a conflict. Conflicts are detected
//! before anything is written to the document.

use super::tree::{GuestConfig, ensure_object_in_array};
use crate::net::HostNetworkConfig;
use crate::volumes::constants::BLOCK_SOURCE;
use crate::volumes::{BlockDeviceAllocator, VolumeConfig, is_reserved};
use serde_json::{Value, json};
use std::collections::HashSet;
use unirun_shared::errors::{UnirunError, UnirunResult};

/// Guest-side name of the single virtio NIC
pub const GUEST_INTERFACE: &str = "vioif0";

const FAMILY_INET: &str = "inet";
const METHOD_STATIC: &str = "static";

/// Add hostname, interface address, gateway and resolver settings.
pub fn merge_network(config: &mut GuestConfig, host: &HostNetworkConfig) -> UnirunResult<()> {
    if config.exists(&["net"]) {
        return Err(UnirunError::Conflict(
            "guest already defines net configuration".into(),
        ));
    }

    if config.exists(&["hostname"]) {
        tracing::info!("Guest already defines hostname, not overridden");
    } else {
        config.set(&["hostname"], host.hostname.as_str())?;
    }

    let addrs = config.ensure_array_at(&["net", "interfaces", GUEST_INTERFACE, "addrs"], 1)?;
    let addr = ensure_object_in_array(addrs, 0)?;
    addr.insert("type".into(), json!(FAMILY_INET));
    addr.insert("method".into(), json!(METHOD_STATIC));
    addr.insert("addr".into(), json!(host.ip_address));

    let gateways = config.ensure_array_at(&["net", "gateways"], 1)?;
    let gateway = ensure_object_in_array(gateways, 0)?;
    gateway.insert("type".into(), json!(FAMILY_INET));
    gateway.insert("addr".into(), json!(host.gateway));

    let dns = config.ensure_object_at(&["net", "dns"])?;
    if !host.dns_servers.is_empty() {
        dns.insert("nameservers".into(), json!(host.dns_servers));
    }
    if !host.dns_search.is_empty() {
        dns.insert("search".into(), json!(host.dns_search));
    }

    Ok(())
}

/// Add one block-device mount per volume at `/<name>`.
///
/// Devices are assigned `/dev/ld0a`, `/dev/ld1a`, ... in `volumes` order,
/// which must be the order the disks are attached to the hypervisor.
pub fn merge_volumes(config: &mut GuestConfig, volumes: &[VolumeConfig]) -> UnirunResult<()> {
    check_unique_mountpoints(volumes)?;
    if let Some(mounts) = config.get(&["mount"]) {
        check_guest_mounts(mounts, volumes)?;
    }
    if volumes.is_empty() {
        return Ok(());
    }

    let mut devices = BlockDeviceAllocator::new();
    let mounts = config.ensure_object_at(&["mount"])?;
    for volume in volumes {
        let mountpoint = mountpoint(volume);
        let device = devices.next_path();
        tracing::debug!(mountpoint = %mountpoint, device = %device, "Mounting volume");
        mounts.insert(
            mountpoint,
            json!({ "source": BLOCK_SOURCE, "path": device }),
        );
    }

    Ok(())
}

fn mountpoint(volume: &VolumeConfig) -> String {
    format!("/{}", volume.name)
}

/// Volumes whose names collide would overwrite each other's mount while both
/// disks stay attached.
fn check_unique_mountpoints(volumes: &[VolumeConfig]) -> UnirunResult<()> {
    let mut seen = HashSet::new();
    for volume in volumes {
        if !seen.insert(volume.name.as_str()) {
            return Err(UnirunError::Conflict(format!(
                "volumes share mountpoint {} ({})",
                mountpoint(volume),
                volume.path.display()
            )));
        }
    }
    Ok(())
}

fn check_guest_mounts(mounts: &Value, volumes: &[VolumeConfig]) -> UnirunResult<()> {
    let Some(mounts) = mounts.as_object() else {
        return Err(UnirunError::Conflict(
            "guest `mount` is not an object, cannot merge host volumes".into(),
        ));
    };

    for (mountpoint, mount) in mounts {
        let source = mount.get("source").and_then(Value::as_str);
        let path = mount.get("path").and_then(Value::as_str);
        if let (Some(source), Some(path)) = (source, path)
            && source == BLOCK_SOURCE
            && is_reserved(path)
        {
            return Err(UnirunError::Conflict(format!(
                "guest mount {mountpoint} uses block device {path}, cannot merge with host volumes"
            )));
        }
    }

    for volume in volumes {
        let mountpoint = mountpoint(volume);
        if mounts.contains_key(&mountpoint) {
            return Err(UnirunError::Conflict(format!(
                "guest already defines mount {mountpoint}"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn host() -> HostNetworkConfig {
        HostNetworkConfig {
            hostname: "container-1".into(),
            ip_address: "172.17.0.2/16".into(),
            gateway: "172.17.0.1".into(),
            hardware_address: "02:42:ac:11:00:02".into(),
            dns_servers: vec!["10.0.0.53".into()],
            dns_search: vec!["example.internal".into()],
        }
    }

    fn volume(name: &str) -> VolumeConfig {
        VolumeConfig {
            name: name.into(),
            path: PathBuf::from(format!("/unikernel/fs/{name}.img")),
        }
    }

    fn doc(value: Value) -> GuestConfig {
        GuestConfig::from_value(value).unwrap()
    }

    #[test]
    fn test_merge_network_into_empty_document() {
        let mut config = GuestConfig::new();
        merge_network(&mut config, &host()).unwrap();

        assert_eq!(
            config.as_value(),
            json!({
                "hostname": "container-1",
                "net": {
                    "interfaces": {
                        "vioif0": {
                            "addrs": [{"type": "inet", "method": "static", "addr": "172.17.0.2/16"}]
                        }
                    },
                    "gateways": [{"type": "inet", "addr": "172.17.0.1"}],
                    "dns": {"nameservers": ["10.0.0.53"], "search": ["example.internal"]}
                }
            })
        );
    }

    #[test]
    fn test_merge_network_omits_empty_dns_lists() {
        let mut config = GuestConfig::new();
        let host = HostNetworkConfig {
            dns_servers: vec![],
            dns_search: vec![],
            ..host()
        };
        merge_network(&mut config, &host).unwrap();

        assert_eq!(config.get(&["net", "dns"]), Some(&json!({})));
    }

    #[test]
    fn test_existing_hostname_is_kept() {
        let mut config = doc(json!({"hostname": "from-guest"}));
        merge_network(&mut config, &host()).unwrap();

        assert_eq!(config.get(&["hostname"]), Some(&json!("from-guest")));
        assert!(config.exists(&["net", "gateways"]));
    }

    #[test]
    fn test_existing_net_conflicts_and_leaves_document_unmodified() {
        let original = json!({"net": {"interfaces": {}}, "cmdline": "app"});
        let mut config = doc(original.clone());

        let err = merge_network(&mut config, &host()).unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(config.as_value(), original);
    }

    #[test]
    fn test_merge_volumes_assigns_devices_in_order() {
        let mut config = GuestConfig::new();
        merge_volumes(&mut config, &[volume("data"), volume("logs")]).unwrap();

        assert_eq!(
            config.as_value(),
            json!({
                "mount": {
                    "/data": {"source": "blk", "path": "/dev/ld0a"},
                    "/logs": {"source": "blk", "path": "/dev/ld1a"}
                }
            })
        );
    }

    #[test]
    fn test_merge_volumes_keeps_unrelated_guest_mounts() {
        let mut config = doc(json!({"mount": {"/etc": {"source": "cd9660", "path": "/dev/cd0a"}}}));
        merge_volumes(&mut config, &[volume("data")]).unwrap();

        assert_eq!(
            config.get(&["mount", "/etc", "path"]),
            Some(&json!("/dev/cd0a"))
        );
        assert_eq!(
            config.get(&["mount", "/data", "path"]),
            Some(&json!("/dev/ld0a"))
        );
    }

    #[test]
    fn test_guest_block_device_in_reserved_namespace_conflicts() {
        let original = json!({"mount": {"/app": {"source": "blk", "path": "/dev/ld0a"}}});
        let mut config = doc(original.clone());

        let err = merge_volumes(&mut config, &[volume("data")]).unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(config.as_value(), original);
    }

    #[test]
    fn test_reserved_guest_mount_conflicts_even_without_volumes() {
        let mut config = doc(json!({"mount": {"/app": {"source": "blk", "path": "/dev/ld3a"}}}));
        assert!(merge_volumes(&mut config, &[]).unwrap_err().is_conflict());
    }

    #[test]
    fn test_same_mountpoint_conflicts() {
        let mut config = doc(json!({"mount": {"/data": {"source": "virtio", "path": "/dev/vd0"}}}));
        assert!(merge_volumes(&mut config, &[volume("data")]).unwrap_err().is_conflict());
    }

    #[test]
    fn test_volumes_sharing_a_name_conflict() {
        let volumes = [
            VolumeConfig {
                name: "a".into(),
                path: PathBuf::from("/unikernel/fs/a.img"),
            },
            VolumeConfig {
                name: "a".into(),
                path: PathBuf::from("/unikernel/fs/a.raw"),
            },
        ];
        let mut config = GuestConfig::new();

        let err = merge_volumes(&mut config, &volumes).unwrap_err();
        assert!(err.is_conflict());
        assert!(config.is_empty());
    }

    #[test]
    fn test_no_volumes_leaves_document_untouched() {
        let mut config = GuestConfig::new();
        merge_volumes(&mut config, &[]).unwrap();
        assert!(config.is_empty());
    }
}
