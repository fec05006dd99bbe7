//! Persistent tap links through the tun driver.
//!
//! rtnetlink cannot create tap links, so they are made the way `ip tuntap`
//! does it: bind a tun file descriptor to a new `IFF_TAP` interface and mark
//! it persistent so it outlives the descriptor.

use std::fs::OpenOptions;
use std::os::fd::AsRawFd;
use std::path::Path;
use unirun_shared::errors::{UnirunError, UnirunResult};

const IFF_TAP: libc::c_short = 0x0002;
const IFF_NO_PI: libc::c_short = 0x1000;

nix::ioctl_write_ptr_bad!(
    tun_set_iff,
    nix::request_code_write!(b'T', 202, std::mem::size_of::<libc::c_int>()),
    TunRequest
);
nix::ioctl_write_int!(tun_set_persist, b'T', 203);

/// `struct ifreq` as `TUNSETIFF` reads it: name plus the flags union member.
#[repr(C)]
struct TunRequest {
    name: [libc::c_char; libc::IFNAMSIZ],
    flags: libc::c_short,
    _pad: [u8; 22],
}

impl TunRequest {
    fn new(name: &str, flags: libc::c_short) -> UnirunResult<Self> {
        let bytes = name.as_bytes();
        if bytes.is_empty() || bytes.len() >= libc::IFNAMSIZ || bytes.contains(&0) {
            return Err(UnirunError::Network(format!("invalid tap name '{name}'")));
        }

        let mut request = Self {
            name: [0; libc::IFNAMSIZ],
            flags,
            _pad: [0; 22],
        };
        for (dst, src) in request.name.iter_mut().zip(bytes) {
            *dst = *src as libc::c_char;
        }
        Ok(request)
    }
}

/// Create a persistent tap link named `name`.
pub fn create_persistent_tap(tun_device: &Path, name: &str) -> UnirunResult<()> {
    let request = TunRequest::new(name, IFF_TAP | IFF_NO_PI)?;

    let tun = OpenOptions::new()
        .read(true)
        .write(true)
        .open(tun_device)
        .map_err(|e| {
            UnirunError::Network(format!("open {}: {}", tun_device.display(), e))
        })?;

    // SAFETY: `request` is a valid ifreq-shaped buffer and `tun` stays open
    // for both calls.
    unsafe {
        tun_set_iff(tun.as_raw_fd(), &request)
            .map_err(|e| UnirunError::Network(format!("TUNSETIFF({name}): {e}")))?;
        tun_set_persist(tun.as_raw_fd(), 1)
            .map_err(|e| UnirunError::Network(format!("TUNSETPERSIST({name}): {e}")))?;
    }

    Ok(())
}
