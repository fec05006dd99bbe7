//! Ethernet hardware addresses.

use rand::RngCore;
use std::fmt;
use std::str::FromStr;
use unirun_shared::errors::UnirunError;

/// A 48-bit Ethernet hardware address.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct HardwareAddr([u8; 6]);

impl HardwareAddr {
    pub const LEN: usize = 6;

    /// I/G bit: set for multicast/broadcast.
    const MULTICAST_BIT: u8 = 0x01;
    /// U/L bit: set for locally administered addresses.
    const LOCAL_BIT: u8 = 0x02;

    pub fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    /// Build from a netlink attribute payload; `None` unless exactly 6 bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        <[u8; 6]>::try_from(bytes).ok().map(Self)
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// Random, locally administered, unicast address drawn from `rng`.
    pub fn generate_local_unicast<R: RngCore + ?Sized>(rng: &mut R) -> Self {
        let mut octets = [0u8; 6];
        rng.fill_bytes(&mut octets);
        octets[0] &= !Self::MULTICAST_BIT;
        octets[0] |= Self::LOCAL_BIT;
        Self(octets)
    }

    /// Random, locally administered, unicast address from the thread RNG.
    pub fn random() -> Self {
        Self::generate_local_unicast(&mut rand::rng())
    }

    pub fn is_unicast(&self) -> bool {
        self.0[0] & Self::MULTICAST_BIT == 0
    }

    pub fn is_locally_administered(&self) -> bool {
        self.0[0] & Self::LOCAL_BIT != 0
    }
}

impl fmt::Display for HardwareAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl fmt::Debug for HardwareAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HardwareAddr({self})")
    }
}

impl FromStr for HardwareAddr {
    type Err = UnirunError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || UnirunError::Config(format!("invalid hardware address: {s}"));

        let mut octets = [0u8; 6];
        let mut parts = s.split(':');
        for octet in octets.iter_mut() {
            let part = parts.next().ok_or_else(invalid)?;
            if part.len() != 2 {
                return Err(invalid());
            }
            *octet = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
        }
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self(octets))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_display_is_lowercase_colon_hex() {
        let addr = HardwareAddr::new([0x02, 0x42, 0xAC, 0x11, 0x00, 0x02]);
        assert_eq!(addr.to_string(), "02:42:ac:11:00:02");
    }

    #[test]
    fn test_parse_display_agree() {
        let addr: HardwareAddr = "de:ad:be:ef:00:01".parse().unwrap();
        assert_eq!(addr.octets(), [0xde, 0xad, 0xbe, 0xef, 0x00, 0x01]);
        assert!("de:ad:be:ef:00".parse::<HardwareAddr>().is_err());
        assert!("de:ad:be:ef:00:01:02".parse::<HardwareAddr>().is_err());
        assert!("zz:ad:be:ef:00:01".parse::<HardwareAddr>().is_err());
    }

    #[test]
    fn test_from_slice_requires_six_bytes() {
        assert!(HardwareAddr::from_slice(&[1, 2, 3, 4, 5, 6]).is_some());
        assert!(HardwareAddr::from_slice(&[1, 2, 3]).is_none());
        assert!(HardwareAddr::from_slice(&[0; 20]).is_none());
    }

    #[test]
    fn test_random_is_local_unicast() {
        for _ in 0..64 {
            let addr = HardwareAddr::random();
            assert!(addr.is_unicast());
            assert!(addr.is_locally_administered());
        }
    }

    proptest! {
        #[test]
        fn generated_address_is_local_unicast_for_any_seed(seed in any::<u64>()) {
            let mut rng = StdRng::seed_from_u64(seed);
            let addr = HardwareAddr::generate_local_unicast(&mut rng);
            prop_assert_eq!(addr.octets()[0] & 0x01, 0);
            prop_assert_eq!(addr.octets()[0] & 0x02, 0x02);
        }
    }
}
