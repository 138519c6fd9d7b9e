//! Common types used throughout ipwatch

use std::fmt;
use std::str::FromStr;

/// MAC Address (6 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    /// Create a new MAC address
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    /// Broadcast MAC address (ff:ff:ff:ff:ff:ff)
    pub const fn broadcast() -> Self {
        Self([0xff, 0xff, 0xff, 0xff, 0xff, 0xff])
    }

    /// Zero MAC address (00:00:00:00:00:00)
    pub const fn zero() -> Self {
        Self([0x00, 0x00, 0x00, 0x00, 0x00, 0x00])
    }

    /// Create a MAC address from a slice, which must be exactly 6 bytes
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        if slice.len() == 6 {
            let mut bytes = [0u8; 6];
            bytes.copy_from_slice(slice);
            Some(Self(bytes))
        } else {
            None
        }
    }

    /// Get bytes as slice
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Convert to array
    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// Check if this is the broadcast address
    pub fn is_broadcast(&self) -> bool {
        self.0 == [0xff; 6]
    }

    /// Check if this is the all-zero address
    pub fn is_zero(&self) -> bool {
        self.0 == [0x00; 6]
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

impl FromStr for MacAddr {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 6 {
            return Err(crate::Error::config("Invalid MAC address format"));
        }

        let mut bytes = [0u8; 6];
        for (i, part) in parts.iter().enumerate() {
            if part.len() != 2 {
                return Err(crate::Error::config("Invalid MAC address format"));
            }
            bytes[i] = u8::from_str_radix(part, 16)
                .map_err(|_| crate::Error::config("Invalid MAC address hex"))?;
        }

        Ok(MacAddr(bytes))
    }
}

impl From<[u8; 6]> for MacAddr {
    fn from(bytes: [u8; 6]) -> Self {
        MacAddr(bytes)
    }
}

/// IP protocol version of an observed mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IpVersion {
    V4,
    V6,
}

impl IpVersion {
    /// Numeric form used in the history database (4 or 6)
    pub fn as_db(&self) -> i64 {
        match self {
            IpVersion::V4 => 4,
            IpVersion::V6 => 6,
        }
    }
}

impl fmt::Display for IpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpVersion::V4 => write!(f, "IPv4"),
            IpVersion::V6 => write!(f, "IPv6"),
        }
    }
}

/// Wire timestamp of a captured frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketTime {
    /// Seconds since the epoch
    pub sec: i64,
    /// Microseconds within the second
    pub usec: i64,
}

impl PacketTime {
    pub const fn new(sec: i64, usec: i64) -> Self {
        Self { sec, usec }
    }
}

/// A single address observation decoded from a captured frame
///
/// Produced by the frame decoder and consumed immediately by the change
/// detector. The IP address is in canonical text form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub ip_version: IpVersion,
    pub ip_addr: String,
    pub hw_addr: MacAddr,
    pub captured_at: PacketTime,
}

/// Read access to the current IP-to-hardware mappings
///
/// Implemented by the history store. The frame decoder consults this to
/// detect forged ARP replies without mutating history.
pub trait CurrentMappings {
    /// The hardware address currently mapped to an IP address, if any
    fn current_hw(&self, ip_version: IpVersion, ip_addr: &str) -> Option<MacAddr>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mac_addr_display() {
        let mac = MacAddr([0x00, 0x11, 0x22, 0xaa, 0xbb, 0xcc]);
        assert_eq!(format!("{}", mac), "00:11:22:aa:bb:cc");
    }

    #[test]
    fn test_mac_addr_parse() {
        let mac: MacAddr = "aa:bb:cc:00:11:22".parse().unwrap();
        assert_eq!(mac.octets(), [0xaa, 0xbb, 0xcc, 0x00, 0x11, 0x22]);
        assert!("aa:bb:cc:00:11".parse::<MacAddr>().is_err());
        assert!("aa:bb:cc:00:11:2g".parse::<MacAddr>().is_err());
    }

    #[test]
    fn test_mac_addr_special() {
        assert!(MacAddr::broadcast().is_broadcast());
        assert!(MacAddr::zero().is_zero());
        assert!(!MacAddr([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]).is_broadcast());
        assert!(!MacAddr([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]).is_zero());
    }

    #[test]
    fn test_mac_addr_from_slice() {
        assert!(MacAddr::from_slice(&[1, 2, 3, 4, 5]).is_none());
        let mac = MacAddr::from_slice(&[1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(mac.octets(), [1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_ip_version_db_form() {
        assert_eq!(IpVersion::V4.as_db(), 4);
        assert_eq!(IpVersion::V6.as_db(), 6);
    }
}
