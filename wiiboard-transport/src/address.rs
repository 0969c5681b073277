//! Bluetooth device addresses

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TransportError;

/// A Bluetooth device address, stored in display order (`00:1E:35:...` → `[0x00, 0x1E, 0x35, ...]`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BdAddr([u8; 6]);

impl BdAddr {
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    /// Bytes in display order
    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// Bytes in the little-endian order the kernel's `bdaddr_t` expects
    pub fn to_le_bytes(&self) -> [u8; 6] {
        let mut b = self.0;
        b.reverse();
        b
    }
}

impl FromStr for BdAddr {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TransportError::InvalidAddress(s.to_string());
        let mut bytes = [0u8; 6];
        let mut parts = s.trim().split(':');
        for byte in bytes.iter_mut() {
            let part = parts.next().ok_or_else(invalid)?;
            if part.len() != 2 || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(invalid());
            }
            *byte = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
        }
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self(bytes))
    }
}

impl fmt::Display for BdAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

// Serialized as the familiar colon-separated string, e.g. in config files.
impl Serialize for BdAddr {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BdAddr {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let addr: BdAddr = "00:1e:35:3b:7c:12".parse().unwrap();
        assert_eq!(addr.octets(), [0x00, 0x1E, 0x35, 0x3B, 0x7C, 0x12]);
        assert_eq!(addr.to_string(), "00:1E:35:3B:7C:12");
    }

    #[test]
    fn test_kernel_byte_order() {
        let addr = BdAddr::new([0x00, 0x1E, 0x35, 0x3B, 0x7C, 0x12]);
        assert_eq!(addr.to_le_bytes(), [0x12, 0x7C, 0x3B, 0x35, 0x1E, 0x00]);
    }

    #[test]
    fn test_rejects_malformed() {
        for bad in ["", "00:1E:35:3B:7C", "00:1E:35:3B:7C:12:34", "0:1E:35:3B:7C:12", "zz:1E:35:3B:7C:12"] {
            assert!(
                matches!(bad.parse::<BdAddr>(), Err(TransportError::InvalidAddress(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_serde_as_string() {
        let addr = BdAddr::new([0x00, 0x1E, 0x35, 0x3B, 0x7C, 0x12]);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"00:1E:35:3B:7C:12\"");
        let back: BdAddr = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }
}
