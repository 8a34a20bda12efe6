//! MAC address parsing, formatting and randomization
//!
//! Randomized addresses keep a fixed vendor prefix and draw the NIC
//! octets from `getrandom`, so restoration only ever needs the original
//! address recorded at discovery time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{InterfaceError, Result};

/// Vendor prefix for randomized addresses
pub const DEFAULT_OUI: [u8; 3] = [0x00, 0x00, 0x00];

/// A validated MAC address
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MacAddress {
    bytes: [u8; 6],
}

impl MacAddress {
    /// Create a new MAC address from bytes
    #[must_use]
    pub fn new(bytes: [u8; 6]) -> Self {
        Self { bytes }
    }

    /// Parse a MAC address from string
    ///
    /// Accepts formats:
    /// - `AA:BB:CC:DD:EE:FF`
    /// - `AA-BB-CC-DD-EE-FF`
    /// - `AABBCCDDEEFF`
    ///
    /// # Errors
    ///
    /// Returns [`InterfaceError::InvalidMacAddress`] carrying the input
    /// if the string is not a valid MAC address.
    pub fn parse(s: &str) -> Result<Self> {
        s.parse()
    }

    /// Get the raw bytes
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.bytes
    }

    /// Get the OUI (Organizationally Unique Identifier) portion
    #[must_use]
    pub fn oui(&self) -> [u8; 3] {
        [self.bytes[0], self.bytes[1], self.bytes[2]]
    }

    /// Create a random MAC with a specific vendor OUI
    ///
    /// The prefix is copied verbatim; callers that need the locally
    /// administered bit must set it in `oui` themselves.
    ///
    /// # Errors
    ///
    /// Returns [`InterfaceError::Rng`] if the system randomness source fails.
    pub fn random_with_oui(oui: [u8; 3]) -> Result<Self> {
        let mut bytes = [0u8; 6];
        bytes[0] = oui[0];
        bytes[1] = oui[1];
        bytes[2] = oui[2];

        getrandom::getrandom(&mut bytes[3..6])
            .map_err(|e| InterfaceError::Rng(format!("Failed to get random bytes: {}", e)))?;

        Ok(Self { bytes })
    }

    fn from_separated(s: &str, separator: char) -> Option<Self> {
        let mut bytes = [0u8; 6];
        let mut parts = s.split(separator);
        for byte in &mut bytes {
            *byte = u8::from_str_radix(parts.next()?, 16).ok()?;
        }
        if parts.next().is_some() {
            return None;
        }
        Some(Self { bytes })
    }

    fn from_plain_hex(s: &str) -> Option<Self> {
        let mut bytes = [0u8; 6];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(s.get(i * 2..i * 2 + 2)?, 16).ok()?;
        }
        Some(Self { bytes })
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            self.bytes[0],
            self.bytes[1],
            self.bytes[2],
            self.bytes[3],
            self.bytes[4],
            self.bytes[5]
        )
    }
}

impl FromStr for MacAddress {
    type Err = InterfaceError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_uppercase();

        let parsed = if normalized.contains(':') {
            Self::from_separated(&normalized, ':')
        } else if normalized.contains('-') {
            Self::from_separated(&normalized, '-')
        } else if normalized.len() == 12 {
            Self::from_plain_hex(&normalized)
        } else {
            None
        };

        parsed.ok_or_else(|| InterfaceError::InvalidMacAddress { mac: s.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_all_three_forms() {
        let expected = MacAddress::new([0x00, 0x0C, 0x29, 0x3E, 0x1F, 0xA0]);
        assert_eq!(MacAddress::parse("00:0c:29:3e:1f:a0").unwrap(), expected);
        assert_eq!(MacAddress::parse("00-0C-29-3E-1F-A0").unwrap(), expected);
        assert_eq!(MacAddress::parse("000c293e1fa0").unwrap(), expected);
    }

    #[test]
    fn test_display_is_uppercase_colon() {
        let mac = MacAddress::new([0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x01]);
        assert_eq!(mac.to_string(), "DE:AD:BE:EF:00:01");
    }

    #[test]
    fn test_invalid_strings_carry_the_input() {
        for bad in ["00:11:22:33:44", "00:11:22:33:44:GG", "00112233445", "hello"] {
            match MacAddress::parse(bad) {
                Err(InterfaceError::InvalidMacAddress { mac }) => assert_eq!(mac, bad),
                other => panic!("expected InvalidMacAddress for {:?}, got {:?}", bad, other),
            }
        }
    }

    #[test]
    fn test_random_with_oui_preserves_prefix_verbatim() {
        let mac = MacAddress::random_with_oui(DEFAULT_OUI).unwrap();
        assert_eq!(mac.oui(), [0x00, 0x00, 0x00]);

        // No locally-administered or multicast bit fixing is applied.
        let odd = MacAddress::random_with_oui([0x01, 0x00, 0x5E]).unwrap();
        assert_eq!(odd.oui(), [0x01, 0x00, 0x5E]);
    }

    #[test]
    fn test_two_random_addresses_differ() {
        let first = MacAddress::random_with_oui(DEFAULT_OUI).unwrap();
        let second = MacAddress::random_with_oui(DEFAULT_OUI).unwrap();
        assert_ne!(first, second);
    }
}
