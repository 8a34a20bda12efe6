//! Wireless adapter records and role capability detection

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use aircrew_netlink::{InterfaceMode, PhyCapabilities};

use crate::error::{InterfaceError, Result};
use crate::mac::MacAddress;

/// Roles a radio can be reserved for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Raw frame capture and injection
    Monitor,
    /// Access point (beacon, associate clients)
    #[serde(rename = "ap")]
    AccessPoint,
    /// Upstream connectivity; exempt from shutdown restoration
    Internet,
}

impl Role {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Monitor => "monitor",
            Role::AccessPoint => "ap",
            Role::Internet => "internet",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = InterfaceError;

    fn from_str(s: &str) -> Result<Self> {
        let token = s.trim();
        if token.eq_ignore_ascii_case("monitor") {
            Ok(Role::Monitor)
        } else if token.eq_ignore_ascii_case("ap") {
            Ok(Role::AccessPoint)
        } else if token.eq_ignore_ascii_case("internet") {
            Ok(Role::Internet)
        } else {
            Err(InterfaceError::InvalidValue {
                value: s.to_string(),
                expected: "one of: monitor, ap, internet",
            })
        }
    }
}

/// One radio known to the registry
///
/// Capabilities are fixed at discovery time; only the current MAC and the
/// external-management flag change afterwards. `original_mac` is immutable
/// for the adapter's lifetime, it is what shutdown restoration writes back.
#[derive(Debug, Clone)]
pub struct Adapter {
    name: String,
    ifindex: u32,
    phy: u32,
    supports_monitor: bool,
    supports_ap: bool,
    externally_managed: bool,
    original_mac: MacAddress,
    current_mac: MacAddress,
}

impl Adapter {
    /// Create an adapter record with no detected capabilities yet
    #[must_use]
    pub fn new(name: impl Into<String>, ifindex: u32, phy: u32, mac: MacAddress) -> Self {
        Self {
            name: name.into(),
            ifindex,
            phy,
            supports_monitor: false,
            supports_ap: false,
            externally_managed: false,
            original_mac: mac.clone(),
            current_mac: mac,
        }
    }

    /// Record mode support from the driver-reported capability set
    pub fn apply_capabilities(&mut self, caps: &PhyCapabilities) {
        self.supports_monitor = caps.supported_modes.contains(&InterfaceMode::Monitor);
        self.supports_ap = caps.supported_modes.contains(&InterfaceMode::AccessPoint);
    }

    /// Whether the radio can serve the given role
    ///
    /// `Internet` has no mode requirement; any interface can be an uplink.
    #[must_use]
    pub fn supports(&self, role: Role) -> bool {
        match role {
            Role::Monitor => self.supports_monitor,
            Role::AccessPoint => self.supports_ap,
            Role::Internet => true,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn ifindex(&self) -> u32 {
        self.ifindex
    }

    /// Physical radio (wiphy) id; several interfaces may share one
    #[must_use]
    pub fn phy(&self) -> u32 {
        self.phy
    }

    #[must_use]
    pub fn supports_monitor(&self) -> bool {
        self.supports_monitor
    }

    #[must_use]
    pub fn supports_ap(&self) -> bool {
        self.supports_ap
    }

    #[must_use]
    pub fn is_externally_managed(&self) -> bool {
        self.externally_managed
    }

    pub fn set_externally_managed(&mut self, managed: bool) {
        self.externally_managed = managed;
    }

    #[must_use]
    pub fn original_mac(&self) -> &MacAddress {
        &self.original_mac
    }

    #[must_use]
    pub fn current_mac(&self) -> &MacAddress {
        &self.current_mac
    }

    pub fn set_current_mac(&mut self, mac: MacAddress) {
        self.current_mac = mac;
    }

    /// Serializable snapshot for status output
    #[must_use]
    pub fn summary(&self, active: bool) -> AdapterSummary {
        AdapterSummary {
            name: self.name.clone(),
            ifindex: self.ifindex,
            phy: self.phy,
            supports_monitor: self.supports_monitor,
            supports_ap: self.supports_ap,
            externally_managed: self.externally_managed,
            active,
            original_mac: self.original_mac.to_string(),
            current_mac: self.current_mac.to_string(),
        }
    }
}

/// Point-in-time view of one adapter, shaped for JSON status output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterSummary {
    pub name: String,
    pub ifindex: u32,
    pub phy: u32,
    pub supports_monitor: bool,
    pub supports_ap: bool,
    pub externally_managed: bool,
    pub active: bool,
    pub original_mac: String,
    pub current_mac: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps_with(modes: &[InterfaceMode]) -> PhyCapabilities {
        PhyCapabilities {
            wiphy: 0,
            name: "phy0".to_string(),
            supported_modes: modes.to_vec(),
            supports_monitor: modes.contains(&InterfaceMode::Monitor),
            supports_ap: modes.contains(&InterfaceMode::AccessPoint),
            supports_station: modes.contains(&InterfaceMode::Station),
        }
    }

    #[test]
    fn capabilities_follow_driver_mode_list() {
        let mac = MacAddress::new([0, 0x0C, 0x29, 0, 0, 1]);
        let mut adapter = Adapter::new("wlan0", 3, 0, mac);
        assert!(!adapter.supports_monitor());
        assert!(!adapter.supports_ap());

        adapter.apply_capabilities(&caps_with(&[InterfaceMode::Station, InterfaceMode::Monitor]));
        assert!(adapter.supports_monitor());
        assert!(!adapter.supports_ap());
        assert!(adapter.supports(Role::Monitor));
        assert!(!adapter.supports(Role::AccessPoint));
        assert!(adapter.supports(Role::Internet));
    }

    #[test]
    fn current_mac_moves_original_stays() {
        let original = MacAddress::new([0, 0x0C, 0x29, 0, 0, 2]);
        let mut adapter = Adapter::new("wlan1", 4, 1, original.clone());

        let replacement = MacAddress::new([0, 0, 0, 0xAA, 0xBB, 0xCC]);
        adapter.set_current_mac(replacement.clone());
        assert_eq!(adapter.current_mac(), &replacement);
        assert_eq!(adapter.original_mac(), &original);
    }

    #[test]
    fn role_tokens_parse_case_insensitively() {
        assert_eq!("monitor".parse::<Role>().unwrap(), Role::Monitor);
        assert_eq!("AP".parse::<Role>().unwrap(), Role::AccessPoint);
        assert_eq!("Internet".parse::<Role>().unwrap(), Role::Internet);

        match "bridge".parse::<Role>() {
            Err(InterfaceError::InvalidValue { value, .. }) => assert_eq!(value, "bridge"),
            other => panic!("expected InvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn role_serializes_to_lowercase_tokens() {
        assert_eq!(serde_json::to_string(&Role::AccessPoint).unwrap(), "\"ap\"");
        assert_eq!(serde_json::to_string(&Role::Monitor).unwrap(), "\"monitor\"");
        assert_eq!(
            serde_json::from_str::<Role>("\"internet\"").unwrap(),
            Role::Internet
        );
    }

    #[test]
    fn summary_formats_macs_for_status_output() {
        let mac = MacAddress::new([0xDE, 0xAD, 0xBE, 0xEF, 0, 3]);
        let adapter = Adapter::new("wlan0", 5, 2, mac);
        let summary = adapter.summary(true);
        assert!(summary.active);
        assert_eq!(summary.phy, 2);
        assert_eq!(summary.original_mac, "DE:AD:BE:EF:00:03");

        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"name\":\"wlan0\""));
        assert!(json.contains("\"current_mac\":\"DE:AD:BE:EF:00:03\""));
    }
}
