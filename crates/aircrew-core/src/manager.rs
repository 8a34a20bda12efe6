//! Allocation, guarded state transitions and shutdown restore
//!
//! [`RadioManager`] owns the registry plus three pieces of book-keeping:
//! which radios are claimed (`active`), which must be left alone at
//! shutdown (`exclude_restore`), and which virtual interfaces this
//! process fabricated and therefore owns.

use std::collections::HashSet;
use std::sync::Arc;

use aircrew_netlink::{InterfaceMode, WirelessManager};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::adapter::{AdapterSummary, Role};
use crate::error::{InterfaceError, Result};
use crate::mac::{MacAddress, DEFAULT_OUI};
use crate::ops::{RadioOps, OS_INVALID_ARGUMENT};
use crate::planner::{self, VifPlan};
use crate::registry::Registry;

/// Behavioral knobs for [`RadioManager`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Interface carrying the internet uplink; setting this enables the
    /// sharing restrictions on externally managed radios
    pub uplink_interface: Option<String>,
    /// Name prefix for fabricated virtual interfaces
    pub vif_prefix: String,
    /// How many candidate names to try before giving up on fabrication
    pub vif_name_attempts: u32,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            uplink_interface: None,
            vif_prefix: "wlan".to_string(),
            vif_name_attempts: 64,
        }
    }
}

/// What shutdown restoration managed to do, interface by interface
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupReport {
    pub restored: Vec<String>,
    pub failed_restores: Vec<String>,
    pub removed_vifs: Vec<String>,
    pub failed_removals: Vec<String>,
}

/// Hands radios to roles and keeps them restorable
pub struct RadioManager {
    ops: Arc<dyn RadioOps>,
    config: ManagerConfig,
    registry: Registry,
    active: HashSet<String>,
    exclude_restore: HashSet<String>,
    fabricated: Vec<String>,
}

impl RadioManager {
    /// Discover the host's radios and start with nothing claimed
    pub fn new(ops: Arc<dyn RadioOps>, config: ManagerConfig) -> Result<Self> {
        let registry = Registry::discover(ops.as_ref())?;
        info!(target: "wifi", radios = registry.len(), "radio manager ready");
        Ok(Self {
            ops,
            config,
            registry,
            active: HashSet::new(),
            exclude_restore: HashSet::new(),
            fabricated: Vec::new(),
        })
    }

    /// Claim a caller-chosen interface for a role
    ///
    /// An internet uplink is special-cased: the name is excluded from
    /// shutdown restore even when it is not a radio we manage (wired or
    /// cellular uplinks never appear in the registry), and unknown
    /// names succeed without being claimed.
    #[tracing::instrument(target = "wifi", skip(self))]
    pub fn validate(&mut self, interface: &str, role: Option<Role>) -> Result<()> {
        if role == Some(Role::Internet) {
            self.exclude_restore.insert(interface.to_string());
            if !self.registry.contains(interface) {
                debug!(target: "wifi", interface, "uplink is not a managed radio, leaving it alone");
                return Ok(());
            }
        }

        let adapter = self.registry.get(interface)?;
        if role != Some(Role::Internet) && adapter.is_externally_managed() && self.sharing_enabled()
        {
            return Err(InterfaceError::InterfaceExternallyManaged {
                name: interface.to_string(),
            });
        }
        if let Some(role @ (Role::Monitor | Role::AccessPoint)) = role {
            if !adapter.supports(role) {
                return Err(InterfaceError::unsupported_role(interface, role));
            }
        }
        if self.active.contains(interface) {
            return Err(InterfaceError::invalid_interface(interface));
        }

        self.active.insert(interface.to_string());
        info!(target: "wifi", interface, role = ?role, "interface validated");
        Ok(())
    }

    /// Pick a free radio for the requested capabilities
    ///
    /// Radios matching the request exactly are preferred over partial
    /// matches; among several exact matches the most recently
    /// discovered wins.
    #[tracing::instrument(target = "wifi", skip(self))]
    pub fn allocate(&mut self, wants_ap: bool, wants_monitor: bool) -> Result<String> {
        let mut candidates = Vec::new();
        for adapter in self.registry.iter() {
            if self.active.contains(adapter.name()) {
                continue;
            }
            if adapter.supports_ap() == wants_ap && adapter.supports_monitor() == wants_monitor {
                candidates.insert(0, adapter);
            } else if wants_ap && adapter.supports_ap() {
                candidates.push(adapter);
            } else if wants_monitor && adapter.supports_monitor() {
                candidates.push(adapter);
            }
        }

        let sharing = self.sharing_enabled();
        let selected = candidates
            .iter()
            .find(|a| !a.is_externally_managed() || !sharing)
            .map(|a| a.name().to_string());

        match selected {
            Some(name) => {
                self.active.insert(name.clone());
                info!(target: "wifi", interface = %name, wants_monitor, wants_ap, "interface allocated");
                Ok(name)
            }
            None => match candidates.first() {
                Some(first) => Err(InterfaceError::InterfaceExternallyManaged {
                    name: first.name().to_string(),
                }),
                None => Err(InterfaceError::InterfaceNotFound {
                    wants_monitor,
                    wants_ap,
                }),
            },
        }
    }

    /// Allocate a monitor radio and an AP radio, in that order
    pub fn allocate_pair(&mut self) -> Result<(String, String)> {
        let monitor = self.allocate(false, true)?;
        let ap = self.allocate(true, false)?;
        Ok((monitor, ap))
    }

    /// Switch operating mode; the interface is brought down first and
    /// stays down
    pub fn set_mode(&mut self, interface: &str, mode: InterfaceMode) -> Result<()> {
        self.registry.get(interface)?;
        self.ops.bring_down(interface)?;
        self.ops.set_mode(interface, mode)?;
        Ok(())
    }

    /// Rewrite the hardware address from a textual MAC
    #[tracing::instrument(target = "wifi", skip(self))]
    pub fn set_mac(&mut self, interface: &str, mac: &str) -> Result<()> {
        self.registry.get(interface)?;
        let parsed = MacAddress::parse(mac)?;
        self.apply_mac(interface, &parsed)?;
        self.registry.get_mut(interface)?.set_current_mac(parsed);
        info!(target: "wifi", interface, mac, "hardware address set");
        Ok(())
    }

    /// Rewrite the hardware address with `00:00:00` plus three random
    /// octets
    #[tracing::instrument(target = "wifi", skip(self))]
    pub fn set_random_mac(&mut self, interface: &str) -> Result<MacAddress> {
        self.registry.get(interface)?;
        let mac = MacAddress::random_with_oui(DEFAULT_OUI)?;
        // current_mac records the last requested address, even when the
        // write below fails
        self.registry.get_mut(interface)?.set_current_mac(mac.clone());
        self.apply_mac(interface, &mac)?;
        info!(target: "wifi", interface, mac = %mac, "hardware address randomized");
        Ok(mac)
    }

    /// Tune to a 2.4 or 5 GHz channel
    pub fn set_channel(&mut self, interface: &str, channel: u8) -> Result<()> {
        self.registry.get(interface)?;
        if WirelessManager::channel_to_frequency(channel).is_none() {
            return Err(InterfaceError::InvalidValue {
                value: channel.to_string(),
                expected: "a channel number with a known center frequency",
            });
        }
        self.ops.set_channel(interface, channel)?;
        Ok(())
    }

    pub fn bring_up(&mut self, interface: &str) -> Result<()> {
        self.registry.get(interface)?;
        self.ops.bring_up(interface)?;
        Ok(())
    }

    pub fn bring_down(&mut self, interface: &str) -> Result<()> {
        self.registry.get(interface)?;
        self.ops.bring_down(interface)?;
        Ok(())
    }

    /// Clear a soft rfkill block when one is set
    pub fn unblock(&mut self, interface: &str) -> Result<()> {
        self.registry.get(interface)?;
        if self.ops.is_soft_blocked(interface)? {
            info!(target: "wifi", interface, "clearing soft rfkill block");
            self.ops.clear_soft_block(interface)?;
        }
        Ok(())
    }

    /// Fabricate a monitor-mode virtual interface on the named radio's phy
    ///
    /// Candidate names are prefix plus a counter starting at 1; the
    /// kernel rejecting a name (typically because it is taken) moves to
    /// the next counter value, up to the configured attempt bound.
    #[tracing::instrument(target = "wifi", skip(self))]
    pub fn add_virtual_interface(&mut self, interface: &str) -> Result<String> {
        self.registry.get(interface)?;
        for attempt in 1..=self.config.vif_name_attempts {
            let name = format!("{}{}", self.config.vif_prefix, attempt);
            if let Err(err) = self.ops.bring_down(interface) {
                debug!(target: "wifi", interface, error = %err, "parent would not go down, retrying");
                continue;
            }
            match self.ops.create_vif(interface, &name, InterfaceMode::Monitor) {
                Ok(()) => {
                    self.fabricated.push(name.clone());
                    info!(target: "wifi", parent = interface, interface = %name, "virtual monitor interface added");
                    return Ok(name);
                }
                Err(err) => {
                    debug!(target: "wifi", interface = %name, error = %err, "interface name rejected");
                }
            }
        }
        Err(InterfaceError::ResourceExhausted {
            attempts: self.config.vif_name_attempts,
        })
    }

    /// Put claimed radios back the way they were found
    ///
    /// Restores original hardware addresses (skipping excluded uplinks)
    /// and deletes fabricated virtual interfaces. Sequential and
    /// best-effort: every step is attempted, failures are logged, and
    /// the first error comes back once everything has been tried.
    #[tracing::instrument(target = "wifi", skip(self))]
    pub fn on_exit(&mut self) -> Result<CleanupReport> {
        let mut report = CleanupReport::default();
        let mut first_error: Option<InterfaceError> = None;

        let to_restore: Vec<String> = self
            .registry
            .names()
            .filter(|name| self.active.contains(*name) && !self.exclude_restore.contains(*name))
            .map(str::to_string)
            .collect();

        for name in to_restore {
            let original = self.registry.get(&name)?.original_mac().clone();
            match self.apply_mac(&name, &original) {
                Ok(()) => {
                    self.registry.get_mut(&name)?.set_current_mac(original);
                    report.restored.push(name);
                }
                Err(err) => {
                    warn!(target: "wifi", interface = %name, error = %err, "failed to restore hardware address");
                    report.failed_restores.push(name);
                    first_error.get_or_insert(err);
                }
            }
        }

        for name in std::mem::take(&mut self.fabricated) {
            match self.ops.delete_vif(&name) {
                Ok(()) => report.removed_vifs.push(name),
                Err(err) => {
                    warn!(target: "wifi", interface = %name, error = %err, "failed to remove virtual interface");
                    report.failed_removals.push(name);
                    first_error.get_or_insert(err.into());
                }
            }
        }

        match first_error {
            Some(err) => {
                warn!(target: "wifi", report = ?report, "shutdown restore incomplete");
                Err(err)
            }
            None => {
                info!(
                    target: "wifi",
                    restored = report.restored.len(),
                    removed = report.removed_vifs.len(),
                    "shutdown restore finished"
                );
                Ok(report)
            }
        }
    }

    /// Run the dual-role planner over the current registry
    #[must_use]
    pub fn vif_plan(&self) -> VifPlan {
        planner::plan(&self.registry, self.config.uplink_interface.as_deref())
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    #[must_use]
    pub fn is_active(&self, interface: &str) -> bool {
        self.active.contains(interface)
    }

    /// Claimed interfaces in discovery order; always a subset of the
    /// registry
    #[must_use]
    pub fn active_interfaces(&self) -> Vec<&str> {
        self.registry
            .names()
            .filter(|name| self.active.contains(*name))
            .collect()
    }

    #[must_use]
    pub fn is_excluded_from_restore(&self, interface: &str) -> bool {
        self.exclude_restore.contains(interface)
    }

    /// Virtual interfaces this process created and will delete at exit
    #[must_use]
    pub fn fabricated_interfaces(&self) -> &[String] {
        &self.fabricated
    }

    /// Point-in-time view of every radio, for status output
    #[must_use]
    pub fn summary(&self) -> Vec<AdapterSummary> {
        self.registry
            .iter()
            .map(|adapter| adapter.summary(self.active.contains(adapter.name())))
            .collect()
    }

    fn sharing_enabled(&self) -> bool {
        self.config.uplink_interface.is_some()
    }

    /// Managed mode, down, write; the order the drivers insist on
    fn apply_mac(&mut self, interface: &str, mac: &MacAddress) -> Result<()> {
        self.set_mode(interface, InterfaceMode::Station)?;
        self.ops.bring_down(interface)?;
        match self.ops.set_mac(interface, *mac.as_bytes()) {
            Ok(()) => Ok(()),
            Err(err) if err.errno() == Some(OS_INVALID_ARGUMENT) => {
                Err(InterfaceError::InvalidMacAddress {
                    mac: mac.to_string(),
                })
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::mock::MockRadioOps;

    fn manager(ops: &MockRadioOps) -> RadioManager {
        RadioManager::new(Arc::new(ops.clone()), ManagerConfig::default()).unwrap()
    }

    fn sharing_manager(ops: &MockRadioOps, uplink: &str) -> RadioManager {
        let config = ManagerConfig {
            uplink_interface: Some(uplink.to_string()),
            ..ManagerConfig::default()
        };
        RadioManager::new(Arc::new(ops.clone()), config).unwrap()
    }

    #[test]
    fn config_defaults_apply_to_missing_fields() {
        let config: ManagerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.uplink_interface, None);
        assert_eq!(config.vif_prefix, "wlan");
        assert_eq!(config.vif_name_attempts, 64);
    }

    #[test]
    fn validating_twice_rejects_the_second_claim() {
        let ops = MockRadioOps::new();
        ops.add_radio("wlan0", 0, true, false);
        let mut mgr = manager(&ops);

        mgr.validate("wlan0", Some(Role::Monitor)).unwrap();
        assert!(mgr.is_active("wlan0"));

        let err = mgr.validate("wlan0", Some(Role::Monitor)).unwrap_err();
        assert!(matches!(err, InterfaceError::InvalidInterface { role: None, .. }));
    }

    #[test]
    fn unknown_uplink_is_excluded_but_never_claimed() {
        let ops = MockRadioOps::new();
        ops.add_radio("wlan0", 0, true, true);
        let mut mgr = manager(&ops);

        mgr.validate("eth0", Some(Role::Internet)).unwrap();
        assert!(mgr.is_excluded_from_restore("eth0"));
        assert!(!mgr.is_active("eth0"));
        assert!(mgr.active_interfaces().is_empty());
    }

    #[test]
    fn unknown_name_for_a_radio_role_is_invalid() {
        let ops = MockRadioOps::new();
        ops.add_radio("wlan0", 0, true, true);
        let mut mgr = manager(&ops);

        let err = mgr.validate("wlan9", Some(Role::Monitor)).unwrap_err();
        assert!(matches!(err, InterfaceError::InvalidInterface { .. }));
        assert!(!mgr.is_excluded_from_restore("wlan9"));
    }

    #[test]
    fn known_uplink_radio_is_excluded_and_claimed() {
        let ops = MockRadioOps::new();
        ops.add_radio("wlan0", 0, true, true);
        let mut mgr = manager(&ops);

        mgr.validate("wlan0", Some(Role::Internet)).unwrap();
        assert!(mgr.is_excluded_from_restore("wlan0"));
        assert!(mgr.is_active("wlan0"));
    }

    #[test]
    fn externally_managed_radio_is_rejected_only_while_sharing() {
        let ops = MockRadioOps::new();
        ops.add_radio("wlan0", 0, true, true);
        ops.set_nm_managed("wlan0", true);

        let mut without_uplink = manager(&ops);
        without_uplink.validate("wlan0", Some(Role::Monitor)).unwrap();

        let mut with_uplink = sharing_manager(&ops, "eth0");
        let err = with_uplink.validate("wlan0", Some(Role::Monitor)).unwrap_err();
        assert!(matches!(err, InterfaceError::InterfaceExternallyManaged { .. }));
    }

    #[test]
    fn role_claim_needs_the_matching_capability() {
        let ops = MockRadioOps::new();
        ops.add_radio("wlan0", 0, true, false);
        let mut mgr = manager(&ops);

        let err = mgr.validate("wlan0", Some(Role::AccessPoint)).unwrap_err();
        assert!(matches!(
            err,
            InterfaceError::InvalidInterface {
                role: Some(Role::AccessPoint),
                ..
            }
        ));
        assert!(!mgr.is_active("wlan0"));
    }

    #[test]
    fn exact_capability_match_beats_partial_matches() {
        let ops = MockRadioOps::new();
        ops.add_radio("wlan0", 0, false, true);
        ops.add_radio("wlan1", 1, true, false);
        ops.add_radio("wlan2", 2, true, true);
        let mut mgr = manager(&ops);

        assert_eq!(mgr.allocate(true, true).unwrap(), "wlan2");
    }

    #[test]
    fn latest_discovered_exact_match_wins() {
        let ops = MockRadioOps::new();
        ops.add_radio("wlan0", 0, true, true);
        ops.add_radio("wlan1", 1, true, true);
        let mut mgr = manager(&ops);

        assert_eq!(mgr.allocate(true, true).unwrap(), "wlan1");
        assert_eq!(mgr.allocate(true, true).unwrap(), "wlan0");
    }

    #[test]
    fn exhausted_pool_reports_the_requested_roles() {
        let ops = MockRadioOps::new();
        ops.add_radio("wlan0", 0, false, true);
        let mut mgr = manager(&ops);

        let err = mgr.allocate(false, true).unwrap_err();
        assert!(matches!(
            err,
            InterfaceError::InterfaceNotFound {
                wants_monitor: true,
                wants_ap: false
            }
        ));
    }

    #[test]
    fn all_candidates_managed_while_sharing_names_the_preferred_one() {
        let ops = MockRadioOps::new();
        ops.add_radio("wlan0", 0, true, true);
        ops.add_radio("wlan1", 1, true, true);
        ops.set_nm_managed("wlan0", true);
        ops.set_nm_managed("wlan1", true);
        let mut mgr = sharing_manager(&ops, "eth0");

        let err = mgr.allocate(false, true).unwrap_err();
        // Partial matches stay in discovery order, so wlan0 heads the list
        assert!(matches!(
            err,
            InterfaceError::InterfaceExternallyManaged { ref name } if name == "wlan0"
        ));

        let mut unrestricted = manager(&ops);
        assert!(unrestricted.allocate(false, true).is_ok());
    }

    #[test]
    fn pair_allocation_takes_monitor_then_ap() {
        let ops = MockRadioOps::new();
        ops.add_radio("wlan0", 0, true, false);
        ops.add_radio("wlan1", 1, false, true);
        let mut mgr = manager(&ops);

        assert_eq!(mgr.allocate_pair().unwrap(), ("wlan0".to_string(), "wlan1".to_string()));
    }

    #[test]
    fn lone_dual_role_radio_cannot_serve_a_pair() {
        let ops = MockRadioOps::new();
        ops.add_radio("wlan0", 0, true, true);
        let mut mgr = manager(&ops);

        let err = mgr.allocate_pair().unwrap_err();
        assert!(matches!(
            err,
            InterfaceError::InterfaceNotFound {
                wants_monitor: false,
                wants_ap: true
            }
        ));
    }

    #[test]
    fn mac_rewrite_follows_the_down_mode_down_write_sequence() {
        let ops = MockRadioOps::new();
        ops.add_radio("wlan0", 0, true, true);
        let mut mgr = manager(&ops);

        mgr.set_mac("wlan0", "02:00:00:11:22:33").unwrap();
        assert_eq!(
            ops.calls(),
            [
                "bring_down wlan0",
                "set_mode wlan0 managed",
                "bring_down wlan0",
                "set_mac wlan0 02:00:00:11:22:33",
            ]
        );
        let adapter = mgr.registry().get("wlan0").unwrap();
        assert_eq!(adapter.current_mac().to_string(), "02:00:00:11:22:33");
        assert_ne!(adapter.original_mac(), adapter.current_mac());
    }

    #[test]
    fn kernel_rejecting_the_mac_maps_to_invalid_mac_address() {
        let ops = MockRadioOps::new();
        ops.add_radio("wlan0", 0, true, true);
        ops.fail_set_mac("wlan0", OS_INVALID_ARGUMENT);
        let mut mgr = manager(&ops);

        let err = mgr.set_mac("wlan0", "02:00:00:11:22:33").unwrap_err();
        assert!(matches!(
            err,
            InterfaceError::InvalidMacAddress { ref mac } if mac == "02:00:00:11:22:33"
        ));
        let adapter = mgr.registry().get("wlan0").unwrap();
        assert_eq!(adapter.current_mac(), adapter.original_mac());
    }

    #[test]
    fn unparsable_mac_never_reaches_the_os() {
        let ops = MockRadioOps::new();
        ops.add_radio("wlan0", 0, true, true);
        let mut mgr = manager(&ops);

        let err = mgr.set_mac("wlan0", "definitely not a mac").unwrap_err();
        assert!(matches!(err, InterfaceError::InvalidMacAddress { .. }));
        assert!(ops.calls().is_empty());

        let adapter = mgr.registry().get("wlan0").unwrap();
        assert_eq!(adapter.current_mac(), adapter.original_mac());
    }

    #[test]
    fn random_mac_keeps_the_null_prefix_and_updates_the_record() {
        let ops = MockRadioOps::new();
        ops.add_radio("wlan0", 0, true, true);
        let mut mgr = manager(&ops);

        let mac = mgr.set_random_mac("wlan0").unwrap();
        assert_eq!(mac.oui(), [0x00, 0x00, 0x00]);
        let adapter = mgr.registry().get("wlan0").unwrap();
        assert_eq!(adapter.current_mac(), &mac);
        assert_eq!(
            ops.calls().last().unwrap(),
            &format!("set_mac wlan0 {}", mac)
        );
    }

    #[test]
    fn random_mac_is_recorded_even_when_the_write_fails() {
        let ops = MockRadioOps::new();
        ops.add_radio("wlan0", 0, true, true);
        ops.fail_set_mac("wlan0", OS_INVALID_ARGUMENT);
        let mut mgr = manager(&ops);

        let original = mgr.registry().get("wlan0").unwrap().original_mac().clone();
        let err = mgr.set_random_mac("wlan0").unwrap_err();
        assert!(matches!(err, InterfaceError::InvalidMacAddress { .. }));

        let adapter = mgr.registry().get("wlan0").unwrap();
        assert_ne!(adapter.current_mac(), &original);
        assert_eq!(adapter.current_mac().oui(), [0x00, 0x00, 0x00]);
    }

    #[test]
    fn channel_without_a_known_frequency_is_rejected_locally() {
        let ops = MockRadioOps::new();
        ops.add_radio("wlan0", 0, true, true);
        let mut mgr = manager(&ops);

        let err = mgr.set_channel("wlan0", 15).unwrap_err();
        assert!(matches!(err, InterfaceError::InvalidValue { .. }));
        assert!(ops.calls().is_empty());

        mgr.set_channel("wlan0", 6).unwrap();
        assert_eq!(ops.calls(), ["set_channel wlan0 6"]);
    }

    #[test]
    fn unblock_only_touches_blocked_radios() {
        let ops = MockRadioOps::new();
        ops.add_radio("wlan0", 0, true, true);
        ops.add_radio("wlan1", 1, true, true);
        ops.set_soft_blocked("wlan0", true);
        let mut mgr = manager(&ops);

        mgr.unblock("wlan0").unwrap();
        mgr.unblock("wlan1").unwrap();
        assert_eq!(ops.calls(), ["clear_soft_block wlan0"]);
    }

    #[test]
    fn state_transitions_reject_unknown_interfaces_before_touching_the_os() {
        let ops = MockRadioOps::new();
        ops.add_radio("wlan0", 0, true, true);
        let mut mgr = manager(&ops);

        assert!(mgr.set_mode("wlan9", InterfaceMode::Monitor).is_err());
        assert!(mgr.bring_up("wlan9").is_err());
        assert!(mgr.set_channel("wlan9", 6).is_err());
        assert!(mgr.add_virtual_interface("wlan9").is_err());
        assert!(ops.calls().is_empty());
    }

    #[test]
    fn virtual_interface_names_skip_collisions() {
        let ops = MockRadioOps::new();
        ops.add_radio("wlan0", 0, true, true);
        let mut mgr = manager(&ops);

        assert_eq!(mgr.add_virtual_interface("wlan0").unwrap(), "wlan1");
        // wlan1 now exists, so the second fabrication lands on wlan2
        assert_eq!(mgr.add_virtual_interface("wlan0").unwrap(), "wlan2");
        assert_eq!(mgr.fabricated_interfaces(), ["wlan1", "wlan2"]);
    }

    #[test]
    fn bounded_name_retry_gives_up_cleanly() {
        let ops = MockRadioOps::new();
        ops.add_radio("wlan0", 0, true, true);
        ops.reject_vif_name("wlan1");
        ops.reject_vif_name("wlan2");
        ops.reject_vif_name("wlan3");
        let config = ManagerConfig {
            vif_name_attempts: 3,
            ..ManagerConfig::default()
        };
        let mut mgr = RadioManager::new(Arc::new(ops.clone()), config).unwrap();

        let err = mgr.add_virtual_interface("wlan0").unwrap_err();
        assert!(matches!(err, InterfaceError::ResourceExhausted { attempts: 3 }));
        assert!(mgr.fabricated_interfaces().is_empty());
    }

    #[test]
    fn shutdown_restores_claimed_radios_and_removes_fabrications() {
        let ops = MockRadioOps::new();
        ops.add_radio("wlan0", 0, true, false);
        ops.add_radio("wlan1", 1, false, true);
        ops.add_radio("wlan2", 2, true, true);
        let original0 = MacAddress::new(ops.radio_mac("wlan0").unwrap());
        let original1 = MacAddress::new(ops.radio_mac("wlan1").unwrap());

        let mut mgr = sharing_manager(&ops, "wlan2");
        mgr.validate("wlan2", Some(Role::Internet)).unwrap();
        mgr.validate("wlan0", Some(Role::Monitor)).unwrap();
        mgr.validate("wlan1", Some(Role::AccessPoint)).unwrap();
        mgr.set_random_mac("wlan0").unwrap();
        let vif = mgr.add_virtual_interface("wlan0").unwrap();
        assert_eq!(vif, "wlan3");

        let report = mgr.on_exit().unwrap();
        assert_eq!(report.restored, ["wlan0", "wlan1"]);
        assert_eq!(report.removed_vifs, ["wlan3"]);
        assert!(report.failed_restores.is_empty());

        let calls = ops.calls();
        assert!(calls.contains(&format!("set_mac wlan0 {}", original0)));
        assert!(calls.contains(&format!("set_mac wlan1 {}", original1)));
        assert_eq!(calls.last().unwrap(), "delete_vif wlan3");
        assert!(!calls.iter().any(|c| c.starts_with("set_mac wlan2")));
        assert!(!ops.interface_exists("wlan3"));
        assert_eq!(ops.radio_mac("wlan0"), Some(*original0.as_bytes()));
    }

    #[test]
    fn shutdown_continues_past_failures_and_returns_the_first() {
        let ops = MockRadioOps::new();
        ops.add_radio("wlan0", 0, true, false);
        ops.add_radio("wlan1", 1, false, true);
        let original1 = MacAddress::new(ops.radio_mac("wlan1").unwrap());
        // EPERM on the first restore; the second must still run
        ops.fail_set_mac("wlan0", 1);

        let mut mgr = manager(&ops);
        mgr.validate("wlan0", Some(Role::Monitor)).unwrap();
        mgr.validate("wlan1", Some(Role::AccessPoint)).unwrap();
        let vif = mgr.add_virtual_interface("wlan0").unwrap();

        let err = mgr.on_exit().unwrap_err();
        assert!(matches!(err, InterfaceError::Netlink(_)));

        let calls = ops.calls();
        assert!(calls.contains(&format!("set_mac wlan1 {}", original1)));
        assert_eq!(calls.last().unwrap(), &format!("delete_vif {}", vif));
        // Fabrications are handed over exactly once
        assert!(mgr.fabricated_interfaces().is_empty());
    }

    #[test]
    fn status_summary_marks_claimed_radios() {
        let ops = MockRadioOps::new();
        ops.add_radio("wlan0", 0, true, false);
        ops.add_radio("wlan1", 1, false, true);
        let mut mgr = manager(&ops);
        mgr.validate("wlan0", Some(Role::Monitor)).unwrap();

        let summary = mgr.summary();
        assert_eq!(summary.len(), 2);
        assert!(summary[0].active);
        assert!(!summary[1].active);
        assert_eq!(summary[0].name, "wlan0");
    }
}
