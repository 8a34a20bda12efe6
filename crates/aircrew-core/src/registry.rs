//! Radio discovery and the name-keyed adapter registry

use std::collections::HashMap;

use aircrew_netlink::NetlinkError;
use tracing::{debug, info};

use crate::adapter::Adapter;
use crate::error::{InterfaceError, Result};
use crate::mac::MacAddress;
use crate::ops::{RadioOps, OS_NOT_SUPPORTED, OS_NO_DEVICE};

/// Every usable radio on the host, keyed by interface name
///
/// Iteration yields adapters in discovery order, which is what makes
/// allocation and shutdown restore deterministic.
#[derive(Debug, Default)]
pub struct Registry {
    adapters: HashMap<String, Adapter>,
    order: Vec<String>,
}

impl Registry {
    /// Enumerate the host's interfaces and keep the radios
    ///
    /// Interfaces that are not nl80211 devices (OS code 93) or that
    /// vanish mid-scan (OS code 19) are skipped; any other failure
    /// aborts discovery, since it usually means the control plane
    /// itself is broken.
    pub fn discover(ops: &dyn RadioOps) -> Result<Self> {
        let mut registry = Self::default();
        for name in ops.list_interfaces()? {
            if !ops.is_wireless(&name) {
                debug!(target: "wifi", interface = %name, "skipping non-radio interface");
                continue;
            }
            let info = match ops.radio_info(&name) {
                Ok(info) => info,
                Err(err) if is_skippable(&err) => {
                    debug!(target: "wifi", interface = %name, error = %err, "skipping unreachable radio");
                    continue;
                }
                Err(err) => return Err(err.into()),
            };
            let caps = match ops.phy_capabilities(&name) {
                Ok(caps) => caps,
                Err(err) if is_skippable(&err) => {
                    debug!(target: "wifi", interface = %name, error = %err, "skipping radio without a queryable phy");
                    continue;
                }
                Err(err) => return Err(err.into()),
            };
            let Some(mac) = info.mac else {
                debug!(target: "wifi", interface = %name, "skipping radio with no readable hardware address");
                continue;
            };

            let mut adapter = Adapter::new(name.as_str(), info.ifindex, info.wiphy, MacAddress::new(mac));
            adapter.apply_capabilities(&caps);
            adapter.set_externally_managed(ops.is_externally_managed(&name));
            info!(
                target: "wifi",
                interface = %name,
                phy = adapter.phy(),
                monitor = adapter.supports_monitor(),
                ap = adapter.supports_ap(),
                externally_managed = adapter.is_externally_managed(),
                "discovered radio"
            );
            registry.insert(adapter);
        }
        Ok(registry)
    }

    pub fn get(&self, name: &str) -> Result<&Adapter> {
        self.adapters
            .get(name)
            .ok_or_else(|| InterfaceError::invalid_interface(name))
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut Adapter> {
        self.adapters
            .get_mut(name)
            .ok_or_else(|| InterfaceError::invalid_interface(name))
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.adapters.contains_key(name)
    }

    /// Adapters in discovery order
    pub fn iter(&self) -> impl Iterator<Item = &Adapter> {
        self.order.iter().filter_map(|name| self.adapters.get(name))
    }

    /// Interface names in discovery order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    fn insert(&mut self, adapter: Adapter) {
        let name = adapter.name().to_string();
        if self.adapters.insert(name.clone(), adapter).is_none() {
            self.order.push(name);
        }
    }
}

fn is_skippable(err: &NetlinkError) -> bool {
    matches!(err.errno(), Some(OS_NOT_SUPPORTED | OS_NO_DEVICE))
}
