//! OS control surface behind the radio manager
//!
//! Every kernel interaction goes through [`RadioOps`] so the allocation
//! and lifecycle logic can be exercised against a mock. [`RealRadioOps`]
//! drives nl80211, rtnetlink, rfkill and the NetworkManager probe from
//! `aircrew-netlink`, plus sysfs for enumeration.

use std::path::Path;

use aircrew_netlink::{
    InterfaceMode, NetlinkError, PhyCapabilities, Result, RfkillManager, WirelessInfo,
    WirelessManager,
};

/// EINVAL; the kernel's answer to a malformed MAC address.
pub(crate) const OS_INVALID_ARGUMENT: i32 = 22;
/// EPROTONOSUPPORT; interface exists but is not an nl80211 device.
pub(crate) const OS_NOT_SUPPORTED: i32 = 93;
/// ENODEV; interface vanished between enumeration and query.
pub(crate) const OS_NO_DEVICE: i32 = 19;

/// Blocking kernel operations the manager needs from a radio
///
/// Errors carry the raw OS code where one exists (see
/// [`NetlinkError::errno`]); callers dispatch on 22/93/19 without
/// string matching.
pub trait RadioOps: Send + Sync {
    /// Names of every network interface on the host, wireless or not
    fn list_interfaces(&self) -> Result<Vec<String>>;

    /// Whether the interface is a radio; unknown names are not
    fn is_wireless(&self, interface: &str) -> bool;

    /// nl80211 view of one interface
    ///
    /// Non-radio interfaces fail with OS code 93, vanished ones with 19.
    fn radio_info(&self, interface: &str) -> Result<WirelessInfo>;

    /// Modes the phy behind the interface supports
    fn phy_capabilities(&self, interface: &str) -> Result<PhyCapabilities>;

    fn set_mode(&self, interface: &str, mode: InterfaceMode) -> Result<()>;

    /// Write a hardware address; the interface must already be down
    fn set_mac(&self, interface: &str, mac: [u8; 6]) -> Result<()>;

    fn set_channel(&self, interface: &str, channel: u8) -> Result<()>;

    fn bring_up(&self, interface: &str) -> Result<()>;

    fn bring_down(&self, interface: &str) -> Result<()>;

    /// Whether a soft rfkill block is set; interfaces without an rfkill
    /// node report `false`
    fn is_soft_blocked(&self, interface: &str) -> Result<bool>;

    fn clear_soft_block(&self, interface: &str) -> Result<()>;

    /// Create a named virtual interface on the phy behind `parent`
    fn create_vif(&self, parent: &str, name: &str, mode: InterfaceMode) -> Result<()>;

    fn delete_vif(&self, interface: &str) -> Result<()>;

    /// Whether an external connection manager claims the interface
    ///
    /// Hosts without such a service report `false` for everything.
    fn is_externally_managed(&self, interface: &str) -> bool;
}

/// [`RadioOps`] backed by the kernel control plane
pub struct RealRadioOps;

impl RealRadioOps {
    /// Run a route-layer or D-Bus future to completion from blocking code.
    /// Reuses the ambient tokio runtime when one exists, otherwise spins
    /// up a throwaway one for the single call.
    fn run_async<T, F>(&self, future: F) -> Result<T>
    where
        F: std::future::Future<Output = Result<T>>,
    {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle.block_on(future),
            Err(_) => tokio::runtime::Runtime::new()
                .map_err(|e| NetlinkError::runtime("create tokio runtime", e.to_string()))?
                .block_on(future),
        }
    }
}

impl RadioOps for RealRadioOps {
    fn list_interfaces(&self) -> Result<Vec<String>> {
        let entries = std::fs::read_dir("/sys/class/net")
            .map_err(|e| NetlinkError::io_error("read /sys/class/net", e))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| NetlinkError::io_error("read /sys/class/net", e))?;
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        // Directory order is arbitrary; sorted names make discovery order
        // reproducible across runs.
        names.sort();
        Ok(names)
    }

    fn is_wireless(&self, interface: &str) -> bool {
        Path::new("/sys/class/net")
            .join(interface)
            .join("wireless")
            .exists()
    }

    fn radio_info(&self, interface: &str) -> Result<WirelessInfo> {
        let class_dir = Path::new("/sys/class/net").join(interface);
        if !class_dir.exists() {
            return Err(NetlinkError::command_failed(
                "get_interface",
                interface,
                OS_NO_DEVICE,
            ));
        }
        // Wired interfaces carry no wireless subdirectory; report the same
        // OS code a wiphy-less nl80211 query would produce.
        if !class_dir.join("wireless").exists() {
            return Err(NetlinkError::command_failed(
                "get_interface",
                interface,
                OS_NOT_SUPPORTED,
            ));
        }

        let mut wireless = WirelessManager::new()?;
        let mut info = wireless.get_interface_info(interface)?;
        if info.mac.is_none() {
            info.mac = read_sysfs_mac(interface);
        }
        Ok(info)
    }

    fn phy_capabilities(&self, interface: &str) -> Result<PhyCapabilities> {
        let mut wireless = WirelessManager::new()?;
        wireless.get_phy_capabilities(interface)
    }

    fn set_mode(&self, interface: &str, mode: InterfaceMode) -> Result<()> {
        let mut wireless = WirelessManager::new()?;
        wireless.set_mode(interface, mode)
    }

    fn set_mac(&self, interface: &str, mac: [u8; 6]) -> Result<()> {
        self.run_async(aircrew_netlink::set_mac_address(interface, mac))
    }

    fn set_channel(&self, interface: &str, channel: u8) -> Result<()> {
        let mut wireless = WirelessManager::new()?;
        wireless.set_channel(interface, channel)
    }

    fn bring_up(&self, interface: &str) -> Result<()> {
        self.run_async(aircrew_netlink::set_interface_up(interface))
    }

    fn bring_down(&self, interface: &str) -> Result<()> {
        self.run_async(aircrew_netlink::set_interface_down(interface))
    }

    fn is_soft_blocked(&self, interface: &str) -> Result<bool> {
        let rfkill = RfkillManager::new();
        match rfkill.find_index_by_interface(interface)? {
            Some(idx) => Ok(rfkill.get_state(idx)?.soft_blocked),
            None => Ok(false),
        }
    }

    fn clear_soft_block(&self, interface: &str) -> Result<()> {
        let rfkill = RfkillManager::new();
        match rfkill.find_index_by_interface(interface)? {
            Some(idx) => rfkill.unblock(idx),
            None => Ok(()),
        }
    }

    fn create_vif(&self, parent: &str, name: &str, mode: InterfaceMode) -> Result<()> {
        let mut wireless = WirelessManager::new()?;
        wireless.create_interface(parent, name, mode)
    }

    fn delete_vif(&self, interface: &str) -> Result<()> {
        let mut wireless = WirelessManager::new()?;
        wireless.delete_interface(interface)
    }

    fn is_externally_managed(&self, interface: &str) -> bool {
        self.run_async(aircrew_netlink::is_device_managed(interface))
            .unwrap_or(false)
    }
}

fn read_sysfs_mac(interface: &str) -> Option<[u8; 6]> {
    let text = std::fs::read_to_string(format!("/sys/class/net/{}/address", interface)).ok()?;
    parse_sysfs_mac(&text)
}

fn parse_sysfs_mac(text: &str) -> Option<[u8; 6]> {
    let mut bytes = [0u8; 6];
    let mut parts = text.trim().split(':');
    for byte in &mut bytes {
        *byte = u8::from_str_radix(parts.next()?, 16).ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(bytes)
}
