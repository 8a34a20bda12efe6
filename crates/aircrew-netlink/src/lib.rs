//! # aircrew-netlink
//!
//! Kernel control plane for aircrew. Replaces the system binaries a
//! wireless toolchain usually shells out to (`ip`, `iw`, `rfkill`,
//! `nmcli`) with native implementations over Linux kernel APIs:
//! nl80211 generic netlink, rtnetlink, `/dev/rfkill` and the
//! NetworkManager D-Bus service.
//!
//! ## Features
//!
//! - **Link Management**: Bring interfaces up/down and rewrite hardware addresses
//! - **Wireless**: nl80211-based mode, channel and virtual-interface control
//! - **PHY Capabilities**: Query the interface modes a wireless chip supports
//! - **RF Kill**: Query and clear software blocks on radios
//! - **NetworkManager Probe**: Detect externally managed devices
//!
//! ## Platform Support
//!
//! Linux-only. Code is gated with `#[cfg(target_os = "linux")]` and compiles
//! on other platforms but functions are unavailable.
//!
//! ## Usage
//!
//! ```no_run
//! use aircrew_netlink::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     set_interface_down("wlan0").await?;
//!
//!     let mut wireless = WirelessManager::new()?;
//!     wireless.set_mode("wlan0", InterfaceMode::Monitor)?;
//!
//!     set_interface_up("wlan0").await?;
//!     Ok(())
//! }
//! ```

#[cfg(target_os = "linux")]
pub mod interface;
#[cfg(target_os = "linux")]
pub mod networkmanager;
#[cfg(target_os = "linux")]
pub mod rfkill;
#[cfg(target_os = "linux")]
pub mod wireless;

pub mod error;

pub use error::{NetlinkError, Result};

#[cfg(target_os = "linux")]
pub use interface::LinkManager;
#[cfg(target_os = "linux")]
pub use networkmanager::NetworkManagerClient;
#[cfg(target_os = "linux")]
pub use rfkill::{RfkillDevice, RfkillEvent, RfkillManager, RfkillOp, RfkillType};
#[cfg(target_os = "linux")]
pub use wireless::{ChannelWidth, InterfaceMode, PhyCapabilities, WirelessInfo, WirelessManager};

#[cfg(target_os = "linux")]
pub async fn set_interface_up(interface: &str) -> Result<()> {
    let mgr = LinkManager::new()?;
    mgr.set_interface_up(interface).await
}

#[cfg(target_os = "linux")]
pub async fn set_interface_down(interface: &str) -> Result<()> {
    let mgr = LinkManager::new()?;
    mgr.set_interface_down(interface).await
}

#[cfg(target_os = "linux")]
pub async fn set_mac_address(interface: &str, mac: [u8; 6]) -> Result<()> {
    let mgr = LinkManager::new()?;
    mgr.set_mac_address(interface, mac).await
}

/// Check whether NetworkManager claims a device. Hosts without the
/// service report `false` for every interface.
#[cfg(target_os = "linux")]
pub async fn is_device_managed(interface: &str) -> Result<bool> {
    let client = match NetworkManagerClient::new().await {
        Ok(client) => client,
        Err(_) => return Ok(false),
    };
    if !client.is_available().await {
        return Ok(false);
    }
    client.is_device_managed(interface).await
}
