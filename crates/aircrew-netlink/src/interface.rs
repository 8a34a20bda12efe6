//! Link-level interface management via rtnetlink.
//!
//! Brings interfaces up and down and rewrites hardware addresses without
//! shelling out to `ip`. All operations are async and talk to the kernel
//! over a netlink socket spawned as a background tokio task.

use crate::error::{NetlinkError, Result};
use futures::stream::TryStreamExt;
use rtnetlink::{new_connection, Handle};
use tracing::info;

/// Manager for link state and hardware address changes.
///
/// Each manager maintains its own netlink connection spawned as a
/// background tokio task.
pub struct LinkManager {
    handle: Handle,
}

impl LinkManager {
    /// Create a new link manager.
    ///
    /// # Errors
    ///
    /// Returns error if the netlink connection cannot be established.
    pub fn new() -> Result<Self> {
        let (connection, handle, _) = new_connection().map_err(|e| {
            NetlinkError::runtime("creating netlink connection for link management", e.to_string())
        })?;

        tokio::spawn(connection);

        Ok(Self { handle })
    }

    /// Get the kernel index for a network interface by name.
    ///
    /// # Arguments
    ///
    /// * `name` - Interface name (e.g., "eth0", "wlan0")
    ///
    /// # Errors
    ///
    /// * `InterfaceNotFound` - Interface does not exist
    /// * `InterfaceIndexError` - Failed to query interface
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use aircrew_netlink::*;
    /// # async fn example() -> Result<()> {
    /// let mgr = LinkManager::new()?;
    /// let index = mgr.get_interface_index("wlan0").await?;
    /// println!("wlan0 index: {}", index);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get_interface_index(&self, name: &str) -> Result<u32> {
        let mut links = self
            .handle
            .link()
            .get()
            .match_name(name.to_string())
            .execute();

        if let Some(link) = links
            .try_next()
            .await
            .map_err(|e| NetlinkError::InterfaceIndexError {
                interface: name.to_string(),
                reason: e.to_string(),
            })?
        {
            Ok(link.header.index)
        } else {
            Err(NetlinkError::InterfaceNotFound {
                name: name.to_string(),
            })
        }
    }

    /// Bring a network interface up (set IFF_UP flag).
    ///
    /// # Errors
    ///
    /// * `InterfaceNotFound` - Interface does not exist
    /// * `SetStateError` - Failed to set interface state (insufficient permissions, etc.)
    pub async fn set_interface_up(&self, name: &str) -> Result<()> {
        let index = self.get_interface_index(name).await?;

        self.handle
            .link()
            .set(index)
            .up()
            .execute()
            .await
            .map_err(|e| NetlinkError::SetStateError {
                interface: name.to_string(),
                desired_state: "UP".to_string(),
                reason: e.to_string(),
            })?;

        info!("Interface {} set to UP", name);
        Ok(())
    }

    /// Bring a network interface down (clear IFF_UP flag).
    ///
    /// # Errors
    ///
    /// * `InterfaceNotFound` - Interface does not exist
    /// * `SetStateError` - Failed to set interface state
    pub async fn set_interface_down(&self, name: &str) -> Result<()> {
        let index = self.get_interface_index(name).await?;

        self.handle
            .link()
            .set(index)
            .down()
            .execute()
            .await
            .map_err(|e| NetlinkError::SetStateError {
                interface: name.to_string(),
                desired_state: "DOWN".to_string(),
                reason: e.to_string(),
            })?;

        info!("Interface {} set to DOWN", name);
        Ok(())
    }

    /// Rewrite the hardware address of an interface.
    ///
    /// The interface must be down on most drivers; callers own that
    /// ordering. Kernel rejections keep their errno so callers can tell a
    /// malformed address (EINVAL) from other failures.
    ///
    /// # Arguments
    ///
    /// * `interface` - Interface name (must exist)
    /// * `mac` - New hardware address
    ///
    /// # Errors
    ///
    /// * `InterfaceNotFound` - Interface does not exist
    /// * `CommandFailed` - Kernel rejected the address change
    pub async fn set_mac_address(&self, interface: &str, mac: [u8; 6]) -> Result<()> {
        let index = self.get_interface_index(interface).await?;

        self.handle
            .link()
            .set(index)
            .address(mac.to_vec())
            .execute()
            .await
            .map_err(|e| match e {
                rtnetlink::Error::NetlinkError(ref msg) => NetlinkError::command_failed(
                    "set_mac",
                    interface,
                    msg.code.map(|c| c.get().abs()).unwrap_or(0),
                ),
                other => NetlinkError::MacAddressError {
                    interface: interface.to_string(),
                    reason: other.to_string(),
                },
            })?;

        info!(
            "Interface {} hardware address set to {:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            interface, mac[0], mac[1], mac[2], mac[3], mac[4], mac[5]
        );
        Ok(())
    }
}
