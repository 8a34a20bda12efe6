//! NetworkManager D-Bus probe.
//!
//! Asks NetworkManager whether it claims a device. Hosts without the
//! service on the system bus are common on the small boards this runs
//! on; callers treat that as "nothing is externally managed".

use crate::error::{NetlinkError, Result};
use zbus::Connection;

const NM_DEST: &str = "org.freedesktop.NetworkManager";
const NM_PATH: &str = "/org/freedesktop/NetworkManager";

/// Client for the NetworkManager system D-Bus service.
pub struct NetworkManagerClient {
    connection: Connection,
}

impl NetworkManagerClient {
    /// Create a new NetworkManager client.
    ///
    /// # Errors
    ///
    /// Returns error if the system D-Bus is unreachable.
    pub async fn new() -> Result<Self> {
        let connection = Connection::system().await.map_err(|e| {
            NetlinkError::DBus(format!(
                "failed to connect to system D-Bus (is D-Bus running?): {}",
                e
            ))
        })?;

        Ok(Self { connection })
    }

    /// Check if NetworkManager is available and running.
    pub async fn is_available(&self) -> bool {
        let proxy = match zbus::Proxy::new(&self.connection, NM_DEST, NM_PATH, NM_DEST).await {
            Ok(p) => p,
            Err(_) => return false,
        };

        proxy.get_property::<String>("Version").await.is_ok()
    }

    /// Get device object path by interface name.
    async fn get_device_path(&self, interface: &str) -> Result<zbus::zvariant::OwnedObjectPath> {
        let proxy = zbus::Proxy::new(&self.connection, NM_DEST, NM_PATH, NM_DEST)
            .await
            .map_err(|e| {
                NetlinkError::DBus(format!("failed to create NetworkManager proxy: {}", e))
            })?;

        let device_path: zbus::zvariant::OwnedObjectPath = proxy
            .call_method("GetDeviceByIpIface", &(interface))
            .await
            .map_err(|e| {
                NetlinkError::DBus(format!(
                    "failed to look up device for interface '{}': {}",
                    interface, e
                ))
            })?
            .body()
            .deserialize()
            .map_err(|e| {
                NetlinkError::DBus(format!(
                    "failed to parse device path from NetworkManager response: {}",
                    e
                ))
            })?;

        Ok(device_path)
    }

    /// Check whether NetworkManager claims a device.
    ///
    /// # Errors
    ///
    /// Returns error if the device is unknown to NetworkManager or the
    /// property query fails.
    pub async fn is_device_managed(&self, interface: &str) -> Result<bool> {
        let device_path = self.get_device_path(interface).await?;

        let proxy = zbus::Proxy::new(
            &self.connection,
            NM_DEST,
            device_path,
            "org.freedesktop.NetworkManager.Device",
        )
        .await
        .map_err(|e| NetlinkError::DBus(format!("failed to create device proxy: {}", e)))?;

        proxy.get_property::<bool>("Managed").await.map_err(|e| {
            NetlinkError::DBus(format!(
                "failed to read Managed property for interface '{}': {}",
                interface, e
            ))
        })
    }
}
