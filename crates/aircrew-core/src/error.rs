//! Error types for radio discovery, allocation and state control
//!
//! One tagged enum covers every failure the manager can surface, so
//! orchestrators can match exhaustively instead of string-sniffing.
//! Kernel-level failures pass through unchanged as [`InterfaceError::Netlink`].

use thiserror::Error;

use aircrew_netlink::NetlinkError;

use crate::adapter::Role;

/// Result type alias using [`InterfaceError`]
pub type Result<T> = std::result::Result<T, InterfaceError>;

/// Errors that can occur while managing wireless interfaces
#[derive(Error, Debug)]
pub enum InterfaceError {
    /// No free interface supports the requested mode combination
    #[error("No free interface satisfies the request (monitor: {wants_monitor}, AP: {wants_ap})")]
    InterfaceNotFound { wants_monitor: bool, wants_ap: bool },

    /// Interface unknown, already allocated, or missing a required capability
    #[error("Invalid interface: {}{}", .name, role_requirement(.role))]
    InvalidInterface { name: String, role: Option<Role> },

    /// MAC address rejected locally or by the kernel
    #[error("Invalid MAC address: {mac}")]
    InvalidMacAddress { mac: String },

    /// A value failed validation before reaching the kernel
    #[error("Invalid value '{value}': expected {expected}")]
    InvalidValue { value: String, expected: &'static str },

    /// An external connection manager owns the interface
    #[error(
        "Interface {name} is managed by an external network service; mark it unmanaged \
         (e.g. a NetworkManager unmanaged-devices entry) and retry"
    )]
    InterfaceExternallyManaged { name: String },

    /// A bounded retry loop gave up
    #[error("Gave up naming a virtual interface after {attempts} attempts")]
    ResourceExhausted { attempts: u32 },

    /// Random number generation failed
    #[error("RNG error: {0}")]
    Rng(String),

    /// Kernel control-plane failure
    #[error(transparent)]
    Netlink(#[from] NetlinkError),
}

impl InterfaceError {
    /// Check if the caller can recover by asking for a different interface
    ///
    /// Allocation misses are recoverable (another radio, or none, can be
    /// requested); everything else needs operator intervention or signals
    /// a kernel-level fault.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            InterfaceError::InterfaceNotFound { .. }
                | InterfaceError::InterfaceExternallyManaged { .. }
        )
    }

    /// Create an invalid-interface error without a role requirement
    #[must_use]
    pub fn invalid_interface(name: impl Into<String>) -> Self {
        InterfaceError::InvalidInterface {
            name: name.into(),
            role: None,
        }
    }

    /// Create an invalid-interface error for a missing mode capability
    #[must_use]
    pub fn unsupported_role(name: impl Into<String>, role: Role) -> Self {
        InterfaceError::InvalidInterface {
            name: name.into(),
            role: Some(role),
        }
    }
}

fn role_requirement(role: &Option<Role>) -> String {
    match role {
        Some(role) => format!(" (does not support {} mode)", role),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_includes_role() {
        let err = InterfaceError::unsupported_role("wlan0", Role::Monitor);
        let text = err.to_string();
        assert!(text.contains("wlan0"));
        assert!(text.contains("monitor"));

        let bare = InterfaceError::invalid_interface("wlan1").to_string();
        assert_eq!(bare, "Invalid interface: wlan1");
    }

    #[test]
    fn test_is_recoverable() {
        let miss = InterfaceError::InterfaceNotFound {
            wants_monitor: true,
            wants_ap: false,
        };
        assert!(miss.is_recoverable());
        assert!(!InterfaceError::invalid_interface("wlan0").is_recoverable());
    }

    #[test]
    fn test_netlink_errno_preserved_through_conversion() {
        let netlink = NetlinkError::command_failed("set_mac", "wlan0", 22);
        let err: InterfaceError = netlink.into();
        match err {
            InterfaceError::Netlink(inner) => assert_eq!(inner.errno(), Some(22)),
            other => panic!("expected Netlink variant, got {:?}", other),
        }
    }
}
