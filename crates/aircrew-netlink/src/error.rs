use thiserror::Error;

/// Unified error type for all aircrew-netlink operations.
///
/// Carries enough context to tell which operation failed and on which
/// interface or device. Kernel rejections that callers dispatch on keep
/// their numeric errno instead of a flattened message.
#[derive(Error, Debug)]
pub enum NetlinkError {
    // Interface errors
    #[error("Interface '{name}' not found. Verify interface exists with 'ip link show'.")]
    InterfaceNotFound { name: String },

    #[error("Failed to get interface index for '{interface}': {reason}")]
    InterfaceIndexError { interface: String, reason: String },

    #[error("Failed to set interface '{interface}' state to {desired_state}: {reason}")]
    SetStateError {
        interface: String,
        desired_state: String,
        reason: String,
    },

    #[error("Failed to get MAC address for interface '{interface}': {reason}")]
    MacAddressError { interface: String, reason: String },

    /// Kernel rejected a command; the errno is preserved so callers can
    /// recognize codes like ENODEV (19), EINVAL (22) or ENOTSUP (93).
    #[error("{operation} failed on '{interface}' (os error {errno})")]
    CommandFailed {
        operation: &'static str,
        interface: String,
        errno: i32,
    },

    // Rfkill errors
    #[error("Failed to {operation} rfkill device {device_id}: {reason}")]
    RfkillError {
        operation: String,
        device_id: u32,
        reason: String,
    },

    #[error("Failed to open /dev/rfkill: {reason}. Ensure device exists and you have permissions.")]
    RfkillDeviceError { reason: String },

    // NetworkManager probe errors
    #[error("D-Bus error: {0}")]
    DBus(String),

    // Generic errors
    #[error("Operation failed: {0}")]
    OperationFailed(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Permission denied: {operation}. Root privileges required.")]
    PermissionDenied { operation: String },

    #[error("IO error during {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {what}: {reason}")]
    ParseError { what: String, reason: String },

    #[error("Netlink protocol error during {operation}: {reason}")]
    NetlinkProtocol { operation: String, reason: String },

    #[error("Runtime error: {context}: {reason}")]
    Runtime { context: String, reason: String },
}

pub type Result<T> = std::result::Result<T, NetlinkError>;

// Helper methods for common error construction patterns
impl NetlinkError {
    /// Create an IO error with context
    pub fn io_error(operation: impl Into<String>, source: std::io::Error) -> Self {
        // Check for permission denied
        if source.kind() == std::io::ErrorKind::PermissionDenied {
            return Self::PermissionDenied {
                operation: operation.into(),
            };
        }
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Create a netlink protocol error with context
    pub fn netlink_error(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::NetlinkProtocol {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Create a runtime error with context
    pub fn runtime(context: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Runtime {
            context: context.into(),
            reason: reason.into(),
        }
    }

    /// Kernel command rejection with the errno preserved.
    pub fn command_failed(operation: &'static str, interface: impl Into<String>, errno: i32) -> Self {
        Self::CommandFailed {
            operation,
            interface: interface.into(),
            errno,
        }
    }

    /// The raw OS error code behind this error, when one exists.
    pub fn errno(&self) -> Option<i32> {
        match self {
            Self::CommandFailed { errno, .. } => Some(*errno),
            Self::Io { source, .. } => source.raw_os_error(),
            _ => None,
        }
    }
}
