//! Wireless interface resource management
//!
//! Discovers the host's radios over nl80211, records what each phy can
//! do (monitor, AP), hands radios out to roles, performs the guarded
//! state transitions the drivers require (down before mode or MAC
//! changes), and puts everything back at shutdown.
//!
//! All OS access goes through the [`RadioOps`] trait; production code
//! uses [`RealRadioOps`], tests use a mock.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use aircrew_core::{ManagerConfig, RadioManager, RealRadioOps};
//!
//! fn main() -> aircrew_core::Result<()> {
//!     let mut manager = RadioManager::new(Arc::new(RealRadioOps), ManagerConfig::default())?;
//!     let (monitor, ap) = manager.allocate_pair()?;
//!     manager.set_random_mac(&monitor)?;
//!     manager.bring_up(&monitor)?;
//!     manager.bring_up(&ap)?;
//!     // ... run captures and the AP ...
//!     manager.on_exit()?;
//!     Ok(())
//! }
//! ```

pub mod adapter;
pub mod channel;
pub mod error;
pub mod mac;
pub mod manager;
pub mod ops;
pub mod planner;
pub mod registry;

pub use adapter::{Adapter, AdapterSummary, Role};
pub use channel::ChannelHopper;
pub use error::{InterfaceError, Result};
pub use mac::{MacAddress, DEFAULT_OUI};
pub use manager::{CleanupReport, ManagerConfig, RadioManager};
pub use ops::{RadioOps, RealRadioOps};
pub use planner::VifPlan;
pub use registry::Registry;

pub use aircrew_netlink::{InterfaceMode, NetlinkError};
