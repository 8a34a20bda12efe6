//! Decides whether one chip must carry monitor and AP at the same time

use std::collections::HashMap;

use tracing::debug;

use crate::adapter::Adapter;
use crate::registry::Registry;

/// Outcome of [`plan`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VifPlan {
    /// Radio whose phy should host an extra monitor interface, when the
    /// planner can single one out
    pub interface: Option<String>,
    /// One phy has to serve monitor and AP concurrently; callers must
    /// serialize the two uses
    pub shared_phy: bool,
}

/// Work out how monitor and AP duties map onto the discovered phys
///
/// The uplink radio's phy is left out entirely: it is busy carrying
/// the internet connection. Representatives are the first
/// radio discovered per phy, ranked by how many of the two roles the
/// phy supports.
pub fn plan(registry: &Registry, uplink: Option<&str>) -> VifPlan {
    let skip_phy = uplink.and_then(|name| registry.get(name).ok().map(Adapter::phy));

    let mut vif_counts: HashMap<u32, usize> = HashMap::new();
    let mut per_phy: Vec<(u32, String, u8)> = Vec::new();
    for adapter in registry.iter() {
        if Some(adapter.phy()) == skip_phy {
            continue;
        }
        let count = vif_counts.entry(adapter.phy()).or_insert(0);
        *count += 1;
        if *count == 1 {
            per_phy.push((adapter.phy(), adapter.name().to_string(), score(adapter)));
        }
    }

    // Stable sort; phys with equal scores keep discovery order
    per_phy.sort_by(|a, b| b.2.cmp(&a.2));

    let plan = match per_phy.as_slice() {
        [(phy, _, 2)] if vif_counts[phy] == 1 => VifPlan {
            interface: None,
            shared_phy: true,
        },
        [(phy, _, _)] if vif_counts[phy] > 1 => VifPlan {
            interface: None,
            shared_phy: true,
        },
        [(_, name, 2), (_, _, 0), ..] => VifPlan {
            interface: Some(name.clone()),
            shared_phy: true,
        },
        _ => VifPlan {
            interface: None,
            shared_phy: false,
        },
    };
    debug!(
        target: "wifi",
        interface = ?plan.interface,
        shared_phy = plan.shared_phy,
        "virtual interface plan"
    );
    plan
}

fn score(adapter: &Adapter) -> u8 {
    u8::from(adapter.supports_monitor()) + u8::from(adapter.supports_ap())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::mock::MockRadioOps;

    fn registry(ops: &MockRadioOps) -> Registry {
        Registry::discover(ops).unwrap()
    }

    #[test]
    fn lone_dual_role_radio_means_shared_phy_without_a_pick() {
        let ops = MockRadioOps::new();
        ops.add_radio("wlan0", 0, true, true);

        let plan = plan(&registry(&ops), None);
        assert_eq!(
            plan,
            VifPlan {
                interface: None,
                shared_phy: true
            }
        );
    }

    #[test]
    fn lone_partial_radio_needs_no_extra_interface() {
        let ops = MockRadioOps::new();
        ops.add_radio("wlan0", 0, true, false);

        let plan = plan(&registry(&ops), None);
        assert_eq!(
            plan,
            VifPlan {
                interface: None,
                shared_phy: false
            }
        );
    }

    #[test]
    fn several_interfaces_on_one_phy_still_share_it() {
        let ops = MockRadioOps::new();
        ops.add_radio("wlan0", 0, true, false);
        ops.add_radio("wlan0mon", 0, true, false);

        let plan = plan(&registry(&ops), None);
        assert_eq!(
            plan,
            VifPlan {
                interface: None,
                shared_phy: true
            }
        );
    }

    #[test]
    fn capable_phy_next_to_a_useless_one_is_picked() {
        let ops = MockRadioOps::new();
        ops.add_radio("wlan0", 0, true, true);
        ops.add_radio("wlan1", 1, false, false);

        let plan = plan(&registry(&ops), None);
        assert_eq!(
            plan,
            VifPlan {
                interface: Some("wlan0".to_string()),
                shared_phy: true
            }
        );
    }

    #[test]
    fn two_usable_phys_split_the_roles() {
        let ops = MockRadioOps::new();
        ops.add_radio("wlan0", 0, true, true);
        ops.add_radio("wlan1", 1, true, false);

        let plan = plan(&registry(&ops), None);
        assert_eq!(
            plan,
            VifPlan {
                interface: None,
                shared_phy: false
            }
        );
    }

    #[test]
    fn uplink_phy_is_taken_out_of_the_running() {
        let ops = MockRadioOps::new();
        ops.add_radio("wlan0", 0, true, true);
        ops.add_radio("wlan1", 1, false, false);

        let plan = plan(&registry(&ops), Some("wlan0"));
        assert_eq!(
            plan,
            VifPlan {
                interface: None,
                shared_phy: false
            }
        );
    }

    #[test]
    fn unknown_uplink_name_excludes_nothing() {
        let ops = MockRadioOps::new();
        ops.add_radio("wlan0", 0, true, true);

        let plan = plan(&registry(&ops), Some("eth0"));
        assert!(plan.shared_phy);
    }

    #[test]
    fn empty_registry_yields_an_empty_plan() {
        let ops = MockRadioOps::new();
        let plan = plan(&registry(&ops), None);
        assert_eq!(
            plan,
            VifPlan {
                interface: None,
                shared_phy: false
            }
        );
    }
}
