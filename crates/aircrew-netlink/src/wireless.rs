use crate::error::{NetlinkError, Result};
use neli::{
    attr::Attribute,
    consts::nl::{NlmF, NlmFFlags},
    genl::{Genlmsghdr, Nlattr},
    nl::{NlPayload, Nlmsghdr},
    socket::NlSocketHandle,
    types::GenlBuffer,
};
use tracing::{debug, info};

// Re-export commonly used types from neli
use neli::consts::socket::NlFamily;

const NL80211_GENL_NAME: &str = "nl80211";
const NLMSG_ERR: u16 = 2; // NLMSG_ERROR

// nl80211 commands
const NL80211_CMD_GET_WIPHY: u8 = 1;
const NL80211_CMD_SET_WIPHY: u8 = 2;
const NL80211_CMD_GET_INTERFACE: u8 = 5;
const NL80211_CMD_SET_INTERFACE: u8 = 6;
const NL80211_CMD_NEW_INTERFACE: u8 = 7;
const NL80211_CMD_DEL_INTERFACE: u8 = 8;

// nl80211 attributes
const NL80211_ATTR_WIPHY: u16 = 1;
const NL80211_ATTR_WIPHY_NAME: u16 = 2;
const NL80211_ATTR_IFINDEX: u16 = 3;
const NL80211_ATTR_IFNAME: u16 = 4;
const NL80211_ATTR_IFTYPE: u16 = 5;
const NL80211_ATTR_MAC: u16 = 6;
const NL80211_ATTR_SUPPORTED_IFTYPES: u16 = 32;
const NL80211_ATTR_WIPHY_FREQ: u16 = 38;
const NL80211_ATTR_WIPHY_CHANNEL_TYPE: u16 = 39;

const NLA_TYPE_MASK: u16 = 0x3fff;

// Interface types
const NL80211_IFTYPE_ADHOC: u32 = 1;
const NL80211_IFTYPE_STATION: u32 = 2;
const NL80211_IFTYPE_AP: u32 = 3;
const NL80211_IFTYPE_MONITOR: u32 = 6;
const NL80211_IFTYPE_MESH_POINT: u32 = 7;
const NL80211_IFTYPE_P2P_CLIENT: u32 = 8;
const NL80211_IFTYPE_P2P_GO: u32 = 9;

// Channel types
const NL80211_CHAN_NO_HT: u32 = 0;
const NL80211_CHAN_HT20: u32 = 1;
const NL80211_CHAN_HT40MINUS: u32 = 2;
const NL80211_CHAN_HT40PLUS: u32 = 3;

/// Wireless interface mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceMode {
    Adhoc,
    Station,
    AccessPoint,
    Monitor,
    MeshPoint,
    P2PClient,
    P2PGo,
}

impl InterfaceMode {
    fn to_nl80211(self) -> u32 {
        match self {
            Self::Adhoc => NL80211_IFTYPE_ADHOC,
            Self::Station => NL80211_IFTYPE_STATION,
            Self::AccessPoint => NL80211_IFTYPE_AP,
            Self::Monitor => NL80211_IFTYPE_MONITOR,
            Self::MeshPoint => NL80211_IFTYPE_MESH_POINT,
            Self::P2PClient => NL80211_IFTYPE_P2P_CLIENT,
            Self::P2PGo => NL80211_IFTYPE_P2P_GO,
        }
    }

    fn from_nl80211(iftype: u32) -> Option<Self> {
        match iftype {
            NL80211_IFTYPE_ADHOC => Some(Self::Adhoc),
            NL80211_IFTYPE_STATION => Some(Self::Station),
            NL80211_IFTYPE_AP => Some(Self::AccessPoint),
            NL80211_IFTYPE_MONITOR => Some(Self::Monitor),
            NL80211_IFTYPE_MESH_POINT => Some(Self::MeshPoint),
            NL80211_IFTYPE_P2P_CLIENT => Some(Self::P2PClient),
            NL80211_IFTYPE_P2P_GO => Some(Self::P2PGo),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Adhoc => "adhoc",
            Self::Station => "managed",
            Self::AccessPoint => "ap",
            Self::Monitor => "monitor",
            Self::MeshPoint => "mesh",
            Self::P2PClient => "p2p-client",
            Self::P2PGo => "p2p-go",
        }
    }
}

impl std::fmt::Display for InterfaceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Channel bandwidth
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelWidth {
    NoHT,
    HT20,
    HT40Minus,
    HT40Plus,
}

impl ChannelWidth {
    fn to_nl80211(self) -> u32 {
        match self {
            Self::NoHT => NL80211_CHAN_NO_HT,
            Self::HT20 => NL80211_CHAN_HT20,
            Self::HT40Minus => NL80211_CHAN_HT40MINUS,
            Self::HT40Plus => NL80211_CHAN_HT40PLUS,
        }
    }
}

/// Wireless interface information
#[derive(Debug, Clone)]
pub struct WirelessInfo {
    pub interface: String,
    pub ifindex: u32,
    pub wiphy: u32,
    pub mode: Option<InterfaceMode>,
    pub mac: Option<[u8; 6]>,
    pub frequency: Option<u32>,
    pub channel: Option<u8>,
}

/// PHY capabilities
#[derive(Debug, Clone)]
pub struct PhyCapabilities {
    pub wiphy: u32,
    pub name: String,
    pub supported_modes: Vec<InterfaceMode>,
    pub supports_monitor: bool,
    pub supports_ap: bool,
    pub supports_station: bool,
}

/// Wireless netlink manager
pub struct WirelessManager {
    socket: NlSocketHandle,
    family_id: u16,
}

impl WirelessManager {
    /// Create a new wireless manager
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Cannot create netlink socket (requires CAP_NET_ADMIN)
    /// - nl80211 generic netlink family not found (wireless drivers not loaded)
    pub fn new() -> Result<Self> {
        let mut socket = NlSocketHandle::connect(NlFamily::Generic, None, &[]).map_err(|e| {
            NetlinkError::ConnectionFailed(format!("Failed to create nl80211 socket: {}", e))
        })?;

        let family_id = socket.resolve_genl_family(NL80211_GENL_NAME).map_err(|e| {
            NetlinkError::OperationFailed(format!(
                "Failed to resolve nl80211 family (wireless drivers not loaded?): {}",
                e
            ))
        })?;

        Ok(Self { socket, family_id })
    }

    /// Get interface index from name
    fn get_ifindex(&self, interface: &str) -> Result<u32> {
        let ifindex =
            std::fs::read_to_string("/sys/class/net/".to_string() + interface + "/ifindex")
                .map_err(|_| NetlinkError::InterfaceNotFound {
                    name: interface.to_string(),
                })?;

        ifindex
            .trim()
            .parse::<u32>()
            .map_err(|e| NetlinkError::InterfaceIndexError {
                interface: interface.to_string(),
                reason: e.to_string(),
            })
    }

    fn send_request(
        &mut self,
        cmd: u8,
        attrs: GenlBuffer<u16, neli::types::Buffer>,
        ack: bool,
        operation: &'static str,
    ) -> Result<()> {
        let flags = if ack {
            NlmFFlags::new(&[NlmF::Request, NlmF::Ack])
        } else {
            NlmFFlags::new(&[NlmF::Request])
        };
        let genlhdr = Genlmsghdr::new(cmd, 1, attrs);
        let nlhdr = Nlmsghdr::new(
            None,
            self.family_id,
            flags,
            None,
            None,
            NlPayload::Payload(genlhdr),
        );

        self.socket.send(nlhdr).map_err(|e| {
            NetlinkError::netlink_error(operation, format!("failed to send request: {}", e))
        })
    }

    fn recv_response(
        &mut self,
        operation: &'static str,
    ) -> Result<Nlmsghdr<u16, Genlmsghdr<u8, u16>>> {
        self.socket
            .recv()
            .map_err(|e| {
                NetlinkError::netlink_error(operation, format!("failed to receive response: {}", e))
            })?
            .ok_or_else(|| NetlinkError::netlink_error(operation, "no response received"))
    }

    /// Consume the kernel reply to a request sent with the ACK flag. Nonzero
    /// error codes come back as `CommandFailed` with the errno preserved.
    ///
    /// Commands like NEW_INTERFACE echo a result message before the ack;
    /// those are drained here so they cannot poison the next request on
    /// this socket.
    fn recv_ack(&mut self, operation: &'static str, interface: &str) -> Result<()> {
        for _ in 0..4 {
            let response = self.recv_response(operation)?;
            if response.nl_type != NLMSG_ERR {
                continue;
            }
            return match response.nl_payload {
                // NLMSG_ERROR with code 0 is the expected ACK
                NlPayload::Err(err) if err.error == 0 => Ok(()),
                NlPayload::Ack(ack) if ack.error == 0 => Ok(()),
                NlPayload::Err(err) => Err(NetlinkError::command_failed(
                    operation,
                    interface,
                    err.error.abs(),
                )),
                NlPayload::Ack(ack) => Err(NetlinkError::command_failed(
                    operation,
                    interface,
                    ack.error.abs(),
                )),
                other => Err(NetlinkError::netlink_error(
                    operation,
                    format!("unexpected payload {:?}", other),
                )),
            };
        }
        Err(NetlinkError::netlink_error(
            operation,
            "no acknowledgment received",
        ))
    }

    fn u32_attr(attr_type: u16, value: u32, operation: &'static str) -> Result<Nlattr<u16, neli::types::Buffer>> {
        Nlattr::new(false, false, attr_type, value).map_err(|e| {
            NetlinkError::netlink_error(operation, format!("failed to build attribute: {}", e))
        })
    }

    /// Set interface mode (managed, monitor, ap, etc.)
    ///
    /// # Arguments
    ///
    /// * `interface` - Interface name (e.g., "wlan0")
    /// * `mode` - Desired interface mode
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Interface not found
    /// - Permission denied (requires root)
    /// - Mode not supported by hardware
    /// - Interface is up (must be down to change mode)
    pub fn set_mode(&mut self, interface: &str, mode: InterfaceMode) -> Result<()> {
        let ifindex = self.get_ifindex(interface)?;
        debug!(
            "nl80211 set_mode iface={} ifindex={} mode={}",
            interface, ifindex, mode
        );

        let mut attrs = GenlBuffer::new();
        attrs.push(Self::u32_attr(NL80211_ATTR_IFINDEX, ifindex, "set_interface")?);
        attrs.push(Self::u32_attr(
            NL80211_ATTR_IFTYPE,
            mode.to_nl80211(),
            "set_interface",
        )?);

        self.send_request(NL80211_CMD_SET_INTERFACE, attrs, true, "set_interface")?;
        self.recv_ack("set_interface", interface)?;

        info!(
            "nl80211 set_mode succeeded iface={} ifindex={} mode={}",
            interface, ifindex, mode
        );
        Ok(())
    }

    /// Set channel
    ///
    /// # Arguments
    ///
    /// * `interface` - Interface name
    /// * `channel` - Channel number (1-14 for 2.4GHz, 36+ for 5GHz)
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Channel number has no known center frequency
    /// - Interface not found
    /// - Channel not supported by hardware
    pub fn set_channel(&mut self, interface: &str, channel: u8) -> Result<()> {
        let frequency = Self::channel_to_frequency(channel).ok_or_else(|| {
            NetlinkError::OperationFailed(format!("Invalid channel number: {}", channel))
        })?;
        debug!(
            "nl80211 set_channel iface={} channel={} freq={}",
            interface, channel, frequency
        );

        self.set_frequency(interface, frequency, ChannelWidth::NoHT)
    }

    /// Set frequency
    ///
    /// # Arguments
    ///
    /// * `interface` - Interface name
    /// * `frequency` - Frequency in MHz
    /// * `width` - Channel bandwidth
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Interface not found
    /// - Permission denied
    /// - Frequency not supported
    pub fn set_frequency(
        &mut self,
        interface: &str,
        frequency: u32,
        width: ChannelWidth,
    ) -> Result<()> {
        let ifindex = self.get_ifindex(interface)?;
        debug!(
            "nl80211 set_frequency iface={} ifindex={} freq={} width={:?}",
            interface, ifindex, frequency, width
        );

        let mut attrs = GenlBuffer::new();
        attrs.push(Self::u32_attr(NL80211_ATTR_IFINDEX, ifindex, "set_wiphy")?);
        attrs.push(Self::u32_attr(NL80211_ATTR_WIPHY_FREQ, frequency, "set_wiphy")?);
        attrs.push(Self::u32_attr(
            NL80211_ATTR_WIPHY_CHANNEL_TYPE,
            width.to_nl80211(),
            "set_wiphy",
        )?);

        self.send_request(NL80211_CMD_SET_WIPHY, attrs, true, "set_wiphy")?;
        self.recv_ack("set_wiphy", interface)?;

        info!(
            "nl80211 set_frequency succeeded iface={} ifindex={} freq={} width={:?}",
            interface, ifindex, frequency, width
        );
        Ok(())
    }

    /// Create a virtual interface on the phy behind an existing one
    ///
    /// # Arguments
    ///
    /// * `phy_interface` - Existing interface on the target phy
    /// * `new_name` - Name for the new interface
    /// * `mode` - Interface mode for the new interface
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Physical interface not found
    /// - Permission denied
    /// - Interface name already exists
    /// - Mode not supported
    pub fn create_interface(
        &mut self,
        phy_interface: &str,
        new_name: &str,
        mode: InterfaceMode,
    ) -> Result<()> {
        let ifindex = self.get_ifindex(phy_interface)?;
        debug!(
            "nl80211 create_interface parent={} name={} mode={}",
            phy_interface, new_name, mode
        );

        let mut attrs = GenlBuffer::new();
        attrs.push(Self::u32_attr(NL80211_ATTR_IFINDEX, ifindex, "new_interface")?);
        attrs.push(
            Nlattr::new(false, false, NL80211_ATTR_IFNAME, new_name.as_bytes()).map_err(|e| {
                NetlinkError::netlink_error("new_interface", format!("failed to build attribute: {}", e))
            })?,
        );
        attrs.push(Self::u32_attr(
            NL80211_ATTR_IFTYPE,
            mode.to_nl80211(),
            "new_interface",
        )?);

        self.send_request(NL80211_CMD_NEW_INTERFACE, attrs, true, "new_interface")?;
        self.recv_ack("new_interface", new_name)?;

        info!(
            "nl80211 create_interface succeeded parent={} name={} mode={}",
            phy_interface, new_name, mode
        );
        Ok(())
    }

    /// Delete a virtual interface
    ///
    /// # Arguments
    ///
    /// * `interface` - Interface name to delete
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Interface not found
    /// - Permission denied
    /// - Cannot delete physical interface
    pub fn delete_interface(&mut self, interface: &str) -> Result<()> {
        let ifindex = self.get_ifindex(interface)?;
        debug!("nl80211 delete_interface iface={} ifindex={}", interface, ifindex);

        let mut attrs = GenlBuffer::new();
        attrs.push(Self::u32_attr(NL80211_ATTR_IFINDEX, ifindex, "del_interface")?);

        self.send_request(NL80211_CMD_DEL_INTERFACE, attrs, true, "del_interface")?;
        self.recv_ack("del_interface", interface)?;

        info!("nl80211 delete_interface succeeded iface={}", interface);
        Ok(())
    }

    /// Get interface information
    ///
    /// # Arguments
    ///
    /// * `interface` - Interface name
    ///
    /// # Errors
    ///
    /// Returns error if the interface is unknown, is not a wireless
    /// interface, or the query fails. Kernel rejections keep their errno.
    pub fn get_interface_info(&mut self, interface: &str) -> Result<WirelessInfo> {
        let ifindex = self.get_ifindex(interface)?;

        let mut attrs = GenlBuffer::new();
        attrs.push(Self::u32_attr(NL80211_ATTR_IFINDEX, ifindex, "get_interface")?);

        self.send_request(NL80211_CMD_GET_INTERFACE, attrs, false, "get_interface")?;
        let response = self.recv_response("get_interface")?;

        let mut info = WirelessInfo {
            interface: interface.to_string(),
            ifindex,
            wiphy: 0,
            mode: None,
            mac: None,
            frequency: None,
            channel: None,
        };

        match &response.nl_payload {
            NlPayload::Payload(genlhdr) => {
                let attrs = genlhdr.get_attr_handle();
                for attr in attrs.iter() {
                    match attr.nla_type.nla_type {
                        NL80211_ATTR_WIPHY => {
                            let payload = attr.nla_payload.as_ref();
                            if payload.len() >= 4 {
                                info.wiphy = u32::from_ne_bytes([
                                    payload[0], payload[1], payload[2], payload[3],
                                ]);
                            }
                        }
                        NL80211_ATTR_IFTYPE => {
                            let payload = attr.nla_payload.as_ref();
                            if payload.len() >= 4 {
                                let iftype = u32::from_ne_bytes([
                                    payload[0], payload[1], payload[2], payload[3],
                                ]);
                                info.mode = InterfaceMode::from_nl80211(iftype);
                            }
                        }
                        NL80211_ATTR_MAC => {
                            let payload = attr.nla_payload.as_ref();
                            if payload.len() == 6 {
                                info.mac = Some([
                                    payload[0], payload[1], payload[2], payload[3], payload[4],
                                    payload[5],
                                ]);
                            }
                        }
                        NL80211_ATTR_WIPHY_FREQ => {
                            let payload = attr.nla_payload.as_ref();
                            if payload.len() >= 4 {
                                let freq = u32::from_ne_bytes([
                                    payload[0], payload[1], payload[2], payload[3],
                                ]);
                                info.frequency = Some(freq);
                                info.channel = Self::frequency_to_channel(freq);
                            }
                        }
                        _ => {}
                    }
                }
            }
            // Non-wireless interfaces answer with an error instead of a dump
            NlPayload::Err(err) if err.error != 0 => {
                return Err(NetlinkError::command_failed(
                    "get_interface",
                    interface,
                    err.error.abs(),
                ));
            }
            other => {
                return Err(NetlinkError::netlink_error(
                    "get_interface",
                    format!("unexpected payload {:?}", other),
                ));
            }
        }

        Ok(info)
    }

    /// Query the capabilities of the phy behind an interface
    ///
    /// # Errors
    ///
    /// Returns error if the interface is unknown or the wiphy query fails.
    pub fn get_phy_capabilities(&mut self, interface: &str) -> Result<PhyCapabilities> {
        let info = self.get_interface_info(interface)?;

        let mut attrs = GenlBuffer::new();
        attrs.push(Self::u32_attr(NL80211_ATTR_WIPHY, info.wiphy, "get_wiphy")?);

        self.send_request(NL80211_CMD_GET_WIPHY, attrs, false, "get_wiphy")?;
        let response = self.recv_response("get_wiphy")?;

        let mut caps = PhyCapabilities {
            wiphy: info.wiphy,
            name: format!("phy{}", info.wiphy),
            supported_modes: Vec::new(),
            supports_monitor: false,
            supports_ap: false,
            supports_station: false,
        };

        match &response.nl_payload {
            NlPayload::Payload(genlhdr) => {
                let attrs = genlhdr.get_attr_handle();
                for attr in attrs.iter() {
                    match attr.nla_type.nla_type {
                        NL80211_ATTR_WIPHY_NAME => {
                            let payload = attr.nla_payload.as_ref();
                            if let Ok(name) = std::str::from_utf8(payload) {
                                caps.name = name.trim_end_matches('\0').to_string();
                            }
                        }
                        NL80211_ATTR_SUPPORTED_IFTYPES => {
                            // Nested set of flag attributes; the attribute
                            // type itself carries the iftype value.
                            for iftype in Self::parse_nested_attr_types(attr.payload().as_ref()) {
                                if let Some(mode) = InterfaceMode::from_nl80211(u32::from(iftype)) {
                                    if !caps.supported_modes.contains(&mode) {
                                        caps.supported_modes.push(mode);
                                    }
                                }
                            }
                        }
                        _ => {}
                    }
                }
            }
            NlPayload::Err(err) if err.error != 0 => {
                return Err(NetlinkError::command_failed(
                    "get_wiphy",
                    interface,
                    err.error.abs(),
                ));
            }
            other => {
                return Err(NetlinkError::netlink_error(
                    "get_wiphy",
                    format!("unexpected payload {:?}", other),
                ));
            }
        }

        caps.supports_monitor = caps.supported_modes.contains(&InterfaceMode::Monitor);
        caps.supports_ap = caps.supported_modes.contains(&InterfaceMode::AccessPoint);
        caps.supports_station = caps.supported_modes.contains(&InterfaceMode::Station);

        debug!(
            "nl80211 phy capabilities wiphy={} name={} monitor={} ap={}",
            caps.wiphy, caps.name, caps.supports_monitor, caps.supports_ap
        );
        Ok(caps)
    }

    /// Walk a nested attribute payload and return the masked attribute types.
    fn parse_nested_attr_types(payload: &[u8]) -> Vec<u16> {
        let mut types = Vec::new();
        let mut offset = 0;
        while payload.len().saturating_sub(offset) >= 4 {
            let header = &payload[offset..offset + 4];
            let len = u16::from_ne_bytes([header[0], header[1]]) as usize;
            let nla_type = u16::from_ne_bytes([header[2], header[3]]) & NLA_TYPE_MASK;
            if len < 4 || offset + len > payload.len() {
                break;
            }
            types.push(nla_type);
            let aligned = (len + 3) & !3;
            if aligned == 0 {
                break;
            }
            offset = offset.saturating_add(aligned);
        }
        types
    }

    /// Convert channel number to frequency (MHz)
    pub fn channel_to_frequency(channel: u8) -> Option<u32> {
        match channel {
            // 2.4 GHz
            1 => Some(2412),
            2 => Some(2417),
            3 => Some(2422),
            4 => Some(2427),
            5 => Some(2432),
            6 => Some(2437),
            7 => Some(2442),
            8 => Some(2447),
            9 => Some(2452),
            10 => Some(2457),
            11 => Some(2462),
            12 => Some(2467),
            13 => Some(2472),
            14 => Some(2484),
            // 5 GHz
            36 => Some(5180),
            40 => Some(5200),
            44 => Some(5220),
            48 => Some(5240),
            52 => Some(5260),
            56 => Some(5280),
            60 => Some(5300),
            64 => Some(5320),
            100 => Some(5500),
            104 => Some(5520),
            108 => Some(5540),
            112 => Some(5560),
            116 => Some(5580),
            120 => Some(5600),
            124 => Some(5620),
            128 => Some(5640),
            132 => Some(5660),
            136 => Some(5680),
            140 => Some(5700),
            144 => Some(5720),
            149 => Some(5745),
            153 => Some(5765),
            157 => Some(5785),
            161 => Some(5805),
            165 => Some(5825),
            _ => None,
        }
    }

    /// Convert frequency (MHz) to channel number
    pub fn frequency_to_channel(freq: u32) -> Option<u8> {
        match freq {
            // 2.4 GHz
            2412 => Some(1),
            2417 => Some(2),
            2422 => Some(3),
            2427 => Some(4),
            2432 => Some(5),
            2437 => Some(6),
            2442 => Some(7),
            2447 => Some(8),
            2452 => Some(9),
            2457 => Some(10),
            2462 => Some(11),
            2467 => Some(12),
            2472 => Some(13),
            2484 => Some(14),
            // 5 GHz
            5180 => Some(36),
            5200 => Some(40),
            5220 => Some(44),
            5240 => Some(48),
            5260 => Some(52),
            5280 => Some(56),
            5300 => Some(60),
            5320 => Some(64),
            5500 => Some(100),
            5520 => Some(104),
            5540 => Some(108),
            5560 => Some(112),
            5580 => Some(116),
            5600 => Some(120),
            5620 => Some(124),
            5640 => Some(128),
            5660 => Some(132),
            5680 => Some(136),
            5700 => Some(140),
            5720 => Some(144),
            5745 => Some(149),
            5765 => Some(153),
            5785 => Some(157),
            5805 => Some(161),
            5825 => Some(165),
            _ => None,
        }
    }
}
