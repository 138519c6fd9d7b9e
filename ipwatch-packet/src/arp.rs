//! ARP frame parsing

use std::net::Ipv4Addr;

use ipwatch_core::MacAddr;

use crate::reader::Reader;

/// Ethernet ARP frame length (header plus the two address pairs)
pub const ARP_FRAME_LEN: usize = 28;

/// Hardware type: Ethernet
pub const HARDWARE_ETHERNET: u16 = 1;
/// Hardware type: IEEE 802 networks
pub const HARDWARE_IEEE802: u16 = 6;
/// Protocol type: IPv4
pub const PROTOCOL_IPV4: u16 = 0x0800;
/// Opcode: request
pub const OP_REQUEST: u16 = 1;
/// Opcode: reply
pub const OP_REPLY: u16 = 2;

/// An ARP frame for IPv4 over Ethernet
#[derive(Debug, Clone, Copy)]
pub struct ArpFrame {
    pub hardware_type: u16,
    pub protocol_type: u16,
    pub hardware_len: u8,
    pub protocol_len: u8,
    pub opcode: u16,
    pub sender_hw: MacAddr,
    pub sender_ip: Ipv4Addr,
    pub target_hw: MacAddr,
    pub target_ip: Ipv4Addr,
}

impl ArpFrame {
    /// Parse an ARP frame, consuming [`ARP_FRAME_LEN`] bytes
    ///
    /// The address fields are read assuming Ethernet/IPv4 lengths; callers
    /// must validate `hardware_len` and `protocol_len` before trusting them.
    pub fn parse(reader: &mut Reader<'_>) -> Option<Self> {
        let hardware_type = reader.read_u16_be()?;
        let protocol_type = reader.read_u16_be()?;
        let hardware_len = reader.read_u8()?;
        let protocol_len = reader.read_u8()?;
        let opcode = reader.read_u16_be()?;
        let sender_hw = reader.read_mac()?;
        let sender_ip = reader.read_ipv4()?;
        let target_hw = reader.read_mac()?;
        let target_ip = reader.read_ipv4()?;
        Some(Self {
            hardware_type,
            protocol_type,
            hardware_len,
            protocol_len,
            opcode,
            sender_hw,
            sender_ip,
            target_hw,
            target_ip,
        })
    }
}
