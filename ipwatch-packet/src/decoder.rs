//! Frame decoder
//!
//! Turns a raw captured frame into an [`Observation`], or a typed
//! [`FrameError`] describing why the frame was dropped. Dropped frames are
//! never fatal; the capture loop logs the error and moves on.

use thiserror::Error;
use tracing::warn;

use ipwatch_core::{CurrentMappings, IpVersion, MacAddr, Observation, PacketTime};

use crate::arp::{
    ArpFrame, ARP_FRAME_LEN, HARDWARE_ETHERNET, HARDWARE_IEEE802, OP_REPLY, OP_REQUEST,
    PROTOCOL_IPV4,
};
use crate::ethernet::{EtherType, EthernetHeader};
use crate::nd::{
    Ipv6Header, NdOptions, NeighborMessage, ICMPV6_HEADER_LEN, IPPROTO_ICMPV6, IPV6_HEADER_LEN,
    ND_MESSAGE_LEN, ND_NEIGHBOR_ADVERT, ND_NEIGHBOR_SOLICIT,
};
use crate::reader::Reader;

/// Why a frame was dropped instead of producing an observation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("packet length ({len}) is too short for an ethernet packet")]
    TooShortForEthernet { len: usize },

    #[error("packet with ethernet source address {src_mac} (local or broadcast)")]
    LocalOrBroadcastSource { src_mac: MacAddr },

    #[error("packet from {src_mac} with unexpected ethernet type 0x{ethertype:04x}")]
    UnexpectedEtherType { src_mac: MacAddr, ethertype: u16 },

    #[error("packet from {src_mac} with length too short for an arp packet")]
    TooShortForArp { src_mac: MacAddr },

    #[error("packet from {src_mac} with unexpected arp hardware type {hardware_type}")]
    UnexpectedArpHardwareType { src_mac: MacAddr, hardware_type: u16 },

    #[error("packet from {src_mac} with unexpected arp protocol type 0x{protocol_type:04x}")]
    UnexpectedArpProtocolType { src_mac: MacAddr, protocol_type: u16 },

    #[error("packet from {src_mac} with unexpected arp hardware length {len}")]
    UnexpectedArpHardwareLen { src_mac: MacAddr, len: u8 },

    #[error("packet from {src_mac} with unexpected arp protocol length {len}")]
    UnexpectedArpProtocolLen { src_mac: MacAddr, len: u8 },

    #[error("packet from {src_mac} with unexpected arp opcode {opcode}")]
    UnexpectedArpOpcode { src_mac: MacAddr, opcode: u16 },

    #[error("packet from {src_mac} with non matching arp sender hardware address {sender}")]
    ArpSenderMismatch { src_mac: MacAddr, sender: MacAddr },

    #[error(
        "packet from {src_mac} with unexpected target address for {target_ip}: \
         expected {expected}, received {received}"
    )]
    PoisonedArpReply {
        src_mac: MacAddr,
        target_ip: String,
        expected: MacAddr,
        received: MacAddr,
    },

    #[error("packet from {src_mac} with unexpected arp sender address {sender_ip}")]
    ZeroArpSender { src_mac: MacAddr, sender_ip: String },

    #[error("packet from {src_mac} with length too short for ip6")]
    TooShortForIpv6 { src_mac: MacAddr },

    #[error("packet from {src_mac} ({src_ip}) with unexpected ip6 next header ({next_header})")]
    UnexpectedNextHeader {
        src_mac: MacAddr,
        src_ip: String,
        next_header: u8,
    },

    #[error("packet from {src_mac} ({src_ip}) with length too short for icmp6")]
    TooShortForIcmpv6 { src_mac: MacAddr, src_ip: String },

    #[error("packet from {src_mac} ({src_ip}) with unexpected icmp6 type {icmp_type}")]
    UnexpectedIcmpv6Type {
        src_mac: MacAddr,
        src_ip: String,
        icmp_type: u8,
    },

    #[error("packet from {src_mac} ({src_ip}) with length too short for neighbor discovery")]
    TooShortForNeighbor { src_mac: MacAddr, src_ip: String },

    #[error(
        "packet from {src_mac} ({src_ip}) with length too short for a neighbor discovery option"
    )]
    BadNeighborOption { src_mac: MacAddr, src_ip: String },

    #[error(
        "packet from {src_mac} ({src_ip}) with unexpected neighbor discovery \
         link address length {len}"
    )]
    UnexpectedLinkAddrLen {
        src_mac: MacAddr,
        src_ip: String,
        len: usize,
    },

    #[error(
        "packet from {src_mac} ({src_ip}) with non matching neighbor discovery \
         option address {option}"
    )]
    NeighborOptionMismatch {
        src_mac: MacAddr,
        src_ip: String,
        option: MacAddr,
    },

    #[error("packet with unexpected source address {src_ip}")]
    UnspecifiedNeighborSource { src_ip: String },
}

/// Decode a captured frame into an address observation
///
/// `mappings` is consulted only for the ARP-reply consistency check; the
/// decoder never mutates history.
pub fn decode_frame(
    data: &[u8],
    captured_at: PacketTime,
    mappings: &dyn CurrentMappings,
) -> Result<Observation, FrameError> {
    let mut reader = Reader::new(data);
    let eth = EthernetHeader::parse(&mut reader)
        .ok_or(FrameError::TooShortForEthernet { len: data.len() })?;

    let source = eth.source;
    if source.is_zero() || source.is_broadcast() {
        return Err(FrameError::LocalOrBroadcastSource { src_mac: source });
    }

    match eth.ethertype {
        EtherType::Arp => decode_arp(reader, source, captured_at, mappings),
        EtherType::Ipv6 => decode_neighbor(reader, source, captured_at),
        EtherType::Other(ethertype) => Err(FrameError::UnexpectedEtherType { src_mac: source, ethertype }),
    }
}

/// Decode and validate an ARP payload
fn decode_arp(
    mut reader: Reader<'_>,
    source: MacAddr,
    captured_at: PacketTime,
    mappings: &dyn CurrentMappings,
) -> Result<Observation, FrameError> {
    if reader.remaining() < ARP_FRAME_LEN {
        return Err(FrameError::TooShortForArp { src_mac: source });
    }
    let arp = ArpFrame::parse(&mut reader).ok_or(FrameError::TooShortForArp { src_mac: source })?;

    if arp.hardware_type != HARDWARE_ETHERNET && arp.hardware_type != HARDWARE_IEEE802 {
        return Err(FrameError::UnexpectedArpHardwareType {
            src_mac: source,
            hardware_type: arp.hardware_type,
        });
    }
    if arp.protocol_type != PROTOCOL_IPV4 {
        return Err(FrameError::UnexpectedArpProtocolType {
            src_mac: source,
            protocol_type: arp.protocol_type,
        });
    }
    if arp.hardware_len != 6 {
        return Err(FrameError::UnexpectedArpHardwareLen {
            src_mac: source,
            len: arp.hardware_len,
        });
    }
    if arp.protocol_len != 4 {
        return Err(FrameError::UnexpectedArpProtocolLen {
            src_mac: source,
            len: arp.protocol_len,
        });
    }
    if arp.opcode != OP_REQUEST && arp.opcode != OP_REPLY {
        return Err(FrameError::UnexpectedArpOpcode {
            src_mac: source,
            opcode: arp.opcode,
        });
    }

    // The sender hardware address must match the ethernet source address
    if arp.sender_hw != source {
        return Err(FrameError::ArpSenderMismatch {
            src_mac: source,
            sender: arp.sender_hw,
        });
    }

    // Replies claiming a target address that disagrees with the current
    // mapping are forged or poisoned; history is left untouched.
    if arp.opcode == OP_REPLY {
        let target_ip = arp.target_ip.to_string();
        if let Some(expected) = mappings.current_hw(IpVersion::V4, &target_ip) {
            if expected != arp.target_hw {
                return Err(FrameError::PoisonedArpReply {
                    src_mac: source,
                    target_ip,
                    expected,
                    received: arp.target_hw,
                });
            }
        }
    }

    if arp.sender_ip.is_unspecified() {
        return Err(FrameError::ZeroArpSender {
            src_mac: source,
            sender_ip: arp.sender_ip.to_string(),
        });
    }

    Ok(Observation {
        ip_version: IpVersion::V4,
        ip_addr: arp.sender_ip.to_string(),
        hw_addr: arp.sender_hw,
        captured_at,
    })
}

/// Decode and validate an ICMPv6 neighbor discovery payload
fn decode_neighbor(
    mut reader: Reader<'_>,
    source: MacAddr,
    captured_at: PacketTime,
) -> Result<Observation, FrameError> {
    if reader.remaining() < IPV6_HEADER_LEN {
        return Err(FrameError::TooShortForIpv6 { src_mac: source });
    }
    let ip6 = Ipv6Header::parse(&mut reader).ok_or(FrameError::TooShortForIpv6 { src_mac: source })?;
    let src_ip = ip6.source.to_string();

    if ip6.next_header != IPPROTO_ICMPV6 {
        return Err(FrameError::UnexpectedNextHeader {
            src_mac: source,
            src_ip,
            next_header: ip6.next_header,
        });
    }

    if reader.remaining() < ICMPV6_HEADER_LEN {
        return Err(FrameError::TooShortForIcmpv6 { src_mac: source, src_ip });
    }

    let declared_len = ip6.payload_len as usize;
    if reader.remaining() < declared_len {
        warn!(
            "icmp6 packet truncated - increase snaplen by {} bytes",
            declared_len - reader.remaining()
        );
    }

    let icmp_type = reader.clone().read_u8().ok_or_else(|| {
        FrameError::TooShortForIcmpv6 {
            src_mac: source,
            src_ip: src_ip.clone(),
        }
    })?;
    if icmp_type != ND_NEIGHBOR_SOLICIT && icmp_type != ND_NEIGHBOR_ADVERT {
        return Err(FrameError::UnexpectedIcmpv6Type {
            src_mac: source,
            src_ip,
            icmp_type,
        });
    }

    if reader.remaining() < ND_MESSAGE_LEN {
        return Err(FrameError::TooShortForNeighbor { src_mac: source, src_ip });
    }
    let _message = NeighborMessage::parse(&mut reader)
        .ok_or_else(|| FrameError::TooShortForNeighbor {
            src_mac: source,
            src_ip: src_ip.clone(),
        })?;

    // A link-layer address option that disagrees with the ethernet source
    // address rejects the frame.
    for option in NdOptions::new(reader) {
        let option = option.map_err(|_| FrameError::BadNeighborOption {
            src_mac: source,
            src_ip: src_ip.clone(),
        })?;
        if !option.is_link_layer() {
            continue;
        }
        let option_addr = MacAddr::from_slice(option.payload).ok_or_else(|| {
            FrameError::UnexpectedLinkAddrLen {
                src_mac: source,
                src_ip: src_ip.clone(),
                len: option.payload.len(),
            }
        })?;
        if option_addr != source {
            return Err(FrameError::NeighborOptionMismatch {
                src_mac: source,
                src_ip,
                option: option_addr,
            });
        }
    }

    if ip6.source.is_unspecified() {
        return Err(FrameError::UnspecifiedNeighborSource { src_ip });
    }

    Ok(Observation {
        ip_version: IpVersion::V6,
        ip_addr: src_ip,
        hw_addr: source,
        captured_at,
    })
}
