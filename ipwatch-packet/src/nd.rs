//! IPv6 header and ICMPv6 Neighbor Discovery parsing

use std::net::Ipv6Addr;

use crate::reader::Reader;

/// Fixed IPv6 header length
pub const IPV6_HEADER_LEN: usize = 40;

/// ICMPv6 header length (type, code, checksum, message body word)
pub const ICMPV6_HEADER_LEN: usize = 8;

/// Neighbor solicit/advertise message length, ICMPv6 header included
pub const ND_MESSAGE_LEN: usize = 24;

/// IPv6 next-header value for ICMPv6
pub const IPPROTO_ICMPV6: u8 = 58;

/// ICMPv6 type: neighbor solicitation
pub const ND_NEIGHBOR_SOLICIT: u8 = 135;
/// ICMPv6 type: neighbor advertisement
pub const ND_NEIGHBOR_ADVERT: u8 = 136;

/// ND option: source link-layer address
pub const ND_OPT_SOURCE_LINKADDR: u8 = 1;
/// ND option: target link-layer address
pub const ND_OPT_TARGET_LINKADDR: u8 = 2;

/// The fields of the fixed IPv6 header this system uses
#[derive(Debug, Clone, Copy)]
pub struct Ipv6Header {
    /// Declared payload length
    pub payload_len: u16,
    /// Next header protocol number
    pub next_header: u8,
    /// Source address
    pub source: Ipv6Addr,
}

impl Ipv6Header {
    /// Parse an IPv6 header, consuming [`IPV6_HEADER_LEN`] bytes
    pub fn parse(reader: &mut Reader<'_>) -> Option<Self> {
        reader.skip(4)?; // version, traffic class, flow label
        let payload_len = reader.read_u16_be()?;
        let next_header = reader.read_u8()?;
        reader.skip(1)?; // hop limit
        let source = reader.read_ipv6()?;
        reader.skip(16)?; // destination
        Some(Self {
            payload_len,
            next_header,
            source,
        })
    }
}

/// A neighbor solicitation or advertisement message
///
/// Solicitations and advertisements share one layout; only the ICMPv6 type
/// distinguishes them.
#[derive(Debug, Clone, Copy)]
pub struct NeighborMessage {
    /// ICMPv6 type (135 or 136)
    pub icmp_type: u8,
    /// Target address the message is about
    pub target: Ipv6Addr,
}

impl NeighborMessage {
    /// Parse a neighbor discovery message, consuming [`ND_MESSAGE_LEN`] bytes
    pub fn parse(reader: &mut Reader<'_>) -> Option<Self> {
        let icmp_type = reader.read_u8()?;
        reader.skip(3)?; // code, checksum
        reader.skip(4)?; // reserved / flags
        let target = reader.read_ipv6()?;
        Some(Self { icmp_type, target })
    }
}

/// Reasons an ND option sequence is rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NdOptionError {
    /// Option declared a length of zero units
    ZeroLength,
    /// Option length runs past the captured bytes
    Overrun,
}

/// A single neighbor discovery option
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NdOption<'a> {
    /// Option type
    pub option_type: u8,
    /// Option payload, excluding the two header bytes
    pub payload: &'a [u8],
}

impl NdOption<'_> {
    /// Is this a source or target link-layer address option?
    pub fn is_link_layer(&self) -> bool {
        self.option_type == ND_OPT_SOURCE_LINKADDR || self.option_type == ND_OPT_TARGET_LINKADDR
    }
}

/// Iterator over the ND options trailing a neighbor message
///
/// Option lengths are declared in units of 8 bytes. Fewer than two trailing
/// bytes end the sequence; a zero or overrunning length is an error that
/// rejects the whole frame.
pub struct NdOptions<'a> {
    reader: Reader<'a>,
}

impl<'a> NdOptions<'a> {
    pub fn new(reader: Reader<'a>) -> Self {
        Self { reader }
    }
}

impl<'a> Iterator for NdOptions<'a> {
    type Item = Result<NdOption<'a>, NdOptionError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.reader.remaining() < 2 {
            return None;
        }
        let option_type = self.reader.read_u8()?;
        let len_units = self.reader.read_u8()?;
        if len_units == 0 {
            return Some(Err(NdOptionError::ZeroLength));
        }
        let payload_len = len_units as usize * 8 - 2;
        match self.reader.take(payload_len) {
            Some(payload) => Some(Ok(NdOption {
                option_type,
                payload,
            })),
            None => Some(Err(NdOptionError::Overrun)),
        }
    }
}
