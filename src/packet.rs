//! DHCP packet parsing and encoding per RFC 2131.
//!
//! A DHCP packet is a fixed 236-byte header followed by a 4-byte magic
//! cookie and a fixed-capacity 308-byte options area. The whole packet is
//! always transmitted at full size; the options area holds a TLV sequence
//! terminated by an End tag.
//!
//! # Packet Structure
//!
//! ```text
//! 0                   1                   2                   3
//! 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |     op (1)    |   htype (1)   |   hlen (1)    |   hops (1)    |
//! +---------------+---------------+---------------+---------------+
//! |                            xid (4)                            |
//! +-------------------------------+-------------------------------+
//! |           secs (2)            |           flags (2)           |
//! +-------------------------------+-------------------------------+
//! |                          ciaddr (4)                           |
//! +---------------------------------------------------------------+
//! |                          yiaddr (4)                           |
//! +---------------------------------------------------------------+
//! |                          siaddr (4)                           |
//! +---------------------------------------------------------------+
//! |                          giaddr (4)                           |
//! +---------------------------------------------------------------+
//! |                          chaddr (16)                          |
//! +---------------------------------------------------------------+
//! |                          sname (64)                           |
//! +---------------------------------------------------------------+
//! |                          file (128)                           |
//! +---------------------------------------------------------------+
//! |                    magic cookie (4) = 99.130.83.99            |
//! +---------------------------------------------------------------+
//! |                          options (308)                        |
//! +---------------------------------------------------------------+
//! ```
//!
//! # References
//!
//! - RFC 2131: Dynamic Host Configuration Protocol

use std::net::Ipv4Addr;

use crate::error::{Error, Result};
use crate::options::OptionCode;

/// DHCP magic cookie that identifies DHCP packets (vs BOOTP).
const DHCP_MAGIC_COOKIE: [u8; 4] = [99, 130, 83, 99];

const DHCP_OP_HTYPE_HLEN_HOPS_SIZE: usize = 4;
const DHCP_XID_SIZE: usize = 4;
const DHCP_SECS_SIZE: usize = 2;
const DHCP_FLAGS_SIZE: usize = 2;
const DHCP_CIADDR_SIZE: usize = 4;
const DHCP_YIADDR_SIZE: usize = 4;
const DHCP_SIADDR_SIZE: usize = 4;
const DHCP_GIADDR_SIZE: usize = 4;
const DHCP_CHADDR_SIZE: usize = 16;
const DHCP_SNAME_SIZE: usize = 64;
const DHCP_FILE_SIZE: usize = 128;

const DHCP_SNAME_OFFSET: usize = DHCP_OP_HTYPE_HLEN_HOPS_SIZE
    + DHCP_XID_SIZE
    + DHCP_SECS_SIZE
    + DHCP_FLAGS_SIZE
    + DHCP_CIADDR_SIZE
    + DHCP_YIADDR_SIZE
    + DHCP_SIADDR_SIZE
    + DHCP_GIADDR_SIZE
    + DHCP_CHADDR_SIZE;

const DHCP_FILE_OFFSET: usize = DHCP_SNAME_OFFSET + DHCP_SNAME_SIZE;

const DHCP_MAGIC_COOKIE_OFFSET: usize = DHCP_FILE_OFFSET + DHCP_FILE_SIZE;

/// Size of the fixed header portion including magic cookie.
const DHCP_FIXED_HEADER_SIZE: usize = DHCP_MAGIC_COOKIE_OFFSET + DHCP_MAGIC_COOKIE.len();

/// Fixed capacity of the options area.
pub const DHCP_OPTIONS_CAPACITY: usize = 308;

/// Total on-the-wire packet size. Packets are always sent at full size.
pub const DHCP_PACKET_SIZE: usize = DHCP_FIXED_HEADER_SIZE + DHCP_OPTIONS_CAPACITY;

/// Flags bit 15: "I need broadcast replies".
const BROADCAST_FLAG: u16 = 0x8000;

/// BOOTP/DHCP operation code for client requests.
pub const BOOTREQUEST: u8 = 1;

/// BOOTP/DHCP operation code for server replies.
pub const BOOTREPLY: u8 = 2;

/// Hardware type for Ethernet.
pub const HTYPE_ETHERNET: u8 = 1;

/// Hardware address length for Ethernet (6 bytes).
pub const HLEN_ETHERNET: u8 = 6;

/// A decoded DHCP packet.
///
/// This struct represents both client requests and server replies. Use
/// [`decode`](Self::decode) for incoming datagrams and
/// [`reply_to`](Self::reply_to) to start a response.
#[derive(Debug, Clone)]
pub struct DhcpPacket {
    /// Operation code: [`BOOTREQUEST`] (1) or [`BOOTREPLY`] (2).
    pub op: u8,

    /// Hardware address type. [`HTYPE_ETHERNET`] (1) for Ethernet.
    pub htype: u8,

    /// Hardware address length. [`HLEN_ETHERNET`] (6) for Ethernet.
    pub hlen: u8,

    /// Hop count, used by relay agents only.
    pub hops: u8,

    /// Transaction ID chosen by the client, echoed in replies.
    pub xid: u32,

    /// Seconds elapsed since the client began address acquisition.
    pub secs: u16,

    /// Flags. Bit 15 (0x8000) = broadcast flag.
    pub flags: u16,

    /// Client IP address (set by clients in BOUND/RENEWING/REBINDING).
    pub ciaddr: Ipv4Addr,

    /// "Your" IP address - the address being assigned to the client.
    pub yiaddr: Ipv4Addr,

    /// IP address of the next server to use in bootstrap.
    pub siaddr: Ipv4Addr,

    /// Relay agent IP address.
    pub giaddr: Ipv4Addr,

    /// Client hardware address (MAC for Ethernet, first 6 bytes).
    pub chaddr: [u8; 16],

    /// Server host name (unused by this server, carried verbatim).
    pub sname: [u8; 64],

    /// Boot file name (unused by this server, carried verbatim).
    pub file: [u8; 128],

    /// Raw options area. A TLV sequence terminated by an End tag; bytes
    /// after the End tag are meaningless.
    pub options: [u8; DHCP_OPTIONS_CAPACITY],
}

/// Location of one option inside a packet's options area.
///
/// Returned by [`DhcpPacket::find_option`]; the offset/length pair stays
/// bounded by the options area, so it can be used to read the value or
/// (for the End tag) as an insertion point without further checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionView {
    /// The option code found.
    pub code: u8,
    /// Byte offset of the option's tag within the options area.
    pub tag_offset: usize,
    /// Length of the option's value (0 for Pad and End).
    pub value_len: usize,
}

impl Default for DhcpPacket {
    /// A zeroed packet whose options area is a valid empty list (a single
    /// End tag at offset 0).
    fn default() -> Self {
        let mut options = [0u8; DHCP_OPTIONS_CAPACITY];
        options[0] = OptionCode::End as u8;
        Self {
            op: 0,
            htype: 0,
            hlen: 0,
            hops: 0,
            xid: 0,
            secs: 0,
            flags: 0,
            ciaddr: Ipv4Addr::UNSPECIFIED,
            yiaddr: Ipv4Addr::UNSPECIFIED,
            siaddr: Ipv4Addr::UNSPECIFIED,
            giaddr: Ipv4Addr::UNSPECIFIED,
            chaddr: [0; 16],
            sname: [0; 64],
            file: [0; 128],
            options,
        }
    }
}

impl DhcpPacket {
    /// Decodes a DHCP request from raw bytes.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidPacket`] if the datagram is shorter than the fixed
    ///   header plus cookie (240 bytes) or the magic cookie is wrong.
    /// - [`Error::InvalidHardwareType`] if htype/hlen is not Ethernet/6.
    /// - [`Error::UnexpectedPacketType`] if the operation field is not
    ///   BOOTREQUEST - a server only accepts request-shaped datagrams.
    ///
    /// Options bytes are copied unparsed; a datagram carrying fewer than
    /// 308 option bytes leaves the remainder zeroed (Pad).
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < DHCP_FIXED_HEADER_SIZE {
            return Err(Error::InvalidPacket(format!(
                "packet too short: {} bytes (minimum {})",
                data.len(),
                DHCP_FIXED_HEADER_SIZE
            )));
        }

        let cookie_end = DHCP_MAGIC_COOKIE_OFFSET + DHCP_MAGIC_COOKIE.len();
        if data[DHCP_MAGIC_COOKIE_OFFSET..cookie_end] != DHCP_MAGIC_COOKIE {
            return Err(Error::InvalidPacket("invalid magic cookie".to_string()));
        }

        let op = data[0];
        let htype = data[1];
        let hlen = data[2];
        let hops = data[3];

        if htype != HTYPE_ETHERNET || hlen != HLEN_ETHERNET {
            return Err(Error::InvalidHardwareType { htype, hlen });
        }

        if op != BOOTREQUEST {
            return Err(Error::UnexpectedPacketType(format!(
                "operation {} is not BOOTREQUEST",
                op
            )));
        }

        let xid = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);
        let secs = u16::from_be_bytes([data[8], data[9]]);
        let flags = u16::from_be_bytes([data[10], data[11]]);

        let ciaddr = Ipv4Addr::new(data[12], data[13], data[14], data[15]);
        let yiaddr = Ipv4Addr::new(data[16], data[17], data[18], data[19]);
        let siaddr = Ipv4Addr::new(data[20], data[21], data[22], data[23]);
        let giaddr = Ipv4Addr::new(data[24], data[25], data[26], data[27]);

        let mut chaddr = [0u8; 16];
        chaddr.copy_from_slice(&data[28..44]);

        let mut sname = [0u8; 64];
        sname.copy_from_slice(&data[DHCP_SNAME_OFFSET..DHCP_SNAME_OFFSET + DHCP_SNAME_SIZE]);

        let mut file = [0u8; 128];
        file.copy_from_slice(&data[DHCP_FILE_OFFSET..DHCP_FILE_OFFSET + DHCP_FILE_SIZE]);

        let mut options = [0u8; DHCP_OPTIONS_CAPACITY];
        let available = (data.len() - DHCP_FIXED_HEADER_SIZE).min(DHCP_OPTIONS_CAPACITY);
        options[..available]
            .copy_from_slice(&data[DHCP_FIXED_HEADER_SIZE..DHCP_FIXED_HEADER_SIZE + available]);

        Ok(Self {
            op,
            htype,
            hlen,
            hops,
            xid,
            secs,
            flags,
            ciaddr,
            yiaddr,
            siaddr,
            giaddr,
            chaddr,
            sname,
            file,
            options,
        })
    }

    /// Encodes the packet for transmission.
    ///
    /// The packet is always encoded at full size ([`DHCP_PACKET_SIZE`]);
    /// option bytes past the End tag go out as stored.
    pub fn encode(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(DHCP_PACKET_SIZE);

        packet.push(self.op);
        packet.push(self.htype);
        packet.push(self.hlen);
        packet.push(self.hops);

        packet.extend_from_slice(&self.xid.to_be_bytes());
        packet.extend_from_slice(&self.secs.to_be_bytes());
        packet.extend_from_slice(&self.flags.to_be_bytes());

        packet.extend_from_slice(&self.ciaddr.octets());
        packet.extend_from_slice(&self.yiaddr.octets());
        packet.extend_from_slice(&self.siaddr.octets());
        packet.extend_from_slice(&self.giaddr.octets());

        packet.extend_from_slice(&self.chaddr);
        packet.extend_from_slice(&self.sname);
        packet.extend_from_slice(&self.file);

        packet.extend_from_slice(&DHCP_MAGIC_COOKIE);
        packet.extend_from_slice(&self.options);

        packet
    }

    /// Locates the first occurrence of an option.
    ///
    /// Performs a forward, self-terminating scan of the options area: a Pad
    /// tag advances by one byte, any other tag by `2 + len`, and the scan
    /// stops at the first End tag - which is returned if and only if `code`
    /// is [`OptionCode::End`], so "find End" doubles as "find insertion
    /// point". The scan is bounded by the options capacity and fails closed
    /// (`None`) on a truncated option or a missing End tag.
    ///
    /// Duplicate codes are not de-duplicated; only the first match is
    /// returned.
    pub fn find_option(&self, code: OptionCode) -> Option<OptionView> {
        let wanted = code as u8;
        let area = &self.options[..];
        let mut index = 0;

        while index < area.len() {
            let tag = area[index];

            if tag == OptionCode::End as u8 {
                if wanted == OptionCode::End as u8 {
                    return Some(OptionView {
                        code: tag,
                        tag_offset: index,
                        value_len: 0,
                    });
                }
                return None;
            }

            if tag == OptionCode::Pad as u8 {
                if wanted == OptionCode::Pad as u8 {
                    return Some(OptionView {
                        code: tag,
                        tag_offset: index,
                        value_len: 0,
                    });
                }
                index += 1;
                continue;
            }

            // Length byte and value must lie inside the options area.
            if index + 1 >= area.len() {
                return None;
            }
            let len = area[index + 1] as usize;
            if index + 2 + len > area.len() {
                return None;
            }

            if tag == wanted {
                return Some(OptionView {
                    code: tag,
                    tag_offset: index,
                    value_len: len,
                });
            }

            index += 2 + len;
        }

        None
    }

    /// Returns the value bytes of the first occurrence of an option.
    ///
    /// Pad and End have no value; querying them yields an empty slice.
    pub fn option_value(&self, code: OptionCode) -> Option<&[u8]> {
        let view = self.find_option(code)?;
        if view.code == OptionCode::Pad as u8 || view.code == OptionCode::End as u8 {
            return Some(&[]);
        }
        let start = view.tag_offset + 2;
        Some(&self.options[start..start + view.value_len])
    }

    /// Appends an option before the End tag.
    ///
    /// Overwrites the current End tag with `code, len, value...` and writes
    /// a fresh End tag immediately after.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidPacket`] if the options area has no End tag to
    ///   replace.
    /// - [`Error::OptionsFull`] if the option plus its trailing End tag
    ///   would not fit in the fixed capacity, or the value exceeds 255
    ///   bytes.
    pub fn add_option(&mut self, code: OptionCode, value: &[u8]) -> Result<()> {
        let end = self
            .find_option(OptionCode::End)
            .ok_or_else(|| Error::InvalidPacket("options area has no end tag".to_string()))?;

        let at = end.tag_offset;
        if value.len() > u8::MAX as usize || at + 2 + value.len() + 1 > DHCP_OPTIONS_CAPACITY {
            return Err(Error::OptionsFull {
                code: code as u8,
                len: value.len(),
            });
        }

        self.options[at] = code as u8;
        self.options[at + 1] = value.len() as u8;
        self.options[at + 2..at + 2 + value.len()].copy_from_slice(value);
        self.options[at + 2 + value.len()] = OptionCode::End as u8;

        Ok(())
    }

    /// Returns the raw message type value (Option 53) if present and
    /// well-formed.
    pub fn message_type(&self) -> Option<u8> {
        match self.option_value(OptionCode::MessageType) {
            Some(value) if value.len() == 1 => Some(value[0]),
            _ => None,
        }
    }

    /// Returns the requested IP address (Option 50) if present and
    /// well-formed.
    pub fn requested_ip(&self) -> Option<Ipv4Addr> {
        match self.option_value(OptionCode::RequestedIpAddress) {
            Some(value) if value.len() == 4 => {
                Some(Ipv4Addr::new(value[0], value[1], value[2], value[3]))
            }
            _ => None,
        }
    }

    /// Returns the server identifier (Option 54) if present and
    /// well-formed.
    pub fn server_identifier(&self) -> Option<Ipv4Addr> {
        match self.option_value(OptionCode::ServerIdentifier) {
            Some(value) if value.len() == 4 => {
                Some(Ipv4Addr::new(value[0], value[1], value[2], value[3]))
            }
            _ => None,
        }
    }

    /// Returns the client's MAC (the first 6 chaddr bytes).
    pub fn mac(&self) -> [u8; 6] {
        let mut mac = [0u8; 6];
        mac.copy_from_slice(&self.chaddr[..6]);
        mac
    }

    /// Formats the client hardware address as a colon-separated string,
    /// e.g. "aa:bb:cc:dd:ee:ff".
    pub fn format_mac(&self) -> String {
        use std::fmt::Write;
        let mut result = String::with_capacity(17);
        for (index, byte) in self.chaddr[..6].iter().enumerate() {
            if index > 0 {
                result.push(':');
            }
            let _ = write!(result, "{:02x}", byte);
        }
        result
    }

    /// Returns true if the broadcast flag (bit 15) is set.
    ///
    /// When set, servers must broadcast replies instead of unicasting.
    pub fn is_broadcast(&self) -> bool {
        (self.flags & BROADCAST_FLAG) != 0
    }

    /// Starts a reply to a request.
    ///
    /// The reply is zero-initialized with operation BOOTREPLY and Ethernet
    /// hardware type/length; xid, chaddr, flags and ciaddr are echoed from
    /// the request. The options area begins as a valid empty list (a
    /// single End tag), so a partially built reply is never malformed.
    pub fn reply_to(request: &DhcpPacket) -> Self {
        Self {
            op: BOOTREPLY,
            htype: HTYPE_ETHERNET,
            hlen: HLEN_ETHERNET,
            xid: request.xid,
            flags: request.flags,
            ciaddr: request.ciaddr,
            chaddr: request.chaddr,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_bytes(message_type: u8) -> Vec<u8> {
        let mut packet = vec![0u8; DHCP_PACKET_SIZE];

        packet[0] = BOOTREQUEST;
        packet[1] = HTYPE_ETHERNET;
        packet[2] = HLEN_ETHERNET;
        packet[4..8].copy_from_slice(&0x12345678u32.to_be_bytes());
        packet[10..12].copy_from_slice(&0x8000u16.to_be_bytes());
        packet[28..34].copy_from_slice(&[0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]);
        packet[236..240].copy_from_slice(&DHCP_MAGIC_COOKIE);

        packet[240] = OptionCode::MessageType as u8;
        packet[241] = 1;
        packet[242] = message_type;
        packet[243] = OptionCode::End as u8;
        packet
    }

    #[test]
    fn test_decode_fields() {
        let mut data = request_bytes(1);
        data[3] = 5;
        data[8..10].copy_from_slice(&1234u16.to_be_bytes());
        data[12..16].copy_from_slice(&[10, 0, 0, 1]);
        data[16..20].copy_from_slice(&[10, 0, 0, 2]);
        data[20..24].copy_from_slice(&[10, 0, 0, 3]);
        data[24..28].copy_from_slice(&[10, 0, 0, 4]);

        let packet = DhcpPacket::decode(&data).unwrap();
        assert_eq!(packet.op, BOOTREQUEST);
        assert_eq!(packet.htype, HTYPE_ETHERNET);
        assert_eq!(packet.hlen, HLEN_ETHERNET);
        assert_eq!(packet.hops, 5);
        assert_eq!(packet.xid, 0x12345678);
        assert_eq!(packet.secs, 1234);
        assert_eq!(packet.flags, 0x8000);
        assert!(packet.is_broadcast());
        assert_eq!(packet.ciaddr, Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(packet.yiaddr, Ipv4Addr::new(10, 0, 0, 2));
        assert_eq!(packet.siaddr, Ipv4Addr::new(10, 0, 0, 3));
        assert_eq!(packet.giaddr, Ipv4Addr::new(10, 0, 0, 4));
        assert_eq!(packet.format_mac(), "aa:bb:cc:dd:ee:ff");
        assert_eq!(packet.message_type(), Some(1));
    }

    #[test]
    fn test_decode_rejects_short_packets() {
        assert!(matches!(
            DhcpPacket::decode(&[0u8; 100]),
            Err(Error::InvalidPacket(_))
        ));
        assert!(matches!(
            DhcpPacket::decode(&[0u8; 239]),
            Err(Error::InvalidPacket(_))
        ));
    }

    #[test]
    fn test_decode_rejects_bad_cookie() {
        let mut data = request_bytes(1);
        data[236..240].copy_from_slice(&[0, 0, 0, 0]);
        assert!(matches!(
            DhcpPacket::decode(&data),
            Err(Error::InvalidPacket(_))
        ));
    }

    #[test]
    fn test_decode_rejects_non_ethernet() {
        let mut data = request_bytes(1);
        data[1] = 6;
        assert!(matches!(
            DhcpPacket::decode(&data),
            Err(Error::InvalidHardwareType { htype: 6, hlen: 6 })
        ));

        let mut data = request_bytes(1);
        data[2] = 7;
        assert!(matches!(
            DhcpPacket::decode(&data),
            Err(Error::InvalidHardwareType { htype: 1, hlen: 7 })
        ));
    }

    #[test]
    fn test_decode_rejects_bootreply() {
        let mut data = request_bytes(1);
        data[0] = BOOTREPLY;
        assert!(matches!(
            DhcpPacket::decode(&data),
            Err(Error::UnexpectedPacketType(_))
        ));
    }

    #[test]
    fn test_decode_minimum_size_has_empty_options() {
        let data = request_bytes(1);
        let packet = DhcpPacket::decode(&data[..240]).unwrap();
        // Nothing after the cookie: the zeroed area has no End tag, so
        // every lookup fails closed.
        assert!(packet.find_option(OptionCode::MessageType).is_none());
        assert!(packet.find_option(OptionCode::End).is_none());
    }

    #[test]
    fn test_roundtrip_preserves_every_byte() {
        let mut data = request_bytes(3);
        data[240] = OptionCode::MessageType as u8;
        data[241] = 1;
        data[242] = 3;
        data[243] = OptionCode::RequestedIpAddress as u8;
        data[244] = 4;
        data[245..249].copy_from_slice(&[192, 168, 1, 100]);
        data[249] = OptionCode::End as u8;

        let packet = DhcpPacket::decode(&data).unwrap();
        let encoded = packet.encode();
        assert_eq!(encoded.len(), DHCP_PACKET_SIZE);
        assert_eq!(encoded, data);

        let reparsed = DhcpPacket::decode(&encoded).unwrap();
        assert_eq!(reparsed.xid, packet.xid);
        assert_eq!(reparsed.options[..], packet.options[..]);
    }

    #[test]
    fn test_find_option_on_end_only_area() {
        let packet = DhcpPacket::default();

        let end = packet.find_option(OptionCode::End).unwrap();
        assert_eq!(end.code, OptionCode::End as u8);
        assert_eq!(end.tag_offset, 0);
        assert_eq!(end.value_len, 0);

        assert!(packet.find_option(OptionCode::MessageType).is_none());
        assert!(packet.find_option(OptionCode::RequestedIpAddress).is_none());
        assert!(packet.find_option(OptionCode::SubnetMask).is_none());
    }

    #[test]
    fn test_find_option_skips_pad_bytes() {
        let mut packet = DhcpPacket::default();
        packet.options[..8].fill(OptionCode::Pad as u8);
        packet.options[8] = OptionCode::MessageType as u8;
        packet.options[9] = 1;
        packet.options[10] = 1;
        packet.options[11] = OptionCode::End as u8;

        assert_eq!(packet.message_type(), Some(1));
        let end = packet.find_option(OptionCode::End).unwrap();
        assert_eq!(end.tag_offset, 11);
    }

    #[test]
    fn test_find_option_skips_unknown_codes() {
        let mut packet = DhcpPacket::default();
        packet.options[0] = 200;
        packet.options[1] = 4;
        packet.options[2..6].copy_from_slice(&[0xde, 0xad, 0xbe, 0xef]);
        packet.options[6] = OptionCode::MessageType as u8;
        packet.options[7] = 1;
        packet.options[8] = 2;
        packet.options[9] = OptionCode::End as u8;

        assert_eq!(packet.message_type(), Some(2));
    }

    #[test]
    fn test_find_option_returns_first_match_only() {
        let mut packet = DhcpPacket::default();
        packet.options[0] = OptionCode::MessageType as u8;
        packet.options[1] = 1;
        packet.options[2] = 1;
        packet.options[3] = OptionCode::MessageType as u8;
        packet.options[4] = 1;
        packet.options[5] = 3;
        packet.options[6] = OptionCode::End as u8;

        assert_eq!(packet.message_type(), Some(1));
    }

    #[test]
    fn test_find_option_fails_closed_on_truncation() {
        // A length byte that points past the end of the area must not be
        // followed.
        let mut packet = DhcpPacket::default();
        packet.options.fill(0);
        packet.options[DHCP_OPTIONS_CAPACITY - 2] = OptionCode::LeaseTime as u8;
        packet.options[DHCP_OPTIONS_CAPACITY - 1] = 200;

        assert!(packet.find_option(OptionCode::LeaseTime).is_none());
        assert!(packet.find_option(OptionCode::End).is_none());

        // Tag as the very last byte: no room for a length byte.
        let mut packet = DhcpPacket::default();
        packet.options.fill(0);
        packet.options[DHCP_OPTIONS_CAPACITY - 1] = OptionCode::LeaseTime as u8;
        assert!(packet.find_option(OptionCode::LeaseTime).is_none());
    }

    #[test]
    fn test_add_option_then_find() {
        let mut packet = DhcpPacket::default();
        packet
            .add_option(OptionCode::RequestedIpAddress, &[192, 168, 1, 50])
            .unwrap();

        assert_eq!(
            packet.option_value(OptionCode::RequestedIpAddress),
            Some(&[192, 168, 1, 50][..])
        );
        assert_eq!(packet.requested_ip(), Some(Ipv4Addr::new(192, 168, 1, 50)));

        // The fresh End tag sits right after the appended option.
        let end = packet.find_option(OptionCode::End).unwrap();
        assert_eq!(end.tag_offset, 6);
    }

    #[test]
    fn test_add_option_appends_in_order() {
        let mut packet = DhcpPacket::default();
        packet.add_option(OptionCode::MessageType, &[2]).unwrap();
        packet
            .add_option(OptionCode::ServerIdentifier, &[10, 0, 0, 1])
            .unwrap();
        packet
            .add_option(OptionCode::LeaseTime, &60u32.to_be_bytes())
            .unwrap();

        assert_eq!(packet.options[0], OptionCode::MessageType as u8);
        assert_eq!(packet.options[3], OptionCode::ServerIdentifier as u8);
        assert_eq!(packet.options[9], OptionCode::LeaseTime as u8);
        assert_eq!(packet.options[15], OptionCode::End as u8);
        assert_eq!(
            packet.option_value(OptionCode::LeaseTime),
            Some(&60u32.to_be_bytes()[..])
        );
    }

    #[test]
    fn test_add_option_rejects_overflow() {
        let mut packet = DhcpPacket::default();
        // Fill the area almost completely.
        let big = [0u8; 200];
        packet.add_option(OptionCode::SubnetMask, &big).unwrap();
        let result = packet.add_option(OptionCode::LeaseTime, &big);
        assert!(matches!(
            result,
            Err(Error::OptionsFull { code: 51, len: 200 })
        ));

        // The area must still end with a valid End tag.
        assert!(packet.find_option(OptionCode::End).is_some());
        assert_eq!(
            packet.option_value(OptionCode::SubnetMask),
            Some(&big[..])
        );
    }

    #[test]
    fn test_add_option_without_end_tag_fails() {
        let mut packet = DhcpPacket::default();
        packet.options.fill(0);
        assert!(matches!(
            packet.add_option(OptionCode::MessageType, &[1]),
            Err(Error::InvalidPacket(_))
        ));
    }

    #[test]
    fn test_reply_to_echoes_request_fields() {
        let mut data = request_bytes(1);
        data[12..16].copy_from_slice(&[192, 168, 1, 10]);
        let request = DhcpPacket::decode(&data).unwrap();

        let reply = DhcpPacket::reply_to(&request);
        assert_eq!(reply.op, BOOTREPLY);
        assert_eq!(reply.htype, HTYPE_ETHERNET);
        assert_eq!(reply.hlen, HLEN_ETHERNET);
        assert_eq!(reply.xid, request.xid);
        assert_eq!(reply.flags, request.flags);
        assert_eq!(reply.ciaddr, request.ciaddr);
        assert_eq!(reply.chaddr, request.chaddr);
        assert_eq!(reply.yiaddr, Ipv4Addr::UNSPECIFIED);
        assert_eq!(reply.options[0], OptionCode::End as u8);
    }

    #[test]
    fn test_encode_offsets() {
        let mut packet = DhcpPacket::default();
        packet.op = BOOTREPLY;
        packet.htype = HTYPE_ETHERNET;
        packet.hlen = HLEN_ETHERNET;
        packet.xid = 0xdeadbeef;
        packet.flags = 0x8000;
        packet.yiaddr = Ipv4Addr::new(192, 168, 1, 100);
        packet.chaddr[..6].copy_from_slice(&[0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]);

        let encoded = packet.encode();
        assert_eq!(encoded.len(), DHCP_PACKET_SIZE);
        assert_eq!(encoded[0], BOOTREPLY);
        assert_eq!(&encoded[4..8], &0xdeadbeefu32.to_be_bytes());
        assert_eq!(&encoded[10..12], &0x8000u16.to_be_bytes());
        assert_eq!(&encoded[16..20], &[192, 168, 1, 100]);
        assert_eq!(&encoded[28..34], &[0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]);
        assert_eq!(&encoded[236..240], &DHCP_MAGIC_COOKIE);
        assert_eq!(encoded[240], OptionCode::End as u8);
    }

    #[test]
    fn test_mac_accessor() {
        let data = request_bytes(1);
        let packet = DhcpPacket::decode(&data).unwrap();
        assert_eq!(packet.mac(), [0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]);
    }
}
