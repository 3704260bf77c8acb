//! DHCP option codes and message types.
//!
//! DHCP conveys parameters as TLV options appended to the fixed packet
//! header. This server interprets a deliberately small, closed set of
//! option codes; anything else is skipped on the wire without being
//! parsed (see [`crate::packet::DhcpPacket::find_option`]).
//!
//! # References
//!
//! - RFC 2132: DHCP Options and BOOTP Vendor Extensions

/// DHCP option codes understood by this server.
///
/// Only the codes the protocol engine actually reads or writes are listed;
/// unknown codes are skipped during option scans, never interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OptionCode {
    /// Padding (single byte, no length/value). Used for alignment.
    Pad = 0,
    /// Subnet mask (RFC 2132 §3.3).
    SubnetMask = 1,
    /// Requested IP address (RFC 2132 §9.1).
    RequestedIpAddress = 50,
    /// IP address lease time in seconds (RFC 2132 §9.2).
    LeaseTime = 51,
    /// DHCP message type (RFC 2132 §9.6).
    MessageType = 53,
    /// Server identifier (RFC 2132 §9.7).
    ServerIdentifier = 54,
    /// End of options marker.
    End = 255,
}

/// DHCP message types (Option 53) as defined in RFC 2132 §9.6.
///
/// Values outside 1..=8 are invalid; [`TryFrom<u8>`] rejects them with the
/// raw value as the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    /// Client broadcast to locate servers.
    Discover = 1,
    /// Server response to DISCOVER with IP offer.
    Offer = 2,
    /// Client request for offered parameters.
    Request = 3,
    /// Client indicates address is already in use.
    Decline = 4,
    /// Server acknowledgement with configuration.
    Ack = 5,
    /// Server negative acknowledgement.
    Nak = 6,
    /// Client releases IP address.
    Release = 7,
    /// Client requests config without IP allocation.
    Inform = 8,
}

impl TryFrom<u8> for MessageType {
    type Error = u8;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Discover),
            2 => Ok(Self::Offer),
            3 => Ok(Self::Request),
            4 => Ok(Self::Decline),
            5 => Ok(Self::Ack),
            6 => Ok(Self::Nak),
            7 => Ok(Self::Release),
            8 => Ok(Self::Inform),
            other => Err(other),
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(message_type_name(*self as u8))
    }
}

/// Returns the conventional name for a raw message type value.
///
/// Unknown values render as an explicit marker rather than failing; this
/// is used in log lines where the value comes straight off the wire.
pub fn message_type_name(value: u8) -> &'static str {
    match MessageType::try_from(value) {
        Ok(MessageType::Discover) => "DISCOVER",
        Ok(MessageType::Offer) => "OFFER",
        Ok(MessageType::Request) => "REQUEST",
        Ok(MessageType::Decline) => "DECLINE",
        Ok(MessageType::Ack) => "ACK",
        Ok(MessageType::Nak) => "NAK",
        Ok(MessageType::Release) => "RELEASE",
        Ok(MessageType::Inform) => "INFORM",
        Err(_) => "<unknown message type>",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_type_conversions() {
        for value in 1..=8u8 {
            let msg_type = MessageType::try_from(value).unwrap();
            assert_eq!(msg_type as u8, value);
        }
        assert!(MessageType::try_from(0).is_err());
        assert!(MessageType::try_from(9).is_err());
        assert!(MessageType::try_from(255).is_err());
    }

    #[test]
    fn test_message_type_display() {
        assert_eq!(format!("{}", MessageType::Discover), "DISCOVER");
        assert_eq!(format!("{}", MessageType::Offer), "OFFER");
        assert_eq!(format!("{}", MessageType::Request), "REQUEST");
        assert_eq!(format!("{}", MessageType::Decline), "DECLINE");
        assert_eq!(format!("{}", MessageType::Ack), "ACK");
        assert_eq!(format!("{}", MessageType::Nak), "NAK");
        assert_eq!(format!("{}", MessageType::Release), "RELEASE");
        assert_eq!(format!("{}", MessageType::Inform), "INFORM");
    }

    #[test]
    fn test_message_type_name_never_panics() {
        for value in 0..=255u8 {
            let name = message_type_name(value);
            assert!(!name.is_empty());
        }
        assert_eq!(message_type_name(0), "<unknown message type>");
        assert_eq!(message_type_name(9), "<unknown message type>");
    }
}
