//! Error types for the DHCP server.
//!
//! All fallible operations in this crate return [`Result<T>`], which uses
//! the [`Error`] enum for error variants.

/// Errors that can occur during DHCP server operation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Network I/O error while receiving or sending a datagram.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed DHCP packet.
    ///
    /// Covers packets shorter than the fixed header, a bad magic cookie,
    /// a missing or out-of-range message type, and REQUESTs from a
    /// RENEWING/REBINDING client for a (MAC, IP) pair this server does not
    /// know. The last case is deliberately answered with silence.
    #[error("Invalid DHCP packet: {0}")]
    InvalidPacket(String),

    /// Hardware type/length is not Ethernet/6.
    #[error("Unsupported hardware type {htype}/{hlen} (expected Ethernet 1/6)")]
    InvalidHardwareType {
        /// The `htype` field of the offending packet.
        htype: u8,
        /// The `hlen` field of the offending packet.
        hlen: u8,
    },

    /// The packet is not one this server answers.
    ///
    /// Either the operation field is not BOOTREQUEST, or the message type
    /// is valid but not DISCOVER/REQUEST.
    #[error("Unexpected DHCP packet type: {0}")]
    UnexpectedPacketType(String),

    /// No free or reusable address is left to satisfy a DISCOVER.
    #[error("No leases available for client")]
    NoMoreLeases,

    /// A REQUEST carried neither a requested-ip option nor a nonzero ciaddr.
    #[error("DHCP request without an IP address")]
    NoIpRequested,

    /// Appending an option would overflow the fixed options area.
    #[error("Option {code} with {len} value bytes does not fit in the options area")]
    OptionsFull {
        /// The option code that did not fit.
        code: u8,
        /// The length of the value that did not fit.
        len: usize,
    },

    /// A pool spec on the command channel did not parse.
    #[error("Invalid pool spec: {0}")]
    InvalidPoolSpec(String),

    /// Socket creation or configuration error.
    ///
    /// Typically occurs when binding to port 67 without sufficient
    /// privileges, or when the configured network interface doesn't exist.
    #[error("Socket error: {0}")]
    Socket(String),
}

/// A specialized Result type for DHCP operations.
pub type Result<T> = std::result::Result<T, Error>;
