//! Server configuration and the administrative pool-spec grammar.

use std::net::Ipv4Addr;

use crate::error::{Error, Result};

/// Default subnet mask applied when a pool spec omits one.
pub const DEFAULT_MASK: Ipv4Addr = Ipv4Addr::new(255, 255, 255, 0);

/// DHCP server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Network interface to bind to (e.g. "eth0"). `None` binds to all
    /// interfaces, which also leaves the server identifier unresolved.
    pub interface: Option<String>,

    /// UDP port to listen on. Standard DHCP server port is 67.
    pub server_port: u16,

    /// UDP port replies are sent to. Standard DHCP client port is 68.
    pub client_port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interface: None,
            server_port: 67,
            client_port: 68,
        }
    }
}

/// A parsed pool spec: the inclusive address range to add and its mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSpec {
    /// First address of the range.
    pub from: Ipv4Addr,
    /// Last address of the range (equal to `from` for a single address).
    pub to: Ipv4Addr,
    /// Raw mask value: a prefix length (<= 32) or a literal mask in host
    /// byte order.
    pub raw_mask: u32,
}

/// Parses a pool spec of the form `<ip>[-<ip2>][/<mask>]`.
///
/// The mask may be a prefix length ("24") or dotted quad
/// ("255.255.255.0"); omitted, it defaults to [`DEFAULT_MASK`]. A single
/// address parses to a one-address range; the range bounds may be given in
/// either order.
///
/// # Errors
///
/// Returns [`Error::InvalidPoolSpec`] for malformed addresses, masks, or
/// out-of-range prefix lengths.
pub fn parse_pool_spec(spec: &str) -> Result<PoolSpec> {
    let spec = spec.trim();
    if spec.is_empty() {
        return Err(Error::InvalidPoolSpec("empty pool spec".to_string()));
    }

    let (range, mask) = match spec.split_once('/') {
        Some((range, mask)) => (range, Some(mask)),
        None => (spec, None),
    };

    let raw_mask = match mask {
        None => u32::from(DEFAULT_MASK),
        Some(mask) => parse_mask(mask)?,
    };

    let (from, to) = match range.split_once('-') {
        Some((from, to)) => (parse_ip(from)?, parse_ip(to)?),
        None => {
            let ip = parse_ip(range)?;
            (ip, ip)
        }
    };

    Ok(PoolSpec { from, to, raw_mask })
}

fn parse_ip(text: &str) -> Result<Ipv4Addr> {
    text.trim()
        .parse::<Ipv4Addr>()
        .map_err(|_| Error::InvalidPoolSpec(format!("invalid IPv4 address '{}'", text.trim())))
}

fn parse_mask(text: &str) -> Result<u32> {
    let text = text.trim();
    if let Ok(prefix) = text.parse::<u32>() {
        if prefix > 32 {
            return Err(Error::InvalidPoolSpec(format!(
                "prefix length {} out of range",
                prefix
            )));
        }
        return Ok(prefix);
    }
    let mask = parse_ip(text)
        .map_err(|_| Error::InvalidPoolSpec(format!("invalid mask '{}'", text)))?;
    Ok(u32::from(mask))
}
