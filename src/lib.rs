//! # ndhcpd
//!
//! A minimal DHCP server: a fixed pool of addresses, the DISCOVER/OFFER/
//! REQUEST/ACK handshake, and nothing else.
//!
//! ## Features
//!
//! - DISCOVER answered with an OFFER, REQUEST with an ACK or NAK
//! - Pool-based allocation: lowest free address first, returning clients
//!   keep their address
//! - Lazy lease expiry, no background timers
//! - Runtime pool configuration while the server runs
//! - Async/await with Tokio
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::net::Ipv4Addr;
//!
//! use ndhcpd::{Config, DhcpServer};
//!
//! #[tokio::main]
//! async fn main() -> ndhcpd::Result<()> {
//!     let mut server = DhcpServer::new(Config::default());
//!     server
//!         .add_range(
//!             Ipv4Addr::new(192, 168, 1, 100),
//!             Ipv4Addr::new(192, 168, 1, 200),
//!             24,
//!         )
//!         .await;
//!     server.start().await?;
//!     tokio::signal::ctrl_c().await?;
//!     server.stop().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`Config`] - Interface and port configuration
//! - [`DhcpServer`] - Lifecycle facade around the UDP listener
//! - [`AddressPool`] - Lease table with lazy expiry
//! - [`DhcpPacket`] - DHCP packet parsing and encoding
//! - [`MessageType`] - The DHCP message types per RFC 2132

pub mod config;
pub mod error;
pub mod lease;
pub mod options;
pub mod packet;
pub mod server;

pub use config::{Config, PoolSpec, parse_pool_spec};
pub use error::{Error, Result};
pub use lease::{AddressPool, LeaseState};
pub use options::{MessageType, OptionCode};
pub use packet::DhcpPacket;
pub use server::DhcpServer;
