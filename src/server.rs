//! DHCP server: protocol engine, UDP transport, and lifecycle facade.
//!
//! The module is split the way the packet flow is: [`PacketEngine`] is the
//! pure DISCOVER/REQUEST state machine (time is passed in, nothing async),
//! the transport task owns the socket and runs decode, process and send per
//! datagram, and [`DhcpServer`] wraps both behind start/stop and the pool
//! configuration calls.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;
use std::time::{Duration, Instant};

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::lease::AddressPool;
use crate::options::{MessageType, OptionCode, message_type_name};
use crate::packet::DhcpPacket;

/// How long an OFFER reserves an address, in seconds.
const OFFER_HOLD_SECS: u64 = 60;

/// Lease duration granted by an ACK, in seconds.
const LEASE_DURATION_SECS: u64 = 3600;

const RECV_BUFFER_SIZE: usize = 1500;

/// The DISCOVER/REQUEST state machine.
///
/// Operates on an [`AddressPool`] and a decoded request; the current time
/// is injected so lease expiry is deterministic under test. Every path
/// either returns a reply packet or an error; errors other than I/O mean
/// "no reply is sent".
pub struct PacketEngine {
    server_id: Ipv4Addr,
}

impl PacketEngine {
    /// Creates an engine advertising `server_id` in its replies.
    ///
    /// While the server identifier is unresolved the caller passes
    /// [`Ipv4Addr::UNSPECIFIED`] and the option encodes 0.0.0.0.
    pub fn new(server_id: Ipv4Addr) -> Self {
        Self { server_id }
    }

    /// Processes one request and produces the reply, if any.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidPacket`] for a missing or out-of-range message
    ///   type, and for a REQUEST naming a (MAC, IP) pair this server does
    ///   not know when the client gave no hint it was addressing us - a
    ///   renewing client of some other server gets silence, not a NAK.
    /// - [`Error::UnexpectedPacketType`] for valid message types this
    ///   server does not answer (RELEASE, DECLINE, INFORM, ...).
    /// - [`Error::NoMoreLeases`] when a DISCOVER finds the pool exhausted.
    /// - [`Error::NoIpRequested`] when a REQUEST names no address at all.
    pub fn process_packet(
        &self,
        pool: &mut AddressPool,
        request: &DhcpPacket,
        now: Instant,
    ) -> Result<DhcpPacket> {
        let raw_type = request.message_type().ok_or_else(|| {
            Error::InvalidPacket("missing or malformed message type option".to_string())
        })?;

        let message_type = MessageType::try_from(raw_type).map_err(|value| {
            Error::InvalidPacket(format!("message type {} out of range", value))
        })?;

        match message_type {
            MessageType::Discover => self.make_offer(pool, request, now),
            MessageType::Request => self.process_ip_request(pool, request, now),
            other => Err(Error::UnexpectedPacketType(format!(
                "{} is not handled by this server",
                other
            ))),
        }
    }

    /// Answers a DISCOVER with an OFFER.
    ///
    /// A client that already holds an offer or lease gets the same address
    /// back, expired or not; otherwise the lowest free or expired address
    /// is reserved for [`OFFER_HOLD_SECS`].
    fn make_offer(
        &self,
        pool: &mut AddressPool,
        request: &DhcpPacket,
        now: Instant,
    ) -> Result<DhcpPacket> {
        let mac = request.mac();
        let (ip, mask) = pool
            .find_by_mac(&mac)
            .or_else(|| pool.find_reusable(now))
            .ok_or(Error::NoMoreLeases)?;

        pool.offer(ip, mac, now, Duration::from_secs(OFFER_HOLD_SECS));

        let mut reply = DhcpPacket::reply_to(request);
        reply.yiaddr = ip;
        reply.add_option(OptionCode::MessageType, &[MessageType::Offer as u8])?;
        reply.add_option(OptionCode::ServerIdentifier, &self.server_id.octets())?;
        reply.add_option(
            OptionCode::LeaseTime,
            &(OFFER_HOLD_SECS as u32).to_be_bytes(),
        )?;
        reply.add_option(OptionCode::SubnetMask, &mask.octets())?;

        Ok(reply)
    }

    /// Answers a REQUEST with an ACK, a NAK, or silence.
    ///
    /// The address under negotiation is taken from the requested-ip option
    /// when present (even if zero), falling back to a nonzero ciaddr. A
    /// known (MAC, IP) pair is (re)bound for [`LEASE_DURATION_SECS`];
    /// renewal simply replaces the record. An unknown pair is NAKed only
    /// when the client addressed a server explicitly (server-id option,
    /// SELECTING) or named an address to verify (requested-ip option,
    /// INIT-REBOOT); a bare renewal for a lease we never granted is
    /// answered with silence so the client's real server can.
    fn process_ip_request(
        &self,
        pool: &mut AddressPool,
        request: &DhcpPacket,
        now: Instant,
    ) -> Result<DhcpPacket> {
        let mac = request.mac();

        let requested = match request.requested_ip() {
            Some(ip) => ip,
            None if request.ciaddr != Ipv4Addr::UNSPECIFIED => request.ciaddr,
            None => return Err(Error::NoIpRequested),
        };

        let held_mask = pool.lookup(requested).and_then(|entry| {
            if entry.state.mac() == Some(mac) {
                Some(entry.mask)
            } else {
                None
            }
        });

        match held_mask {
            Some(mask) => {
                pool.bind(requested, mac, now, Duration::from_secs(LEASE_DURATION_SECS));
                self.ack(request, requested, mask)
            }
            None => {
                let selecting = request.find_option(OptionCode::ServerIdentifier).is_some();
                let init_reboot = request
                    .find_option(OptionCode::RequestedIpAddress)
                    .is_some();
                if selecting || init_reboot {
                    self.nak(request)
                } else {
                    Err(Error::InvalidPacket(format!(
                        "no lease for {} held by {}",
                        requested,
                        request.format_mac()
                    )))
                }
            }
        }
    }

    fn ack(&self, request: &DhcpPacket, ip: Ipv4Addr, mask: Ipv4Addr) -> Result<DhcpPacket> {
        let mut reply = DhcpPacket::reply_to(request);
        reply.yiaddr = ip;
        reply.add_option(OptionCode::MessageType, &[MessageType::Ack as u8])?;
        reply.add_option(OptionCode::ServerIdentifier, &self.server_id.octets())?;
        reply.add_option(
            OptionCode::LeaseTime,
            &(LEASE_DURATION_SECS as u32).to_be_bytes(),
        )?;
        reply.add_option(OptionCode::SubnetMask, &mask.octets())?;
        Ok(reply)
    }

    fn nak(&self, request: &DhcpPacket) -> Result<DhcpPacket> {
        let mut reply = DhcpPacket::reply_to(request);
        reply.add_option(OptionCode::MessageType, &[MessageType::Nak as u8])?;
        reply.add_option(OptionCode::ServerIdentifier, &self.server_id.octets())?;
        Ok(reply)
    }
}

/// Picks where a reply goes.
///
/// The broadcast flag or an unset ciaddr (both echoed from the request)
/// force a broadcast to the client port; otherwise the reply is unicast to
/// the client's current address.
fn reply_destination(reply: &DhcpPacket, client_port: u16) -> SocketAddrV4 {
    if reply.is_broadcast() || reply.ciaddr == Ipv4Addr::UNSPECIFIED {
        SocketAddrV4::new(Ipv4Addr::BROADCAST, client_port)
    } else {
        SocketAddrV4::new(reply.ciaddr, client_port)
    }
}

fn create_socket(config: &Config) -> Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))
        .map_err(|error| Error::Socket(format!("Failed to create socket: {}", error)))?;

    socket
        .set_reuse_address(true)
        .map_err(|error| Error::Socket(format!("Failed to set SO_REUSEADDR: {}", error)))?;

    socket
        .set_broadcast(true)
        .map_err(|error| Error::Socket(format!("Failed to set SO_BROADCAST: {}", error)))?;

    socket
        .set_nonblocking(true)
        .map_err(|error| Error::Socket(format!("Failed to set non-blocking: {}", error)))?;

    if let Some(ref interface) = config.interface {
        bind_to_device(&socket, interface)?;
    }

    let bind_addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, config.server_port);
    socket
        .bind(&bind_addr.into())
        .map_err(|error| Error::Socket(format!("Failed to bind to {}: {}", bind_addr, error)))?;

    let std_socket: std::net::UdpSocket = socket.into();
    let tokio_socket = UdpSocket::from_std(std_socket)
        .map_err(|error| Error::Socket(format!("Failed to convert to tokio socket: {}", error)))?;

    Ok(tokio_socket)
}

/// Restricts the socket to one interface with SO_BINDTODEVICE.
#[cfg(target_os = "linux")]
fn bind_to_device(socket: &Socket, interface: &str) -> Result<()> {
    use std::os::fd::AsRawFd;

    let name = interface.as_bytes();
    let result = unsafe {
        libc::setsockopt(
            socket.as_raw_fd(),
            libc::SOL_SOCKET,
            libc::SO_BINDTODEVICE,
            name.as_ptr() as *const libc::c_void,
            name.len() as libc::socklen_t,
        )
    };

    if result != 0 {
        return Err(Error::Socket(format!(
            "Failed to bind to device {}: {}",
            interface,
            std::io::Error::last_os_error()
        )));
    }

    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn bind_to_device(_socket: &Socket, interface: &str) -> Result<()> {
    tracing::warn!(
        "Binding to interface {} is only supported on Linux and will be ignored",
        interface
    );
    Ok(())
}

/// Looks up the IPv4 address of the bound interface with SIOCGIFADDR.
///
/// Returns `None` while the interface has no address yet (common right
/// after boot), so the caller retries on the next datagram.
#[cfg(target_os = "linux")]
fn resolve_server_id(socket: &UdpSocket, interface: Option<&str>) -> Option<Ipv4Addr> {
    use std::os::fd::AsRawFd;

    let interface = interface?;
    let name = interface.as_bytes();
    if name.is_empty() || name.len() >= libc::IFNAMSIZ {
        return None;
    }

    let mut request: libc::ifreq = unsafe { std::mem::zeroed() };
    for (slot, byte) in request.ifr_name.iter_mut().zip(name.iter()) {
        *slot = *byte as libc::c_char;
    }

    let result = unsafe { libc::ioctl(socket.as_raw_fd(), libc::SIOCGIFADDR, &mut request) };
    if result != 0 {
        return None;
    }

    let address = unsafe { *(&request.ifr_ifru.ifru_addr as *const libc::sockaddr as *const libc::sockaddr_in) };
    if address.sin_family != libc::AF_INET as libc::sa_family_t {
        return None;
    }

    // s_addr is in network byte order.
    Some(Ipv4Addr::from(u32::from_be(address.sin_addr.s_addr)))
}

#[cfg(not(target_os = "linux"))]
fn resolve_server_id(_socket: &UdpSocket, _interface: Option<&str>) -> Option<Ipv4Addr> {
    None
}

async fn handle_datagram(
    data: &[u8],
    source: SocketAddr,
    socket: &UdpSocket,
    pool: &Mutex<AddressPool>,
    config: &Config,
    server_id: Option<Ipv4Addr>,
) -> Result<()> {
    let request = DhcpPacket::decode(data)?;

    info!(
        "{} from {} ({})",
        message_type_name(request.message_type().unwrap_or(0)),
        request.format_mac(),
        source
    );

    let engine = PacketEngine::new(server_id.unwrap_or(Ipv4Addr::UNSPECIFIED));
    let reply = {
        let mut pool = pool.lock().await;
        engine.process_packet(&mut pool, &request, Instant::now())?
    };

    let destination = reply_destination(&reply, config.client_port);
    socket
        .send_to(&reply.encode(), SocketAddr::V4(destination))
        .await?;

    info!(
        "{} {} to {}",
        message_type_name(reply.message_type().unwrap_or(0)),
        reply.yiaddr,
        request.format_mac()
    );

    Ok(())
}

/// The receive loop. Runs until the shutdown channel fires.
///
/// The `biased` select checks shutdown before the socket, so a stop
/// request wins even under datagram load. Per-packet errors are logged
/// and the loop keeps serving.
async fn serve(
    socket: UdpSocket,
    pool: Arc<Mutex<AddressPool>>,
    config: Config,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut buffer = [0u8; RECV_BUFFER_SIZE];
    let mut server_id: Option<Ipv4Addr> = None;

    info!("DHCP server ready and listening");

    loop {
        tokio::select! {
            biased;

            _ = shutdown.changed() => {
                info!("DHCP listener shutting down");
                return;
            }

            received = socket.recv_from(&mut buffer) => {
                let (size, source) = match received {
                    Ok(pair) => pair,
                    Err(error) => {
                        error!("Error receiving packet: {}", error);
                        continue;
                    }
                };

                if server_id.is_none() {
                    server_id = resolve_server_id(&socket, config.interface.as_deref());
                    if server_id.is_none() {
                        debug!("Server identifier unresolved, replies will carry 0.0.0.0");
                    }
                }

                let result =
                    handle_datagram(&buffer[..size], source, &socket, &pool, &config, server_id)
                        .await;
                if let Err(error) = result {
                    error!("Error handling packet from {}: {}", source, error);
                }
            }
        }
    }
}

struct Running {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// The server facade: pool configuration plus start/stop lifecycle.
///
/// The pool is shared with the listener task behind a mutex, so addresses
/// can be added while the server runs.
pub struct DhcpServer {
    config: Config,
    pool: Arc<Mutex<AddressPool>>,
    running: Option<Running>,
}

impl DhcpServer {
    /// Creates a stopped server with the given configuration and an empty
    /// pool.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            pool: Arc::new(Mutex::new(AddressPool::new())),
            running: None,
        }
    }

    /// Sets the interface to bind to. Takes effect on the next start.
    pub fn set_interface(&mut self, interface: Option<String>) {
        self.config.interface = interface;
    }

    /// Adds an inclusive address range to the pool.
    pub async fn add_range(&self, from: Ipv4Addr, to: Ipv4Addr, raw_mask: u32) {
        self.pool.lock().await.add_range(from, to, raw_mask);
    }

    /// Adds a single address to the pool.
    pub async fn add_ip(&self, ip: Ipv4Addr, raw_mask: u32) {
        self.pool.lock().await.add_ip(ip, raw_mask);
    }

    /// Lists the configured addresses in ascending order.
    pub async fn ips(&self) -> Vec<Ipv4Addr> {
        self.pool.lock().await.ips()
    }

    /// Returns true while the listener task is running.
    pub fn is_started(&self) -> bool {
        self.running.is_some()
    }

    /// Starts the listener. Does nothing if already started.
    ///
    /// # Errors
    ///
    /// [`Error::Socket`] if the socket cannot be created, configured, or
    /// bound (typically: port 67 without privileges, or a missing
    /// interface).
    pub async fn start(&mut self) -> Result<()> {
        if self.running.is_some() {
            info!("DHCP server already started");
            return Ok(());
        }

        let socket = create_socket(&self.config)?;
        let (shutdown, receiver) = watch::channel(false);
        let handle = tokio::spawn(serve(
            socket,
            Arc::clone(&self.pool),
            self.config.clone(),
            receiver,
        ));

        self.running = Some(Running { shutdown, handle });
        info!(
            "DHCP server started on port {} ({})",
            self.config.server_port,
            self.config.interface.as_deref().unwrap_or("all interfaces")
        );
        Ok(())
    }

    /// Stops the listener and clears all lease state.
    ///
    /// Configured addresses and masks survive a stop; only leases are
    /// forgotten. Does nothing if already stopped.
    pub async fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            let _ = running.shutdown.send(true);
            if let Err(error) = running.handle.await {
                error!("Listener task failed: {}", error);
            }
            self.pool.lock().await.clear_leases();
            info!("DHCP server stopped");
        }
    }
}
