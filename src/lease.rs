//! Address pool and lease state tracking.
//!
//! The pool is an ordered table of configured addresses, each carrying its
//! subnet mask and current lease state. Expiry is lazy: nothing runs on a
//! timer, an overdue lease simply becomes eligible for reuse the next time
//! an allocation scans the table.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

/// The state of one configured address.
///
/// `Offered` and `Bound` differ only in meaning, not in data: an offer is a
/// short-lived tentative reservation awaiting the client's REQUEST, a bound
/// lease is a confirmed assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaseState {
    /// Never handed out, or explicitly cleared.
    Free,
    /// Tentatively reserved by an OFFER.
    Offered {
        /// Client hardware address the offer was made to.
        mac: [u8; 6],
        /// When the offer was made.
        start: Instant,
        /// How long the offer is held.
        duration: Duration,
    },
    /// Confirmed by an ACK.
    Bound {
        /// Client hardware address holding the lease.
        mac: [u8; 6],
        /// When the lease was granted or last renewed.
        start: Instant,
        /// Lease duration.
        duration: Duration,
    },
}

impl LeaseState {
    /// Returns the MAC holding this lease, if any.
    pub fn mac(&self) -> Option<[u8; 6]> {
        match self {
            Self::Free => None,
            Self::Offered { mac, .. } | Self::Bound { mac, .. } => Some(*mac),
        }
    }

    /// Returns true if the address can be handed to a new client at `now`.
    ///
    /// Free addresses always can; offered and bound addresses can once
    /// their duration has fully elapsed.
    pub fn is_reusable(&self, now: Instant) -> bool {
        match self {
            Self::Free => true,
            Self::Offered { start, duration, .. } | Self::Bound { start, duration, .. } => {
                now.duration_since(*start) >= *duration
            }
        }
    }
}

/// One configured address: its subnet mask and lease state.
#[derive(Debug, Clone, Copy)]
pub struct PoolEntry {
    /// Subnet mask advertised with this address.
    pub mask: Ipv4Addr,
    /// Current lease state.
    pub state: LeaseState,
}

/// The set of addresses this server may hand out.
///
/// Ordered by IP so allocation scans and [`ips`](Self::ips) listings are
/// deterministic (lowest address first).
#[derive(Debug, Default)]
pub struct AddressPool {
    entries: BTreeMap<Ipv4Addr, PoolEntry>,
}

/// Normalizes a raw mask value to a subnet mask.
///
/// Values up to 32 are treated as a prefix length and converted
/// (`24` becomes `255.255.255.0`); larger values are taken as a literal
/// mask in host byte order.
pub fn mask_from_raw(raw: u32) -> Ipv4Addr {
    if raw <= 32 {
        // Prefix 0 would shift by 32, which u32 cannot express.
        let bits = match raw {
            0 => 0,
            prefix => u32::MAX << (32 - prefix),
        };
        Ipv4Addr::from(bits)
    } else {
        Ipv4Addr::from(raw)
    }
}

impl AddressPool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds every address in the inclusive range between `from` and `to`
    /// with the given raw mask (prefix length or literal mask, see
    /// [`mask_from_raw`]).
    ///
    /// The bounds may be given in either order. Re-adding an existing
    /// address updates its mask and keeps its lease state.
    pub fn add_range(&mut self, from: Ipv4Addr, to: Ipv4Addr, raw_mask: u32) {
        let mask = mask_from_raw(raw_mask);
        let a = u32::from(from);
        let b = u32::from(to);
        for ip in a.min(b)..=a.max(b) {
            self.insert(Ipv4Addr::from(ip), mask);
        }
    }

    /// Adds a single address with the given raw mask.
    ///
    /// Re-adding an existing address updates its mask and keeps its lease
    /// state.
    pub fn add_ip(&mut self, ip: Ipv4Addr, raw_mask: u32) {
        self.insert(ip, mask_from_raw(raw_mask));
    }

    fn insert(&mut self, ip: Ipv4Addr, mask: Ipv4Addr) {
        self.entries
            .entry(ip)
            .and_modify(|entry| entry.mask = mask)
            .or_insert(PoolEntry {
                mask,
                state: LeaseState::Free,
            });
    }

    /// Returns the entry for a configured address.
    pub fn lookup(&self, ip: Ipv4Addr) -> Option<&PoolEntry> {
        self.entries.get(&ip)
    }

    /// Finds the lowest address already associated with `mac`, offered or
    /// bound, regardless of expiry. Returns the address and its mask.
    ///
    /// A returning client gets its previous address back even if the lease
    /// has lapsed in the meantime.
    pub fn find_by_mac(&self, mac: &[u8; 6]) -> Option<(Ipv4Addr, Ipv4Addr)> {
        self.entries
            .iter()
            .find(|(_, entry)| entry.state.mac().as_ref() == Some(mac))
            .map(|(ip, entry)| (*ip, entry.mask))
    }

    /// Finds the lowest address that is free or whose lease has expired at
    /// `now`. Returns the address and its mask.
    pub fn find_reusable(&self, now: Instant) -> Option<(Ipv4Addr, Ipv4Addr)> {
        self.entries
            .iter()
            .find(|(_, entry)| entry.state.is_reusable(now))
            .map(|(ip, entry)| (*ip, entry.mask))
    }

    /// Marks an address as tentatively offered to `mac`.
    ///
    /// Does nothing if the address is not configured.
    pub fn offer(&mut self, ip: Ipv4Addr, mac: [u8; 6], now: Instant, duration: Duration) {
        if let Some(entry) = self.entries.get_mut(&ip) {
            entry.state = LeaseState::Offered {
                mac,
                start: now,
                duration,
            };
        }
    }

    /// Marks an address as bound to `mac`.
    ///
    /// Renewing replaces the previous record outright, restarting the
    /// clock. Does nothing if the address is not configured.
    pub fn bind(&mut self, ip: Ipv4Addr, mac: [u8; 6], now: Instant, duration: Duration) {
        if let Some(entry) = self.entries.get_mut(&ip) {
            entry.state = LeaseState::Bound {
                mac,
                start: now,
                duration,
            };
        }
    }

    /// Lists all configured addresses in ascending order.
    pub fn ips(&self) -> Vec<Ipv4Addr> {
        self.entries.keys().copied().collect()
    }

    /// Resets every address to [`LeaseState::Free`], keeping the
    /// configured addresses and masks.
    pub fn clear_leases(&mut self) {
        for entry in self.entries.values_mut() {
            entry.state = LeaseState::Free;
        }
    }

    /// Number of configured addresses.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no addresses are configured.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
