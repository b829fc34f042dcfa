#![cfg_attr(not(test), no_std)]

//! Shared definitions for the WRAITH XDP filter.
//!
//! The packet classifier itself lives here (`frame`, `filter`) rather than
//! in the eBPF crate so that the exact code the verifier runs is also
//! compiled for the host and covered by unit tests. Everything is `no_std`
//! and free of allocation; the eBPF build inlines it into the program via
//! LTO.

pub mod filter;
pub mod frame;

/// Inclusive lower bound of the WRAITH UDP port range.
pub const WRAITH_PORT_MIN: u16 = 40000;

/// Inclusive upper bound of the WRAITH UDP port range.
pub const WRAITH_PORT_MAX: u16 = 50000;

/// Capacity of the queue-id -> AF_XDP socket redirect table. One entry per
/// RX queue; the control plane registers sockets, the filter only reads.
pub const SOCKET_TABLE_CAPACITY: u32 = 64;

/// Slot indices of the per-CPU statistics array. The userspace agent sums
/// each slot across CPUs to obtain the global counter.
pub mod stats {
    pub const RX_PACKETS: u32 = 0;
    pub const RX_BYTES: u32 = 1;
    pub const DROPPED: u32 = 2;
    pub const REDIRECTED: u32 = 3;
    pub const SLOT_COUNT: u32 = 4;
}

/// Aggregated view of the statistics map, summed across all CPUs.
///
/// Counters are monotonic for the lifetime of the loaded program; the
/// filter only ever increments its own CPU's slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "user", derive(serde::Serialize, serde::Deserialize))]
pub struct StatsSnapshot {
    /// WRAITH-eligible packets seen (counted before the redirect attempt).
    pub rx_packets: u64,
    /// Total bytes of those packets, full frame length.
    pub rx_bytes: u64,
    /// Eligible packets dropped because no socket was registered for the
    /// RX queue (or the redirect helper failed).
    pub dropped: u64,
    /// Eligible packets handed to an AF_XDP socket.
    pub redirected: u64,
}

impl StatsSnapshot {
    /// Packets that reached a terminal redirect-path disposition. Equals
    /// `rx_packets` unless the agent raced a snapshot between the receive
    /// and dispatch increments.
    pub fn disposed(&self) -> u64 {
        self.dropped + self.redirected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_disposed() {
        let snap = StatsSnapshot {
            rx_packets: 10,
            rx_bytes: 600,
            dropped: 3,
            redirected: 7,
        };
        assert_eq!(snap.disposed(), 10);
        assert_eq!(snap.disposed(), snap.rx_packets);
    }

    #[test]
    fn test_slot_indices_are_dense() {
        assert_eq!(stats::RX_PACKETS, 0);
        assert_eq!(stats::RX_BYTES, 1);
        assert_eq!(stats::DROPPED, 2);
        assert_eq!(stats::REDIRECTED, 3);
        assert_eq!(stats::SLOT_COUNT, 4);
    }
}
