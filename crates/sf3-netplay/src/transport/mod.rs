//! Packet channel abstraction consumed by the session.
//!
//! A channel is an unreliable, unordered datagram pipe keyed by peer address.
//! Sending never blocks on delivery; receiving drains whatever has arrived.
//!
//! - [`udp`]: real sockets, with a background receiver thread feeding a queue
//! - [`memory`]: in-process network with configurable latency and loss

pub mod memory;
pub mod udp;

use std::net::SocketAddr;

use crate::error::NetplayError;

pub use memory::{LinkConditions, MemoryChannel, MemoryNetwork, MemoryOpener};
pub use udp::{UdpChannel, UdpOpener};

/// A received datagram and its sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    pub from: SocketAddr,
    pub bytes: Vec<u8>,
}

pub trait PacketChannel: Send {
    /// Address this channel receives on.
    fn local_addr(&self) -> SocketAddr;

    /// Best-effort, non-blocking send.
    fn send(&mut self, bytes: &[u8], to: SocketAddr) -> Result<(), NetplayError>;

    /// Drain every datagram received since the last call. Never blocks.
    fn poll_received(&mut self) -> Vec<Datagram>;
}

/// Opens a fresh channel each time a session begins.
///
/// Dropping the channel closes it.
pub trait ChannelOpener: Send {
    fn open(&self) -> Result<Box<dyn PacketChannel>, NetplayError>;
}
