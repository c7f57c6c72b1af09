//! In-process packet network for tests and local play.
//!
//! Time is driven explicitly with [`MemoryNetwork::advance`], so delivery is
//! fully deterministic for a given seed.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::Mutex;
use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::trace;

use super::{ChannelOpener, Datagram, PacketChannel};
use crate::error::NetplayError;

/// Impairments applied to every datagram.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkConditions {
    /// Minimum one-way delay, in network ticks.
    pub latency_ticks: u32,
    /// Extra random delay of up to this many ticks. Non-zero values reorder packets.
    pub jitter_ticks: u32,
    /// Probability in `[0, 1]` that a datagram is dropped.
    pub loss: f64,
}

impl LinkConditions {
    pub const IDEAL: LinkConditions = LinkConditions {
        latency_ticks: 0,
        jitter_ticks: 0,
        loss: 0.0,
    };
}

impl Default for LinkConditions {
    fn default() -> Self {
        Self::IDEAL
    }
}

struct InFlight {
    deliver_at: u64,
    datagram: Datagram,
}

struct NetworkInner {
    now: u64,
    conditions: LinkConditions,
    rng: StdRng,
    /// Pending datagrams per bound address. Unbound addresses swallow traffic.
    queues: HashMap<SocketAddr, Vec<InFlight>>,
    dropped: u64,
}

/// Shared handle to a simulated network. Clones refer to the same network.
#[derive(Clone)]
pub struct MemoryNetwork {
    inner: Arc<Mutex<NetworkInner>>,
}

impl MemoryNetwork {
    pub fn new(conditions: LinkConditions, seed: u64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(NetworkInner {
                now: 0,
                conditions,
                rng: StdRng::seed_from_u64(seed),
                queues: HashMap::new(),
                dropped: 0,
            })),
        }
    }

    /// Lossless, zero-latency network.
    pub fn ideal() -> Self {
        Self::new(LinkConditions::IDEAL, 0)
    }

    /// Move network time forward one tick.
    pub fn advance(&self) {
        self.inner.lock().now += 1;
    }

    pub fn now(&self) -> u64 {
        self.inner.lock().now
    }

    pub fn set_conditions(&self, conditions: LinkConditions) {
        self.inner.lock().conditions = conditions;
    }

    /// Number of datagrams lost so far, including those sent to unbound addresses.
    pub fn dropped(&self) -> u64 {
        self.inner.lock().dropped
    }

    pub fn is_bound(&self, addr: SocketAddr) -> bool {
        self.inner.lock().queues.contains_key(&addr)
    }

    /// Bind a channel at `addr`.
    pub fn bind(&self, addr: SocketAddr) -> Result<MemoryChannel, NetplayError> {
        let mut inner = self.inner.lock();
        if inner.queues.contains_key(&addr) {
            return Err(NetplayError::ChannelUnavailable(format!(
                "{addr} already bound"
            )));
        }
        inner.queues.insert(addr, Vec::new());
        Ok(MemoryChannel {
            addr,
            network: self.clone(),
        })
    }

    /// Opener that binds a fresh channel at `addr` on each call.
    pub fn opener(&self, addr: SocketAddr) -> MemoryOpener {
        MemoryOpener {
            addr,
            network: self.clone(),
        }
    }

    fn unbind(&self, addr: SocketAddr) {
        self.inner.lock().queues.remove(&addr);
    }
}

pub struct MemoryOpener {
    addr: SocketAddr,
    network: MemoryNetwork,
}

impl ChannelOpener for MemoryOpener {
    fn open(&self) -> Result<Box<dyn PacketChannel>, NetplayError> {
        Ok(Box::new(self.network.bind(self.addr)?))
    }
}

/// Endpoint on a [`MemoryNetwork`]. Dropping it unbinds the address.
pub struct MemoryChannel {
    addr: SocketAddr,
    network: MemoryNetwork,
}

impl PacketChannel for MemoryChannel {
    fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    fn send(&mut self, bytes: &[u8], to: SocketAddr) -> Result<(), NetplayError> {
        let mut guard = self.network.inner.lock();
        let inner = &mut *guard;
        let LinkConditions {
            latency_ticks,
            jitter_ticks,
            loss,
        } = inner.conditions;

        if inner.rng.random_bool(loss.clamp(0.0, 1.0)) {
            inner.dropped += 1;
            trace!("memory network dropped {} -> {}", self.addr, to);
            return Ok(());
        }
        let jitter = if jitter_ticks > 0 {
            inner.rng.random_range(0..=jitter_ticks)
        } else {
            0
        };
        let deliver_at = inner.now + (latency_ticks + jitter) as u64;

        match inner.queues.get_mut(&to) {
            Some(queue) => queue.push(InFlight {
                deliver_at,
                datagram: Datagram {
                    from: self.addr,
                    bytes: bytes.to_vec(),
                },
            }),
            None => inner.dropped += 1,
        }
        Ok(())
    }

    fn poll_received(&mut self) -> Vec<Datagram> {
        let mut inner = self.network.inner.lock();
        let now = inner.now;
        let Some(queue) = inner.queues.get_mut(&self.addr) else {
            return Vec::new();
        };

        let (mut ready, pending): (Vec<_>, Vec<_>) = std::mem::take(queue)
            .into_iter()
            .partition(|pkt| pkt.deliver_at <= now);
        *queue = pending;
        ready.sort_by_key(|pkt| pkt.deliver_at);
        ready.into_iter().map(|pkt| pkt.datagram).collect()
    }
}

impl Drop for MemoryChannel {
    fn drop(&mut self) {
        self.network.unbind(self.addr);
    }
}
