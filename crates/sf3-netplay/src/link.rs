//! Addressed, session-scoped messaging on top of a [`PacketChannel`].

use std::fmt::Debug;
use std::net::SocketAddr;
use std::time::Instant;

use sf3_netproto::{
    codec::{decode_datagram, encode_message},
    error::ProtoError,
    messages::{
        Message,
        handshake::{Bye, Hello, HelloAck},
        input::InputWindow,
        sync::{Ping, Pong},
    },
    msg_id::MsgId,
    packet::PacketView,
};
use tracing::{debug, trace, warn};

use crate::transport::PacketChannel;

/// A decoded message from the peer.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Inbound {
    Hello(Hello),
    HelloAck(HelloAck),
    Bye(Bye),
    Inputs(InputWindow),
    Ping(Ping),
    Pong(Pong),
}

/// An [`Inbound`] message with the sender's session nonce from the header.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Received {
    pub nonce: u32,
    pub msg: Inbound,
}

/// Channel bound to one peer.
///
/// Every outgoing header carries our nonce. Once the peer's nonce is known,
/// anything stamped with another one is a leftover from an earlier session
/// and is dropped.
pub(crate) struct Link {
    channel: Box<dyn PacketChannel>,
    peer: SocketAddr,
    local_nonce: u32,
    peer_nonce: Option<u32>,
    seq: u32,
    epoch: Instant,
}

impl Link {
    pub(crate) fn new(channel: Box<dyn PacketChannel>, peer: SocketAddr) -> Self {
        Self {
            channel,
            peer,
            local_nonce: rand::random::<u32>() | 1,
            peer_nonce: None,
            seq: 0,
            epoch: Instant::now(),
        }
    }

    pub(crate) fn local_nonce(&self) -> u32 {
        self.local_nonce
    }

    pub(crate) fn peer_nonce(&self) -> Option<u32> {
        self.peer_nonce
    }

    pub(crate) fn bind_peer(&mut self, nonce: u32) {
        self.peer_nonce = Some(nonce);
    }

    /// Milliseconds since the link was opened, for ping timestamps.
    pub(crate) fn now_ms(&self) -> u32 {
        self.epoch.elapsed().as_millis() as u32
    }

    /// Fire-and-forget send. Failures are logged; the protocol recovers from loss.
    pub(crate) fn send<T: Message + Debug>(&mut self, msg: &T) {
        let seq = self.seq;
        self.seq = self.seq.wrapping_add(1);

        let bytes = match encode_message(self.local_nonce, seq, msg) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to encode {:?}: {}", T::msg_id(), e);
                return;
            }
        };
        if let Err(e) = self.channel.send(&bytes, self.peer) {
            debug!("Send {:?} to {} failed: {}", T::msg_id(), self.peer, e);
        }
    }

    /// Drain and decode everything the peer has sent since the last call.
    pub(crate) fn receive(&mut self) -> Vec<Received> {
        let mut out = Vec::new();
        for datagram in self.channel.poll_received() {
            if datagram.from != self.peer {
                trace!("Ignoring datagram from stranger {}", datagram.from);
                continue;
            }
            let view = match decode_datagram(&datagram.bytes) {
                Ok(view) => view,
                Err(e) => {
                    debug!("Dropping malformed datagram: {}", e);
                    continue;
                }
            };
            if let Some(expected) = self.peer_nonce
                && view.header.session != expected
            {
                trace!(
                    "Dropping {:?} from stale session {:#010x}",
                    view.msg_id, view.header.session
                );
                continue;
            }
            match Self::decode(&view) {
                Ok(msg) => out.push(Received {
                    nonce: view.header.session,
                    msg,
                }),
                Err(e) => debug!("Dropping undecodable {:?}: {}", view.msg_id, e),
            }
        }
        out
    }

    fn decode(view: &PacketView<'_>) -> Result<Inbound, ProtoError> {
        Ok(match view.msg_id {
            MsgId::Hello => Inbound::Hello(view.decode()?),
            MsgId::HelloAck => Inbound::HelloAck(view.decode()?),
            MsgId::Bye => Inbound::Bye(view.decode()?),
            MsgId::InputWindow => Inbound::Inputs(view.decode()?),
            MsgId::Ping => Inbound::Ping(view.decode()?),
            MsgId::Pong => Inbound::Pong(view.decode()?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryNetwork;
    use sf3_netproto::messages::handshake::ByeReason;

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    fn pair(net: &MemoryNetwork) -> (Link, Link) {
        let a = Link::new(Box::new(net.bind(addr(1)).unwrap()), addr(2));
        let b = Link::new(Box::new(net.bind(addr(2)).unwrap()), addr(1));
        (a, b)
    }

    #[test]
    fn hello_carries_sender_nonce() {
        let net = MemoryNetwork::ideal();
        let (mut a, mut b) = pair(&net);
        let hello = Hello {
            player_slot: 0,
            input_delay: 2,
            max_rollback: 12,
        };
        a.send(&hello);
        assert_eq!(
            b.receive(),
            vec![Received {
                nonce: a.local_nonce(),
                msg: Inbound::Hello(hello)
            }]
        );
    }

    #[test]
    fn stale_session_traffic_is_dropped_after_binding() {
        let net = MemoryNetwork::ideal();
        let (mut a, mut b) = pair(&net);
        b.bind_peer(a.local_nonce() ^ 0xFFFF_0000);

        a.send(&Ping { t_ms: 5 });
        assert!(b.receive().is_empty());

        b.bind_peer(a.local_nonce());
        a.send(&Bye {
            reason: ByeReason::MenuExit,
        });
        let got = b.receive();
        assert_eq!(got.len(), 1);
        assert_eq!(
            got[0].msg,
            Inbound::Bye(Bye {
                reason: ByeReason::MenuExit
            })
        );
    }

    #[test]
    fn strangers_and_garbage_are_ignored() {
        let net = MemoryNetwork::ideal();
        let (mut a, mut b) = pair(&net);
        let mut stranger = net.bind(addr(9)).unwrap();
        stranger
            .send(&encode_message(1, 0, &Ping { t_ms: 1 }).unwrap(), addr(2))
            .unwrap();
        a.channel.send(b"not a packet", addr(2)).unwrap();

        assert!(b.receive().is_empty());
    }
}
