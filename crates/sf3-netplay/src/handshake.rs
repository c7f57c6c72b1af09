//! Connecting phase: symmetric Hello / HelloAck exchange.
//!
//! Both peers announce themselves until each has seen the other's `Hello`
//! and received an ack for its own. There is no host; the negotiated input
//! delay is the larger of the two.

use sf3_netproto::messages::handshake::{Hello, HelloAck};
use tracing::{debug, info, trace};

use crate::{
    config::NetplayConfig,
    error::NetplayError,
    link::{Inbound, Link, Received},
};

/// Parameters both peers agreed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Agreement {
    pub peer_nonce: u32,
    pub peer_slot: u8,
    pub input_delay: u8,
    /// Smaller of the two advertised rollback windows.
    pub max_rollback: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HandshakeProgress {
    Waiting,
    Done(Agreement),
    /// The peer sent `Bye` before we got going.
    PeerLeft,
}

pub(crate) struct Handshake {
    link: Link,
    hello: Hello,
    ticks: u32,
    /// Nonce and announcement of the peer's current session.
    peer: Option<(u32, Hello)>,
    acked: bool,
}

impl Handshake {
    pub(crate) fn new(link: Link, player_slot: u8, config: &NetplayConfig) -> Self {
        Self {
            link,
            hello: Hello {
                player_slot,
                input_delay: config.input_delay,
                max_rollback: config.max_rollback_frames,
            },
            ticks: 0,
            peer: None,
            acked: false,
        }
    }

    pub(crate) fn into_link(self) -> Link {
        self.link
    }

    /// One connecting tick.
    ///
    /// Fails with [`NetplayError::SlotConflict`] if the peer claims our slot and
    /// with [`NetplayError::HandshakeTimeout`] once the budget is spent.
    pub(crate) fn tick(&mut self, config: &NetplayConfig) -> Result<HandshakeProgress, NetplayError> {
        for Received { nonce, msg } in self.link.receive() {
            let from_known_peer = self.peer.is_some_and(|(known, _)| known == nonce);
            match msg {
                Inbound::Hello(hello) => {
                    if hello.player_slot == self.hello.player_slot {
                        return Err(NetplayError::SlotConflict(hello.player_slot));
                    }
                    if self.peer.is_some() && !from_known_peer {
                        debug!("Peer restarted its session ({:#010x})", nonce);
                    }
                    self.peer = Some((nonce, hello));
                    self.link.send(&HelloAck { echo_nonce: nonce });
                }
                Inbound::HelloAck(ack) => {
                    if ack.echo_nonce == self.link.local_nonce() {
                        self.acked = true;
                    } else {
                        trace!("Ignoring ack for foreign nonce {:#010x}", ack.echo_nonce);
                    }
                }
                // The peer is already running, so it saw our Hello.
                Inbound::Inputs(_) if from_known_peer => self.acked = true,
                // Only the peer's current session may cancel the handshake.
                Inbound::Bye(bye) if from_known_peer => {
                    info!("Peer left during handshake: {:?}", bye.reason);
                    return Ok(HandshakeProgress::PeerLeft);
                }
                other => trace!("Ignoring {:?} while connecting", other),
            }
        }

        if self.acked
            && let Some((nonce, peer_hello)) = self.peer
        {
            self.link.bind_peer(nonce);
            let agreement = Agreement {
                peer_nonce: nonce,
                peer_slot: peer_hello.player_slot,
                input_delay: self.hello.input_delay.max(peer_hello.input_delay),
                max_rollback: self.hello.max_rollback.min(peer_hello.max_rollback),
            };
            info!(
                "Handshake complete after {} ticks: peer slot {}, input delay {}, rollback window {}",
                self.ticks, agreement.peer_slot, agreement.input_delay, agreement.max_rollback
            );
            return Ok(HandshakeProgress::Done(agreement));
        }

        if self.ticks % config.handshake_resend_ticks == 0 {
            self.link.send(&self.hello);
        }
        self.ticks += 1;
        if self.ticks >= config.handshake_timeout_ticks {
            return Err(NetplayError::HandshakeTimeout(self.ticks));
        }
        Ok(HandshakeProgress::Waiting)
    }
}
