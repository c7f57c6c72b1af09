//! Running phase: one simulation frame per tick with rollback repair.

use sf3_netproto::messages::{
    handshake::HelloAck,
    input::InputWindow,
    sync::{Ping, Pong},
};
use tracing::{info, trace};

use crate::{
    config::NetplayConfig,
    error::NetplayError,
    handshake::Agreement,
    link::{Inbound, Link, Received},
    simulation::Simulation,
    stats::{NetworkStats, StatsAggregator},
    sync::RollbackSync,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TickOutcome {
    Continue,
    PeerLeft,
}

pub(crate) struct RunningSession<T> {
    link: Link,
    sync: RollbackSync<T>,
    stats: StatsAggregator,
    /// The peer holds every local frame below this one.
    peer_ack: u32,
    ticks: u32,
    redundancy: u8,
    ping_interval: u32,
}

impl<T> RunningSession<T> {
    pub(crate) fn new(link: Link, local_slot: u8, agreement: Agreement, config: &NetplayConfig) -> Self {
        let mut stats = StatsAggregator::new(config.ping_smoothing);
        stats.set_delay(agreement.input_delay as u32);
        info!(
            "Netplay running as slot {} with {} frames input delay and a {} frame rollback window",
            local_slot, agreement.input_delay, agreement.max_rollback
        );
        Self {
            link,
            sync: RollbackSync::new(local_slot, agreement.input_delay, agreement.max_rollback),
            stats,
            peer_ack: 0,
            ticks: 0,
            redundancy: config.redundancy_window,
            ping_interval: config.ping_interval_ticks,
        }
    }

    pub(crate) fn into_link(self) -> Link {
        self.link
    }

    pub(crate) fn stats(&self) -> NetworkStats {
        self.stats.snapshot()
    }

    pub(crate) fn current_frame(&self) -> u32 {
        self.sync.current_frame()
    }

    /// One frame: drain the network, repair mispredictions, capture local
    /// input, simulate, then publish our inputs.
    ///
    /// Errors are fatal to the session.
    pub(crate) fn tick<S>(&mut self, sim: &mut S, local_input: u16) -> Result<TickOutcome, NetplayError>
    where
        S: Simulation<Snapshot = T>,
    {
        if self.drain_network() == TickOutcome::PeerLeft {
            return Ok(TickOutcome::PeerLeft);
        }

        let rolled = self.sync.resolve(sim)?;
        self.stats.record_rollback(rolled);

        self.sync.add_local_input(local_input);
        self.sync.advance(sim)?;

        let (base_frame, buttons) = self.sync.outbound_window(self.peer_ack, self.redundancy);
        self.link.send(&InputWindow {
            base_frame,
            ack_frame: self.sync.remote_ack(),
            buttons,
        });

        if self.ticks % self.ping_interval == 0 {
            let t_ms = self.link.now_ms();
            self.link.send(&Ping { t_ms });
        }
        self.ticks += 1;
        Ok(TickOutcome::Continue)
    }

    fn drain_network(&mut self) -> TickOutcome {
        let mut outcome = TickOutcome::Continue;
        for Received { nonce, msg } in self.link.receive() {
            match msg {
                Inbound::Inputs(window) => {
                    self.peer_ack = self.peer_ack.max(window.ack_frame);
                    for (frame, buttons) in window.frames() {
                        self.sync.on_remote_input(frame, buttons);
                    }
                }
                Inbound::Ping(ping) => self.link.send(&Pong { t_ms: ping.t_ms }),
                Inbound::Pong(pong) => {
                    let now = self.link.now_ms();
                    if pong.t_ms <= now {
                        self.stats.record_rtt(now - pong.t_ms);
                    }
                }
                // Our ack may have been lost; the peer keeps announcing until it sees one.
                Inbound::Hello(_) => {
                    if self.link.peer_nonce() == Some(nonce) {
                        self.link.send(&HelloAck { echo_nonce: nonce });
                    }
                }
                Inbound::Bye(bye) => {
                    info!("Peer left: {:?}", bye.reason);
                    outcome = TickOutcome::PeerLeft;
                }
                Inbound::HelloAck(_) => trace!("Late HelloAck ignored"),
            }
        }
        outcome
    }
}
