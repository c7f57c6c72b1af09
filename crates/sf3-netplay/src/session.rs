//! The netplay session handle driven by the host's frame loop.
//!
//! The session is a tagged [`Phase`]: each call to [`NetplaySession::run`]
//! consumes the current phase and produces the next one, so per-state data
//! (handshake progress, rollback buffers, teardown countdown) only exists
//! while that state is live.

use std::net::SocketAddr;

use sf3_netproto::{
    constants::PLAYER_COUNT,
    messages::handshake::{Bye, ByeReason},
};
use tracing::{debug, info, warn};

use crate::{
    config::NetplayConfig,
    error::NetplayError,
    handshake::{Handshake, HandshakeProgress},
    link::Link,
    monitor::SessionMonitor,
    running::{RunningSession, TickOutcome},
    simulation::Simulation,
    state::SessionState,
    stats::NetworkStats,
    transport::{ChannelOpener, UdpOpener},
};

/// Why the last session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExitReason {
    /// The local player backed out.
    MenuExit,
    /// No handshake within the configured budget.
    HandshakeTimeout,
    /// Both peers claimed the same player slot.
    SlotConflict,
    /// Remote input fell further behind than the rollback window allows.
    RollbackWindowExceeded,
    /// The peer sent `Bye`.
    PeerLeft,
    /// The packet channel could not be opened.
    ChannelUnavailable,
}

impl ExitReason {
    fn from_error(err: &NetplayError) -> Self {
        match err {
            NetplayError::HandshakeTimeout(_) => ExitReason::HandshakeTimeout,
            NetplayError::SlotConflict(_) => ExitReason::SlotConflict,
            NetplayError::ChannelUnavailable(_) | NetplayError::Io(_) => {
                ExitReason::ChannelUnavailable
            }
            _ => ExitReason::RollbackWindowExceeded,
        }
    }

    fn bye_reason(self) -> ByeReason {
        match self {
            ExitReason::MenuExit | ExitReason::PeerLeft => ByeReason::MenuExit,
            ExitReason::HandshakeTimeout
            | ExitReason::SlotConflict
            | ExitReason::ChannelUnavailable => ByeReason::Timeout,
            ExitReason::RollbackWindowExceeded => ByeReason::Desync,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct SessionParams {
    player_slot: u8,
    peer: SocketAddr,
}

/// Countdown while leaving a session, optionally repeating `Bye` to the peer.
struct Teardown {
    link: Option<Link>,
    bye: Option<ByeReason>,
    remaining: u32,
}

impl Teardown {
    fn new(link: Option<Link>, bye: Option<ByeReason>, ticks: u32) -> Self {
        Self {
            link,
            bye,
            remaining: ticks.max(1),
        }
    }

    /// Returns `None` once the countdown is over; dropping the link closes the channel.
    fn step(mut self) -> Option<Self> {
        if let (Some(link), Some(reason)) = (self.link.as_mut(), self.bye) {
            link.send(&Bye { reason });
        }
        if self.remaining <= 1 {
            return None;
        }
        self.remaining -= 1;
        Some(self)
    }
}

enum Phase<T> {
    Idle,
    Transitioning(Teardown),
    Connecting(Handshake),
    Running(Box<RunningSession<T>>),
    Exiting(Teardown),
}

impl<T> Phase<T> {
    fn state(&self) -> SessionState {
        match self {
            Phase::Idle => SessionState::Idle,
            Phase::Transitioning(_) => SessionState::Transitioning,
            Phase::Connecting(_) => SessionState::Connecting,
            Phase::Running(_) => SessionState::Running,
            Phase::Exiting(_) => SessionState::Exiting,
        }
    }
}

/// Two-peer rollback session.
///
/// The host calls [`Self::run`] exactly once per frame, whatever the state.
/// Nothing here blocks or panics on network conditions; every failure turns
/// into a state transition and an [`ExitReason`].
pub struct NetplaySession<S: Simulation> {
    config: NetplayConfig,
    opener: Box<dyn ChannelOpener>,
    params: Option<SessionParams>,
    phase: Phase<S::Snapshot>,
    exit_reason: Option<ExitReason>,
    monitor: SessionMonitor,
}

impl<S: Simulation> NetplaySession<S> {
    pub fn new(config: NetplayConfig, opener: impl ChannelOpener + 'static) -> Self {
        Self {
            config: config.normalized(),
            opener: Box::new(opener),
            params: None,
            phase: Phase::Idle,
            exit_reason: None,
            monitor: SessionMonitor::new(),
        }
    }

    /// Session over UDP, bound to [`NetplayConfig::bind_addr`].
    pub fn udp(config: NetplayConfig) -> Self {
        let opener = UdpOpener::new(config.bind_addr);
        Self::new(config, opener)
    }

    pub fn config(&self) -> &NetplayConfig {
        &self.config
    }

    /// Choose the local player slot (0 or 1) and the peer address.
    ///
    /// Only honored while idle. Invalid values are logged and leave the
    /// previous parameters in place.
    pub fn set_params(&mut self, player_slot: u8, peer: &str) {
        if !matches!(self.phase, Phase::Idle) {
            warn!("set_params ignored while {:?}", self.state());
            return;
        }
        match self.parse_params(player_slot, peer) {
            Ok(params) => {
                debug!("Netplay params: slot {}, peer {}", params.player_slot, params.peer);
                self.params = Some(params);
            }
            Err(e) => warn!("set_params rejected: {}", e),
        }
    }

    fn parse_params(&self, player_slot: u8, peer: &str) -> Result<SessionParams, NetplayError> {
        if player_slot as usize >= PLAYER_COUNT {
            return Err(NetplayError::InvalidPlayerSlot(player_slot));
        }
        Ok(SessionParams {
            player_slot,
            peer: self.config.peer_addr(peer)?,
        })
    }

    /// Open the channel and start connecting. No-op unless idle with params set.
    pub fn begin(&mut self) {
        if !matches!(self.phase, Phase::Idle) {
            warn!("begin ignored while {:?}", self.state());
            return;
        }
        let Some(params) = self.params else {
            warn!("begin ignored: no peer configured");
            return;
        };

        self.exit_reason = None;
        let prev = self.state();
        let next = match self.opener.open() {
            Ok(channel) => {
                info!(
                    "Connecting to {} as slot {} from {}",
                    params.peer,
                    params.player_slot,
                    channel.local_addr()
                );
                let link = Link::new(channel, params.peer);
                Phase::Connecting(Handshake::new(link, params.player_slot, &self.config))
            }
            Err(e) => {
                warn!("Cannot open packet channel: {}", e);
                self.exit_reason = Some(ExitReason::ChannelUnavailable);
                Phase::Exiting(Teardown::new(None, None, 1))
            }
        };
        self.enter(prev, next);
    }

    /// Advance the session by one host frame.
    ///
    /// While running, `local_input` is this frame's button bitmask and `sim`
    /// is stepped (and possibly rewound and replayed). In every other state
    /// `sim` is left untouched.
    pub fn run(&mut self, sim: &mut S, local_input: u16) {
        let prev = self.state();
        let phase = std::mem::replace(&mut self.phase, Phase::Idle);
        let next = match phase {
            Phase::Idle => Phase::Idle,
            Phase::Connecting(handshake) => self.step_connecting(handshake),
            Phase::Running(running) => self.step_running(running, sim, local_input),
            Phase::Transitioning(teardown) => {
                teardown.step().map_or(Phase::Idle, Phase::Transitioning)
            }
            Phase::Exiting(teardown) => teardown.step().map_or(Phase::Idle, Phase::Exiting),
        };
        self.enter(prev, next);
    }

    fn step_connecting(&mut self, mut handshake: Handshake) -> Phase<S::Snapshot> {
        match handshake.tick(&self.config) {
            Ok(HandshakeProgress::Waiting) => Phase::Connecting(handshake),
            Ok(HandshakeProgress::Done(agreement)) => {
                let slot = self.params.map_or(0, |p| p.player_slot);
                let running =
                    RunningSession::new(handshake.into_link(), slot, agreement, &self.config);
                Phase::Running(Box::new(running))
            }
            Ok(HandshakeProgress::PeerLeft) => {
                self.exit_reason = Some(ExitReason::PeerLeft);
                Phase::Transitioning(Teardown::new(Some(handshake.into_link()), None, 1))
            }
            Err(e) => {
                warn!("Handshake failed: {}", e);
                self.fail(handshake.into_link(), &e)
            }
        }
    }

    fn step_running(
        &mut self,
        mut running: Box<RunningSession<S::Snapshot>>,
        sim: &mut S,
        local_input: u16,
    ) -> Phase<S::Snapshot> {
        match running.tick(sim, local_input) {
            Ok(TickOutcome::Continue) => Phase::Running(running),
            Ok(TickOutcome::PeerLeft) => {
                self.exit_reason = Some(ExitReason::PeerLeft);
                Phase::Transitioning(Teardown::new(Some(running.into_link()), None, 1))
            }
            Err(e) => {
                warn!("Netplay desync at frame {}: {}", running.current_frame(), e);
                self.fail(running.into_link(), &e)
            }
        }
    }

    fn fail(&mut self, link: Link, err: &NetplayError) -> Phase<S::Snapshot> {
        let reason = ExitReason::from_error(err);
        self.exit_reason = Some(reason);
        Phase::Exiting(Teardown::new(
            Some(link),
            Some(reason.bye_reason()),
            self.config.teardown_ticks,
        ))
    }

    /// The player backed out to the menu. Tears down any live session.
    pub fn handle_menu_exit(&mut self) {
        let prev = self.state();
        let phase = std::mem::replace(&mut self.phase, Phase::Idle);
        let ticks = self.config.teardown_ticks;
        let bye = Some(ByeReason::MenuExit);
        let next = match phase {
            Phase::Idle => {
                debug!("Menu exit with no session");
                Phase::Idle
            }
            Phase::Exiting(teardown) => Phase::Exiting(teardown),
            Phase::Connecting(handshake) => {
                Phase::Exiting(Teardown::new(Some(handshake.into_link()), bye, ticks))
            }
            Phase::Running(running) => {
                Phase::Exiting(Teardown::new(Some(running.into_link()), bye, ticks))
            }
            // The peer is already gone; nothing to announce.
            Phase::Transitioning(teardown) => Phase::Exiting(Teardown::new(teardown.link, None, ticks)),
        };
        if matches!(next, Phase::Exiting(_)) && self.exit_reason.is_none() {
            self.exit_reason = Some(ExitReason::MenuExit);
        }
        self.enter(prev, next);
    }

    pub fn state(&self) -> SessionState {
        self.phase.state()
    }

    /// All zero unless running.
    pub fn network_stats(&self) -> NetworkStats {
        match &self.phase {
            Phase::Running(running) => running.stats(),
            _ => NetworkStats::default(),
        }
    }

    /// Thread-safe read handle, updated every `run`.
    pub fn monitor(&self) -> SessionMonitor {
        self.monitor.clone()
    }

    /// Why the most recent session ended (or is ending). Cleared by [`Self::begin`].
    pub fn exit_reason(&self) -> Option<ExitReason> {
        self.exit_reason
    }

    /// Next frame to simulate while running.
    pub fn current_frame(&self) -> Option<u32> {
        match &self.phase {
            Phase::Running(running) => Some(running.current_frame()),
            _ => None,
        }
    }

    fn enter(&mut self, prev: SessionState, next: Phase<S::Snapshot>) {
        let state = next.state();
        debug_assert!(
            prev.can_transition_to(state),
            "illegal transition {prev:?} -> {state:?}"
        );
        if prev != state {
            info!("Netplay session {:?} -> {:?}", prev, state);
        }
        self.phase = next;
        self.monitor.publish(
            state,
            self.current_frame().unwrap_or(0),
            self.network_stats(),
        );
    }
}
