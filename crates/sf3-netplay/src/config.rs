use std::net::{IpAddr, SocketAddr};

use serde::{Deserialize, Serialize};
use sf3_netproto::constants::MAX_INPUT_WINDOW;

use crate::error::NetplayError;

/// Largest accepted local input delay, in frames.
pub const MAX_INPUT_DELAY: u8 = 10;

/// Largest accepted rollback window, in frames.
///
/// Together with [`MAX_INPUT_DELAY`] this keeps every unacknowledged input
/// inside one `InputWindow`.
pub const MAX_ROLLBACK_FRAMES: u8 = 48;

/// Tunables for a netplay session.
///
/// All tick-based values count calls to `NetplaySession::run`, i.e. simulation
/// frames at the host's tick rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetplayConfig {
    /// Local input lag in frames. The session uses the larger of both peers' values.
    pub input_delay: u8,

    /// Maximum number of frames that may be predicted (and later resimulated).
    pub max_rollback_frames: u8,

    /// Minimum number of trailing local frames repeated in every input packet.
    pub redundancy_window: u8,

    /// Give up connecting after this many ticks without a completed handshake.
    pub handshake_timeout_ticks: u32,

    /// Resend `Hello` every N ticks while connecting.
    pub handshake_resend_ticks: u32,

    /// Send a ping every N ticks while running.
    pub ping_interval_ticks: u32,

    /// Weight of a new RTT sample in the moving average, in `(0, 1]`.
    pub ping_smoothing: f32,

    /// Ticks spent in `Exiting` repeating `Bye` before returning to idle.
    pub teardown_ticks: u32,

    /// Port used when the peer address is given without one.
    pub default_port: u16,

    /// Local address the UDP channel binds to.
    pub bind_addr: SocketAddr,
}

impl Default for NetplayConfig {
    fn default() -> Self {
        Self {
            input_delay: 2,
            max_rollback_frames: 12,
            redundancy_window: 8,
            handshake_timeout_ticks: 600, // 10 s at 60 Hz
            handshake_resend_ticks: 6,
            ping_interval_ticks: 30,
            ping_smoothing: 0.125,
            teardown_ticks: 3,
            default_port: 50_000,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 50_000)),
        }
    }
}

impl NetplayConfig {
    /// Clamp values into ranges the engine can honor.
    pub fn normalized(mut self) -> Self {
        self.input_delay = self.input_delay.min(MAX_INPUT_DELAY);
        self.max_rollback_frames = self.max_rollback_frames.clamp(1, MAX_ROLLBACK_FRAMES);
        self.redundancy_window = self.redundancy_window.clamp(1, MAX_INPUT_WINDOW as u8);
        self.handshake_timeout_ticks = self.handshake_timeout_ticks.max(1);
        self.handshake_resend_ticks = self.handshake_resend_ticks.max(1);
        self.ping_interval_ticks = self.ping_interval_ticks.max(1);
        self.teardown_ticks = self.teardown_ticks.max(1);
        if !(self.ping_smoothing > 0.0 && self.ping_smoothing <= 1.0) {
            self.ping_smoothing = Self::default().ping_smoothing;
        }
        self
    }

    /// Parse `"ip"` or `"ip:port"`, filling in [`Self::default_port`].
    pub fn peer_addr(&self, s: &str) -> Result<SocketAddr, NetplayError> {
        let s = s.trim();
        if let Ok(addr) = s.parse::<SocketAddr>() {
            return Ok(addr);
        }
        s.parse::<IpAddr>()
            .map(|ip| SocketAddr::new(ip, self.default_port))
            .map_err(|_| NetplayError::InvalidPeerAddress(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_repairs_degenerate_values() {
        let cfg = NetplayConfig {
            input_delay: 40,
            max_rollback_frames: 0,
            redundancy_window: 200,
            handshake_resend_ticks: 0,
            ping_interval_ticks: 0,
            ping_smoothing: f32::NAN,
            teardown_ticks: 0,
            ..Default::default()
        }
        .normalized();

        assert_eq!(cfg.input_delay, MAX_INPUT_DELAY);
        assert_eq!(cfg.max_rollback_frames, 1);
        assert_eq!(cfg.redundancy_window as usize, MAX_INPUT_WINDOW);
        assert_eq!(cfg.handshake_resend_ticks, 1);
        assert_eq!(cfg.ping_interval_ticks, 1);
        assert_eq!(cfg.ping_smoothing, 0.125);
        assert_eq!(cfg.teardown_ticks, 1);
    }

    #[test]
    fn unacked_inputs_fit_one_window() {
        let worst = MAX_ROLLBACK_FRAMES as usize + MAX_INPUT_DELAY as usize + 2;
        assert!(worst <= MAX_INPUT_WINDOW);
    }

    #[test]
    fn peer_addr_defaults_the_port() {
        let cfg = NetplayConfig::default();
        assert_eq!(
            cfg.peer_addr("192.168.1.20").unwrap(),
            SocketAddr::from(([192, 168, 1, 20], 50_000))
        );
        assert_eq!(
            cfg.peer_addr(" 10.0.0.5:7000 ").unwrap(),
            SocketAddr::from(([10, 0, 0, 5], 7000))
        );
        assert_eq!(cfg.peer_addr("[::1]:9").unwrap().port(), 9);
        assert!(matches!(
            cfg.peer_addr("not-an-address"),
            Err(NetplayError::InvalidPeerAddress(_))
        ));
        assert!(cfg.peer_addr("").is_err());
    }

    #[test]
    fn defaults_survive_normalization() {
        assert_eq!(NetplayConfig::default().normalized(), NetplayConfig::default());
    }
}
