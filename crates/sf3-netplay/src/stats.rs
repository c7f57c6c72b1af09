//! Network statistics exposed to the UI.

use serde::Serialize;

/// Snapshot of the figures shown by the netstats overlay.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct NetworkStats {
    /// Negotiated local input lag in frames.
    pub delay: u32,
    /// Smoothed round-trip time to the peer in milliseconds.
    pub ping: u32,
    /// Frames resimulated by the most recent tick (0 if it did not roll back).
    pub rollback: u32,
}

/// Accumulates raw measurements and derives [`NetworkStats`].
#[derive(Debug, Clone)]
pub struct StatsAggregator {
    smoothing: f32,
    rtt_ms: Option<f32>,
    delay: u32,
    rollback: u32,
}

impl StatsAggregator {
    /// `smoothing` is the weight of each new RTT sample, in `(0, 1]`.
    pub fn new(smoothing: f32) -> Self {
        Self {
            smoothing: smoothing.clamp(f32::EPSILON, 1.0),
            rtt_ms: None,
            delay: 0,
            rollback: 0,
        }
    }

    pub fn set_delay(&mut self, frames: u32) {
        self.delay = frames;
    }

    /// Fold one round-trip sample into the exponential moving average.
    pub fn record_rtt(&mut self, sample_ms: u32) {
        let sample = sample_ms as f32;
        self.rtt_ms = Some(match self.rtt_ms {
            None => sample,
            Some(avg) => avg + self.smoothing * (sample - avg),
        });
    }

    /// Frames resimulated this tick. Overwrites the previous tick's value.
    pub fn record_rollback(&mut self, frames: u32) {
        self.rollback = frames;
    }

    pub fn snapshot(&self) -> NetworkStats {
        NetworkStats {
            delay: self.delay,
            ping: self.rtt_ms.map_or(0, |avg| avg.max(0.0).round() as u32),
            rollback: self.rollback,
        }
    }
}
