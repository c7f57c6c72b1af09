//! Lock-light view of a session for other threads (UI overlays, host menus).

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU32, Ordering};

use parking_lot::Mutex;

use crate::{state::SessionState, stats::NetworkStats};

#[derive(Debug, Default)]
struct Shared {
    state: AtomicU8,
    frame: AtomicU32,
    stats: Mutex<NetworkStats>,
}

/// Cloneable read handle onto a session's published state.
///
/// Values are published once per `run` and on every transition; readers never
/// block the tick loop for longer than a stats copy.
#[derive(Debug, Clone, Default)]
pub struct SessionMonitor {
    shared: Arc<Shared>,
}

impl SessionMonitor {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        SessionState::from_repr(self.shared.state.load(Ordering::Acquire)).unwrap_or_default()
    }

    /// All zero unless the session is running.
    pub fn network_stats(&self) -> NetworkStats {
        *self.shared.stats.lock()
    }

    /// Next frame the session will simulate; 0 outside `Running`.
    pub fn current_frame(&self) -> u32 {
        self.shared.frame.load(Ordering::Acquire)
    }

    pub(crate) fn publish(&self, state: SessionState, frame: u32, stats: NetworkStats) {
        *self.shared.stats.lock() = stats;
        self.shared.frame.store(frame, Ordering::Release);
        self.shared.state.store(state as u8, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn fresh_monitor_reads_idle_and_zero() {
        let monitor = SessionMonitor::new();
        assert_eq!(monitor.state(), SessionState::Idle);
        assert_eq!(monitor.network_stats(), NetworkStats::default());
    }

    #[test]
    fn published_values_are_visible_from_other_threads() {
        let monitor = SessionMonitor::new();
        let stats = NetworkStats {
            delay: 2,
            ping: 48,
            rollback: 3,
        };
        monitor.publish(SessionState::Running, 120, stats);

        let reader = monitor.clone();
        let seen = thread::spawn(move || (reader.state(), reader.current_frame(), reader.network_stats()))
            .join()
            .unwrap();
        assert_eq!(seen, (SessionState::Running, 120, stats));
    }
}
