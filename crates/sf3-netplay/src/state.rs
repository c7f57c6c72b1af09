//! Observable session lifecycle states and the legal transitions between them.

use strum::FromRepr;

/// Netplay session state, as seen by the host loop and the UI.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, FromRepr)]
pub enum SessionState {
    /// No session.
    #[default]
    Idle = 0,
    /// Leaving the match mode because the peer went back to its menu.
    Transitioning = 1,
    /// Handshake with the peer in progress.
    Connecting = 2,
    /// Steady-state simulation with live synchronization.
    Running = 3,
    /// Teardown requested (menu exit, timeout or unrecoverable desync).
    Exiting = 4,
}

impl SessionState {
    pub const ALL: [SessionState; 5] = [
        SessionState::Idle,
        SessionState::Transitioning,
        SessionState::Connecting,
        SessionState::Running,
        SessionState::Exiting,
    ];

    /// Whether the transition table allows moving from `self` to `next`.
    ///
    /// Staying in the same state is always allowed.
    pub const fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        if self as u8 == next as u8 {
            return true;
        }
        matches!(
            (self, next),
            (Idle, Connecting)
                | (Idle, Exiting)
                | (Connecting, Running)
                | (Connecting, Exiting)
                | (Connecting, Transitioning)
                | (Running, Exiting)
                | (Running, Transitioning)
                | (Transitioning, Exiting)
                | (Transitioning, Idle)
                | (Exiting, Idle)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repr_round_trips_for_atomic_storage() {
        for state in SessionState::ALL {
            assert_eq!(SessionState::from_repr(state as u8), Some(state));
        }
        assert_eq!(SessionState::from_repr(5), None);
    }

    #[test]
    fn every_state_can_reach_idle() {
        // Breadth-first walk of the table from each state.
        for start in SessionState::ALL {
            let mut seen = vec![start];
            let mut frontier = vec![start];
            while let Some(s) = frontier.pop() {
                for next in SessionState::ALL {
                    if s.can_transition_to(next) && !seen.contains(&next) {
                        seen.push(next);
                        frontier.push(next);
                    }
                }
            }
            assert!(seen.contains(&SessionState::Idle), "{start:?} is stuck");
        }
    }

    #[test]
    fn idle_cannot_jump_to_running() {
        assert!(!SessionState::Idle.can_transition_to(SessionState::Running));
        assert!(!SessionState::Exiting.can_transition_to(SessionState::Running));
        assert!(!SessionState::Running.can_transition_to(SessionState::Connecting));
    }
}
