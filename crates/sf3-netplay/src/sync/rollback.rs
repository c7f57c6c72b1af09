//! Rollback synchronization.
//!
//! Predicts remote inputs (repeats last known input) and, when a confirmed
//! input contradicts a prediction that was already simulated, restores the
//! snapshot taken before that frame and resimulates up to the present.

use sf3_netproto::constants::{MAX_INPUT_WINDOW, PLAYER_COUNT};
use tracing::{debug, trace, warn};

use super::{
    history::{Confirmation, InputHistory},
    predictor::Predictor,
    snapshot::SnapshotArena,
};
use crate::{error::NetplayError, simulation::Simulation};

/// Ring size for both input histories.
///
/// Covers the rollback window behind the current frame plus a peer running up
/// to one window (and a full input packet) ahead of us.
fn history_capacity(input_delay: u32, max_rollback: u32) -> usize {
    (2 * max_rollback + input_delay) as usize + MAX_INPUT_WINDOW + 2
}

/// Input histories, predictor and snapshots for one running session.
#[derive(Debug)]
pub struct RollbackSync<T> {
    local_slot: usize,
    input_delay: u32,
    max_rollback: u32,
    local: InputHistory,
    remote: InputHistory,
    predictor: Predictor,
    snapshots: SnapshotArena<T>,
    /// Next frame to simulate; frames below it have been simulated.
    current_frame: u32,
    /// Next local frame to capture.
    next_local_frame: u32,
    /// Earliest frame whose simulated prediction turned out wrong.
    pending_rollback: Option<u32>,
}

impl<T> RollbackSync<T> {
    /// `local_slot` must be 0 or 1.
    ///
    /// Frames `0..input_delay` are pre-filled with neutral confirmed input for
    /// both players; the peer does the same since the delay is negotiated.
    pub fn new(local_slot: u8, input_delay: u8, max_rollback: u8) -> Self {
        let input_delay = input_delay as u32;
        let max_rollback = max_rollback.max(1) as u32;
        let capacity = history_capacity(input_delay, max_rollback);

        let mut sync = Self {
            local_slot: (local_slot as usize).min(PLAYER_COUNT - 1),
            input_delay,
            max_rollback,
            local: InputHistory::new(capacity),
            remote: InputHistory::new(capacity),
            predictor: Predictor::new(),
            snapshots: SnapshotArena::new(max_rollback as usize + 2),
            current_frame: 0,
            next_local_frame: input_delay,
            pending_rollback: None,
        };
        for frame in 0..input_delay {
            sync.local.confirm(frame, 0);
            sync.remote.confirm(frame, 0);
        }
        sync
    }

    pub fn current_frame(&self) -> u32 {
        self.current_frame
    }

    pub fn input_delay(&self) -> u32 {
        self.input_delay
    }

    pub fn max_rollback(&self) -> u32 {
        self.max_rollback
    }

    /// Every remote frame below this one is confirmed.
    pub fn remote_ack(&self) -> u32 {
        self.remote.first_unconfirmed()
    }

    pub fn pending_rollback(&self) -> Option<u32> {
        self.pending_rollback
    }

    pub fn local_history(&self) -> &InputHistory {
        &self.local
    }

    pub fn remote_history(&self) -> &InputHistory {
        &self.remote
    }

    /// Capture the local input for `current_frame + input_delay`.
    ///
    /// Returns the frame the input was scheduled for.
    pub fn add_local_input(&mut self, buttons: u16) -> u32 {
        let frame = self.next_local_frame;
        let capacity = self.local.capacity() as u32;
        self.local.purge_before((frame + 1).saturating_sub(capacity));

        let outcome = self.local.confirm(frame, buttons);
        if !outcome.newly_confirmed() {
            warn!("local input for frame {} not stored: {:?}", frame, outcome);
        }
        self.next_local_frame = frame + 1;
        frame
    }

    /// Apply a confirmed remote input.
    ///
    /// A contradicted prediction schedules a rollback, resolved by [`Self::resolve`].
    pub fn on_remote_input(&mut self, frame: u32, buttons: u16) -> Confirmation {
        let outcome = self.remote.confirm(frame, buttons);
        match outcome {
            Confirmation::Mispredicted { predicted } => {
                trace!(
                    "misprediction at frame {}: guessed {:#06x}, got {:#06x}",
                    frame, predicted, buttons
                );
                let target = match self.pending_rollback {
                    Some(pending) => pending.min(frame),
                    None => frame,
                };
                self.pending_rollback = Some(target);
            }
            Confirmation::Conflict { confirmed } => {
                warn!(
                    "peer resent frame {} as {:#06x}, keeping confirmed {:#06x}",
                    frame, buttons, confirmed
                );
            }
            Confirmation::OutOfRange => {
                trace!("remote frame {} outside history window", frame);
            }
            _ => {}
        }
        if outcome.newly_confirmed() {
            self.predictor.observe(frame, buttons);
        }
        outcome
    }

    /// Fail if simulating the current frame would put more predicted frames
    /// in flight than the rollback window can repair.
    pub fn check_window(&self) -> Result<(), NetplayError> {
        let oldest = self.remote.first_unconfirmed();
        if self.current_frame + 1 > oldest + self.max_rollback {
            return Err(NetplayError::RollbackWindowExceeded {
                oldest,
                current: self.current_frame,
            });
        }
        Ok(())
    }

    /// Execute a pending rollback, if any.
    ///
    /// Returns the number of frames resimulated (0 when nothing was mispredicted).
    pub fn resolve<S>(&mut self, sim: &mut S) -> Result<u32, NetplayError>
    where
        S: Simulation<Snapshot = T>,
    {
        let Some(target) = self.pending_rollback.take() else {
            return Ok(0);
        };
        if target >= self.current_frame {
            return Ok(0);
        }

        let snapshot = self
            .snapshots
            .get(target)
            .ok_or(NetplayError::MissingSnapshot(target))?;
        sim.restore(snapshot);

        for frame in target..self.current_frame {
            if frame != target {
                self.snapshots.save(frame, sim.snapshot());
            }
            let inputs = self.inputs_for(frame);
            sim.advance_frame(inputs);
        }

        let frames = self.current_frame - target;
        debug!("rolled back {} frames from frame {}", frames, target);
        Ok(frames)
    }

    /// Simulate the current frame with confirmed or predicted remote input.
    pub fn advance<S>(&mut self, sim: &mut S) -> Result<(), NetplayError>
    where
        S: Simulation<Snapshot = T>,
    {
        self.check_window()?;

        let frame = self.current_frame;
        self.snapshots.save(frame, sim.snapshot());
        let inputs = self.inputs_for(frame);
        sim.advance_frame(inputs);
        self.current_frame += 1;

        let keep_from = self.current_frame.saturating_sub(self.max_rollback);
        self.snapshots.discard_before(keep_from);
        self.remote.purge_before(keep_from);
        Ok(())
    }

    fn inputs_for(&mut self, frame: u32) -> [u16; PLAYER_COUNT] {
        let local = match self.local.get(frame) {
            Some(rec) => rec.buttons,
            None => {
                trace!("no local input for frame {}, using neutral", frame);
                0
            }
        };

        let remote = match self.remote.get(frame) {
            Some(rec) if rec.is_confirmed() => rec.buttons,
            _ => {
                let guess = self.predictor.predict(frame);
                self.remote.record_prediction(frame, guess.buttons);
                guess.buttons
            }
        };

        let mut inputs = [0u16; PLAYER_COUNT];
        inputs[self.local_slot] = local;
        inputs[PLAYER_COUNT - 1 - self.local_slot] = remote;
        inputs
    }

    /// Local frames to put in the next outbound packet.
    ///
    /// Covers everything from `peer_ack` on, and never less than the trailing
    /// `redundancy` frames, capped at one packet's worth.
    pub fn outbound_window(&self, peer_ack: u32, redundancy: u8) -> (u32, Vec<u16>) {
        let end = self.next_local_frame;
        let floor = end
            .saturating_sub(MAX_INPUT_WINDOW as u32)
            .max(self.local.oldest_frame());
        let start = peer_ack
            .min(end.saturating_sub(redundancy as u32))
            .max(floor);
        (start, self.local.buttons_in(start, end))
    }
}
