//! Interface to the deterministic game simulation.

use sf3_netproto::constants::PLAYER_COUNT;

/// The game engine as seen by the rollback controller.
///
/// Implementations must be deterministic: restoring a snapshot and replaying
/// the same inputs has to reproduce bit-identical state, or peers drift apart.
pub trait Simulation {
    /// Complete, restorable capture of simulation state.
    type Snapshot;

    /// Step one frame. `inputs[slot]` is the bitmask for player `slot`.
    fn advance_frame(&mut self, inputs: [u16; PLAYER_COUNT]);

    /// Capture the state as it is before the next `advance_frame`.
    fn snapshot(&self) -> Self::Snapshot;

    /// Rewind to a previously captured state.
    fn restore(&mut self, snapshot: &Self::Snapshot);
}
