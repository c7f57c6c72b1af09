//! Input synchronization for a running session.
//!
//! - [`history`]: per-player ring of confirmed/predicted frame inputs
//! - [`predictor`]: repeat-last-known guesses for unseen remote frames
//! - [`snapshot`]: snapshot arena covering the rollback window
//! - [`rollback`]: misprediction detection, restore and resimulation

pub mod history;
pub mod predictor;
pub mod rollback;
pub mod snapshot;

pub use history::{Confirmation, FrameInput, InputHistory, InputKind};
pub use predictor::Predictor;
pub use rollback::RollbackSync;
pub use snapshot::SnapshotArena;
