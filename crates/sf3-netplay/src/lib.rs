//! Two-peer rollback netplay.
//!
//! The host owns a deterministic [`Simulation`] and calls
//! [`NetplaySession::run`] once per frame. The session handshakes with the
//! peer over a [`transport::PacketChannel`], exchanges redundant input
//! windows, predicts missing remote input and rewinds the simulation when a
//! prediction turns out wrong.
//!
//! # Architecture
//!
//! - [`session`]: phase machine and the host-facing handle
//! - [`sync`]: input histories, prediction, snapshots and rollback
//! - [`transport`]: UDP and in-memory packet channels
//! - [`monitor`]: cross-thread view of state and statistics
//! - [`config`], [`stats`], [`state`], [`error`]

pub mod config;
pub mod error;
mod handshake;
mod link;
pub mod monitor;
mod running;
pub mod session;
pub mod simulation;
pub mod state;
pub mod stats;
pub mod sync;
pub mod transport;

pub use config::NetplayConfig;
pub use error::NetplayError;
pub use monitor::SessionMonitor;
pub use session::{ExitReason, NetplaySession};
pub use sf3_netproto::constants::PLAYER_COUNT;
pub use simulation::Simulation;
pub use state::SessionState;
pub use stats::NetworkStats;
