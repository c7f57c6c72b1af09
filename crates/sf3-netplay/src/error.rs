//! Netplay error types.
//!
//! These never cross the public session boundary: `NetplaySession::run` turns
//! them into state transitions and an [`ExitReason`](crate::session::ExitReason).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NetplayError {
    #[error("invalid peer address: {0}")]
    InvalidPeerAddress(String),

    #[error("invalid player slot: {0}")]
    InvalidPlayerSlot(u8),

    #[error("packet channel unavailable: {0}")]
    ChannelUnavailable(String),

    #[error("protocol error: {0}")]
    Protocol(#[from] sf3_netproto::error::ProtoError),

    #[error("handshake timed out after {0} ticks")]
    HandshakeTimeout(u32),

    #[error("peer claims player slot {0}, which is ours")]
    SlotConflict(u8),

    #[error("unconfirmed remote frames since {oldest} exceed the rollback window at frame {current}")]
    RollbackWindowExceeded { oldest: u32, current: u32 },

    #[error("no snapshot retained for frame {0}")]
    MissingSnapshot(u32),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
