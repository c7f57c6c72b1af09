use serde::{Deserialize, Serialize};

use super::impl_message;

/// Session-start announcement, resent until the peer acknowledges it.
///
/// The sender's session nonce travels in the packet header.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hello {
    /// Which side of the match the sender controls (0 or 1).
    pub player_slot: u8,
    /// Sender's configured local input delay in frames.
    pub input_delay: u8,
    /// Sender's maximum rollback window in frames.
    pub max_rollback: u8,
}

/// Acknowledges a peer's [`Hello`] by echoing its header nonce.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct HelloAck {
    pub echo_nonce: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByeReason {
    /// The player backed out to the menu.
    MenuExit,
    /// The sender could not keep its simulation consistent.
    Desync,
    /// The handshake never completed.
    Timeout,
}

/// Sent repeatedly during teardown so the peer can leave promptly.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bye {
    pub reason: ByeReason,
}

impl_message! {
    Hello => Hello,
    HelloAck => HelloAck,
    Bye => Bye,
}
