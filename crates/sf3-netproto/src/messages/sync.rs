use serde::{Deserialize, Serialize};

use super::impl_message;

/// Round-trip probe. `t_ms` is the sender's session clock.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ping {
    pub t_ms: u32,
}

/// Echo of a [`Ping`], carrying the original `t_ms` unchanged.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pong {
    pub t_ms: u32,
}

impl_message! {
    Ping => Ping,
    Pong => Pong,
}
