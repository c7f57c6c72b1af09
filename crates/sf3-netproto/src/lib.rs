//! Wire protocol for two-peer rollback netplay.
//!
//! Every datagram is `[Header][postcard payload]`. The header is a fixed
//! little-endian layout (see [`header::Header`]); payloads are the message
//! structs in [`messages`], identified by [`msg_id::MsgId`].

pub mod codec;
pub mod constants;
pub mod error;
pub mod header;
pub mod messages;
pub mod msg_id;
pub mod packet;
