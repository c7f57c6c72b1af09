use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtoError {
    #[error("bad magic")]
    BadMagic,
    #[error("unsupported version {0}")]
    UnsupportedVersion(u8),
    #[error("buffer too short")]
    TooShort,
    #[error("payload length mismatch")]
    LengthMismatch,
    #[error("payload too large: {0}")]
    PayloadTooLarge(usize),
    #[error("datagram too large: {0}")]
    DatagramTooLarge(usize),
    #[error("unknown msg id: {0}")]
    UnknownMsgId(u8),
    #[error("unexpected msg id: expected {expected:?}, got {got:?}")]
    UnexpectedMsgId {
        expected: crate::msg_id::MsgId,
        got: crate::msg_id::MsgId,
    },
    #[error("input window too long: {0}")]
    InputWindowTooLong(usize),
    #[error("postcard decode error: {0}")]
    Postcard(#[from] postcard::Error),
}
