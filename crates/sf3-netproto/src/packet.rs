use crate::{error::ProtoError, header::Header, messages::Message, msg_id::MsgId};

/// A decoded datagram borrowing its payload from the receive buffer.
#[derive(Debug, Clone, Copy)]
pub struct PacketView<'a> {
    pub header: Header,
    pub msg_id: MsgId,
    pub payload: &'a [u8],
}

impl<'a> PacketView<'a> {
    pub fn new(header: Header, msg_id: MsgId, payload: &'a [u8]) -> Self {
        Self {
            header,
            msg_id,
            payload,
        }
    }

    /// Decode the payload as message `T`, checking that the header carries `T`'s id.
    pub fn decode<T: Message>(&self) -> Result<T, ProtoError> {
        if self.msg_id != T::msg_id() {
            return Err(ProtoError::UnexpectedMsgId {
                expected: T::msg_id(),
                got: self.msg_id,
            });
        }
        let msg: T = postcard::from_bytes(self.payload)?;
        msg.validate()?;
        Ok(msg)
    }
}
