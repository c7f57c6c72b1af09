use crate::{
    constants::{HEADER_LEN, MAX_UDP_PAYLOAD},
    error::ProtoError,
    header::Header,
    messages::Message,
    msg_id::MsgId,
    packet::PacketView,
};

/// Encode a message into a single datagram.
///
/// The header is constructed from `T::msg_id()`; `session` and `seq` are the
/// sender's nonce and packet counter.
pub fn encode_message<T: Message>(session: u32, seq: u32, payload: &T) -> Result<Vec<u8>, ProtoError> {
    let payload_bytes = postcard::to_stdvec(payload)?;
    if payload_bytes.len() > MAX_UDP_PAYLOAD {
        return Err(ProtoError::PayloadTooLarge(payload_bytes.len()));
    }

    let mut header = Header::new(T::msg_id() as u8);
    header.session = session;
    header.seq = seq;
    header.payload_len = payload_bytes.len() as u16;

    let mut out = Vec::with_capacity(HEADER_LEN + payload_bytes.len());
    let mut hbuf = [0u8; HEADER_LEN];
    header.encode_into(&mut hbuf);
    out.extend_from_slice(&hbuf);
    out.extend_from_slice(&payload_bytes);
    Ok(out)
}

/// Decode the header of a datagram and resolve its message id.
///
/// The payload is left undecoded; use [`PacketView::decode`].
pub fn decode_datagram(datagram: &[u8]) -> Result<PacketView<'_>, ProtoError> {
    if datagram.len() < HEADER_LEN {
        return Err(ProtoError::TooShort);
    }
    if datagram.len() > HEADER_LEN + MAX_UDP_PAYLOAD {
        return Err(ProtoError::DatagramTooLarge(datagram.len()));
    }

    let (h, payload) = Header::decode(datagram)?;
    let msg = MsgId::from_repr(h.msg_id).ok_or(ProtoError::UnknownMsgId(h.msg_id))?;
    Ok(PacketView::new(h, msg, payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::MAX_INPUT_WINDOW;
    use crate::messages::{
        handshake::{Bye, ByeReason, Hello},
        input::InputWindow,
        sync::Ping,
    };

    #[test]
    fn encoded_message_carries_header_fields() {
        let hello = Hello {
            player_slot: 1,
            input_delay: 2,
            max_rollback: 12,
        };
        let bytes = encode_message(0xDEAD_BEEF, 7, &hello).unwrap();

        let view = decode_datagram(&bytes).unwrap();
        assert_eq!(view.msg_id, MsgId::Hello);
        assert_eq!(view.header.session, 0xDEAD_BEEF);
        assert_eq!(view.header.seq, 7);
        assert_eq!(view.decode::<Hello>().unwrap(), hello);
    }

    #[test]
    fn decode_rejects_mismatched_message_type() {
        let bytes = encode_message(1, 1, &Ping { t_ms: 99 }).unwrap();
        let view = decode_datagram(&bytes).unwrap();
        assert!(matches!(
            view.decode::<Bye>(),
            Err(ProtoError::UnexpectedMsgId {
                expected: MsgId::Bye,
                got: MsgId::Ping
            })
        ));
    }

    #[test]
    fn unknown_msg_id_is_rejected() {
        let mut bytes = encode_message(
            1,
            1,
            &Bye {
                reason: ByeReason::MenuExit,
            },
        )
        .unwrap();
        bytes[3] = 0xEE;
        assert!(matches!(
            decode_datagram(&bytes),
            Err(ProtoError::UnknownMsgId(0xEE))
        ));
    }

    #[test]
    fn oversized_input_window_fails_validation() {
        let window = InputWindow {
            base_frame: 0,
            ack_frame: 0,
            buttons: vec![0; MAX_INPUT_WINDOW + 1],
        };
        let bytes = encode_message(1, 1, &window).unwrap();
        let view = decode_datagram(&bytes).unwrap();
        assert!(matches!(
            view.decode::<InputWindow>(),
            Err(ProtoError::InputWindowTooLong(n)) if n == MAX_INPUT_WINDOW + 1
        ));
    }

    #[test]
    fn truncated_payload_is_an_error() {
        let bytes = encode_message(
            1,
            1,
            &InputWindow {
                base_frame: 300,
                ack_frame: 280,
                buttons: vec![0x0F; 8],
            },
        )
        .unwrap();
        assert!(decode_datagram(&bytes[..bytes.len() - 2]).is_err());
    }
}
