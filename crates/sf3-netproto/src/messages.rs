use crate::{error::ProtoError, msg_id::MsgId};
use serde::de::DeserializeOwned;

pub mod handshake;
pub mod input;
pub mod sync;

/// A trait for all netplay protocol messages.
///
/// Each message type implements this trait to declare its associated `MsgId`,
/// enabling automatic header construction during encoding.
///
/// Implement it through the `impl_message!` macro rather than by hand.
pub trait Message: serde::Serialize + DeserializeOwned + Send + 'static {
    /// Returns the message identifier for this message type.
    fn msg_id() -> MsgId;

    /// Semantic checks run after a successful decode.
    fn validate(&self) -> Result<(), ProtoError> {
        Ok(())
    }
}

/// Bind message structs to their [`MsgId`], optionally with a `[validate_fn]`.
macro_rules! impl_message {
    ($($ty:ty => $id:ident $([$validate:path])?),* $(,)?) => {
        $(
            impl $crate::messages::Message for $ty {
                fn msg_id() -> $crate::msg_id::MsgId {
                    $crate::msg_id::MsgId::$id
                }

                $(
                    fn validate(&self) -> Result<(), $crate::error::ProtoError> {
                        $validate(self)
                    }
                )?
            }
        )*
    };
}

pub(crate) use impl_message;
