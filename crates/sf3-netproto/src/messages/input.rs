use serde::{Deserialize, Serialize};

use super::impl_message;
use crate::{constants::MAX_INPUT_WINDOW, error::ProtoError};

/// A run of consecutive local inputs, oldest first.
///
/// `buttons[i]` is the input for frame `base_frame + i`. Every packet repeats the
/// frames the receiver has not acknowledged yet, so a lost datagram is covered by
/// the next one.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct InputWindow {
    pub base_frame: u32,
    /// The sender has received every one of the receiver's frames below this.
    pub ack_frame: u32,
    pub buttons: Vec<u16>,
}

impl InputWindow {
    /// Iterate `(frame, buttons)` pairs carried by this window.
    pub fn frames(&self) -> impl Iterator<Item = (u32, u16)> + '_ {
        self.buttons
            .iter()
            .enumerate()
            .map(|(i, &b)| (self.base_frame.wrapping_add(i as u32), b))
    }
}

impl_message! {
    InputWindow => InputWindow [validate_window],
}

fn validate_window(w: &InputWindow) -> Result<(), ProtoError> {
    if w.buttons.len() > MAX_INPUT_WINDOW {
        return Err(ProtoError::InputWindowTooLong(w.buttons.len()));
    }
    Ok(())
}
