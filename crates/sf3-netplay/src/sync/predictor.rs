//! Remote input prediction.

use super::history::FrameInput;

/// Repeat-last-known predictor.
///
/// Guesses that the remote player keeps holding whatever the most recent
/// confirmed input (highest frame number seen so far) was. Before any remote
/// input arrives it predicts a neutral (zero) bitmask.
#[derive(Debug, Default, Clone)]
pub struct Predictor {
    last_known: Option<(u32, u16)>,
}

impl Predictor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a confirmed remote input. Older frames than the latest seen are ignored.
    pub fn observe(&mut self, frame: u32, buttons: u16) {
        match self.last_known {
            Some((latest, _)) if frame < latest => {}
            _ => self.last_known = Some((frame, buttons)),
        }
    }

    pub fn predict(&self, frame: u32) -> FrameInput {
        let buttons = self.last_known.map_or(0, |(_, b)| b);
        FrameInput::predicted(frame, buttons)
    }
}
