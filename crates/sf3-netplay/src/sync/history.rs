//! Per-player input history.
//!
//! A fixed-capacity ring of [`FrameInput`] records indexed by `frame % capacity`.
//! The oldest retained frame only moves forward, and never past the first frame
//! that is still unconfirmed.

/// Whether a record came from its owning player or was guessed locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Confirmed,
    Predicted,
}

/// One player's input for one simulation frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInput {
    pub frame: u32,
    pub buttons: u16,
    pub kind: InputKind,
}

impl FrameInput {
    pub fn confirmed(frame: u32, buttons: u16) -> Self {
        Self {
            frame,
            buttons,
            kind: InputKind::Confirmed,
        }
    }

    pub fn predicted(frame: u32, buttons: u16) -> Self {
        Self {
            frame,
            buttons,
            kind: InputKind::Predicted,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.kind == InputKind::Confirmed
    }
}

/// Outcome of [`InputHistory::confirm`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// No record existed; stored as confirmed.
    Stored,
    /// The prediction was right; the record is now confirmed in place.
    Matched,
    /// The prediction was wrong; the record was replaced by the confirmed value.
    Mispredicted { predicted: u16 },
    /// Already confirmed with the same value.
    Duplicate,
    /// Already confirmed with a different value. The stored value is kept.
    Conflict { confirmed: u16 },
    /// Older than the oldest retained frame.
    Stale,
    /// Too far ahead to fit in the ring.
    OutOfRange,
}

impl Confirmation {
    /// True if this call turned a frame into a confirmed record.
    pub fn newly_confirmed(&self) -> bool {
        matches!(
            self,
            Confirmation::Stored | Confirmation::Matched | Confirmation::Mispredicted { .. }
        )
    }
}

#[derive(Debug)]
pub struct InputHistory {
    slots: Vec<Option<FrameInput>>,
    /// Oldest frame still retained.
    oldest: u32,
    /// Every frame below this one is confirmed.
    first_unconfirmed: u32,
}

impl InputHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity.max(1)],
            oldest: 0,
            first_unconfirmed: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn oldest_frame(&self) -> u32 {
        self.oldest
    }

    /// Every frame below the returned one has a confirmed record.
    pub fn first_unconfirmed(&self) -> u32 {
        self.first_unconfirmed
    }

    fn index(&self, frame: u32) -> usize {
        frame as usize % self.slots.len()
    }

    fn in_range(&self, frame: u32) -> bool {
        frame >= self.oldest && ((frame - self.oldest) as usize) < self.slots.len()
    }

    pub fn get(&self, frame: u32) -> Option<FrameInput> {
        if !self.in_range(frame) {
            return None;
        }
        self.slots[self.index(frame)].filter(|r| r.frame == frame)
    }

    /// Store an authoritative input for `frame`.
    ///
    /// A confirmed record is never modified afterwards.
    pub fn confirm(&mut self, frame: u32, buttons: u16) -> Confirmation {
        if frame < self.oldest {
            return Confirmation::Stale;
        }
        if !self.in_range(frame) {
            return Confirmation::OutOfRange;
        }

        let idx = self.index(frame);
        let outcome = match self.slots[idx].filter(|r| r.frame == frame) {
            None => Confirmation::Stored,
            Some(existing) if existing.is_confirmed() => {
                if existing.buttons == buttons {
                    Confirmation::Duplicate
                } else {
                    Confirmation::Conflict {
                        confirmed: existing.buttons,
                    }
                }
            }
            Some(existing) if existing.buttons == buttons => Confirmation::Matched,
            Some(existing) => Confirmation::Mispredicted {
                predicted: existing.buttons,
            },
        };

        if outcome.newly_confirmed() {
            self.slots[idx] = Some(FrameInput::confirmed(frame, buttons));
            self.advance_horizon();
        }
        outcome
    }

    /// Store a guessed input for `frame` unless a confirmed one is already there.
    ///
    /// Returns the record now in place.
    pub fn record_prediction(&mut self, frame: u32, buttons: u16) -> Option<FrameInput> {
        if !self.in_range(frame) {
            return None;
        }
        let idx = self.index(frame);
        match self.slots[idx] {
            Some(existing) if existing.frame == frame && existing.is_confirmed() => Some(existing),
            _ => {
                let rec = FrameInput::predicted(frame, buttons);
                self.slots[idx] = Some(rec);
                Some(rec)
            }
        }
    }

    fn advance_horizon(&mut self) {
        while self
            .get(self.first_unconfirmed)
            .is_some_and(|r| r.is_confirmed())
        {
            self.first_unconfirmed += 1;
        }
    }

    /// Drop records older than `frame`, but never past the confirmed horizon.
    ///
    /// Calls that would move the oldest frame backwards are ignored.
    pub fn purge_before(&mut self, frame: u32) {
        let target = frame.min(self.first_unconfirmed);
        if target <= self.oldest {
            return;
        }
        let span = ((target - self.oldest) as usize).min(self.slots.len());
        for i in 0..span {
            let f = self.oldest + i as u32;
            let idx = self.index(f);
            if self.slots[idx].is_some_and(|r| r.frame == f) {
                self.slots[idx] = None;
            }
        }
        self.oldest = target;
    }

    /// Buttons for the consecutive frames `start..end`, stopping at the first gap.
    pub fn buttons_in(&self, start: u32, end: u32) -> Vec<u16> {
        (start..end)
            .map_while(|f| self.get(f).map(|r| r.buttons))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirm_into_empty_slot_stores() {
        let mut h = InputHistory::new(8);
        assert_eq!(h.confirm(0, 0x10), Confirmation::Stored);
        assert_eq!(h.get(0), Some(FrameInput::confirmed(0, 0x10)));
        assert_eq!(h.first_unconfirmed(), 1);
    }

    #[test]
    fn prediction_then_confirmation() {
        let mut h = InputHistory::new(8);
        h.record_prediction(0, 0x01);
        h.record_prediction(1, 0x01);

        assert_eq!(h.confirm(0, 0x01), Confirmation::Matched);
        assert_eq!(
            h.confirm(1, 0x04),
            Confirmation::Mispredicted { predicted: 0x01 }
        );
        assert_eq!(h.get(1), Some(FrameInput::confirmed(1, 0x04)));
        assert_eq!(h.first_unconfirmed(), 2);
    }

    #[test]
    fn confirmed_records_are_immutable() {
        let mut h = InputHistory::new(8);
        h.confirm(3, 0xAA);
        assert_eq!(h.confirm(3, 0xAA), Confirmation::Duplicate);
        assert_eq!(
            h.confirm(3, 0xBB),
            Confirmation::Conflict { confirmed: 0xAA }
        );
        h.record_prediction(3, 0xCC);
        assert_eq!(h.get(3).map(|r| r.buttons), Some(0xAA));
    }

    #[test]
    fn horizon_stops_at_holes() {
        let mut h = InputHistory::new(8);
        h.confirm(0, 1);
        h.confirm(1, 1);
        h.confirm(3, 1);
        assert_eq!(h.first_unconfirmed(), 2);

        h.confirm(2, 1);
        assert_eq!(h.first_unconfirmed(), 4);
    }

    #[test]
    fn out_of_range_frames_are_rejected() {
        let mut h = InputHistory::new(4);
        assert_eq!(h.confirm(4, 1), Confirmation::OutOfRange);
        assert_eq!(h.get(4), None);
        assert!(h.record_prediction(4, 1).is_none());
    }

    #[test]
    fn purge_is_clamped_and_monotonic() {
        let mut h = InputHistory::new(8);
        for f in 0..4 {
            h.confirm(f, f as u16);
        }
        h.record_prediction(4, 9);

        // Cannot purge past the first unconfirmed frame.
        h.purge_before(6);
        assert_eq!(h.oldest_frame(), 4);
        assert_eq!(h.get(3), None);
        assert_eq!(h.confirm(2, 2), Confirmation::Stale);

        // Moving backwards is ignored.
        h.purge_before(1);
        assert_eq!(h.oldest_frame(), 4);
        assert!(h.get(4).is_some());
    }

    #[test]
    fn ring_reuses_slots_after_purge() {
        let mut h = InputHistory::new(4);
        for f in 0..4 {
            h.confirm(f, 1);
        }
        assert_eq!(h.confirm(4, 2), Confirmation::OutOfRange);

        h.purge_before(2);
        assert_eq!(h.confirm(4, 2), Confirmation::Stored);
        assert_eq!(h.confirm(5, 3), Confirmation::Stored);
        assert_eq!(h.buttons_in(2, 6), vec![1, 1, 2, 3]);
    }

    #[test]
    fn buttons_in_stops_at_gap() {
        let mut h = InputHistory::new(8);
        h.confirm(0, 5);
        h.confirm(1, 6);
        h.confirm(3, 8);
        assert_eq!(h.buttons_in(0, 4), vec![5, 6]);
    }
}
