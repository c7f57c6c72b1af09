//! Snapshot arena for rollback synchronization.
//!
//! Snapshots live in indexed slots keyed by `frame % capacity`, so saving,
//! restoring and discarding a frame are O(1) slot operations.

/// Fixed set of snapshot slots covering the rollback window.
#[derive(Debug)]
pub struct SnapshotArena<T> {
    slots: Vec<Option<(u32, T)>>,
    /// Frames below this have been discarded.
    oldest: u32,
}

impl<T> SnapshotArena<T> {
    /// Create an arena holding up to `capacity` consecutive frames.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            oldest: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn index(&self, frame: u32) -> usize {
        frame as usize % self.slots.len()
    }

    /// Store the state captured before `frame` was simulated.
    ///
    /// Overwrites whatever occupied the slot (a stale copy of the same frame
    /// after a resimulation, or a frame that fell out of the window).
    pub fn save(&mut self, frame: u32, snapshot: T) {
        let idx = self.index(frame);
        self.slots[idx] = Some((frame, snapshot));
    }

    pub fn get(&self, frame: u32) -> Option<&T> {
        if frame < self.oldest {
            return None;
        }
        match &self.slots[self.index(frame)] {
            Some((f, snap)) if *f == frame => Some(snap),
            _ => None,
        }
    }

    /// Discard snapshots older than `frame`.
    pub fn discard_before(&mut self, frame: u32) {
        if frame <= self.oldest {
            return;
        }
        let span = ((frame - self.oldest) as usize).min(self.slots.len());
        for i in 0..span {
            let f = self.oldest + i as u32;
            let idx = self.index(f);
            if matches!(&self.slots[idx], Some((sf, _)) if *sf == f) {
                self.slots[idx] = None;
            }
        }
        self.oldest = frame;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arena_overwrites_wrapped_slots() {
        let mut arena = SnapshotArena::new(4);
        for f in 0..6 {
            arena.save(f, f * 10);
        }
        assert_eq!(arena.get(0), None);
        assert_eq!(arena.get(1), None);
        assert_eq!(arena.get(2), Some(&20));
        assert_eq!(arena.get(5), Some(&50));
    }

    #[test]
    fn resave_replaces_stale_copy() {
        let mut arena = SnapshotArena::new(4);
        arena.save(3, "before");
        arena.save(3, "after");
        assert_eq!(arena.get(3), Some(&"after"));
    }

    #[test]
    fn discard_before_drops_old_frames() {
        let mut arena = SnapshotArena::new(8);
        for f in 0..5 {
            arena.save(f, vec![f as u8]);
        }
        arena.discard_before(3);
        assert_eq!(arena.get(2), None);
        assert_eq!(arena.get(3), Some(&vec![3u8]));
        assert_eq!(arena.get(4), Some(&vec![4u8]));
    }
}
