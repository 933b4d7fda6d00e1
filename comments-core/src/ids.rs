//! Session-local id sequences.

use std::cell::Cell;

/// Monotonically increasing id generator, starting at 1.
///
/// Owned explicitly by whoever allocates ids (normally `CommentApp`), so
/// independent apps and tests never share counters.
#[derive(Debug, Default)]
pub struct IdSequence {
    last: Cell<u64>,
}

impl IdSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next id.
    pub fn next(&self) -> u64 {
        let id = self.last.get() + 1;
        self.last.set(id);
        id
    }

    /// The id `next` would return, without consuming it.
    pub fn peek(&self) -> u64 {
        self.last.get() + 1
    }

    /// Restart the sequence so the next id is 1 again.
    pub fn reset(&self) {
        self.last.set(0);
    }

    /// Make sure ids handed out later never collide with `id`.
    pub fn observe(&self, id: u64) {
        if id > self.last.get() {
            self.last.set(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_starts_at_one_and_increments() {
        let ids = IdSequence::new();
        assert_eq!(ids.peek(), 1);
        assert_eq!(ids.next(), 1);
        assert_eq!(ids.next(), 2);
        assert_eq!(ids.peek(), 3);
    }

    #[test]
    fn reset_restarts_sequence() {
        let ids = IdSequence::new();
        ids.next();
        ids.next();
        ids.reset();
        assert_eq!(ids.next(), 1);
    }

    #[test]
    fn observe_skips_past_existing_ids() {
        let ids = IdSequence::new();
        ids.observe(7);
        assert_eq!(ids.next(), 8);
        ids.observe(3);
        assert_eq!(ids.next(), 9);
    }
}
