//! Single-slot coalescing buffer.

/// Holds at most one item; a newer item replaces the one waiting.
///
/// Producer and consumer run at different cadences. The producer writes
/// every computed result; the consumer only ever sees the latest one.
#[derive(Debug)]
pub struct CoalescingBuffer<T> {
    slot: Option<T>,
}

impl<T> Default for CoalescingBuffer<T> {
    fn default() -> Self {
        Self { slot: None }
    }
}

impl<T> CoalescingBuffer<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `item`; returns true if it replaced an undelivered item
    pub fn put(&mut self, item: T) -> bool {
        self.slot.replace(item).is_some()
    }

    /// Remove the waiting item
    pub fn take(&mut self) -> Option<T> {
        self.slot.take()
    }

    /// Drop the waiting item; returns true if there was one
    pub fn clear(&mut self) -> bool {
        self.slot.take().is_some()
    }

    pub fn peek(&self) -> Option<&T> {
        self.slot.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.slot.is_none()
    }
}
