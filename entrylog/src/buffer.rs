use std::sync::{Mutex, MutexGuard};

/// Unbounded multi-producer, single-consumer queue of pending events.
///
/// Producers push onto a shared `Vec`. The consumer swaps the whole `Vec` out
/// under the same lock, so an append racing a drain lands either in the
/// drained batch or in the fresh container, never in both. Nothing ever
/// iterates the shared container.
#[derive(Debug)]
pub struct EventBuffer<E> {
    pending: Mutex<Vec<E>>,
}

impl<E> EventBuffer<E> {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Insert at the tail. Never fails.
    pub fn append(&self, event: E) {
        self.lock().push(event);
    }

    /// Remove and return everything appended since the previous drain, in
    /// append order.
    pub fn drain_all(&self) -> Vec<E> {
        std::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // Neither push nor take can leave the Vec half-updated, so a poisoned
    // lock still guards consistent data.
    fn lock(&self) -> MutexGuard<'_, Vec<E>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<E> Default for EventBuffer<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "buffer_tests.rs"]
mod tests;
