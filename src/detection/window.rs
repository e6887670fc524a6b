//! Detection window: bounded FIFO of accepted events.
//!
//! ```text
//!   oldest ──▶ [d0][d1][d2] … [dN-1] ◀── newest (push)
//!              ▲
//!              └── evicted when full
//! ```
//!
//! The window is the only input of every downstream computation.

use std::collections::VecDeque;

use super::report::Detection;

#[derive(Debug, Clone)]
pub struct DetectionWindow {
    buf: VecDeque<Detection>,
    capacity: usize,
}

impl DetectionWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append, returning the evicted oldest entry if the window was full.
    pub fn push(&mut self, detection: Detection) -> Option<Detection> {
        let evicted = if self.buf.len() >= self.capacity {
            self.buf.pop_front()
        } else {
            None
        };
        self.buf.push_back(detection);
        evicted
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn newest(&self) -> Option<&Detection> {
        self.buf.back()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Detection> + ExactSizeIterator {
        self.buf.iter()
    }

    /// The newest `n` entries, oldest first.
    pub fn suffix(&self, n: usize) -> impl Iterator<Item = &Detection> {
        self.buf.iter().skip(self.buf.len().saturating_sub(n))
    }

    /// Contents as they would be after pushing `candidate`, oldest first.
    ///
    /// Used to plan a transition before anything is committed.
    pub fn with_candidate<'a>(&'a self, candidate: &'a Detection) -> Vec<&'a Detection> {
        let skip = usize::from(self.buf.len() >= self.capacity);
        self.buf
            .iter()
            .skip(skip)
            .chain(core::iter::once(candidate))
            .collect()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }
}
