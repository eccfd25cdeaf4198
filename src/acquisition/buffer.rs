//! Bounded sliding window of sample pairs

use crate::types::Sample;
use std::collections::VecDeque;

/// Double-ended queue with FIFO eviction beyond a cap
///
/// Used for the pre-trigger lookback (cap `trace_size / 2`), for the
/// post-trigger fill (cap `trace_size`, grows until full) and for the XY
/// rolling window.
#[derive(Debug, Clone, Default)]
pub struct SlidingWindowBuffer {
    samples: VecDeque<Sample>,
    cap: usize,
}

impl SlidingWindowBuffer {
    /// Create an empty buffer holding at most `cap` samples
    pub fn new(cap: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(cap + 1),
            cap,
        }
    }

    /// Append a sample, evicting the oldest one when over the cap
    ///
    /// Returns the evicted sample, if any.
    pub fn push(&mut self, sample: Sample) -> Option<Sample> {
        self.samples.push_back(sample);
        if self.samples.len() > self.cap {
            self.samples.pop_front()
        } else {
            None
        }
    }

    /// Change the cap; excess samples are evicted from the front
    pub fn set_cap(&mut self, cap: usize) {
        self.cap = cap;
        while self.samples.len() > cap {
            self.samples.pop_front();
        }
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// True once the buffer holds `cap` samples
    pub fn is_full(&self) -> bool {
        self.samples.len() >= self.cap
    }

    /// Most recently pushed sample
    pub fn last(&self) -> Option<&Sample> {
        self.samples.back()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Oldest to newest
    pub fn iter(&self) -> std::collections::vec_deque::Iter<'_, Sample> {
        self.samples.iter()
    }
}
