use crate::hardware::Sample;
use std::collections::VecDeque;

// BUFFER COMPONENT ------------------------------------------------------------

/// Bounded rolling window of the most recent samples. Pure data structure:
/// `push` evicts the oldest entry past capacity, `latest` never blocks and
/// never errors, returning fewer samples than asked while the window fills.
///
/// Clearing the buffer is the detector's debounce: after an accepted
/// detection the slope window must re-accumulate before another peak can
/// qualify.
pub struct SampleBuffer {
    samples: VecDeque<Sample>,
    capacity: usize,
}

impl SampleBuffer {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "SampleBuffer capacity must be non-zero");
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, sample: Sample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// The `n` most recent samples in arrival order, or fewer if the window
    /// has not filled yet.
    pub fn latest(&self, n: usize) -> Vec<Sample> {
        let available = self.samples.len();
        let skip = available.saturating_sub(n);
        self.samples.iter().skip(skip).copied().collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}
