//! Per-channel ring buffer holding recently produced samples.
//!
//! The buffer is tagged with the absolute index of its first held sample
//! (`base`). Consumers address samples by absolute index; the buffer frees
//! samples behind the slowest consumer's cursor on each sweep.

use crate::sample::{Sample, SampleIndex};

/// A growable window of recent samples for one frequency channel.
#[derive(Debug, Default)]
pub struct RingBuffer {
    base: SampleIndex,
    data: Vec<Sample>,
}

impl RingBuffer {
    pub fn new() -> Self {
        Self {
            base: 0,
            data: Vec::new(),
        }
    }

    /// Absolute index of the oldest sample still held.
    pub fn head_index(&self) -> SampleIndex {
        self.base
    }

    /// Absolute index one past the newest sample held (the write position).
    pub fn tail_index(&self) -> SampleIndex {
        self.base + self.data.len() as SampleIndex
    }

    /// Number of samples currently held.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Append samples produced at the current tail.
    pub fn append(&mut self, samples: &[Sample]) {
        self.data.extend_from_slice(samples);
    }

    /// Return the window of samples from absolute index `from` to the tail.
    ///
    /// `from` must lie within `[head_index(), tail_index()]`; a consumer
    /// whose cursor has fallen behind the head has violated the ring's
    /// "never drop before the slowest consumer" invariant, which is a
    /// scheduler bug rather than a recoverable condition.
    pub fn window_from(&self, from: SampleIndex) -> &[Sample] {
        assert!(
            from >= self.base,
            "window requested before ring head: from={}, base={}",
            from,
            self.base
        );
        let offset = (from - self.base) as usize;
        &self.data[offset.min(self.data.len())..]
    }

    /// Free samples older than `new_head`, advancing the ring's base index.
    pub fn advance_to(&mut self, new_head: SampleIndex) {
        assert!(
            new_head >= self.base,
            "ring head cannot move backwards: new_head={}, base={}",
            new_head,
            self.base
        );
        assert!(
            new_head <= self.tail_index(),
            "ring head cannot pass the tail: new_head={}, tail={}",
            new_head,
            self.tail_index()
        );
        let drop_count = (new_head - self.base) as usize;
        self.data.drain(0..drop_count);
        self.base = new_head;
    }
}
