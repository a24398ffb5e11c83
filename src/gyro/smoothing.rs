//! Bounded circular history with incremental running sums

/// Fixed-window moving average over 3-axis samples.
///
/// Per-axis totals are maintained incrementally: a push subtracts the
/// value it evicts and adds the new one, so cost is constant regardless
/// of window size and must agree exactly with summing the stored slots.
///
/// The average always divides by the full window, including during
/// warm-up while zero-filled slots remain. That early low bias ramps the
/// output in from zero and is long-standing observable behavior; keep it.
#[derive(Debug, Clone)]
pub struct SmoothingBuffer {
    samples: Vec<[f32; 3]>,
    write_index: usize,
    totals: [f32; 3],
}

impl SmoothingBuffer {
    /// Allocates `window` zero-filled slots; floor of one slot.
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            samples: vec![[0.0; 3]; window],
            write_index: 0,
            totals: [0.0; 3],
        }
    }

    /// Stores `sample` over the oldest slot and returns the running
    /// average across the full window. No allocation.
    pub fn push(&mut self, sample: [f32; 3]) -> [f32; 3] {
        let evicted = self.samples[self.write_index];
        for axis in 0..3 {
            self.totals[axis] -= evicted[axis];
            self.totals[axis] += sample[axis];
        }
        self.samples[self.write_index] = sample;
        self.write_index = (self.write_index + 1) % self.samples.len();

        let window = self.samples.len() as f32;
        [
            self.totals[0] / window,
            self.totals[1] / window,
            self.totals[2] / window,
        ]
    }

    /// Zeroes every slot, the totals, and the write position.
    pub fn clear(&mut self) {
        for slot in &mut self.samples {
            *slot = [0.0; 3];
        }
        self.totals = [0.0; 3];
        self.write_index = 0;
    }

    pub fn window(&self) -> usize {
        self.samples.len()
    }
}
