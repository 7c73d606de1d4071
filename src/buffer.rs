//! Fixed-window rolling average for sensor smoothing
//!
//! One instance tracks one quantity (a concentration, a temperature, a
//! particle bucket). The window is a ring buffer with a compile-time
//! capacity: once full, each new sample evicts the oldest, so the mean
//! always covers the most recent `N` samples with fixed memory and no
//! heap allocation.
//!
//! The mean is computed over the samples currently held; a partially
//! filled window is *not* extrapolated. After [`RollingAverage::reset`],
//! the next [`RollingAverage::reading`] returns the new sample itself.
//!
//! ## Memory layout
//!
//! ```text
//! RollingAverage<10>:
//! ┌─────┬─────┬─────┬───···───┬─────┐
//! │  0  │  1  │  2  │         │  9  │  ← f32 slots
//! └─────┴─────┴─────┴───···───┴─────┘
//!    ↑ write_pos wraps at N
//! Total size = 4 * N + 16 bytes (write_pos and len)
//! ```

/// Ring-buffered rolling mean over the last `N` samples.
///
/// ## Internal invariants
///
/// - `write_pos < N` (next write position is always valid)
/// - `len <= N` (never claim more samples than capacity)
#[derive(Debug, Clone)]
pub struct RollingAverage<const N: usize> {
    /// Sample storage; only the first `len` logical slots are valid
    data: [f32; N],

    /// Index where the next sample will be written, wraps at N
    write_pos: usize,

    /// Current number of valid samples, grows to N then stays
    len: usize,
}

impl<const N: usize> RollingAverage<N> {
    /// Create an empty window.
    pub const fn new() -> Self {
        Self {
            data: [0.0; N],
            write_pos: 0,
            len: 0,
        }
    }

    /// Append a sample (evicting the oldest when full) and return the
    /// mean of the window contents.
    pub fn reading(&mut self, sample: f32) -> f32 {
        self.data[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) % N;

        if self.len < N {
            self.len += 1;
        }

        // len >= 1 at this point, mean() cannot be None
        self.mean().unwrap_or(sample)
    }

    /// Mean of the samples currently held, `None` if the window is empty.
    pub fn mean(&self) -> Option<f32> {
        if self.len == 0 {
            return None;
        }

        let mut sum = 0.0;
        for i in 0..self.len {
            sum += self.data[i];
        }
        Some(sum / self.len as f32)
    }

    /// Empty the window. The next `reading()` returns its own sample.
    pub fn reset(&mut self) {
        self.write_pos = 0;
        self.len = 0;
    }

    /// Number of samples currently held.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the window holds no samples.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Check if the window is at capacity.
    pub fn is_full(&self) -> bool {
        self.len == N
    }
}

impl<const N: usize> Default for RollingAverage<N> {
    fn default() -> Self {
        Self::new()
    }
}
