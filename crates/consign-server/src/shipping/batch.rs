//! Batch flush policy for combined shipments.
//!
//! Accumulated shipments are flushed when:
//! - The number of orders processed since the last flush reaches the batch size
//! - The caller ends the stream (handled by the session, regardless of count)

use std::num::NonZeroUsize;

/// Default batch-size threshold.
pub const DEFAULT_BATCH_SIZE: NonZeroUsize = match NonZeroUsize::new(3) {
    Some(size) => size,
    None => unreachable!(),
};

/// Configuration for shipment batching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    /// Number of processed orders that triggers a flush
    pub batch_size: NonZeroUsize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl BatchConfig {
    /// Create a BatchConfig from the application config value.
    pub fn from_config(batch_size: NonZeroUsize) -> Self {
        Self { batch_size }
    }

    /// Whether a counter value (after increment) triggers a flush.
    pub fn should_flush(&self, counter: usize) -> bool {
        should_flush(counter, self.batch_size.get())
    }
}

/// Flush decision: true exactly when the counter reaches the threshold.
pub fn should_flush(counter: usize, threshold: usize) -> bool {
    counter == threshold
}

/// Orders processed since the last flush.
///
/// Stays in `0..batch_size`; reaching the batch size resets it to zero and
/// reports the flush.
#[derive(Debug)]
pub struct BatchCounter {
    config: BatchConfig,
    count: usize,
}

impl BatchCounter {
    /// Create a counter starting at zero.
    pub fn new(config: BatchConfig) -> Self {
        Self { config, count: 0 }
    }

    /// Count one processed order.
    ///
    /// Returns true if the batch is now due; the counter is reset in that case.
    pub fn increment(&mut self) -> bool {
        self.count += 1;
        if self.config.should_flush(self.count) {
            self.count = 0;
            return true;
        }
        false
    }

    /// Current count since the last flush.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Reset to zero without flushing.
    pub fn reset(&mut self) {
        self.count = 0;
    }
}
