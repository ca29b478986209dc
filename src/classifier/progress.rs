use std::time::Duration;

/// Cumulative progress after a batch completes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchProgress {
    /// 1-based index of the batch that just completed.
    pub batch: usize,
    pub total_batches: usize,
    /// Texts classified so far, including this batch.
    pub processed: usize,
    pub total: usize,
    /// Wall time since the first batch was sent.
    pub elapsed: Duration,
}

impl BatchProgress {
    /// Fraction of texts processed, in `0.0..=1.0`.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        self.processed as f64 / self.total as f64
    }

    /// Estimated time remaining: `elapsed * (1 / progress - 1)`.
    pub fn eta(&self) -> Duration {
        let fraction = self.fraction();
        if fraction <= 0.0 || fraction >= 1.0 {
            return Duration::ZERO;
        }
        self.elapsed.mul_f64(1.0 / fraction - 1.0)
    }

    pub fn is_complete(&self) -> bool {
        self.processed >= self.total
    }
}

/// Receives side-channel events from a classification run.
///
/// Neither method influences the returned data. Both default to doing nothing.
pub trait ProgressObserver {
    /// Called after every successful batch, in batch order.
    fn batch_completed(&self, _progress: &BatchProgress) {}

    /// Called at most once per session, the first time masking changes a text.
    fn identifiers_masked(&self) {}
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {}
