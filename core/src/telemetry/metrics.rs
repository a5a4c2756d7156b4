use std::sync::{Mutex, MutexGuard};

/// Outcome counts of a batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Metrics {
    pub processed: usize,
    pub errors: usize,
}

/// Thread-safe [`Metrics`] shared by the workers of a batch.
///
/// Counters are plain integers, so a worker panicking mid-update cannot leave
/// them inconsistent and a poisoned lock is recovered.
#[derive(Default)]
pub struct MetricsRecorder {
    counts: Mutex<Metrics>,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn counts(&self) -> MutexGuard<'_, Metrics> {
        self.counts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn record_processed(&self) {
        self.counts().processed += 1;
    }

    pub fn record_error(&self) {
        self.counts().errors += 1;
    }

    pub fn snapshot(&self) -> Metrics {
        *self.counts()
    }
}
