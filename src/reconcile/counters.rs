use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Run-wide outcome counters, shared between the reconciler, the retry
/// executor and the progress reporter.
#[derive(Debug, Default)]
pub struct ReconciliationCounters {
    total_images: AtomicU64,
    renamed_images: AtomicU64,
    not_found_images: AtomicU64,
    retries_triggered: AtomicU64,
}

/// Point-in-time copy of [`ReconciliationCounters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub total_images: u64,
    pub renamed_images: u64,
    pub not_found_images: u64,
    pub retries_triggered: u64,
}

impl ReconciliationCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more image; returns the new total.
    pub fn record_image(&self) -> u64 {
        self.total_images.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn record_renamed(&self) {
        self.renamed_images.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_not_found(&self) {
        self.not_found_images.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retry(&self) {
        self.retries_triggered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            total_images: self.total_images.load(Ordering::Relaxed),
            renamed_images: self.renamed_images.load(Ordering::Relaxed),
            not_found_images: self.not_found_images.load(Ordering::Relaxed),
            retries_triggered: self.retries_triggered.load(Ordering::Relaxed),
        }
    }
}

impl CounterSnapshot {
    /// Images that had a matching identifier, whether or not they were renamed.
    pub fn matched_images(&self) -> u64 {
        self.total_images.saturating_sub(self.not_found_images)
    }
}

impl fmt::Display for CounterSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "total={} renamed={} not_found={} retries={}",
            self.total_images, self.renamed_images, self.not_found_images, self.retries_triggered
        )
    }
}
