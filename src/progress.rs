//! Extraction progress reporting
//!
//! Archive readers report work as byte deltas through a [`ProgressSink`]. The
//! [`ExtractionProgress`] sink turns those deltas into a cumulative counter that
//! never decreases and never passes the archive's payload size, then hands each
//! new value to an observer. Rendering lives entirely in the observer.

/// Receives byte deltas from an archive reader during extraction
pub trait ProgressSink {
    /// Record that `delta` more payload bytes were written
    fn advance(&mut self, delta: u64);
}

/// Cumulative progress for one extraction attempt
///
/// Created fresh for every archive set. The observer is called with
/// `(processed, total)` whenever `processed` changes.
pub struct ExtractionProgress<F> {
    processed: u64,
    total: u64,
    observer: F,
}

impl<F: FnMut(u64, u64)> ExtractionProgress<F> {
    /// Start at zero out of `total` bytes
    pub fn new(total: u64, observer: F) -> Self {
        Self {
            processed: 0,
            total,
            observer,
        }
    }

    /// Bytes processed so far, capped at [`total`](Self::total)
    pub fn processed(&self) -> u64 {
        self.processed
    }

    /// Payload size this attempt is measured against
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Whether the counter has reached the payload size
    pub fn is_complete(&self) -> bool {
        self.processed >= self.total
    }
}

impl<F: FnMut(u64, u64)> ProgressSink for ExtractionProgress<F> {
    fn advance(&mut self, delta: u64) {
        let next = self.processed.saturating_add(delta).min(self.total);
        if next != self.processed {
            self.processed = next;
            (self.observer)(self.processed, self.total);
        }
    }
}
