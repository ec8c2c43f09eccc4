//! Caller-facing progress and cancellation surface.
//!
//! Long-running operations (scan, text extraction, raster rendering) report a
//! title, a message and a fractional progress value through a [`ProgressSink`],
//! and observe a [`CancellationToken`] before every discrete sub-step. The CLI
//! bridges the sink onto an indicatif bar; library callers can supply their
//! own sink or [`NullSink`].

pub use tokio_util::sync::CancellationToken;

/// Outcome of a cancellable operation.
///
/// Cancellation is not an error: a cancelled task yields no result and the
/// caller must treat this distinctly from an empty result.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion<T> {
    Done(T),
    Cancelled,
}

impl<T> Completion<T> {
    /// Returns the result value, or `None` if the operation was cancelled.
    pub fn into_done(self) -> Option<T> {
        match self {
            Completion::Done(value) => Some(value),
            Completion::Cancelled => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Completion::Cancelled)
    }
}

/// Receiver for progress updates from a background operation.
///
/// Implementations must tolerate frequent calls; the row loop updates once per
/// emitted column.
pub trait ProgressSink: Send + Sync {
    /// Describes the overall operation, e.g. `"file 2/5: sst_2020.nc"`.
    fn set_title(&self, title: &str);

    /// Describes the current sub-phase, e.g. `"Row 128/4096"`.
    fn set_message(&self, message: &str);

    /// Fraction in `[0, 1]`; implementations may round for display.
    fn set_progress(&self, completed: u64, total: u64);
}

/// Sink that discards all updates.
pub struct NullSink;

impl ProgressSink for NullSink {
    fn set_title(&self, _title: &str) {}
    fn set_message(&self, _message: &str) {}
    fn set_progress(&self, _completed: u64, _total: u64) {}
}

/// Step counter shared by the engines.
///
/// Tracks `completed/total` and forwards every change to the sink. The total
/// is recomputed once per file, after dimension and variable discovery.
pub struct ProgressTracker<'a> {
    sink: &'a dyn ProgressSink,
    completed: u64,
    total: u64,
}

impl<'a> ProgressTracker<'a> {
    pub fn new(sink: &'a dyn ProgressSink) -> Self {
        Self {
            sink,
            completed: 0,
            total: 100,
        }
    }

    /// Start a fresh counting phase with the given total.
    ///
    /// The completed count restarts at zero, so per-file totals never bleed
    /// into the next file of a batch.
    pub fn set_total(&mut self, total: u64) {
        self.completed = 0;
        self.total = total.max(1);
        self.sink.set_progress(self.completed, self.total);
    }

    pub fn step(&mut self) {
        self.completed += 1;
        self.sink.set_progress(self.completed, self.total);
    }

    pub fn title(&self, title: &str) {
        self.sink.set_title(title);
    }

    pub fn message(&self, message: &str) {
        self.sink.set_message(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        updates: Mutex<Vec<(u64, u64)>>,
    }

    impl ProgressSink for RecordingSink {
        fn set_title(&self, _title: &str) {}
        fn set_message(&self, _message: &str) {}
        fn set_progress(&self, completed: u64, total: u64) {
            self.updates.lock().unwrap().push((completed, total));
        }
    }

    #[test]
    fn test_tracker_is_monotonic() {
        let sink = RecordingSink::default();
        let mut tracker = ProgressTracker::new(&sink);
        tracker.set_total(10);
        tracker.step();
        tracker.step();

        let updates = sink.updates.lock().unwrap();
        assert_eq!(updates.as_slice(), &[(0, 10), (1, 10), (2, 10)]);
    }

    #[test]
    fn test_new_total_restarts_the_count() {
        let sink = RecordingSink::default();
        let mut tracker = ProgressTracker::new(&sink);
        tracker.set_total(4);
        tracker.step();
        tracker.set_total(8);
        tracker.step();

        let updates = sink.updates.lock().unwrap();
        assert_eq!(updates.as_slice(), &[(0, 4), (1, 4), (0, 8), (1, 8)]);
    }

    #[test]
    fn test_completion_accessors() {
        let done: Completion<u32> = Completion::Done(7);
        assert_eq!(done.into_done(), Some(7));

        let cancelled: Completion<u32> = Completion::Cancelled;
        assert!(cancelled.is_cancelled());
        assert_eq!(cancelled.into_done(), None);
    }
}
