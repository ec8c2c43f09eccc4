//! Cooperative cancellation of the extraction engine.

use super::{builder_for, read_lines, write_grid_file};
use crate::extract::BatchTextExtractor;
use crate::progress::{CancellationToken, NullSink, ProgressSink};
use std::sync::atomic::{AtomicU64, Ordering};
use tempfile::TempDir;

/// Sink that cancels the token after a fixed number of progress updates,
/// simulating a user interrupt mid-file.
struct CancelAfter {
    token: CancellationToken,
    threshold: u64,
    seen: AtomicU64,
}

impl CancelAfter {
    fn new(token: CancellationToken, threshold: u64) -> Self {
        Self {
            token,
            threshold,
            seen: AtomicU64::new(0),
        }
    }
}

impl ProgressSink for CancelAfter {
    fn set_title(&self, _title: &str) {}
    fn set_message(&self, _message: &str) {}
    fn set_progress(&self, _completed: u64, _total: u64) {
        if self.seen.fetch_add(1, Ordering::SeqCst) + 1 == self.threshold {
            self.token.cancel();
        }
    }
}

#[test]
fn test_pre_cancelled_run_yields_no_report() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("grid.nc");
    write_grid_file(&source);

    let token = CancellationToken::new();
    token.cancel();
    let params = builder_for(&source).build().unwrap();
    let result = BatchTextExtractor::new(params)
        .run(&NullSink, &token)
        .unwrap();

    assert!(result.is_cancelled());
}

#[test]
fn test_cancellation_mid_file_leaves_only_whole_rows() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("grid.nc");
    write_grid_file(&source);

    let token = CancellationToken::new();
    // Past the preliminary phases and the header, somewhere inside the
    // row loop.
    let sink = CancelAfter::new(token.clone(), 14);
    let params = builder_for(&source).build().unwrap();
    let result = BatchTextExtractor::new(params).run(&sink, &token).unwrap();

    assert!(result.is_cancelled());
    let lines = read_lines(&dir.path().join("grid.txt"));
    // Fewer rows than a full run, and no torn row: every written line has
    // all four fields.
    assert!(lines.len() < 9);
    for line in &lines[1..] {
        assert_eq!(line.split(',').count(), 4, "torn row: {line}");
    }
}
