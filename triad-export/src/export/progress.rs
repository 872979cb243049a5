//! Progress reporting capability.
//!
//! Long-running export steps report progress through an injected
//! [`ProgressReporter`] instead of a process-wide console, so the library can
//! run silently in tests and behind any front end.

/// Receives progress for one task at a time.
pub trait ProgressReporter {
    /// Begin a task with a known amount of work.
    fn start(&mut self, label: &str, total: u64);

    /// Record `n` more units of completed work.
    fn advance(&mut self, n: u64);

    /// Mark the current task finished.
    fn finish(&mut self);
}

/// Discards all progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn start(&mut self, _label: &str, _total: u64) {}

    fn advance(&mut self, _n: u64) {}

    fn finish(&mut self) {}
}

impl<P: ProgressReporter + ?Sized> ProgressReporter for &mut P {
    fn start(&mut self, label: &str, total: u64) {
        (**self).start(label, total);
    }

    fn advance(&mut self, n: u64) {
        (**self).advance(n);
    }

    fn finish(&mut self) {
        (**self).finish();
    }
}

/// Records every call; used by tests to check what the exporter reports.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RecordingProgress {
    pub label: String,
    pub total: u64,
    pub advances: Vec<u64>,
    pub finished: bool,
}

impl RecordingProgress {
    /// Sum of all advances so far.
    pub fn position(&self) -> u64 {
        self.advances.iter().sum()
    }
}

impl ProgressReporter for RecordingProgress {
    fn start(&mut self, label: &str, total: u64) {
        self.label = label.to_string();
        self.total = total;
        self.advances.clear();
        self.finished = false;
    }

    fn advance(&mut self, n: u64) {
        self.advances.push(n);
    }

    fn finish(&mut self) {
        self.finished = true;
    }
}
