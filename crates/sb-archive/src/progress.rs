//! Run context and dual progress accounting shared by writer and reader.

use sb_common::{CancelToken, NullEmitter, ProgressEmitter, ProgressEvent};
use std::sync::Arc;

/// Cancellation and progress plumbing for one archive operation.
#[derive(Clone)]
pub struct IoContext {
    pub cancel: CancelToken,
    pub emitter: Arc<dyn ProgressEmitter>,
}

impl Default for IoContext {
    fn default() -> Self {
        Self {
            cancel: CancelToken::new(),
            emitter: Arc::new(NullEmitter),
        }
    }
}

impl IoContext {
    pub fn new(cancel: CancelToken, emitter: Arc<dyn ProgressEmitter>) -> Self {
        Self { cancel, emitter }
    }

    pub(crate) fn check(&self) -> crate::Result<()> {
        match self.cancel.reason() {
            None => Ok(()),
            Some(reason) => Err(reason.into()),
        }
    }
}

/// Tracks bytes moved against a precomputed total.
///
/// Overall fractions are kept non-decreasing even if a source file changes
/// size between the stat pass and the read.
pub(crate) struct ProgressTracker {
    total: u64,
    done: u64,
    last_overall: f64,
    emitter: Arc<dyn ProgressEmitter>,
}

impl ProgressTracker {
    pub(crate) fn new(total: u64, emitter: Arc<dyn ProgressEmitter>) -> Self {
        Self {
            total,
            done: 0,
            last_overall: 0.0,
            emitter,
        }
    }

    /// Record `n` bytes for `name`, now at `entry_done` of `entry_len`.
    /// Returns the file fraction that was reported.
    pub(crate) fn advance(&mut self, name: &str, n: u64, entry_done: u64, entry_len: u64) -> f64 {
        self.done = self.done.saturating_add(n);
        let file_fraction = fraction(entry_done, entry_len);
        self.emitter.emit(ProgressEvent::file(name, file_fraction));
        self.emit_overall(fraction(self.done, self.total));
        file_fraction
    }

    /// Report an entry as fully processed without moving bytes.
    pub(crate) fn entry_complete(&mut self, name: &str) {
        self.emitter.emit(ProgressEvent::file(name, 1.0));
        self.emit_overall(fraction(self.done, self.total));
    }

    /// Final notification on success: overall reaches exactly 1.0.
    pub(crate) fn complete(&mut self) {
        self.last_overall = 1.0;
        self.emitter.emit(ProgressEvent::overall(1.0));
    }

    pub(crate) fn bytes_done(&self) -> u64 {
        self.done
    }

    fn emit_overall(&mut self, overall: f64) {
        let overall = overall.max(self.last_overall);
        self.last_overall = overall;
        self.emitter.emit(ProgressEvent::overall(overall));
    }
}

fn fraction(done: u64, total: u64) -> f64 {
    if total == 0 {
        return if done == 0 { 0.0 } else { 1.0 };
    }
    (done as f64 / total as f64).min(1.0)
}
