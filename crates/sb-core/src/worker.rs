//! Background thread running one export or import.

use crate::orchestrator::{BundleOrchestrator, ExportReport, ExportRequest, ImportReport, ImportRequest};
use sb_common::{CancelToken, Error, Result};
use std::sync::Arc;
use std::thread;
use tracing::{debug, warn};

/// Handle to an export or import running on its own thread.
///
/// Dropping the handle without joining marks the run as caller-destroyed;
/// the worker stops at its next chunk or entry boundary.
pub struct BundleWorker<T: Send + 'static> {
    handle: Option<thread::JoinHandle<Result<T>>>,
    cancel: CancelToken,
}

impl BundleWorker<ExportReport> {
    pub fn spawn_export(
        orchestrator: Arc<BundleOrchestrator>,
        request: ExportRequest,
    ) -> Result<Self> {
        Self::spawn("sb-export", move |cancel| orchestrator.export(&request, cancel))
    }
}

impl BundleWorker<ImportReport> {
    pub fn spawn_import(
        orchestrator: Arc<BundleOrchestrator>,
        request: ImportRequest,
    ) -> Result<Self> {
        Self::spawn("sb-import", move |cancel| orchestrator.import(&request, cancel))
    }
}

impl<T: Send + 'static> BundleWorker<T> {
    fn spawn<F>(name: &str, run: F) -> Result<Self>
    where
        F: FnOnce(&CancelToken) -> Result<T> + Send + 'static,
    {
        let cancel = CancelToken::new();
        let worker_cancel = cancel.clone();
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || run(&worker_cancel))?;
        debug!(thread = name, "Worker started");
        Ok(Self {
            handle: Some(handle),
            cancel,
        })
    }

    /// Ask the worker to stop. The run ends with `Error::Cancelled`.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    /// Wait for the run to finish and return its outcome.
    pub fn join(mut self) -> Result<T> {
        let Some(handle) = self.handle.take() else {
            return Err(Error::CallerDestroyed);
        };
        handle.join().unwrap_or_else(|_| {
            Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "bundle worker panicked",
            )))
        })
    }
}

impl<T: Send + 'static> Drop for BundleWorker<T> {
    fn drop(&mut self) {
        if self.handle.take().is_some() {
            warn!("Worker handle dropped before completion; interrupting run");
            self.cancel.mark_caller_destroyed();
        }
    }
}
