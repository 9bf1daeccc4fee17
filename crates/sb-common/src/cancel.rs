//! Cooperative cancellation.
//!
//! A single atomic shared between the worker and any number of controlling
//! threads. Workers poll it at chunk and entry boundaries; nothing is ever
//! forcibly terminated.

use crate::Error;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

const RUNNING: u8 = 0;
const CANCELLED: u8 = 1;
const CALLER_DESTROYED: u8 = 2;

/// Why a run was interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// Explicit user cancellation.
    Cancelled,
    /// The owning context was torn down while the run was in flight.
    CallerDestroyed,
}

/// Shared cancellation flag. Cloning yields a handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    state: Arc<AtomicU8>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.state.fetch_max(CANCELLED, Ordering::SeqCst);
    }

    /// Signal that the owner no longer exists. Takes precedence over a plain
    /// cancellation.
    pub fn mark_caller_destroyed(&self) {
        self.state.fetch_max(CALLER_DESTROYED, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.load(Ordering::SeqCst) != RUNNING
    }

    pub fn reason(&self) -> Option<CancelReason> {
        match self.state.load(Ordering::SeqCst) {
            CANCELLED => Some(CancelReason::Cancelled),
            CALLER_DESTROYED => Some(CancelReason::CallerDestroyed),
            _ => None,
        }
    }

    /// Clear the flag before starting a new run.
    pub fn reset(&self) {
        self.state.store(RUNNING, Ordering::SeqCst);
    }

    /// Return the matching interruption error if the flag is set.
    pub fn check(&self) -> Result<(), Error> {
        match self.reason() {
            None => Ok(()),
            Some(reason) => Err(reason.into()),
        }
    }
}

impl From<CancelReason> for Error {
    fn from(reason: CancelReason) -> Self {
        match reason {
            CancelReason::Cancelled => Error::Cancelled,
            CancelReason::CallerDestroyed => Error::CallerDestroyed,
        }
    }
}
