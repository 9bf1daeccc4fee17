//! Operation outcome surfaced to export/import callers.

use crate::Error;
use serde::{Deserialize, Serialize};

/// Final status of one export or import run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationResult {
    Success,
    /// Cancelled by the caller; safe to retry.
    Cancelled,
    /// The owning context went away mid-run.
    CallerDestroyed,
    /// The archive lacks a manifest or collection entry.
    InvalidBundle,
    Error,
}

impl OperationResult {
    pub fn is_success(self) -> bool {
        self == OperationResult::Success
    }
}

impl From<&Error> for OperationResult {
    fn from(err: &Error) -> Self {
        match err {
            Error::Cancelled => OperationResult::Cancelled,
            Error::CallerDestroyed => OperationResult::CallerDestroyed,
            Error::InvalidBundle(_) => OperationResult::InvalidBundle,
            _ => OperationResult::Error,
        }
    }
}

impl std::fmt::Display for OperationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OperationResult::Success => "success",
            OperationResult::Cancelled => "cancelled",
            OperationResult::CallerDestroyed => "caller_destroyed",
            OperationResult::InvalidBundle => "invalid_bundle",
            OperationResult::Error => "error",
        };
        write!(f, "{}", s)
    }
}
