//! Scene bundle common types.
//!
//! This crate provides foundational types shared across the scene bundle crates:
//! - Unified error type with stable codes and categories
//! - `OperationResult`, the status surfaced to callers of export/import
//! - Progress events and emitters for handing progress to a UI thread
//! - Cooperative cancellation token

pub mod cancel;
pub mod error;
pub mod progress;
pub mod result;

pub use cancel::{CancelReason, CancelToken};
pub use error::{Error, ErrorCategory, Result};
pub use progress::{EventBus, FnEmitter, JsonlWriter, NullEmitter, ProgressEmitter, ProgressEvent};
pub use result::OperationResult;
