//! Progress event emission.
//!
//! Archive I/O runs on a worker thread; progress must reach the owning UI or
//! context without calling into it directly. Emitters decouple the two:
//! [`EventBus`] hands events across an mpsc channel so the receiver drains
//! them on its own thread, [`JsonlWriter`] streams them for CLI consumers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::{mpsc, Arc, Mutex};

/// A single progress notification. Fractions are always in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// Progress through the entry currently being written or extracted.
    File { name: String, fraction: f64 },
    /// Progress across the whole archive.
    Overall { fraction: f64 },
}

impl ProgressEvent {
    pub fn file(name: impl Into<String>, fraction: f64) -> Self {
        ProgressEvent::File {
            name: name.into(),
            fraction: clamp_fraction(fraction),
        }
    }

    pub fn overall(fraction: f64) -> Self {
        ProgressEvent::Overall {
            fraction: clamp_fraction(fraction),
        }
    }

    pub fn fraction(&self) -> f64 {
        match self {
            ProgressEvent::File { fraction, .. } | ProgressEvent::Overall { fraction } => *fraction,
        }
    }

    pub fn to_jsonl(&self) -> String {
        let record = ProgressRecord {
            ts: Utc::now(),
            event: self,
        };
        serde_json::to_string(&record)
            .unwrap_or_else(|_| r#"{"error":"serialization_failed"}"#.to_string())
    }
}

#[derive(Serialize)]
struct ProgressRecord<'a> {
    ts: DateTime<Utc>,
    #[serde(flatten)]
    event: &'a ProgressEvent,
}

fn clamp_fraction(fraction: f64) -> f64 {
    if fraction.is_nan() {
        0.0
    } else {
        fraction.clamp(0.0, 1.0)
    }
}

/// Trait for receiving progress events from a worker.
pub trait ProgressEmitter: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEmitter;

impl ProgressEmitter for NullEmitter {
    fn emit(&self, _event: ProgressEvent) {}
}

/// Broadcast event bus supporting multiple subscribers.
///
/// Emission never blocks on a subscriber: events are queued on each
/// subscriber's channel and consumed on whichever thread owns the receiver.
#[derive(Debug, Default)]
pub struct EventBus {
    senders: Mutex<Vec<mpsc::Sender<ProgressEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to receive progress events.
    pub fn subscribe(&self) -> mpsc::Receiver<ProgressEvent> {
        let (tx, rx) = mpsc::channel();
        if let Ok(mut senders) = self.senders.lock() {
            senders.push(tx);
        }
        rx
    }

    /// Emit a progress event to all subscribers, dropping closed ones.
    pub fn emit(&self, event: ProgressEvent) {
        if let Ok(mut senders) = self.senders.lock() {
            senders.retain(|sender| sender.send(event.clone()).is_ok());
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.senders.lock().map(|s| s.len()).unwrap_or(0)
    }
}

impl ProgressEmitter for EventBus {
    fn emit(&self, event: ProgressEvent) {
        EventBus::emit(self, event);
    }
}

/// JSONL writer for progress events (CLI-friendly).
pub struct JsonlWriter<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonlWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }
}

impl<W: Write + Send> ProgressEmitter for JsonlWriter<W> {
    fn emit(&self, event: ProgressEvent) {
        let line = event.to_jsonl();
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{}", line);
        }
    }
}

/// Adapts a closure into an emitter.
///
/// The closure runs on the emitting thread; it must only enqueue work for
/// the UI, never touch it directly.
pub struct FnEmitter<F>(pub F)
where
    F: Fn(ProgressEvent) + Send + Sync;

impl<F> ProgressEmitter for FnEmitter<F>
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn emit(&self, event: ProgressEvent) {
        (self.0)(event);
    }
}
