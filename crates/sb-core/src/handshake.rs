//! Create/switch handshake with the host's asynchronous collection API.
//!
//! Each phase subscribes before issuing its request, blocks on a condition
//! variable until the matching notification or a failure notification
//! arrives (or the timeout elapses), then unsubscribes. The order is fixed:
//!
//! 1. back up the active collection file
//! 2. create the new collection, wait for `CollectionCreated`
//! 3. switch back to the prior collection, wait for `CollectionChanged`
//! 4. overwrite the new collection's file with the imported document
//! 5. switch to the new collection, wait for `CollectionChanged`
//!
//! The host saves the active collection when switching away, so the new file
//! is only written while another collection is active.

use crate::host::{FileSystem, HostEvent, SceneHost};
use crate::logging::{event_names, LogContext, Stage};
use parking_lot::{Condvar, Mutex};
use sb_common::{Error, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Steps of the import handshake, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakePhase {
    Backup,
    Create,
    SwitchToPrior,
    Overwrite,
    SwitchToNew,
}

impl std::fmt::Display for HandshakePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            HandshakePhase::Backup => "backup",
            HandshakePhase::Create => "create",
            HandshakePhase::SwitchToPrior => "switch_to_prior",
            HandshakePhase::Overwrite => "overwrite",
            HandshakePhase::SwitchToNew => "switch_to_new",
        };
        f.write_str(s)
    }
}

/// First notification seen for a request: success, or the host's reason.
#[derive(Default)]
struct Signal {
    outcome: Mutex<Option<std::result::Result<(), String>>>,
    cond: Condvar,
}

/// Subscribe, run `request`, and wait until an event satisfying `matches`
/// is dispatched. A [`HostEvent::RequestFailed`] for `target` ends the wait
/// with [`Error::Host`]. The subscription is always removed before returning.
pub fn request_and_wait<F>(
    host: &dyn SceneHost,
    phase: HandshakePhase,
    timeout: Duration,
    target: &str,
    request: impl FnOnce() -> Result<()>,
    matches: F,
) -> Result<()>
where
    F: Fn(&HostEvent) -> bool + Send + Sync + 'static,
{
    let signal = Arc::new(Signal::default());
    let listener_signal = signal.clone();
    let failed_target = target.to_string();
    let id = host.subscribe(Arc::new(move |event: &HostEvent| {
        let outcome = match event {
            HostEvent::RequestFailed { name, reason } if *name == failed_target => {
                Err(reason.clone())
            }
            _ if matches(event) => Ok(()),
            _ => return,
        };
        let mut slot = listener_signal.outcome.lock();
        if slot.is_none() {
            *slot = Some(outcome);
            listener_signal.cond.notify_all();
        }
    }));

    let result = request().and_then(|()| {
        let deadline = Instant::now() + timeout;
        let mut slot = signal.outcome.lock();
        while slot.is_none() {
            if signal.cond.wait_until(&mut slot, deadline).timed_out() {
                break;
            }
        }
        let outcome = slot.take();
        drop(slot);
        match outcome {
            Some(Ok(())) => Ok(()),
            Some(Err(reason)) => Err(Error::Host(format!(
                "{} request for {:?} failed: {}",
                phase, target, reason
            ))),
            None => Err(Error::HandshakeTimeout {
                phase: phase.to_string(),
                seconds: timeout.as_secs(),
            }),
        }
    });

    host.unsubscribe(id);
    result
}

/// Installs an imported document as a new host collection.
pub struct CollectionHandshake<'a> {
    host: &'a dyn SceneHost,
    fs: &'a dyn FileSystem,
    timeout: Duration,
    log: LogContext,
}

impl<'a> CollectionHandshake<'a> {
    pub fn new(host: &'a dyn SceneHost, fs: &'a dyn FileSystem, timeout: Duration) -> Self {
        Self {
            host,
            fs,
            timeout,
            log: LogContext::new(crate::logging::generate_run_id()),
        }
    }

    pub fn with_log_context(mut self, log: LogContext) -> Self {
        self.log = log;
        self
    }

    /// Run the full handshake.
    ///
    /// A failure during backup or creation leaves the prior collection
    /// active. Once creation succeeds the host has already activated the new,
    /// still empty collection, so a later failure may leave it active with
    /// its original contents.
    pub fn install(
        &self,
        prior: &str,
        new_name: &str,
        document: &[u8],
        backup_dir: &Path,
    ) -> Result<()> {
        self.phase(HandshakePhase::Backup, new_name);
        let prior_path = self.host.collection_path(prior)?;
        if self.fs.is_file(&prior_path) {
            self.fs.create_dir_all(backup_dir)?;
            self.fs
                .safe_copy(&prior_path, &backup_dir.join(format!("{}.json", prior)))?;
        } else {
            crate::log_event!(
                self.log,
                WARN,
                event_names::HANDSHAKE_PHASE,
                Stage::Handshake,
                "Active collection has no file to back up",
                prior = prior
            );
        }

        self.phase(HandshakePhase::Create, new_name);
        let created = new_name.to_string();
        request_and_wait(
            self.host,
            HandshakePhase::Create,
            self.timeout,
            new_name,
            || self.host.request_create_collection(new_name),
            move |e| matches!(e, HostEvent::CollectionCreated { name } if *name == created),
        )?;

        self.phase(HandshakePhase::SwitchToPrior, new_name);
        let expected = prior.to_string();
        request_and_wait(
            self.host,
            HandshakePhase::SwitchToPrior,
            self.timeout,
            prior,
            || self.host.request_switch_collection(prior),
            move |e| matches!(e, HostEvent::CollectionChanged { name } if *name == expected),
        )?;

        self.phase(HandshakePhase::Overwrite, new_name);
        let new_path = self.host.collection_path(new_name)?;
        self.fs.write_atomic(&new_path, document)?;

        self.phase(HandshakePhase::SwitchToNew, new_name);
        let expected = new_name.to_string();
        request_and_wait(
            self.host,
            HandshakePhase::SwitchToNew,
            self.timeout,
            new_name,
            || self.host.request_switch_collection(new_name),
            move |e| matches!(e, HostEvent::CollectionChanged { name } if *name == expected),
        )?;

        Ok(())
    }

    fn phase(&self, phase: HandshakePhase, collection: &str) {
        crate::log_event!(
            self.log,
            INFO,
            event_names::HANDSHAKE_PHASE,
            Stage::Handshake,
            "Handshake phase",
            phase = %phase,
            new_collection = collection
        );
    }
}
