//! Fan-out of core events to every connected session.
//!
//! The broadcaster is the core's [`CoreListener`]. It runs on the actor
//! thread, so it only maps the event to an idle subsystem and queues it on
//! each session's input channel; the sessions decide what to push.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Mutex, PoisonError};

use cadenza_core::{CoreEvent, CoreListener};
use tracing::{debug, trace};

use crate::protocol::subsystem::Subsystem;
use crate::session::{SESSION_TARGET, SessionInput};

/// Registry of live sessions keyed by a process-unique id.
#[derive(Debug, Default)]
pub(crate) struct Broadcaster {
    next_id: AtomicU64,
    sessions: Mutex<HashMap<u64, Sender<SessionInput>>>,
}

impl Broadcaster {
    /// Adds a session and returns the id that removes it again.
    pub(crate) fn register(&self, sender: Sender<SessionInput>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().insert(id, sender);
        debug!(target: SESSION_TARGET, session = id, "session registered");
        id
    }

    pub(crate) fn unregister(&self, id: u64) {
        if self.lock().remove(&id).is_some() {
            debug!(target: SESSION_TARGET, session = id, "session unregistered");
        }
    }

    /// Number of sessions currently registered.
    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    fn publish(&self, subsystem: Subsystem) {
        let mut sessions = self.lock();
        sessions.retain(|id, sender| {
            let delivered = sender.send(SessionInput::Event(subsystem)).is_ok();
            if !delivered {
                trace!(target: SESSION_TARGET, session = *id, "dropping closed session");
            }
            delivered
        });
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<u64, Sender<SessionInput>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CoreListener for Broadcaster {
    fn on_event(&self, event: CoreEvent) {
        let Some(subsystem) = Subsystem::for_event(event) else {
            return;
        };
        trace!(target: SESSION_TARGET, %event, %subsystem, "broadcasting change");
        self.publish(subsystem);
    }
}
