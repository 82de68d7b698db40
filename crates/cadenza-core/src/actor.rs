//! Serializes all access to [`Core`] through one thread.
//!
//! Sessions hold cheap [`CoreHandle`] clones and submit closures; the actor
//! runs them one at a time in arrival order and, between jobs, ticks the
//! playback clock so tracks advance when they finish.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::engine::Core;
use crate::error::CoreError;

/// Interval between end-of-track checks when no job arrives.
pub const TICK_INTERVAL: Duration = Duration::from_millis(200);

type Job = Box<dyn FnOnce(&mut Core) + Send>;

enum Message {
    Run(Job),
    Shutdown,
}

/// Cloneable entry point into the core actor.
#[derive(Clone)]
pub struct CoreHandle {
    sender: Sender<Message>,
}

impl std::fmt::Debug for CoreHandle {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.debug_struct("CoreHandle").finish_non_exhaustive()
    }
}

impl CoreHandle {
    /// Runs `job` on the actor thread and waits for its result.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Unavailable`] when the actor has stopped, or
    /// when it panicked while running the job.
    pub fn call<R, F>(&self, job: F) -> Result<R, CoreError>
    where
        F: FnOnce(&mut Core) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (reply_tx, reply_rx) = mpsc::sync_channel(1);
        let wrapped: Job = Box::new(move |core| {
            if reply_tx.send(job(core)).is_err() {
                debug!(target: crate::CORE_TARGET, "caller went away before the reply");
            }
        });
        self.sender
            .send(Message::Run(wrapped))
            .map_err(|_| CoreError::Unavailable)?;
        reply_rx.recv().map_err(|_| CoreError::Unavailable)
    }
}

/// Owner of the actor thread.
#[derive(Debug)]
pub struct CoreActor {
    sender: Sender<Message>,
    thread: Option<JoinHandle<()>>,
}

impl CoreActor {
    /// Moves `core` onto a dedicated thread.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Spawn`] when the thread cannot be created.
    pub fn spawn(core: Core) -> Result<(Self, CoreHandle), CoreError> {
        let (sender, receiver) = mpsc::channel();
        let thread = thread::Builder::new()
            .name("cadenza-core".to_owned())
            .spawn(move || run(core, &receiver))
            .map_err(|source| CoreError::Spawn { source })?;
        let handle = CoreHandle {
            sender: sender.clone(),
        };
        Ok((
            Self {
                sender,
                thread: Some(thread),
            },
            handle,
        ))
    }

    /// Stops the actor after the jobs already queued and waits for it.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if self.sender.send(Message::Shutdown).is_err() {
            debug!(target: crate::CORE_TARGET, "core actor already stopped");
        }
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            warn!(target: crate::CORE_TARGET, "core actor panicked");
        }
    }
}

impl Drop for CoreActor {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(mut core: Core, receiver: &Receiver<Message>) {
    info!(target: crate::CORE_TARGET, "core actor started");
    loop {
        match receiver.recv_timeout(TICK_INTERVAL) {
            Ok(Message::Run(job)) => job(&mut core),
            Ok(Message::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }
        core.tick(Instant::now());
    }
    core.stop();
    info!(target: crate::CORE_TARGET, "core actor stopped");
}
