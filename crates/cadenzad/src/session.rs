//! One MPD client connection from greeting to close.
//!
//! Every session runs two threads. A reader turns the socket into
//! [`SessionInput::Line`]s; the session thread owns the [`Dispatcher`] and
//! consumes a single channel that carries both those lines and the idle
//! events queued by the [`Broadcaster`]. Responses and idle notifications are
//! therefore written by one thread, in the order they were produced.

use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cadenza_config::Config;
use cadenza_core::CoreHandle;
use tracing::{debug, info, warn};

use crate::broadcaster::Broadcaster;
use crate::protocol::dispatcher::{DispatchSettings, Dispatcher};
use crate::protocol::registry::Registry;
use crate::protocol::subsystem::Subsystem;
use crate::transport::{ConnectionHandler, ConnectionStream};

/// Tracing target for connection lifecycle events.
pub(crate) const SESSION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::session");

/// First line written to every client.
pub(crate) const GREETING: &str = "OK MPD 0.19.0";

/// Longest request line accepted, terminator included.
pub(crate) const MAX_LINE_BYTES: usize = 64 * 1024;

const READ_CHUNK: usize = 4096;

/// Everything the session thread reacts to.
#[derive(Debug)]
pub(crate) enum SessionInput {
    /// A complete request line without its terminator.
    Line(String),
    /// A subsystem changed somewhere in the core.
    Event(Subsystem),
    /// Nothing arrived within the connection timeout.
    TimedOut,
    /// The client went away or sent something unreadable.
    Closed,
}

/// Connection limits taken from the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SessionLimits {
    pub(crate) max_connections: usize,
    pub(crate) timeout: Option<Duration>,
}

impl SessionLimits {
    pub(crate) fn from_config(config: &Config) -> Self {
        Self {
            max_connections: config.max_connections,
            timeout: config.connection_timeout(),
        }
    }
}

/// [`ConnectionHandler`] that speaks MPD.
pub(crate) struct MpdConnectionHandler {
    core: CoreHandle,
    settings: Arc<DispatchSettings>,
    registry: &'static Registry,
    broadcaster: Arc<Broadcaster>,
    limits: SessionLimits,
    active: AtomicUsize,
}

impl MpdConnectionHandler {
    pub(crate) fn new(
        core: CoreHandle,
        settings: DispatchSettings,
        registry: &'static Registry,
        broadcaster: Arc<Broadcaster>,
        limits: SessionLimits,
    ) -> Self {
        Self {
            core,
            settings: Arc::new(settings),
            registry,
            broadcaster,
            limits,
            active: AtomicUsize::new(0),
        }
    }

    fn serve(&self, mut stream: ConnectionStream) -> io::Result<()> {
        let reader = stream.try_clone()?;
        reader.set_read_timeout(self.limits.timeout)?;

        let (sender, receiver) = mpsc::channel();
        let registration = Registration {
            broadcaster: &self.broadcaster,
            id: self.broadcaster.register(sender.clone()),
        };
        let pump = thread::Builder::new()
            .name("cadenza-reader".to_owned())
            .spawn(move || pump_lines(LineReader::new(reader), &sender))?;

        let result = self.converse(&mut stream, &receiver, registration.id);

        if let Err(error) = stream.shutdown() {
            debug!(target: SESSION_TARGET, %error, "socket already closed");
        }
        drop(registration);
        if pump.join().is_err() {
            warn!(target: SESSION_TARGET, "reader thread panicked");
        }
        result
    }

    fn converse(
        &self,
        stream: &mut ConnectionStream,
        inputs: &mpsc::Receiver<SessionInput>,
        id: u64,
    ) -> io::Result<()> {
        write_lines(stream, &[GREETING.to_owned()])?;
        let mut dispatcher =
            Dispatcher::new(self.core.clone(), Arc::clone(&self.settings), self.registry);
        while let Ok(input) = inputs.recv() {
            match input {
                SessionInput::Line(line) => {
                    let response = dispatcher.handle_request(&line);
                    if dispatcher.is_closing() {
                        debug!(target: SESSION_TARGET, session = id, "client asked to close");
                        break;
                    }
                    write_lines(stream, &response)?;
                }
                SessionInput::Event(subsystem) => {
                    let notification = dispatcher.handle_idle(subsystem);
                    write_lines(stream, &notification)?;
                }
                SessionInput::TimedOut if dispatcher.is_idling() => {}
                SessionInput::TimedOut => {
                    info!(target: SESSION_TARGET, session = id, "connection timed out");
                    break;
                }
                SessionInput::Closed => break,
            }
        }
        Ok(())
    }
}

impl ConnectionHandler for MpdConnectionHandler {
    fn handle(&self, stream: ConnectionStream) {
        let peer = stream.peer();
        let slot = ConnectionSlot::claim(&self.active);
        if slot.position >= self.limits.max_connections {
            warn!(
                target: SESSION_TARGET,
                peer = %peer,
                limit = self.limits.max_connections,
                "too many connections; closing"
            );
            if let Err(error) = stream.shutdown() {
                debug!(target: SESSION_TARGET, %error, "socket already closed");
            }
            return;
        }
        info!(
            target: SESSION_TARGET,
            peer = %peer,
            sessions = self.broadcaster.len() + 1,
            "client connected"
        );
        if let Err(error) = self.serve(stream) {
            debug!(target: SESSION_TARGET, peer = %peer, %error, "connection ended with an error");
        }
        info!(target: SESSION_TARGET, peer = %peer, "client disconnected");
    }
}

/// Counts one live connection until dropped.
struct ConnectionSlot<'a> {
    active: &'a AtomicUsize,
    /// Connections already open when this one arrived.
    position: usize,
}

impl<'a> ConnectionSlot<'a> {
    fn claim(active: &'a AtomicUsize) -> Self {
        let position = active.fetch_add(1, Ordering::SeqCst);
        Self { active, position }
    }
}

impl Drop for ConnectionSlot<'_> {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Keeps a session subscribed to core events until dropped.
struct Registration<'a> {
    broadcaster: &'a Broadcaster,
    id: u64,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.broadcaster.unregister(self.id);
    }
}

fn write_lines(stream: &mut impl Write, lines: &[String]) -> io::Result<()> {
    if lines.is_empty() {
        return Ok(());
    }
    let mut payload = String::new();
    for line in lines {
        payload.push_str(line);
        payload.push('\n');
    }
    stream.write_all(payload.as_bytes())?;
    stream.flush()
}

fn pump_lines<R: Read>(mut reader: LineReader<R>, sender: &Sender<SessionInput>) {
    loop {
        let input = match reader.next_line() {
            ReadOutcome::Line(line) => SessionInput::Line(line),
            ReadOutcome::TimedOut => SessionInput::TimedOut,
            ReadOutcome::Closed => SessionInput::Closed,
            ReadOutcome::Rejected(reason) => {
                warn!(target: SESSION_TARGET, reason, "closing connection");
                SessionInput::Closed
            }
        };
        let finished = matches!(input, SessionInput::Closed);
        if sender.send(input).is_err() || finished {
            return;
        }
    }
}

/// Result of waiting for the next request line.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ReadOutcome {
    Line(String),
    TimedOut,
    Closed,
    Rejected(&'static str),
}

/// Splits a byte stream into `\n`-terminated lines, keeping partial input
/// across read timeouts.
pub(crate) struct LineReader<R> {
    stream: R,
    buffer: Vec<u8>,
}

impl<R: Read> LineReader<R> {
    pub(crate) const fn new(stream: R) -> Self {
        Self {
            stream,
            buffer: Vec::new(),
        }
    }

    pub(crate) fn next_line(&mut self) -> ReadOutcome {
        let mut chunk = [0_u8; READ_CHUNK];
        loop {
            if let Some(position) = self.buffer.iter().position(|byte| *byte == b'\n') {
                return self.take_line(position);
            }
            if self.buffer.len() > MAX_LINE_BYTES {
                return ReadOutcome::Rejected("request line too long");
            }
            match self.stream.read(&mut chunk) {
                Ok(0) => return ReadOutcome::Closed,
                Ok(read) => self.buffer.extend(chunk.iter().take(read)),
                Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
                Err(error)
                    if matches!(
                        error.kind(),
                        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                    ) =>
                {
                    return ReadOutcome::TimedOut;
                }
                Err(error) => {
                    debug!(target: SESSION_TARGET, %error, "read failed");
                    return ReadOutcome::Closed;
                }
            }
        }
    }

    fn take_line(&mut self, newline: usize) -> ReadOutcome {
        if newline >= MAX_LINE_BYTES {
            return ReadOutcome::Rejected("request line too long");
        }
        let mut line: Vec<u8> = self.buffer.drain(..=newline).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        String::from_utf8(line)
            .map_or(ReadOutcome::Rejected("request is not valid UTF-8"), ReadOutcome::Line)
    }
}
