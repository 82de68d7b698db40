//! Collaborators shared by the daemon test suites.

use std::ffi::OsString;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use camino::Utf8PathBuf;
use cadenza_config::{Config, ListenEndpoint};
use ortho_config::{OrthoConfig, OrthoError};
use tempfile::TempDir;

use crate::bootstrap::{BootstrapError, ConfigLoader};
use crate::health::HealthReporter;
use crate::process::LaunchError;
use crate::process::launch::{LaunchPlan, run_daemon_with};
use crate::process::shutdown::{ShutdownError, ShutdownSignal};

pub const WAIT_TIMEOUT: Duration = Duration::from_secs(5);
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Tracks every daemon under test can serve.
const CATALOGUE: &str = r#"[
    {"uri": "local:dawn/1", "name": "Sunrise", "length": 180000,
     "album": {"name": "Dawn"}, "artists": [{"name": "Aurora"}]},
    {"uri": "local:dawn/2", "name": "Noon", "length": 200000,
     "album": {"name": "Dawn"}, "artists": [{"name": "Aurora"}]},
    {"uri": "local:loose", "name": "Stray", "length": 90000}
]"#;

/// Loader that serves a loopback TCP configuration with a scratch catalogue.
#[derive(Clone)]
pub struct TestConfigLoader {
    dir: Arc<TempDir>,
    password: Option<String>,
    max_connections: usize,
}

impl TestConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        let dir = TempDir::new().expect("create temporary directory");
        fs::write(dir.path().join("library.json"), CATALOGUE).expect("write catalogue");
        Self {
            dir: Arc::new(dir),
            password: None,
            max_connections: 20,
        }
    }

    #[must_use]
    pub fn with_password(mut self, password: &str) -> Self {
        self.password = Some(password.to_owned());
        self
    }

    #[must_use]
    pub const fn with_max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections;
        self
    }

    /// Replaces the catalogue with something that is not JSON.
    pub fn corrupt_catalogue(&self) {
        fs::write(self.path("library.json"), "{not json").expect("overwrite catalogue");
    }

    fn path(&self, name: &str) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(self.dir.path().join(name)).expect("utf8 temp path")
    }

    /// Unix socket path inside the scratch directory.
    pub fn socket_path(&self) -> Utf8PathBuf {
        self.path("run/cadenza.sock")
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(Config {
            hostname: "127.0.0.1".to_owned(),
            port: 0,
            password: self.password.clone(),
            max_connections: self.max_connections,
            library_path: Some(self.path("library.json")),
            ..Config::default()
        })
    }
}

/// Loader that serves a Unix socket configuration.
pub struct UnixConfigLoader(pub TestConfigLoader);

impl ConfigLoader for UnixConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let config = self.0.load()?;
        Ok(Config {
            hostname: format!("unix:{}", self.0.socket_path()),
            ..config
        })
    }
}

/// Loader that fails by passing an unparseable port on the command line.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load_from_iter([
            OsString::from("cadenzad"),
            OsString::from("--port"),
            OsString::from("not-a-port"),
        ])
    }
}

/// Structured health events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    BootstrapStarting,
    BootstrapSucceeded,
    BootstrapFailed(String),
    ListenerStarted(ListenEndpoint),
    ShutdownCompleted,
}

/// Records health events for assertions.
#[derive(Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    /// Endpoint reported by `listener_started`, once it has fired.
    pub fn listening_on(&self) -> Option<ListenEndpoint> {
        self.events().into_iter().find_map(|event| match event {
            HealthEvent::ListenerStarted(endpoint) => Some(endpoint),
            _ => None,
        })
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn listener_started(&self, endpoint: &ListenEndpoint) {
        self.record(HealthEvent::ListenerStarted(endpoint.clone()));
    }

    fn shutdown_completed(&self) {
        self.record(HealthEvent::ShutdownCompleted);
    }
}

/// Shutdown signal released by the test instead of the operating system.
pub struct TestShutdownSignal {
    receiver: Mutex<Receiver<()>>,
}

impl TestShutdownSignal {
    pub fn new() -> (Sender<()>, Self) {
        let (sender, receiver) = mpsc::channel();
        (
            sender,
            Self {
                receiver: Mutex::new(receiver),
            },
        )
    }
}

impl ShutdownSignal for TestShutdownSignal {
    fn wait(&self) -> Result<(), ShutdownError> {
        let receiver = self.receiver.lock().expect("shutdown mutex poisoned");
        // A dropped sender counts as a shutdown request too.
        let _ = receiver.recv();
        Ok(())
    }
}

/// A daemon running on a background thread.
pub struct RunningDaemon {
    pub reporter: Arc<RecordingHealthReporter>,
    trigger: Option<Sender<()>>,
    handle: Option<thread::JoinHandle<Result<(), LaunchError>>>,
}

impl RunningDaemon {
    /// Launches the daemon and waits until it accepts clients.
    pub fn start(loader: impl ConfigLoader + 'static) -> Self {
        let daemon = Self::spawn(loader);
        daemon.wait_for_listener();
        daemon
    }

    /// Launches the daemon without waiting for it.
    pub fn spawn(loader: impl ConfigLoader + 'static) -> Self {
        let reporter = Arc::new(RecordingHealthReporter::default());
        let (trigger, shutdown) = TestShutdownSignal::new();
        let plan_reporter: Arc<dyn HealthReporter> = reporter.clone();
        let handle = thread::spawn(move || {
            run_daemon_with(LaunchPlan {
                loader,
                reporter: plan_reporter,
                shutdown,
            })
        });
        Self {
            reporter,
            trigger: Some(trigger),
            handle: Some(handle),
        }
    }

    /// Endpoint the daemon bound, waiting for it to come up.
    pub fn wait_for_listener(&self) -> ListenEndpoint {
        let deadline = Instant::now() + WAIT_TIMEOUT;
        loop {
            if let Some(endpoint) = self.reporter.listening_on() {
                return endpoint;
            }
            assert!(
                Instant::now() < deadline,
                "daemon did not start listening: {:?}",
                self.reporter.events()
            );
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Opens a client connection to the TCP endpoint.
    pub fn connect(&self) -> MpdClient {
        match self.wait_for_listener() {
            ListenEndpoint::Tcp { host, port } => MpdClient::connect((host.as_str(), port)),
            ListenEndpoint::Unix { path } => panic!("expected a TCP endpoint, got {path}"),
        }
    }

    /// Signals shutdown and collects the daemon's result.
    pub fn stop(&mut self) -> Result<(), LaunchError> {
        self.trigger.take();
        self.join()
    }

    /// Waits for the daemon thread to finish on its own.
    pub fn join(&mut self) -> Result<(), LaunchError> {
        self.handle
            .take()
            .expect("daemon already joined")
            .join()
            .expect("daemon thread panicked")
    }
}

impl Drop for RunningDaemon {
    fn drop(&mut self) {
        self.trigger.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Line-oriented MPD client over TCP.
pub struct MpdClient {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl MpdClient {
    pub fn connect(addr: impl std::net::ToSocketAddrs) -> Self {
        let writer = TcpStream::connect(addr).expect("connect to daemon");
        writer
            .set_read_timeout(Some(WAIT_TIMEOUT))
            .expect("set read timeout");
        let reader = BufReader::new(writer.try_clone().expect("clone client stream"));
        Self { reader, writer }
    }

    /// Reads one line without its terminator; `None` once the server closed.
    pub fn read_line(&mut self) -> Option<String> {
        let mut line = String::new();
        match self.reader.read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end_matches('\n').to_owned()),
        }
    }

    pub fn send_line(&mut self, line: &str) {
        self.writer
            .write_all(format!("{line}\n").as_bytes())
            .expect("write request");
    }

    /// Reads lines up to and including the terminating `OK` or `ACK`.
    pub fn read_response(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        while let Some(line) = self.read_line() {
            let done = line == "OK" || line.starts_with("ACK ");
            lines.push(line);
            if done {
                break;
            }
        }
        lines
    }

    /// Sends a request and reads its full response.
    pub fn request(&mut self, line: &str) -> Vec<String> {
        self.send_line(line);
        self.read_response()
    }

    /// Value of the first `key: value` line in a response.
    pub fn field(&mut self, request: &str, key: &str) -> Option<String> {
        let prefix = format!("{key}: ");
        self.request(request)
            .into_iter()
            .find_map(|line| line.strip_prefix(&prefix).map(str::to_owned))
    }
}
