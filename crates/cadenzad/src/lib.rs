//! An MPD protocol server backed by an in-memory player core.
//!
//! `cadenzad` accepts MPD clients over TCP or a Unix socket, greets each one,
//! and runs its request lines through a fixed pipeline: error rendering,
//! authentication, command-list buffering, idle gating, `OK` termination, and
//! finally the command handler looked up in a static registry. Handlers reach
//! the shared tracklist, playback, mixer, library, and stored playlists only
//! through the single-writer actor in [`cadenza_core`], so concurrent clients
//! observe one serialized history of changes.
//!
//! Every change the core makes is mapped to an idle subsystem and fanned out
//! to all sessions; a session parked in `idle` is woken with the matching
//! `changed:` lines as soon as one of its subsystems fires.
//!
//! The binary is a thin wrapper around [`run_daemon`], which loads the
//! layered configuration, installs telemetry, binds the listener, and blocks
//! until a termination signal arrives.

mod bootstrap;
mod broadcaster;
mod commands;
mod health;
mod process;
mod protocol;
mod session;
mod telemetry;
mod transport;

pub use bootstrap::{BootstrapError, ConfigLoader, Daemon, SystemConfigLoader, bootstrap_with};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{LaunchError, ShutdownError, ShutdownSignal, SystemShutdownSignal, run_daemon};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
