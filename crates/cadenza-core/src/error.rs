//! Error types raised by the core state machine and its actor.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures reaching the core actor.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The actor thread has stopped or panicked; no reply will arrive.
    #[error("core actor is not running")]
    Unavailable,
    /// The actor thread could not be started.
    #[error("failed to spawn core actor thread: {source}")]
    Spawn {
        /// Underlying operating system error.
        #[source]
        source: io::Error,
    },
}

/// Positional arguments that do not fit the current tracklist.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TracklistError {
    /// A range reaches past the end of the tracklist or is empty.
    #[error("range {start}..{end} does not fit a tracklist of {length} entries")]
    Range {
        /// First position of the range.
        start: usize,
        /// One past the last position of the range.
        end: usize,
        /// Tracklist length at the time of the call.
        length: usize,
    },
    /// A single position lies outside the tracklist.
    #[error("position {position} does not fit a tracklist of {length} entries")]
    Position {
        /// Offending position.
        position: usize,
        /// Tracklist length at the time of the call.
        length: usize,
    },
}

/// Failures reading a JSON track catalogue.
#[derive(Debug, Error)]
pub enum CatalogueError {
    /// The catalogue file could not be read.
    #[error("failed to read catalogue {path}: {source}", path = path.display())]
    Read {
        /// Catalogue location.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The catalogue is not a JSON array of tracks.
    #[error("failed to parse catalogue {path}: {source}", path = path.display())]
    Parse {
        /// Catalogue location.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}
