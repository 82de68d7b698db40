//! Player state machine behind the cadenza MPD server.
//!
//! [`Core`] owns the tracklist, playback state, mixer, library, and stored
//! playlists. It is moved onto a dedicated thread by [`CoreActor::spawn`];
//! every protocol session talks to it through a [`CoreHandle`], so mutations
//! from concurrent clients are applied one at a time in arrival order.
//! Observable changes are reported as [`CoreEvent`]s to a single
//! [`CoreListener`].

mod actor;
mod audio;
mod clock;
mod engine;
mod error;
mod events;
mod library;
mod mixer;
mod model;
mod playback;
mod playlists;
mod tracklist;

pub use actor::{CoreActor, CoreHandle, TICK_INTERVAL};
pub use audio::{AudioSink, NullAudioSink};
pub use engine::{Collaborators, Core, DEFAULT_PLAYLIST_SCHEME};
pub use error::{CatalogueError, CoreError, TracklistError};
pub use events::{CoreEvent, CoreListener, NullListener, RecordingListener};
pub use library::{LIBRARY_ROOT_URI, Library, MemoryLibrary, Query, SearchField};
pub use mixer::{Mixer, SoftwareMixer};
pub use model::{
    Album, Artist, PlaybackOptions, PlaybackState, Playlist, Ref, RefKind, TlTrack, Tlid, Track,
    uri_scheme,
};
pub use playlists::{MemoryPlaylistStore, PlaylistStore};
pub use tracklist::Tracklist;

/// Tracing target used by the core.
pub(crate) const CORE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::core");
