//! Idle subsystems and the core events that wake them.

use cadenza_core::CoreEvent;
use strum::{Display, EnumIter, EnumString};

/// Area of server state a client can wait on with `idle`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub(crate) enum Subsystem {
    Database,
    Mixer,
    Options,
    Output,
    Player,
    Playlist,
    StoredPlaylist,
    Update,
}

impl Subsystem {
    /// Subsystem a core event touches, if any.
    pub(crate) const fn for_event(event: CoreEvent) -> Option<Self> {
        match event {
            CoreEvent::PlaybackStateChanged | CoreEvent::Seeked => Some(Self::Player),
            CoreEvent::TracklistChanged => Some(Self::Playlist),
            CoreEvent::PlaylistChanged
            | CoreEvent::PlaylistDeleted
            | CoreEvent::PlaylistsLoaded => Some(Self::StoredPlaylist),
            CoreEvent::OptionsChanged => Some(Self::Options),
            CoreEvent::VolumeChanged => Some(Self::Mixer),
            CoreEvent::MuteChanged => Some(Self::Output),
            CoreEvent::TrackPlaybackStarted
            | CoreEvent::TrackPlaybackEnded
            | CoreEvent::TrackPlaybackPaused
            | CoreEvent::TrackPlaybackResumed => None,
        }
    }
}
