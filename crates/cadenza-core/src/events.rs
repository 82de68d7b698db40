//! Notifications emitted whenever observable core state changes.

use std::sync::{Mutex, PoisonError};

use strum::{Display, IntoStaticStr};

/// A change inside the core, delivered synchronously to the registered
/// [`CoreListener`] from the actor thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum CoreEvent {
    /// A track started playing.
    TrackPlaybackStarted,
    /// The current track stopped playing or was replaced.
    TrackPlaybackEnded,
    /// The current track was paused.
    TrackPlaybackPaused,
    /// The current track was resumed.
    TrackPlaybackResumed,
    /// The playback state machine entered a state.
    PlaybackStateChanged,
    /// The position inside the current track jumped.
    Seeked,
    /// Tracks were added, removed, or reordered.
    TracklistChanged,
    /// One of consume, random, repeat, or single flipped.
    OptionsChanged,
    /// The mixer volume changed.
    VolumeChanged,
    /// The mixer mute flag changed.
    MuteChanged,
    /// A stored playlist was created or saved.
    PlaylistChanged,
    /// A stored playlist was removed.
    PlaylistDeleted,
    /// Stored playlists were (re)loaded from their backend.
    PlaylistsLoaded,
}

/// Receiver of [`CoreEvent`]s.
///
/// Listeners run on the actor thread and must not call back into the core.
pub trait CoreListener: Send + Sync {
    /// Handles one event.
    fn on_event(&self, event: CoreEvent);
}

/// Listener that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullListener;

impl CoreListener for NullListener {
    fn on_event(&self, _event: CoreEvent) {}
}

/// Listener that stores every event in arrival order.
#[derive(Debug, Default)]
pub struct RecordingListener {
    events: Mutex<Vec<CoreEvent>>,
}

impl RecordingListener {
    /// Removes and returns everything recorded so far.
    pub fn take(&self) -> Vec<CoreEvent> {
        let mut events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *events)
    }
}

impl CoreListener for RecordingListener {
    fn on_event(&self, event: CoreEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
