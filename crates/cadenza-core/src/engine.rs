//! The single owner of tracklist, playback, mixer, and stored-playlist state.

use std::sync::Arc;

use tracing::trace;

use crate::audio::{AudioSink, NullAudioSink};
use crate::error::TracklistError;
use crate::events::{CoreEvent, CoreListener};
use crate::library::{Library, MemoryLibrary};
use crate::mixer::{Mixer, SoftwareMixer};
use crate::model::{PlaybackState, Playlist, TlTrack, Tlid, Track};
use crate::playback::Playback;
use crate::playlists::{MemoryPlaylistStore, PlaylistStore};
use crate::tracklist::Tracklist;

/// Scheme served by the default stored-playlist backend.
pub const DEFAULT_PLAYLIST_SCHEME: &str = "m3u";

/// External components the core drives.
pub struct Collaborators {
    /// Sound output.
    pub audio: Box<dyn AudioSink>,
    /// Volume control.
    pub mixer: Box<dyn Mixer>,
    /// Music collection.
    pub library: Box<dyn Library>,
    /// Stored playlists.
    pub playlists: Box<dyn PlaylistStore>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            audio: Box::new(NullAudioSink),
            mixer: Box::new(SoftwareMixer::default()),
            library: Box::new(MemoryLibrary::default()),
            playlists: Box::new(MemoryPlaylistStore::new(DEFAULT_PLAYLIST_SCHEME)),
        }
    }
}

/// Shared player state. Reach it through [`crate::CoreHandle`] so that every
/// session observes one serialized history of mutations.
pub struct Core {
    pub(crate) tracklist: Tracklist,
    pub(crate) playback: Playback,
    mixer: Box<dyn Mixer>,
    library: Box<dyn Library>,
    playlists: Box<dyn PlaylistStore>,
    listener: Arc<dyn CoreListener>,
}

impl Core {
    /// Assembles a core with an empty tracklist in the stopped state.
    #[must_use]
    pub fn new(collaborators: Collaborators, listener: Arc<dyn CoreListener>) -> Self {
        let Collaborators {
            audio,
            mixer,
            library,
            playlists,
        } = collaborators;
        Self {
            tracklist: Tracklist::new(),
            playback: Playback::new(audio),
            mixer,
            library,
            playlists,
            listener,
        }
    }

    /// Read access to the queue.
    #[must_use]
    pub const fn tracklist(&self) -> &Tracklist {
        &self.tracklist
    }

    /// Read access to the music collection.
    #[must_use]
    pub fn library(&self) -> &dyn Library {
        self.library.as_ref()
    }

    /// Read access to stored playlists.
    #[must_use]
    pub fn playlists(&self) -> &dyn PlaylistStore {
        self.playlists.as_ref()
    }

    pub(crate) fn emit(&self, event: CoreEvent) {
        trace!(target: crate::CORE_TARGET, %event, "core event");
        self.listener.on_event(event);
    }

    /// Appends `tracks`, or inserts them starting at `at`.
    pub fn add_tracks(&mut self, tracks: Vec<Track>, at: Option<usize>) -> Vec<TlTrack> {
        self.mutate_tracklist(|tracklist| tracklist.add(tracks, at))
    }

    /// Resolves each URI through the library and queues the results.
    pub fn add_uris(&mut self, uris: &[String], at: Option<usize>) -> Vec<TlTrack> {
        let tracks = uris
            .iter()
            .flat_map(|uri| self.library.lookup(uri))
            .collect();
        self.add_tracks(tracks, at)
    }

    /// Empties the queue, stopping playback.
    pub fn clear_tracklist(&mut self) {
        self.mutate_tracklist(Tracklist::clear);
    }

    /// Removes the entries carrying `tlids`. Removing the entry being played
    /// stops playback first.
    pub fn remove_tlids(&mut self, tlids: &[Tlid]) -> Vec<TlTrack> {
        let removes_current = self
            .playback
            .current
            .as_ref()
            .is_some_and(|current| tlids.contains(&current.tlid));
        if removes_current {
            self.stop();
        }
        self.mutate_tracklist(|tracklist| tracklist.remove(tlids))
    }

    /// Moves `start..end` to begin at `to`.
    ///
    /// # Errors
    ///
    /// Returns [`TracklistError`] when the range or target does not fit.
    pub fn move_tracks(&mut self, start: usize, end: usize, to: usize) -> Result<(), TracklistError> {
        self.mutate_tracklist(|tracklist| tracklist.move_range(start, end, to))
    }

    /// Shuffles the whole queue or the window `start..end`.
    ///
    /// # Errors
    ///
    /// Returns [`TracklistError`] when the window does not fit.
    pub fn shuffle_tracks(
        &mut self,
        start: Option<usize>,
        end: Option<usize>,
    ) -> Result<(), TracklistError> {
        self.mutate_tracklist(|tracklist| tracklist.shuffle(start, end))
    }

    /// Exchanges two positions.
    ///
    /// # Errors
    ///
    /// Returns [`TracklistError`] when either position does not exist.
    pub fn swap_tracks(&mut self, first: usize, second: usize) -> Result<(), TracklistError> {
        self.mutate_tracklist(|tracklist| tracklist.swap(first, second))
    }

    /// Sets the consume flag.
    pub fn set_consume(&mut self, value: bool) {
        let changed = self.tracklist.set_consume(value);
        self.options_changed(changed);
    }

    /// Sets the random flag.
    pub fn set_random(&mut self, value: bool) {
        let changed = self.tracklist.set_random(value);
        self.options_changed(changed);
    }

    /// Sets the repeat flag.
    pub fn set_repeat(&mut self, value: bool) {
        let changed = self.tracklist.set_repeat(value);
        self.options_changed(changed);
    }

    /// Sets the single flag.
    pub fn set_single(&mut self, value: bool) {
        let changed = self.tracklist.set_single(value);
        self.options_changed(changed);
    }

    /// Entry a `next` request would switch to.
    pub fn next_tl_track(&mut self) -> Option<TlTrack> {
        let current = self.playback.current.clone();
        self.tracklist.next_track(current.as_ref())
    }

    fn options_changed(&self, changed: bool) {
        if changed {
            self.emit(CoreEvent::OptionsChanged);
        }
    }

    pub(crate) fn mutate_tracklist<R>(&mut self, mutate: impl FnOnce(&mut Tracklist) -> R) -> R {
        let before = self.tracklist.version();
        let result = mutate(&mut self.tracklist);
        if self.tracklist.version() != before {
            self.on_tracklist_change();
            self.emit(CoreEvent::TracklistChanged);
        }
        result
    }

    fn on_tracklist_change(&mut self) {
        if self.tracklist.is_empty() {
            self.stop();
            self.playback.current = None;
            return;
        }
        let current_gone = self
            .playback
            .current
            .as_ref()
            .is_some_and(|current| self.tracklist.index_of(current.tlid).is_none());
        if current_gone {
            self.playback.current = None;
        }
    }

    /// Mixer volume in percent.
    #[must_use]
    pub fn volume(&self) -> Option<u8> {
        self.mixer.volume()
    }

    /// Sets the mixer volume, clamped to 100.
    pub fn set_volume(&mut self, volume: u8) -> bool {
        let before = self.mixer.volume();
        let applied = self.mixer.set_volume(volume.min(100));
        if applied && self.mixer.volume() != before {
            self.emit(CoreEvent::VolumeChanged);
        }
        applied
    }

    /// Mixer mute flag.
    #[must_use]
    pub fn mute(&self) -> Option<bool> {
        self.mixer.mute()
    }

    /// Sets the mixer mute flag.
    pub fn set_mute(&mut self, mute: bool) -> bool {
        let before = self.mixer.mute();
        let applied = self.mixer.set_mute(mute);
        if applied && self.mixer.mute() != before {
            self.emit(CoreEvent::MuteChanged);
        }
        applied
    }

    /// URI schemes the library can resolve.
    #[must_use]
    pub fn uri_schemes(&self) -> Vec<String> {
        self.library.uri_schemes()
    }

    /// Creates an empty stored playlist.
    pub fn create_playlist(&mut self, name: &str, scheme: Option<&str>) -> Option<Playlist> {
        let created = self.playlists.create(name, scheme);
        if created.is_some() {
            self.emit(CoreEvent::PlaylistChanged);
        }
        created
    }

    /// Stores `playlist`, replacing any copy under the same URI.
    pub fn save_playlist(&mut self, playlist: Playlist) -> Option<Playlist> {
        let saved = self.playlists.save(playlist);
        if saved.is_some() {
            self.emit(CoreEvent::PlaylistChanged);
        }
        saved
    }

    /// Deletes the stored playlist under `uri`.
    pub fn delete_playlist(&mut self, uri: &str) -> bool {
        let deleted = self.playlists.delete(uri);
        if deleted {
            self.emit(CoreEvent::PlaylistDeleted);
        }
        deleted
    }

    /// Coarse playback state.
    #[must_use]
    pub const fn playback_state(&self) -> PlaybackState {
        self.playback.state
    }

    /// Entry being played, paused on, or stopped on.
    #[must_use]
    pub const fn current_tl_track(&self) -> Option<&TlTrack> {
        self.playback.current.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;
    use crate::events::RecordingListener;

    struct Fixture {
        core: Core,
        events: Arc<RecordingListener>,
    }

    #[fixture]
    fn fixture() -> Fixture {
        let events = Arc::new(RecordingListener::default());
        let core = Core::new(Collaborators::default(), events.clone());
        Fixture { core, events }
    }

    fn tracks(count: usize) -> Vec<Track> {
        (0..count)
            .map(|index| Track::new(format!("dummy:{index}")).with_length(60_000))
            .collect()
    }

    #[rstest]
    fn tracklist_mutations_emit_one_event(mut fixture: Fixture) {
        fixture.core.add_tracks(tracks(3), None);
        fixture.core.move_tracks(0, 1, 2).expect("move");
        assert_eq!(
            fixture.events.take(),
            [CoreEvent::TracklistChanged, CoreEvent::TracklistChanged]
        );
        assert_eq!(fixture.core.tracklist().version(), 2);
    }

    #[rstest]
    fn failed_mutations_are_silent(mut fixture: Fixture) {
        fixture.core.add_tracks(tracks(2), None);
        fixture.events.take();
        assert!(fixture.core.swap_tracks(0, 7).is_err());
        assert!(fixture.events.take().is_empty());
    }

    #[rstest]
    fn option_events_fire_on_change_only(mut fixture: Fixture) {
        fixture.core.set_repeat(true);
        fixture.core.set_repeat(true);
        fixture.core.set_single(false);
        assert_eq!(fixture.events.take(), [CoreEvent::OptionsChanged]);
    }

    #[rstest]
    fn volume_is_clamped_and_reported(mut fixture: Fixture) {
        fixture.core.set_volume(50);
        fixture.core.set_volume(50);
        fixture.core.set_volume(250);
        assert_eq!(fixture.core.volume(), Some(100));
        assert_eq!(
            fixture.events.take(),
            [CoreEvent::VolumeChanged, CoreEvent::VolumeChanged]
        );
    }

    #[rstest]
    fn removing_the_current_entry_stops_playback(mut fixture: Fixture) {
        let added = fixture.core.add_tracks(tracks(3), None);
        fixture.core.play(added.get(1).cloned());
        let tlid = added.get(1).map(|entry| entry.tlid).expect("tlid");
        fixture.core.remove_tlids(&[tlid]);
        assert_eq!(fixture.core.playback_state(), PlaybackState::Stopped);
        assert_eq!(fixture.core.current_tl_track(), None);
        assert_eq!(fixture.core.tracklist().len(), 2);
    }

    #[rstest]
    fn removing_unknown_entries_still_counts_as_a_change(mut fixture: Fixture) {
        fixture.core.add_tracks(tracks(2), None);
        fixture.events.take();
        let before = fixture.core.tracklist().version();
        assert!(fixture.core.remove_tlids(&[999]).is_empty());
        assert!(fixture.core.tracklist().version() > before);
        assert_eq!(fixture.events.take(), [CoreEvent::TracklistChanged]);
    }

    #[rstest]
    fn clearing_stops_and_forgets_the_current_entry(mut fixture: Fixture) {
        fixture.core.add_tracks(tracks(2), None);
        fixture.core.play(None);
        fixture.core.clear_tracklist();
        assert_eq!(fixture.core.playback_state(), PlaybackState::Stopped);
        assert_eq!(fixture.core.current_tl_track(), None);
    }

    #[rstest]
    fn stored_playlist_changes_are_announced(mut fixture: Fixture) {
        let playlist = fixture.core.create_playlist("mix", None).expect("create");
        fixture.core.save_playlist(playlist.clone()).expect("save");
        assert!(fixture.core.delete_playlist(&playlist.uri));
        assert!(!fixture.core.delete_playlist(&playlist.uri));
        assert_eq!(
            fixture.events.take(),
            [
                CoreEvent::PlaylistChanged,
                CoreEvent::PlaylistChanged,
                CoreEvent::PlaylistDeleted
            ]
        );
    }
}
