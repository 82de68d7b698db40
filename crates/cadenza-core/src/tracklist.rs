//! The ordered queue of tracks and the rules that pick what plays next.
//!
//! Every structural mutation bumps [`Tracklist::version`], which clients use
//! to decide whether their cached copy is stale. Identifiers handed out by
//! [`Tracklist::add`] come from a monotonic counter and survive reordering.

use rand::seq::SliceRandom;

use crate::error::TracklistError;
use crate::model::{PlaybackOptions, TlTrack, Tlid, Track};

/// Ordered list of queued tracks plus the playback option flags.
#[derive(Debug, Default)]
pub struct Tracklist {
    entries: Vec<TlTrack>,
    version: u64,
    next_tlid: Tlid,
    options: PlaybackOptions,
    shuffled: Vec<TlTrack>,
}

impl Tracklist {
    /// Creates an empty tracklist at version 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queued entries in play order.
    #[must_use]
    pub fn tl_tracks(&self) -> &[TlTrack] {
        &self.entries
    }

    /// Number of queued entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Mutation counter; never decreases.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Current option flags.
    #[must_use]
    pub const fn options(&self) -> PlaybackOptions {
        self.options
    }

    /// Entry at `position`.
    #[must_use]
    pub fn get(&self, position: usize) -> Option<&TlTrack> {
        self.entries.get(position)
    }

    /// Position of the entry carrying `tlid`.
    #[must_use]
    pub fn index_of(&self, tlid: Tlid) -> Option<usize> {
        self.entries.iter().position(|entry| entry.tlid == tlid)
    }

    /// Entry carrying `tlid`.
    #[must_use]
    pub fn find(&self, tlid: Tlid) -> Option<&TlTrack> {
        self.entries.iter().find(|entry| entry.tlid == tlid)
    }

    /// Entries in `start..end`, with both bounds clamped to the list.
    #[must_use]
    pub fn slice(&self, start: usize, end: usize) -> &[TlTrack] {
        let upper = end.min(self.entries.len());
        let lower = start.min(upper);
        self.entries.get(lower..upper).unwrap_or_default()
    }

    /// Entries whose track URI equals `uri`.
    #[must_use]
    pub fn filter_uri(&self, uri: &str) -> Vec<TlTrack> {
        self.entries
            .iter()
            .filter(|entry| entry.track.uri == uri)
            .cloned()
            .collect()
    }

    pub(crate) fn add(&mut self, tracks: Vec<Track>, at: Option<usize>) -> Vec<TlTrack> {
        let mut position = at.map_or(self.entries.len(), |at| at.min(self.entries.len()));
        let mut added = Vec::with_capacity(tracks.len());
        for track in tracks {
            let entry = TlTrack::new(self.next_tlid, track);
            self.next_tlid += 1;
            self.entries.insert(position, entry.clone());
            position += 1;
            added.push(entry);
        }
        if !added.is_empty() {
            self.bump_version();
        }
        added
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.bump_version();
    }

    pub(crate) fn remove(&mut self, tlids: &[Tlid]) -> Vec<TlTrack> {
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|entry| tlids.contains(&entry.tlid));
        self.entries = kept;
        self.bump_version();
        removed
    }

    /// Moves `start..end` so that it begins at `to` in the resulting list.
    /// An empty range (`start == end`) moves the single entry at `start`.
    /// `to` may be anything up to the current length; a slice that would run
    /// past the end is appended.
    pub(crate) fn move_range(
        &mut self,
        start: usize,
        end: usize,
        to: usize,
    ) -> Result<(), TracklistError> {
        let length = self.entries.len();
        let upper = if start == end { end + 1 } else { end };
        if start >= upper || upper > length {
            return Err(TracklistError::Range {
                start,
                end: upper,
                length,
            });
        }
        if to > length {
            return Err(TracklistError::Position {
                position: to,
                length,
            });
        }
        let moved: Vec<_> = self.entries.drain(start..upper).collect();
        let to = to.min(self.entries.len());
        self.entries.splice(to..to, moved);
        self.bump_version();
        Ok(())
    }

    pub(crate) fn shuffle(
        &mut self,
        start: Option<usize>,
        end: Option<usize>,
    ) -> Result<(), TracklistError> {
        let length = self.entries.len();
        let lower = start.unwrap_or(0);
        let upper = end.unwrap_or(length);
        if upper > length || (start.is_some() && end.is_some() && lower >= upper) {
            return Err(TracklistError::Range {
                start: lower,
                end: upper,
                length,
            });
        }
        if let Some(window) = self.entries.get_mut(lower..upper) {
            window.shuffle(&mut rand::thread_rng());
        }
        self.bump_version();
        Ok(())
    }

    /// Exchanges two positions; identifiers travel with their tracks.
    pub(crate) fn swap(&mut self, first: usize, second: usize) -> Result<(), TracklistError> {
        let length = self.entries.len();
        for position in [first, second] {
            if position >= length {
                return Err(TracklistError::Position { position, length });
            }
        }
        self.entries.swap(first, second);
        self.bump_version();
        Ok(())
    }

    pub(crate) fn set_consume(&mut self, value: bool) -> bool {
        replace_flag(&mut self.options.consume, value)
    }

    pub(crate) fn set_repeat(&mut self, value: bool) -> bool {
        replace_flag(&mut self.options.repeat, value)
    }

    pub(crate) fn set_single(&mut self, value: bool) -> bool {
        replace_flag(&mut self.options.single, value)
    }

    pub(crate) fn set_random(&mut self, value: bool) -> bool {
        let changed = replace_flag(&mut self.options.random, value);
        if changed && value {
            self.reshuffle();
        }
        changed
    }

    /// Entry that follows `current` when the user asks to skip forward.
    pub(crate) fn next_track(&mut self, current: Option<&TlTrack>) -> Option<TlTrack> {
        if self.entries.is_empty() {
            return None;
        }
        if self.options.random {
            if self.shuffled.is_empty() && (self.options.repeat || current.is_none()) {
                self.reshuffle();
            }
            return self.shuffled.first().cloned();
        }
        let Some(position) = current.and_then(|entry| self.index_of(entry.tlid)) else {
            return self.entries.first().cloned();
        };
        let following = position + 1;
        if self.options.repeat && following == self.entries.len() {
            return self.entries.first().cloned();
        }
        self.entries.get(following).cloned()
    }

    /// Entry that follows `current` when it finishes on its own.
    pub(crate) fn eot_track(&mut self, current: Option<&TlTrack>) -> Option<TlTrack> {
        match (self.options.single, self.options.repeat) {
            (true, true) => current.cloned(),
            (true, false) => None,
            _ => self.next_track(current),
        }
    }

    /// Entry that precedes `current` when the user asks to skip back.
    pub(crate) fn previous_track(&self, current: Option<&TlTrack>) -> Option<TlTrack> {
        let options = self.options;
        if options.repeat || options.consume || options.random {
            return current.cloned();
        }
        let position = current.and_then(|entry| self.index_of(entry.tlid))?;
        let previous = position.checked_sub(1)?;
        self.entries.get(previous).cloned()
    }

    /// Drops `entry` from the pending random order once it starts playing.
    pub(crate) fn mark_playing(&mut self, entry: &TlTrack) {
        if self.options.random {
            self.shuffled.retain(|pending| pending.tlid != entry.tlid);
        }
    }

    /// Drops `entry` from the pending random order after it failed to load.
    pub(crate) fn mark_unplayable(&mut self, entry: &TlTrack) {
        self.shuffled.retain(|pending| pending.tlid != entry.tlid);
    }

    fn bump_version(&mut self) {
        self.version += 1;
        if self.options.random {
            self.reshuffle();
        } else {
            self.shuffled.clear();
        }
    }

    fn reshuffle(&mut self) {
        self.shuffled.clone_from(&self.entries);
        self.shuffled.shuffle(&mut rand::thread_rng());
    }
}

fn replace_flag(flag: &mut bool, value: bool) -> bool {
    let changed = *flag != value;
    *flag = value;
    changed
}
