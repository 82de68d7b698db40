//! Immutable value types shared by the tracklist, library, and playlists.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Identifier of a tracklist entry, unique for the lifetime of the process.
pub type Tlid = u64;

/// A performer, composer, or album artist.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Artist {
    /// Display name.
    pub name: String,
    /// MusicBrainz identifier, when known.
    pub musicbrainz_id: Option<String>,
}

impl Artist {
    /// Builds an artist with only a name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            musicbrainz_id: None,
        }
    }
}

/// Album metadata attached to a track.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Album {
    /// Backend URI of the album, when it has one.
    pub uri: Option<String>,
    /// Album title.
    pub name: String,
    /// Album artists.
    pub artists: Vec<Artist>,
    /// Number of tracks on the release.
    pub num_tracks: Option<u32>,
    /// Release date as free text (`YYYY` or `YYYY-MM-DD`).
    pub date: Option<String>,
    /// MusicBrainz identifier, when known.
    pub musicbrainz_id: Option<String>,
}

impl Album {
    /// Builds an album with only a title.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// A playable item as described by a library backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Track {
    /// Backend URI; the only mandatory field.
    pub uri: String,
    /// Track title.
    pub name: Option<String>,
    /// Track artists.
    pub artists: Vec<Artist>,
    /// Album the track belongs to.
    pub album: Option<Album>,
    /// Composers.
    pub composers: Vec<Artist>,
    /// Performers.
    pub performers: Vec<Artist>,
    /// Genre as free text.
    pub genre: Option<String>,
    /// Release date as free text.
    pub date: Option<String>,
    /// Position on the album.
    pub track_no: Option<u32>,
    /// Disc number.
    pub disc_no: Option<u32>,
    /// Duration in milliseconds.
    pub length: Option<u64>,
    /// Bit rate in kbit/s.
    pub bitrate: Option<u32>,
    /// Free-form comment.
    pub comment: Option<String>,
    /// MusicBrainz identifier, when known.
    pub musicbrainz_id: Option<String>,
    /// Modification time in milliseconds since the Unix epoch.
    pub last_modified: Option<u64>,
}

impl Track {
    /// Builds a track with only a URI.
    #[must_use]
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            ..Self::default()
        }
    }

    /// Sets the title.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the duration in milliseconds.
    #[must_use]
    pub const fn with_length(mut self, length_ms: u64) -> Self {
        self.length = Some(length_ms);
        self
    }

    /// Appends a track artist.
    #[must_use]
    pub fn with_artist(mut self, artist: Artist) -> Self {
        self.artists.push(artist);
        self
    }

    /// Sets the album.
    #[must_use]
    pub fn with_album(mut self, album: Album) -> Self {
        self.album = Some(album);
        self
    }

    /// URI scheme, i.e. the text before the first `:`.
    #[must_use]
    pub fn scheme(&self) -> &str {
        uri_scheme(&self.uri)
    }
}

/// Returns the scheme part of `uri`, or an empty string when there is none.
#[must_use]
pub fn uri_scheme(uri: &str) -> &str {
    uri.split_once(':').map_or("", |(scheme, _)| scheme)
}

/// A track queued in the tracklist, paired with its stable identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlTrack {
    /// Tracklist identifier.
    pub tlid: Tlid,
    /// The queued track.
    pub track: Arc<Track>,
}

impl TlTrack {
    /// Pairs a track with a tracklist identifier.
    #[must_use]
    pub fn new(tlid: Tlid, track: Track) -> Self {
        Self {
            tlid,
            track: Arc::new(track),
        }
    }
}

/// Kind of entry returned when browsing a library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum RefKind {
    /// A container of further entries.
    Directory,
    /// A playable track.
    Track,
    /// A stored playlist.
    Playlist,
}

/// Lightweight reference to a library or playlist entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ref {
    /// What the reference points at.
    pub kind: RefKind,
    /// Backend URI.
    pub uri: String,
    /// Display name.
    pub name: String,
}

impl Ref {
    /// Builds a directory reference.
    #[must_use]
    pub fn directory(uri: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: RefKind::Directory,
            uri: uri.into(),
            name: name.into(),
        }
    }

    /// Builds a track reference.
    #[must_use]
    pub fn track(uri: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: RefKind::Track,
            uri: uri.into(),
            name: name.into(),
        }
    }

    /// Builds a playlist reference.
    #[must_use]
    pub fn playlist(uri: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: RefKind::Playlist,
            uri: uri.into(),
            name: name.into(),
        }
    }
}

/// A stored playlist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Playlist {
    /// Backend URI.
    pub uri: String,
    /// Display name.
    pub name: String,
    /// Ordered tracks.
    pub tracks: Vec<Track>,
    /// Modification time in milliseconds since the Unix epoch.
    pub last_modified: Option<u64>,
}

/// Coarse playback state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum PlaybackState {
    /// Nothing is playing; the elapsed clock is reset.
    #[default]
    Stopped,
    /// The current track is playing.
    Playing,
    /// The current track is paused; the elapsed clock is frozen.
    Paused,
}

/// Flags that shape track selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackOptions {
    /// Remove tracks from the tracklist once played.
    pub consume: bool,
    /// Play tracks in a shuffled order.
    pub random: bool,
    /// Wrap around at the end of the tracklist.
    pub repeat: bool,
    /// Stop (or replay, with repeat) after the current track.
    pub single: bool,
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("local:track:a.mp3", "local")]
    #[case("http://example.com/stream", "http")]
    #[case("no-scheme", "")]
    fn extracts_uri_scheme(#[case] uri: &str, #[case] expected: &str) {
        assert_eq!(uri_scheme(uri), expected);
    }

    #[test]
    fn catalogue_tracks_fill_missing_fields() {
        let track: Track =
            serde_json::from_str(r#"{"uri":"dummy:a","name":"A","length":1000}"#)
                .expect("parse track");
        assert_eq!(track, Track::new("dummy:a").with_name("A").with_length(1000));
    }
}
