//! Read-only access to the music collection.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use strum::{Display, EnumString};
use tracing::debug;

use crate::error::CatalogueError;
use crate::model::{Ref, Track, uri_scheme};

/// Track attribute a query or distinct listing is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum SearchField {
    /// Album title.
    Album,
    /// Album artist names.
    #[strum(serialize = "albumartist")]
    AlbumArtist,
    /// Every other field.
    Any,
    /// Track artist names.
    Artist,
    /// Free-form comment.
    Comment,
    /// Composer names.
    Composer,
    /// Release date.
    Date,
    /// Track URI.
    Uri,
    /// Genre.
    Genre,
    /// Performer names.
    Performer,
    /// Track title.
    TrackName,
    /// Position on the album.
    TrackNo,
}

/// Conjunction of field constraints; every pair must match.
pub type Query = [(SearchField, String)];

/// Root URI browsed when no URI is given.
pub const LIBRARY_ROOT_URI: &str = "library:";

const ALBUM_URI_PREFIX: &str = "library:album:";

/// Music collection consulted by browse, search, and tracklist additions.
pub trait Library: Send {
    /// Lists the children of `uri`, or of the root when `None`.
    fn browse(&self, uri: Option<&str>) -> Vec<Ref>;
    /// Resolves a track or directory URI into playable tracks.
    fn lookup(&self, uri: &str) -> Vec<Track>;
    /// Tracks matching `query`; `exact` demands equality instead of a
    /// case-insensitive substring match.
    fn search(&self, query: &Query, exact: bool) -> Vec<Track>;
    /// Sorted distinct values of `field` among tracks exactly matching `query`.
    fn distinct(&self, field: SearchField, query: &Query) -> Vec<String>;
    /// URI schemes served by this library.
    fn uri_schemes(&self) -> Vec<String>;
}

/// Library held entirely in memory, grouped into one directory per album.
#[derive(Debug, Default, Clone)]
pub struct MemoryLibrary {
    tracks: Vec<Track>,
}

impl MemoryLibrary {
    /// Wraps an explicit track list.
    #[must_use]
    pub const fn new(tracks: Vec<Track>) -> Self {
        Self { tracks }
    }

    /// Loads a JSON array of tracks.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogueError`] when the file cannot be read or parsed.
    pub fn from_catalogue(path: &Path) -> Result<Self, CatalogueError> {
        let contents = fs::read_to_string(path).map_err(|source| CatalogueError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let tracks: Vec<Track> =
            serde_json::from_str(&contents).map_err(|source| CatalogueError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(
            target: crate::CORE_TARGET,
            path = %path.display(),
            tracks = tracks.len(),
            "loaded library catalogue"
        );
        Ok(Self::new(tracks))
    }

    fn album_tracks<'a>(&'a self, album: &'a str) -> impl Iterator<Item = &'a Track> + 'a {
        self.tracks
            .iter()
            .filter(move |track| track.album.as_ref().is_some_and(|a| a.name == album))
    }
}

impl Library for MemoryLibrary {
    fn browse(&self, uri: Option<&str>) -> Vec<Ref> {
        match uri.unwrap_or(LIBRARY_ROOT_URI) {
            LIBRARY_ROOT_URI => {
                let albums: BTreeSet<&str> = self
                    .tracks
                    .iter()
                    .filter_map(|track| track.album.as_ref())
                    .map(|album| album.name.as_str())
                    .collect();
                let directories = albums
                    .into_iter()
                    .map(|name| Ref::directory(format!("{ALBUM_URI_PREFIX}{name}"), name));
                let loose = self
                    .tracks
                    .iter()
                    .filter(|track| track.album.is_none())
                    .map(track_ref);
                directories.chain(loose).collect()
            }
            other => other
                .strip_prefix(ALBUM_URI_PREFIX)
                .map(|album| self.album_tracks(album).map(track_ref).collect())
                .unwrap_or_default(),
        }
    }

    fn lookup(&self, uri: &str) -> Vec<Track> {
        if let Some(album) = uri.strip_prefix(ALBUM_URI_PREFIX) {
            return self.album_tracks(album).cloned().collect();
        }
        self.tracks
            .iter()
            .filter(|track| track.uri == uri)
            .cloned()
            .collect()
    }

    fn search(&self, query: &Query, exact: bool) -> Vec<Track> {
        self.tracks
            .iter()
            .filter(|track| matches_query(track, query, exact))
            .cloned()
            .collect()
    }

    fn distinct(&self, field: SearchField, query: &Query) -> Vec<String> {
        let values: BTreeSet<String> = self
            .tracks
            .iter()
            .filter(|track| matches_query(track, query, true))
            .flat_map(|track| field_values(track, field))
            .filter(|value| !value.is_empty())
            .collect();
        values.into_iter().collect()
    }

    fn uri_schemes(&self) -> Vec<String> {
        let schemes: BTreeSet<&str> = self
            .tracks
            .iter()
            .map(|track| uri_scheme(&track.uri))
            .filter(|scheme| !scheme.is_empty())
            .collect();
        schemes.into_iter().map(str::to_owned).collect()
    }
}

fn track_ref(track: &Track) -> Ref {
    Ref::track(
        track.uri.clone(),
        track.name.clone().unwrap_or_else(|| track.uri.clone()),
    )
}

fn matches_query(track: &Track, query: &Query, exact: bool) -> bool {
    query.iter().all(|(field, wanted)| {
        let wanted_lower = wanted.to_lowercase();
        field_values(track, *field).iter().any(|value| {
            if exact {
                value == wanted
            } else {
                value.to_lowercase().contains(&wanted_lower)
            }
        })
    })
}

fn names(artists: &[crate::model::Artist]) -> impl Iterator<Item = String> + '_ {
    artists.iter().map(|artist| artist.name.clone())
}

fn field_values(track: &Track, field: SearchField) -> Vec<String> {
    match field {
        SearchField::Album => track.album.iter().map(|album| album.name.clone()).collect(),
        SearchField::AlbumArtist => track
            .album
            .iter()
            .flat_map(|album| names(&album.artists))
            .collect(),
        SearchField::Artist => names(&track.artists).collect(),
        SearchField::Comment => track.comment.iter().cloned().collect(),
        SearchField::Composer => names(&track.composers).collect(),
        SearchField::Date => track.date.iter().cloned().collect(),
        SearchField::Uri => vec![track.uri.clone()],
        SearchField::Genre => track.genre.iter().cloned().collect(),
        SearchField::Performer => names(&track.performers).collect(),
        SearchField::TrackName => track.name.iter().cloned().collect(),
        SearchField::TrackNo => track.track_no.iter().map(u32::to_string).collect(),
        SearchField::Any => [
            SearchField::Album,
            SearchField::AlbumArtist,
            SearchField::Artist,
            SearchField::Comment,
            SearchField::Composer,
            SearchField::Date,
            SearchField::Uri,
            SearchField::Genre,
            SearchField::Performer,
            SearchField::TrackName,
            SearchField::TrackNo,
        ]
        .into_iter()
        .flat_map(|inner| field_values(track, inner))
        .collect(),
    }
}
