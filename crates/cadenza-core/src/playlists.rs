//! Stored playlists.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::model::{Playlist, Ref, uri_scheme};

/// Backend holding named, persistent playlists.
pub trait PlaylistStore: Send {
    /// References to every stored playlist, ordered by name.
    fn as_list(&self) -> Vec<Ref>;
    /// Playlist stored under `uri`.
    fn lookup(&self, uri: &str) -> Option<Playlist>;
    /// Creates an empty playlist; `None` when `scheme` is not served here.
    fn create(&mut self, name: &str, scheme: Option<&str>) -> Option<Playlist>;
    /// Replaces the stored copy of `playlist`, returning what was stored.
    fn save(&mut self, playlist: Playlist) -> Option<Playlist>;
    /// Deletes the playlist under `uri`; `false` when there was none.
    fn delete(&mut self, uri: &str) -> bool;
}

/// Playlist store that lives only as long as the process.
#[derive(Debug, Clone)]
pub struct MemoryPlaylistStore {
    scheme: String,
    playlists: BTreeMap<String, Playlist>,
}

impl MemoryPlaylistStore {
    /// Creates an empty store serving `scheme`.
    #[must_use]
    pub fn new(scheme: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            playlists: BTreeMap::new(),
        }
    }
}

impl PlaylistStore for MemoryPlaylistStore {
    fn as_list(&self) -> Vec<Ref> {
        let mut refs: Vec<Ref> = self
            .playlists
            .values()
            .map(|playlist| Ref::playlist(playlist.uri.clone(), playlist.name.clone()))
            .collect();
        refs.sort_by(|left, right| left.name.cmp(&right.name));
        refs
    }

    fn lookup(&self, uri: &str) -> Option<Playlist> {
        self.playlists.get(uri).cloned()
    }

    fn create(&mut self, name: &str, scheme: Option<&str>) -> Option<Playlist> {
        if scheme.is_some_and(|scheme| scheme != self.scheme) {
            return None;
        }
        let playlist = Playlist {
            uri: format!("{}:{name}", self.scheme),
            name: name.to_owned(),
            tracks: Vec::new(),
            last_modified: Some(now_millis()),
        };
        self.playlists
            .insert(playlist.uri.clone(), playlist.clone());
        Some(playlist)
    }

    fn save(&mut self, mut playlist: Playlist) -> Option<Playlist> {
        if uri_scheme(&playlist.uri) != self.scheme {
            return None;
        }
        playlist.last_modified = Some(now_millis());
        self.playlists
            .insert(playlist.uri.clone(), playlist.clone());
        Some(playlist)
    }

    fn delete(&mut self, uri: &str) -> bool {
        self.playlists.remove(uri).is_some()
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}
