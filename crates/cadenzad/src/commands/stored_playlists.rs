//! Stored playlist commands.
//!
//! Clients address playlists by name. Names are derived from the store's
//! listing on every request: `/` becomes `|`, and a clash gains a ` [n]`
//! suffix starting at 2.

use std::collections::BTreeSet;

use cadenza_core::{Core, Playlist, Track, uri_scheme};
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::protocol::DISPATCH_TARGET;
use crate::protocol::ack::AckError;
use crate::protocol::dispatcher::Dispatcher;
use crate::protocol::registry::{
    Args, CommandSpec, Registry, RegistryError, SongRange, Validator, Value,
};
use crate::protocol::reply::Reply;
use crate::protocol::translator::{iso_timestamp, tracks_reply};

pub(super) fn register(registry: &mut Registry) -> Result<(), RegistryError> {
    registry.add(CommandSpec::new("listplaylist", listplaylist).required("name"))?;
    registry.add(CommandSpec::new("listplaylistinfo", listplaylistinfo).required("name"))?;
    registry.add(CommandSpec::new("listplaylists", listplaylists))?;
    registry.add(
        CommandSpec::new("load", load)
            .required("name")
            .defaulted(
                "range",
                Value::Range(SongRange {
                    start: 0,
                    end: None,
                }),
            )
            .validate("range", Validator::Range),
    )?;
    registry.add(
        CommandSpec::new("playlistadd", playlistadd)
            .required("name")
            .required("uri"),
    )?;
    registry.add(CommandSpec::new("playlistclear", playlistclear).required("name"))?;
    registry.add(
        CommandSpec::new("playlistdelete", playlistdelete)
            .required("name")
            .required("songpos")
            .validate("songpos", Validator::Uint),
    )?;
    registry.add(
        CommandSpec::new("playlistmove", playlistmove)
            .required("name")
            .required("from")
            .required("to")
            .validate("from", Validator::Uint)
            .validate("to", Validator::Uint),
    )?;
    registry.add(
        CommandSpec::new("rename", rename)
            .required("old_name")
            .required("new_name"),
    )?;
    registry.add(CommandSpec::new("rm", rm).required("name"))?;
    registry.add(CommandSpec::new("save", save).required("name"))?;
    Ok(())
}

fn no_such_playlist() -> AckError {
    AckError::no_exist("No such playlist")
}

fn bad_index() -> AckError {
    AckError::arg("Bad song index")
}

fn check_name(name: &str) -> Result<(), AckError> {
    if name.contains(['/', '\n', '\r']) {
        return Err(AckError::invalid_playlist_name());
    }
    Ok(())
}

/// `(name, uri)` for every named playlist, in store order.
fn playlist_names(core: &Core) -> Vec<(String, String)> {
    let mut names: Vec<(String, String)> = Vec::new();
    for entry in core.playlists().as_list() {
        if entry.name.is_empty() {
            continue;
        }
        let base = entry.name.replace('/', "|");
        let mut name = base.clone();
        let mut suffix = 2_u32;
        while names.iter().any(|(taken, _)| *taken == name) {
            name = format!("{base} [{suffix}]");
            suffix += 1;
        }
        names.push((name, entry.uri));
    }
    names
}

fn uri_for_name(core: &Core, name: &str) -> Option<String> {
    playlist_names(core)
        .into_iter()
        .find_map(|(candidate, uri)| (candidate == name).then_some(uri))
}

/// The stored playlist a client calls `name`.
pub(super) fn lookup_by_name(core: &Core, name: &str) -> Option<Playlist> {
    uri_for_name(core, name).and_then(|uri| core.playlists().lookup(&uri))
}

fn save_or_fail(core: &mut Core, playlist: Playlist) -> Result<(), AckError> {
    let scheme = uri_scheme(&playlist.uri).to_owned();
    core.save_playlist(playlist)
        .map(drop)
        .ok_or_else(|| AckError::failed_to_save_playlist(&scheme))
}

/// Creates `name` holding `tracks`, preferring a store that serves one of the
/// tracks' own schemes and falling back to `fallback`.
fn create_with_tracks(
    core: &mut Core,
    name: &str,
    tracks: Vec<Track>,
    fallback: &str,
) -> Result<(), AckError> {
    let schemes: BTreeSet<String> = tracks.iter().map(|track| track.scheme().to_owned()).collect();
    for scheme in &schemes {
        let Some(mut playlist) = core.create_playlist(name, Some(scheme)) else {
            debug!(target: DISPATCH_TARGET, %scheme, "scheme cannot host playlists");
            continue;
        };
        playlist.tracks.clone_from(&tracks);
        if core.save_playlist(playlist).is_some() {
            return Ok(());
        }
    }
    let Some(mut playlist) = core.create_playlist(name, Some(fallback)) else {
        warn!(target: DISPATCH_TARGET, scheme = fallback, "default playlist scheme cannot create playlists");
        return Err(AckError::failed_to_save_playlist(fallback));
    };
    playlist.tracks = tracks;
    save_or_fail(core, playlist)
}

fn fallback_scheme(dispatcher: &Dispatcher) -> String {
    dispatcher.settings().default_playlist_scheme.clone()
}

fn existing(dispatcher: &Dispatcher, name: &str) -> Result<Playlist, AckError> {
    let name = name.to_owned();
    dispatcher
        .core(move |core| lookup_by_name(core, &name))?
        .ok_or_else(no_such_playlist)
}

fn listplaylist(dispatcher: &mut Dispatcher, args: &Args) -> Result<Reply, AckError> {
    let playlist = existing(dispatcher, args.text("name")?)?;
    Ok(playlist
        .tracks
        .into_iter()
        .map(|track| ("file", track.uri))
        .collect())
}

fn listplaylistinfo(dispatcher: &mut Dispatcher, args: &Args) -> Result<Reply, AckError> {
    let playlist = existing(dispatcher, args.text("name")?)?;
    Ok(tracks_reply(&playlist.tracks))
}

/// `playlist:` and `Last-Modified:` lines for every stored playlist.
pub(super) fn playlists_reply(dispatcher: &Dispatcher) -> Result<Reply, AckError> {
    let names = dispatcher.core(|core| playlist_names(core))?;
    let modified = iso_timestamp(OffsetDateTime::now_utc().unix_timestamp()).unwrap_or_default();
    let mut reply = Reply::default();
    for (name, _) in names {
        reply.push_field("playlist", name);
        reply.push_field("Last-Modified", &modified);
    }
    Ok(reply)
}

fn listplaylists(dispatcher: &mut Dispatcher, _: &Args) -> Result<Reply, AckError> {
    playlists_reply(dispatcher)
}

/// Appends a slice of the playlist to the tracklist; out-of-range bounds are
/// clamped.
fn load(dispatcher: &mut Dispatcher, args: &Args) -> Result<Reply, AckError> {
    let name = args.text("name")?.to_owned();
    let range = args.range("range")?;
    dispatcher.core(move |core| {
        let playlist = lookup_by_name(core, &name).ok_or_else(no_such_playlist)?;
        let length = playlist.tracks.len();
        let end = range.end_or(length).min(length);
        let start = range.start.min(end);
        let tracks = playlist
            .tracks
            .into_iter()
            .skip(start)
            .take(end - start)
            .collect();
        core.add_tracks(tracks, None);
        Ok::<(), AckError>(())
    })??;
    Ok(Reply::default())
}

fn playlistadd(dispatcher: &mut Dispatcher, args: &Args) -> Result<Reply, AckError> {
    let name = args.text("name")?.to_owned();
    check_name(&name)?;
    let uri = args.text("uri")?.to_owned();
    let fallback = fallback_scheme(dispatcher);
    dispatcher.core(move |core| {
        let added = core.library().lookup(&uri);
        let Some(mut playlist) = lookup_by_name(core, &name) else {
            return create_with_tracks(core, &name, added, &fallback);
        };
        let playlist_scheme = uri_scheme(&playlist.uri).to_owned();
        playlist.tracks.extend(added);
        core.save_playlist(playlist).map(drop).ok_or_else(|| {
            AckError::invalid_track_for_playlist(&playlist_scheme, uri_scheme(&uri))
        })
    })??;
    Ok(Reply::default())
}

/// Empties the playlist, creating it when missing.
fn playlistclear(dispatcher: &mut Dispatcher, args: &Args) -> Result<Reply, AckError> {
    let name = args.text("name")?.to_owned();
    check_name(&name)?;
    let fallback = fallback_scheme(dispatcher);
    dispatcher.core(move |core| {
        let found = lookup_by_name(core, &name);
        let Some(mut playlist) = found.or_else(|| core.create_playlist(&name, None)) else {
            return Err(AckError::failed_to_save_playlist(&fallback));
        };
        playlist.tracks.clear();
        save_or_fail(core, playlist)
    })??;
    Ok(Reply::default())
}

/// Loads the playlist `name`, applies `edit` to its tracks, and saves it.
fn edit_tracks(
    dispatcher: &Dispatcher,
    name: &str,
    edit: impl FnOnce(&mut Vec<Track>) -> Result<(), AckError> + Send + 'static,
) -> Result<(), AckError> {
    check_name(name)?;
    let name = name.to_owned();
    dispatcher.core(move |core| {
        let mut playlist = lookup_by_name(core, &name).ok_or_else(no_such_playlist)?;
        edit(&mut playlist.tracks)?;
        save_or_fail(core, playlist)
    })?
}

fn playlistdelete(dispatcher: &mut Dispatcher, args: &Args) -> Result<Reply, AckError> {
    let position = args.position("songpos")?;
    edit_tracks(dispatcher, args.text("name")?, move |tracks| {
        if position >= tracks.len() {
            return Err(bad_index());
        }
        tracks.remove(position);
        Ok(())
    })?;
    Ok(Reply::default())
}

fn playlistmove(dispatcher: &mut Dispatcher, args: &Args) -> Result<Reply, AckError> {
    let from = args.position("from")?;
    let to = args.position("to")?;
    if from == to {
        return Ok(Reply::default());
    }
    edit_tracks(dispatcher, args.text("name")?, move |tracks| {
        if from >= tracks.len() {
            return Err(bad_index());
        }
        let track = tracks.remove(from);
        tracks.insert(to.min(tracks.len()), track);
        Ok(())
    })?;
    Ok(Reply::default())
}

fn rename(dispatcher: &mut Dispatcher, args: &Args) -> Result<Reply, AckError> {
    let old_name = args.text("old_name")?.to_owned();
    let new_name = args.text("new_name")?.to_owned();
    check_name(&old_name)?;
    check_name(&new_name)?;
    dispatcher.core(move |core| {
        let old = lookup_by_name(core, &old_name).ok_or_else(no_such_playlist)?;
        if lookup_by_name(core, &new_name).is_some() {
            return Err(AckError::exist("Playlist already exists"));
        }
        let scheme = uri_scheme(&old.uri).to_owned();
        let mut renamed = core
            .create_playlist(&new_name, Some(&scheme))
            .ok_or_else(|| AckError::failed_to_save_playlist(&scheme))?;
        renamed.tracks = old.tracks;
        save_or_fail(core, renamed)?;
        core.delete_playlist(&old.uri);
        Ok(())
    })??;
    Ok(Reply::default())
}

fn rm(dispatcher: &mut Dispatcher, args: &Args) -> Result<Reply, AckError> {
    let name = args.text("name")?.to_owned();
    check_name(&name)?;
    dispatcher.core(move |core| {
        let uri = uri_for_name(core, &name).ok_or_else(no_such_playlist)?;
        core.delete_playlist(&uri);
        Ok::<(), AckError>(())
    })??;
    Ok(Reply::default())
}

/// Stores the tracklist under `name`, overwriting an existing playlist.
fn save(dispatcher: &mut Dispatcher, args: &Args) -> Result<Reply, AckError> {
    let name = args.text("name")?.to_owned();
    check_name(&name)?;
    let fallback = fallback_scheme(dispatcher);
    dispatcher.core(move |core| {
        let tracks: Vec<Track> = core
            .tracklist()
            .tl_tracks()
            .iter()
            .map(|entry| Track::clone(&entry.track))
            .collect();
        match lookup_by_name(core, &name) {
            Some(mut playlist) => {
                playlist.tracks = tracks;
                save_or_fail(core, playlist)
            }
            None => create_with_tracks(core, &name, tracks, &fallback),
        }
    })??;
    Ok(Reply::default())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use cadenza_core::{
        Collaborators, Core, MemoryLibrary, MemoryPlaylistStore, NullListener, PlaylistStore,
        Ref,
    };
    use rstest::{fixture, rstest};

    use super::*;
    use crate::commands::test_support::{Harness, dummy_tracks};

    #[fixture]
    fn harness() -> Harness {
        let mut harness = Harness::with_library(dummy_tracks(4));
        for index in 0..3 {
            harness.ok(&format!("add dummy:{index}"));
        }
        harness.ok("save mix");
        harness
    }

    fn listing(harness: &mut Harness, name: &str) -> Vec<String> {
        harness.ok(&format!("listplaylist {name}"))
    }

    #[rstest]
    fn save_stores_the_tracklist(mut harness: Harness) {
        assert_eq!(
            listing(&mut harness, "mix"),
            ["file: dummy:0", "file: dummy:1", "file: dummy:2"]
        );
        let info = harness.ok("listplaylistinfo mix");
        assert!(info.iter().any(|line| line == "Title: Track 1"));
        assert!(!info.iter().any(|line| line.starts_with("Pos: ")));
    }

    #[rstest]
    fn save_overwrites_an_existing_playlist(mut harness: Harness) {
        harness.ok("delete 0");
        harness.ok("save mix");
        assert_eq!(
            listing(&mut harness, "mix"),
            ["file: dummy:1", "file: dummy:2"]
        );
    }

    #[rstest]
    fn listplaylists_prints_names_with_timestamps(mut harness: Harness) {
        let lines = harness.ok("listplaylists");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "playlist: mix");
        let stamp = lines[1]
            .strip_prefix("Last-Modified: ")
            .expect("timestamp line");
        assert!(stamp.ends_with('Z') && stamp.len() == 20, "{stamp}");
    }

    #[rstest]
    #[case("load mix", 6)]
    #[case("load mix 1:", 5)]
    #[case("load mix 1:2", 4)]
    #[case("load mix 2:9", 4)]
    fn load_appends_a_slice(mut harness: Harness, #[case] line: &str, #[case] length: usize) {
        harness.ok(line);
        assert_eq!(
            harness.field("status", "playlistlength"),
            Some(length.to_string())
        );
    }

    #[rstest]
    #[case("listplaylist gone")]
    #[case("listplaylistinfo gone")]
    #[case("load gone")]
    #[case("playlistdelete gone 0")]
    #[case("rm gone")]
    #[case("rename gone other")]
    fn missing_playlists_are_reported(mut harness: Harness, #[case] line: &str) {
        let command = line.split(' ').next().unwrap_or_default();
        assert_eq!(
            harness.send(line),
            [format!("ACK [50@0] {{{command}}} No such playlist")]
        );
    }

    #[rstest]
    fn playlistadd_extends_or_creates(mut harness: Harness) {
        harness.ok("playlistadd mix dummy:3");
        assert_eq!(listing(&mut harness, "mix").len(), 4);
        harness.ok("playlistadd fresh dummy:3");
        assert_eq!(listing(&mut harness, "fresh"), ["file: dummy:3"]);
    }

    #[rstest]
    fn playlistclear_empties_or_creates(mut harness: Harness) {
        harness.ok("playlistclear mix");
        assert!(listing(&mut harness, "mix").is_empty());
        harness.ok("playlistclear blank");
        assert!(listing(&mut harness, "blank").is_empty());
    }

    #[rstest]
    fn playlistdelete_and_playlistmove_edit_in_place(mut harness: Harness) {
        harness.ok("playlistdelete mix 1");
        assert_eq!(
            listing(&mut harness, "mix"),
            ["file: dummy:0", "file: dummy:2"]
        );
        harness.ok("playlistmove mix 0 1");
        assert_eq!(
            listing(&mut harness, "mix"),
            ["file: dummy:2", "file: dummy:0"]
        );
        assert_eq!(
            harness.send("playlistdelete mix 5"),
            ["ACK [2@0] {playlistdelete} Bad song index"]
        );
        assert_eq!(
            harness.send("playlistmove mix 7 0"),
            ["ACK [2@0] {playlistmove} Bad song index"]
        );
    }

    #[rstest]
    fn playlistmove_to_the_same_place_skips_the_lookup(mut harness: Harness) {
        assert_eq!(harness.send("playlistmove gone 1 1"), ["OK"]);
    }

    #[rstest]
    fn rename_moves_tracks_and_refuses_clobbering(mut harness: Harness) {
        harness.ok("playlistclear other");
        assert_eq!(
            harness.send("rename mix other"),
            ["ACK [56@0] {rename} Playlist already exists"]
        );
        harness.ok("rename mix renamed");
        assert_eq!(listing(&mut harness, "renamed").len(), 3);
        assert_eq!(
            harness.send("listplaylist mix"),
            ["ACK [50@0] {listplaylist} No such playlist"]
        );
    }

    #[rstest]
    fn rm_deletes(mut harness: Harness) {
        harness.ok("rm mix");
        assert!(harness.ok("listplaylists").is_empty());
    }

    #[rstest]
    #[case("save a/b")]
    #[case("playlistadd x/y dummy:0")]
    #[case("rename mix bad/name")]
    fn names_with_separators_are_rejected(mut harness: Harness, #[case] line: &str) {
        let reply = harness.send(line);
        assert_eq!(reply.len(), 1);
        assert!(
            reply[0].ends_with(
                "playlist name is invalid: playlist names may not contain slashes, newlines or carriage returns"
            ),
            "{reply:?}"
        );
        assert!(reply[0].starts_with("ACK [2@0]"));
    }

    #[test]
    fn fallback_failure_is_reported() {
        let mut harness = Harness::new(Collaborators {
            library: Box::new(MemoryLibrary::new(dummy_tracks(1))),
            playlists: Box::new(MemoryPlaylistStore::new("other")),
            ..Collaborators::default()
        });
        harness.ok("add dummy:0");
        assert_eq!(
            harness.send("save mix"),
            ["ACK [0@0] {save} Backend with scheme \"m3u\" failed to save playlist"]
        );
    }

    /// Store whose listing reports duplicate and slash-bearing names.
    struct Crowded(MemoryPlaylistStore);

    impl PlaylistStore for Crowded {
        fn as_list(&self) -> Vec<Ref> {
            vec![
                Ref::playlist("m3u:one", "a/b"),
                Ref::playlist("m3u:two", "a/b"),
                Ref::playlist("m3u:three", ""),
            ]
        }

        fn lookup(&self, uri: &str) -> Option<Playlist> {
            self.0.lookup(uri)
        }

        fn create(&mut self, name: &str, scheme: Option<&str>) -> Option<Playlist> {
            self.0.create(name, scheme)
        }

        fn save(&mut self, playlist: Playlist) -> Option<Playlist> {
            self.0.save(playlist)
        }

        fn delete(&mut self, uri: &str) -> bool {
            self.0.delete(uri)
        }
    }

    #[test]
    fn clashing_names_gain_suffixes() {
        let core = Core::new(
            Collaborators {
                playlists: Box::new(Crowded(MemoryPlaylistStore::new("m3u"))),
                ..Collaborators::default()
            },
            Arc::new(NullListener),
        );
        assert_eq!(
            playlist_names(&core),
            [
                ("a|b".to_owned(), "m3u:one".to_owned()),
                ("a|b [2]".to_owned(), "m3u:two".to_owned()),
            ]
        );
        assert_eq!(uri_for_name(&core, "a|b [2]").as_deref(), Some("m3u:two"));
    }
}
