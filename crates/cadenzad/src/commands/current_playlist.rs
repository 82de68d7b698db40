//! Current playlist (tracklist) commands.

use cadenza_core::{TlTrack, Tlid, uri_scheme};

use super::music_db::{self, BrowseEntry};
use crate::protocol::ack::AckError;
use crate::protocol::dispatcher::Dispatcher;
use crate::protocol::registry::{Args, CommandSpec, Registry, RegistryError, Validator, Value};
use crate::protocol::reply::Reply;
use crate::protocol::translator::{tl_tracks_reply, track_reply};

pub(super) fn register(registry: &mut Registry) -> Result<(), RegistryError> {
    registry.add(CommandSpec::new("add", add).required("uri"))?;
    registry.add(
        CommandSpec::new("addid", addid)
            .required("uri")
            .optional("songpos")
            .validate("songpos", Validator::Uint),
    )?;
    registry.add(
        CommandSpec::new("addtagid", not_implemented)
            .required("tlid")
            .required("tag")
            .required("value")
            .validate("tlid", Validator::Uint),
    )?;
    registry.add(CommandSpec::new("clear", clear))?;
    registry.add(
        CommandSpec::new("cleartagid", not_implemented)
            .required("tlid")
            .required("tag")
            .validate("tlid", Validator::Uint),
    )?;
    registry.add(
        CommandSpec::new("delete", delete)
            .required("songrange")
            .validate("songrange", Validator::Range),
    )?;
    registry.add(
        CommandSpec::new("deleteid", deleteid)
            .required("tlid")
            .validate("tlid", Validator::Uint),
    )?;
    registry.add(
        CommandSpec::new("move", move_range)
            .required("songrange")
            .required("to")
            .validate("songrange", Validator::Range)
            .validate("to", Validator::Uint),
    )?;
    registry.add(
        CommandSpec::new("moveid", moveid)
            .required("tlid")
            .required("to")
            .validate("tlid", Validator::Uint)
            .validate("to", Validator::Uint),
    )?;
    registry.add(CommandSpec::new("playlist", playlistinfo).optional("parameter"))?;
    registry.add(
        CommandSpec::new("playlistfind", playlistfind)
            .required("tag")
            .required("needle"),
    )?;
    registry.add(
        CommandSpec::new("playlistid", playlistid)
            .optional("tlid")
            .validate("tlid", Validator::Uint),
    )?;
    registry.add(CommandSpec::new("playlistinfo", playlistinfo).optional("parameter"))?;
    registry.add(
        CommandSpec::new("playlistsearch", not_implemented)
            .required("tag")
            .required("needle"),
    )?;
    registry.add(
        CommandSpec::new("plchanges", plchanges)
            .required("version")
            .validate("version", Validator::Int),
    )?;
    registry.add(
        CommandSpec::new("plchangesposid", plchangesposid)
            .required("version")
            .validate("version", Validator::Int),
    )?;
    registry.add(
        CommandSpec::new("prio", not_implemented)
            .required("priority")
            .required("position")
            .validate("priority", Validator::Uint)
            .validate("position", Validator::Range),
    )?;
    registry.add(CommandSpec::new("prioid", not_implemented).variadic())?;
    registry.add(
        CommandSpec::new("rangeid", not_implemented)
            .required("tlid")
            .required("songrange")
            .validate("tlid", Validator::Uint)
            .validate("songrange", Validator::Range),
    )?;
    registry.add(
        CommandSpec::new("shuffle", shuffle)
            .optional("songrange")
            .validate("songrange", Validator::Range),
    )?;
    registry.add(
        CommandSpec::new("swap", swap)
            .required("songpos1")
            .required("songpos2")
            .validate("songpos1", Validator::Uint)
            .validate("songpos2", Validator::Uint),
    )?;
    registry.add(
        CommandSpec::new("swapid", swapid)
            .required("tlid1")
            .required("tlid2")
            .validate("tlid1", Validator::Uint)
            .validate("tlid2", Validator::Uint),
    )?;
    Ok(())
}

fn not_implemented(_: &mut Dispatcher, _: &Args) -> Result<Reply, AckError> {
    Err(AckError::not_implemented())
}

fn no_such_song() -> AckError {
    AckError::no_exist("No such song")
}

fn bad_index() -> AckError {
    AckError::arg("Bad song index")
}

fn not_found() -> AckError {
    AckError::no_exist("directory or file not found")
}

/// Queues a URI directly, or every track below a library path.
fn add(dispatcher: &mut Dispatcher, args: &Args) -> Result<Reply, AckError> {
    let uri = args.text("uri")?;
    if uri.trim_matches('/').is_empty() {
        return Ok(Reply::default());
    }
    if !uri_scheme(uri).is_empty() {
        let uris = vec![uri.to_owned()];
        let added = dispatcher.core(move |core| core.add_uris(&uris, None))?;
        if !added.is_empty() {
            return Ok(Reply::default());
        }
    }
    let uris: Vec<String> = music_db::browse(dispatcher, Some(uri), true)?
        .ok_or_else(not_found)?
        .into_iter()
        .filter_map(|entry| match entry {
            BrowseEntry::Track { uri, .. } => Some(uri),
            BrowseEntry::Directory(_) => None,
        })
        .collect();
    if uris.is_empty() {
        return Err(not_found());
    }
    dispatcher.core(move |core| core.add_uris(&uris, None))?;
    Ok(Reply::default())
}

fn addid(dispatcher: &mut Dispatcher, args: &Args) -> Result<Reply, AckError> {
    let uri = args.text("uri")?;
    if uri.is_empty() {
        return Err(no_such_song());
    }
    let position = args.opt_position("songpos")?;
    let uris = vec![uri.to_owned()];
    let added = dispatcher.core(move |core| {
        if position.is_some_and(|position| position > core.tracklist().len()) {
            return Err(bad_index());
        }
        Ok(core.add_uris(&uris, position))
    })??;
    let first = added.first().ok_or_else(no_such_song)?;
    Ok(Reply::field("Id", first.tlid))
}

fn clear(dispatcher: &mut Dispatcher, _: &Args) -> Result<Reply, AckError> {
    dispatcher.core(|core| core.clear_tracklist())?;
    Ok(Reply::default())
}

fn delete(dispatcher: &mut Dispatcher, args: &Args) -> Result<Reply, AckError> {
    let range = args.range("songrange")?;
    dispatcher.core(move |core| {
        let tlids: Vec<Tlid> = core
            .tracklist()
            .slice(range.start, range.end_or(core.tracklist().len()))
            .iter()
            .map(|entry| entry.tlid)
            .collect();
        if tlids.is_empty() {
            return Err(bad_index());
        }
        core.remove_tlids(&tlids);
        Ok(())
    })??;
    Ok(Reply::default())
}

fn deleteid(dispatcher: &mut Dispatcher, args: &Args) -> Result<Reply, AckError> {
    let tlid = args.uint("tlid")?;
    let removed = dispatcher.core(move |core| core.remove_tlids(&[tlid]))?;
    if removed.is_empty() {
        return Err(no_such_song());
    }
    Ok(Reply::default())
}

fn move_range(dispatcher: &mut Dispatcher, args: &Args) -> Result<Reply, AckError> {
    let range = args.range("songrange")?;
    let to = args.position("to")?;
    dispatcher.core(move |core| {
        let end = range.end_or(core.tracklist().len());
        core.move_tracks(range.start, end, to)
    })??;
    Ok(Reply::default())
}

fn moveid(dispatcher: &mut Dispatcher, args: &Args) -> Result<Reply, AckError> {
    let tlid = args.uint("tlid")?;
    let to = args.position("to")?;
    dispatcher.core(move |core| {
        let position = core.tracklist().index_of(tlid).ok_or_else(no_such_song)?;
        core.move_tracks(position, position + 1, to)
            .map_err(AckError::from)
    })??;
    Ok(Reply::default())
}

/// Looks up `tlid` together with its position.
fn locate(dispatcher: &Dispatcher, tlid: Tlid) -> Result<Option<(usize, TlTrack)>, AckError> {
    dispatcher.core(move |core| {
        let tracklist = core.tracklist();
        let position = tracklist.index_of(tlid)?;
        tracklist.get(position).cloned().map(|entry| (position, entry))
    })
}

/// Only the `filename` tag is supported.
fn playlistfind(dispatcher: &mut Dispatcher, args: &Args) -> Result<Reply, AckError> {
    if args.text("tag")? != "filename" {
        return Err(AckError::not_implemented());
    }
    let needle = args.text("needle")?.to_owned();
    let found = dispatcher.core(move |core| core.tracklist().filter_uri(&needle))?;
    let Some(entry) = found.into_iter().next() else {
        return Ok(Reply::default());
    };
    let Some((position, entry)) = locate(dispatcher, entry.tlid)? else {
        return Ok(Reply::default());
    };
    Ok(track_reply(&entry.track, Some((position, entry.tlid))))
}

fn playlistid(dispatcher: &mut Dispatcher, args: &Args) -> Result<Reply, AckError> {
    let Some(tlid) = args.opt_uint("tlid") else {
        let entries = dispatcher.core(|core| core.tracklist().tl_tracks().to_vec())?;
        return Ok(tl_tracks_reply(&entries, 0));
    };
    let (position, entry) = locate(dispatcher, tlid)?.ok_or_else(no_such_song)?;
    Ok(track_reply(&entry.track, Some((position, entry.tlid))))
}

/// Lists all entries, one position, or a range; `-1` means all.
fn playlistinfo(dispatcher: &mut Dispatcher, args: &Args) -> Result<Reply, AckError> {
    let range = match args.opt_text("parameter") {
        None | Some("-1") => None,
        Some(raw) => match Validator::Range.apply(raw) {
            Some(Value::Range(range)) => Some(range),
            _ => return Err(AckError::arg("incorrect arguments")),
        },
    };
    let entries = dispatcher.core(|core| core.tracklist().tl_tracks().to_vec())?;
    let Some(range) = range else {
        return Ok(tl_tracks_reply(&entries, 0));
    };
    if range.start > entries.len() {
        return Err(bad_index());
    }
    let end = range.end_or(entries.len()).min(entries.len());
    let window = entries.get(range.start..end).unwrap_or_default();
    Ok(tl_tracks_reply(window, range.start))
}

fn is_stale(client: i64, current: u64) -> bool {
    u64::try_from(client).map_or(true, |client| client < current)
}

/// Full resync when the client's version is older than the tracklist's.
fn plchanges(dispatcher: &mut Dispatcher, args: &Args) -> Result<Reply, AckError> {
    let client = args.int("version")?;
    let (version, entries) = dispatcher.core(|core| {
        (
            core.tracklist().version(),
            core.tracklist().tl_tracks().to_vec(),
        )
    })?;
    if !is_stale(client, version) {
        return Ok(Reply::default());
    }
    Ok(tl_tracks_reply(&entries, 0))
}

fn plchangesposid(dispatcher: &mut Dispatcher, args: &Args) -> Result<Reply, AckError> {
    let client = args.int("version")?;
    let (version, tlids) = dispatcher.core(|core| {
        let tracklist = core.tracklist();
        let tlids: Vec<Tlid> = tracklist.tl_tracks().iter().map(|entry| entry.tlid).collect();
        (tracklist.version(), tlids)
    })?;
    if u64::try_from(client).is_ok_and(|client| client == version) {
        return Ok(Reply::default());
    }
    let mut reply = Reply::default();
    for (position, tlid) in tlids.into_iter().enumerate() {
        reply.push_field("cpos", position);
        reply.push_field("Id", tlid);
    }
    Ok(reply)
}

fn shuffle(dispatcher: &mut Dispatcher, args: &Args) -> Result<Reply, AckError> {
    let range = args.opt_range("songrange");
    dispatcher.core(move |core| {
        core.shuffle_tracks(range.map(|range| range.start), range.and_then(|range| range.end))
    })??;
    Ok(Reply::default())
}

fn swap(dispatcher: &mut Dispatcher, args: &Args) -> Result<Reply, AckError> {
    let first = args.position("songpos1")?;
    let second = args.position("songpos2")?;
    dispatcher.core(move |core| core.swap_tracks(first, second))??;
    Ok(Reply::default())
}

fn swapid(dispatcher: &mut Dispatcher, args: &Args) -> Result<Reply, AckError> {
    let first = args.uint("tlid1")?;
    let second = args.uint("tlid2")?;
    dispatcher.core(move |core| {
        let tracklist = core.tracklist();
        let (Some(first), Some(second)) = (tracklist.index_of(first), tracklist.index_of(second))
        else {
            return Err(no_such_song());
        };
        core.swap_tracks(first, second).map_err(AckError::from)
    })??;
    Ok(Reply::default())
}

#[cfg(test)]
mod tests {
    use cadenza_core::{Album, Track};
    use rstest::{fixture, rstest};

    use super::*;
    use crate::commands::test_support::{Harness, dummy_tracks};

    #[fixture]
    fn queued() -> Harness {
        let mut harness = Harness::with_library(dummy_tracks(5));
        for index in 0..3 {
            harness.ok(&format!("add dummy:{index}"));
        }
        harness
    }

    fn uris(harness: &mut Harness) -> Vec<String> {
        harness
            .ok("playlistinfo")
            .into_iter()
            .filter_map(|line| line.strip_prefix("file: ").map(str::to_owned))
            .collect()
    }

    fn ids(harness: &mut Harness) -> Vec<String> {
        harness
            .ok("playlistid")
            .into_iter()
            .filter_map(|line| line.strip_prefix("Id: ").map(str::to_owned))
            .collect()
    }

    #[rstest]
    fn add_queues_uris_and_directories() {
        let album = Album::named("Side");
        let mut harness = Harness::with_library(vec![
            Track::new("dummy:a").with_name("A").with_album(album.clone()),
            Track::new("dummy:b").with_name("B").with_album(album),
        ]);
        harness.ok("add dummy:a");
        harness.ok("add /Side");
        harness.ok("add /");
        assert_eq!(uris(&mut harness), ["dummy:a", "dummy:a", "dummy:b"]);
    }

    #[rstest]
    #[case("add Nowhere")]
    #[case("add dummy:missing")]
    fn add_reports_unknown_paths(mut queued: Harness, #[case] line: &str) {
        assert_eq!(
            queued.send(line),
            ["ACK [50@0] {add} directory or file not found"]
        );
    }

    #[rstest]
    fn addid_returns_the_new_id(mut queued: Harness) {
        assert_eq!(queued.ok("addid dummy:3 0"), ["Id: 3"]);
        assert_eq!(uris(&mut queued)[0], "dummy:3");
        assert_eq!(
            queued.send("addid dummy:4 9"),
            ["ACK [2@0] {addid} Bad song index"]
        );
        assert_eq!(
            queued.send("addid dummy:nope"),
            ["ACK [50@0] {addid} No such song"]
        );
        assert_eq!(
            queued.send("addid \"\""),
            ["ACK [50@0] {addid} No such song"]
        );
    }

    #[rstest]
    fn clear_empties_and_bumps_the_version(mut queued: Harness) {
        let before = queued.field("status", "playlist");
        queued.ok("clear");
        assert!(uris(&mut queued).is_empty());
        assert_ne!(queued.field("status", "playlist"), before);
    }

    #[rstest]
    #[case("delete 1", &["dummy:0", "dummy:2"])]
    #[case("delete 1:", &["dummy:0"])]
    #[case("delete 0:2", &["dummy:2"])]
    #[case("deleteid 2", &["dummy:0", "dummy:1"])]
    fn deleting(mut queued: Harness, #[case] line: &str, #[case] expected: &[&str]) {
        queued.ok(line);
        assert_eq!(uris(&mut queued), expected);
    }

    #[rstest]
    #[case("delete 5", "ACK [2@0] {delete} Bad song index")]
    #[case("deleteid 9", "ACK [50@0] {deleteid} No such song")]
    #[case("move 5 0", "ACK [2@0] {move} Bad song index")]
    #[case("move 0:2 4", "ACK [2@0] {move} Bad song index")]
    #[case("moveid 0 4", "ACK [2@0] {moveid} Bad song index")]
    #[case("moveid 9 0", "ACK [50@0] {moveid} No such song")]
    #[case("swap 0 9", "ACK [2@0] {swap} Bad song index")]
    #[case("swapid 0 9", "ACK [50@0] {swapid} No such song")]
    #[case("playlistid 9", "ACK [50@0] {playlistid} No such song")]
    #[case("playlistinfo 4", "ACK [2@0] {playlistinfo} Bad song index")]
    #[case("playlistinfo x", "ACK [2@0] {playlistinfo} incorrect arguments")]
    #[case("shuffle 2:9", "ACK [2@0] {shuffle} Bad song index")]
    fn rejected_edits(mut queued: Harness, #[case] line: &str, #[case] ack: &str) {
        assert_eq!(queued.send(line), [ack]);
    }

    #[rstest]
    #[case("move 0 2", &["1", "2", "0"])]
    #[case("move 1: 0", &["1", "2", "0"])]
    #[case("moveid 2 0", &["2", "0", "1"])]
    #[case("move 0:2 2", &["2", "0", "1"])]
    #[case("move 0:2 3", &["2", "0", "1"])]
    #[case("moveid 0 3", &["1", "2", "0"])]
    #[case("swap 0 2", &["2", "1", "0"])]
    #[case("swapid 1 2", &["0", "2", "1"])]
    fn reordering_keeps_ids(mut queued: Harness, #[case] line: &str, #[case] expected: &[&str]) {
        queued.ok(line);
        assert_eq!(ids(&mut queued), expected);
    }

    #[rstest]
    fn shuffle_keeps_every_entry(mut queued: Harness) {
        queued.ok("shuffle");
        queued.ok("shuffle 0:2");
        let mut shuffled = ids(&mut queued);
        shuffled.sort();
        assert_eq!(shuffled, ["0", "1", "2"]);
    }

    #[rstest]
    #[case("playlistinfo", &["0", "1", "2"])]
    #[case("playlistinfo -1", &["0", "1", "2"])]
    #[case("playlistinfo 1", &["1"])]
    #[case("playlistinfo 1:", &["1", "2"])]
    #[case("playlistinfo 1:9", &["1", "2"])]
    #[case("playlistinfo 3", &[])]
    #[case("playlist", &["0", "1", "2"])]
    fn playlistinfo_windows(mut queued: Harness, #[case] line: &str, #[case] positions: &[&str]) {
        let listed: Vec<String> = queued
            .ok(line)
            .into_iter()
            .filter_map(|entry| entry.strip_prefix("Pos: ").map(str::to_owned))
            .collect();
        assert_eq!(listed, positions);
    }

    #[rstest]
    fn playlistfind_matches_filenames_only(mut queued: Harness) {
        let found = queued.ok("playlistfind filename dummy:1");
        assert!(found.contains(&"Pos: 1".to_owned()));
        assert!(queued.ok("playlistfind filename dummy:9").is_empty());
        assert_eq!(
            queued.send("playlistfind title x"),
            ["ACK [0@0] {playlistfind} Not implemented"]
        );
    }

    #[rstest]
    fn plchanges_resyncs_older_clients(mut queued: Harness) {
        let version = queued.field("status", "playlist").unwrap_or_default();
        assert!(queued.ok(&format!("plchanges {version}")).is_empty());
        assert_eq!(
            queued
                .ok("plchanges 0")
                .iter()
                .filter(|line| line.starts_with("file: "))
                .count(),
            3
        );
        assert!(queued.ok(&format!("plchangesposid {version}")).is_empty());
        assert_eq!(
            queued.ok("plchangesposid -1"),
            ["cpos: 0", "Id: 0", "cpos: 1", "Id: 1", "cpos: 2", "Id: 2"]
        );
    }

    #[rstest]
    #[case("prio 1 0:1")]
    #[case("prioid 1 2")]
    #[case("rangeid 0 1:2")]
    #[case("addtagid 0 artist x")]
    #[case("cleartagid 0 artist")]
    #[case("playlistsearch title x")]
    fn unsupported_edits(mut queued: Harness, #[case] line: &str) {
        let reply = queued.send(line);
        assert!(reply[0].ends_with("Not implemented"), "{reply:?}");
    }

    #[test]
    fn stale_versions() {
        assert!(is_stale(-1, 0));
        assert!(is_stale(2, 3));
        assert!(!is_stale(3, 3));
        assert!(!is_stale(4, 3));
    }
}
