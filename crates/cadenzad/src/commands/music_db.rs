//! Music database commands: searching, listing, and browsing the library by
//! path.

use cadenza_core::{Library, RefKind, SearchField, Track};

use super::stored_playlists;
use crate::protocol::ack::AckError;
use crate::protocol::dispatcher::Dispatcher;
use crate::protocol::registry::{Args, CommandSpec, Registry, RegistryError};
use crate::protocol::reply::Reply;
use crate::protocol::translator::{track_reply, tracks_reply};

pub(super) fn register(registry: &mut Registry) -> Result<(), RegistryError> {
    registry.add(CommandSpec::new("count", count).variadic())?;
    registry.add(CommandSpec::new("find", find).variadic())?;
    registry.add(CommandSpec::new("findadd", findadd).variadic())?;
    registry.add(CommandSpec::new("list", list).variadic())?;
    registry.add(CommandSpec::new("listall", listall).optional("uri"))?;
    registry.add(CommandSpec::new("listallinfo", listallinfo).optional("uri"))?;
    registry.add(CommandSpec::new("listfiles", listfiles).optional("uri"))?;
    registry.add(CommandSpec::new("lsinfo", lsinfo).optional("uri"))?;
    registry.add(CommandSpec::new("rescan", update).optional("uri"))?;
    registry.add(CommandSpec::new("search", search).variadic())?;
    registry.add(CommandSpec::new("searchadd", searchadd).variadic())?;
    registry.add(CommandSpec::new("searchaddpl", searchaddpl).variadic())?;
    registry.add(CommandSpec::new("update", update).optional("uri"))?;
    Ok(())
}

fn incorrect_arguments() -> AckError {
    AckError::arg("incorrect arguments")
}

fn not_found() -> AckError {
    AckError::no_exist("Not found")
}

/// Field names accepted by `find`, `search`, and `count`.
fn search_field(name: &str) -> Option<SearchField> {
    Some(match name {
        "album" => SearchField::Album,
        "albumartist" => SearchField::AlbumArtist,
        "any" => SearchField::Any,
        "artist" => SearchField::Artist,
        "comment" => SearchField::Comment,
        "composer" => SearchField::Composer,
        "date" => SearchField::Date,
        "file" | "filename" => SearchField::Uri,
        "genre" => SearchField::Genre,
        "performer" => SearchField::Performer,
        "title" => SearchField::TrackName,
        "track" => SearchField::TrackNo,
        _ => return None,
    })
}

/// Field names accepted by `list`.
fn list_field(name: &str) -> Option<SearchField> {
    Some(match name {
        "title" => SearchField::TrackName,
        "album" => SearchField::Album,
        "albumartist" => SearchField::AlbumArtist,
        "artist" => SearchField::Artist,
        "composer" => SearchField::Composer,
        "date" => SearchField::Date,
        "genre" => SearchField::Genre,
        "performer" => SearchField::Performer,
        _ => return None,
    })
}

/// Tag name `list` prints for `field`.
const fn list_tag(field: SearchField) -> &'static str {
    match field {
        SearchField::TrackName => "Title",
        SearchField::Album => "Album",
        SearchField::AlbumArtist => "AlbumArtist",
        SearchField::Artist => "Artist",
        SearchField::Composer => "Composer",
        SearchField::Date => "Date",
        SearchField::Genre => "Genre",
        SearchField::Performer => "Performer",
        SearchField::Any | SearchField::Comment | SearchField::Uri | SearchField::TrackNo => "",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QueryError {
    /// A field name is not recognised.
    UnknownField,
    /// The last field has no value.
    MissingValue,
}

type OwnedQuery = Vec<(SearchField, String)>;

/// Parses `field value` pairs; field names are case-insensitive and blank
/// values are dropped.
fn parse_query(
    params: &[String],
    field_for: fn(&str) -> Option<SearchField>,
) -> Result<OwnedQuery, QueryError> {
    let mut query = Vec::new();
    let mut pairs = params.iter();
    while let Some(name) = pairs.next() {
        let field = field_for(&name.to_lowercase()).ok_or(QueryError::UnknownField)?;
        let value = pairs.next().ok_or(QueryError::MissingValue)?;
        if !value.trim().is_empty() {
            query.push((field, value.clone()));
        }
    }
    Ok(query)
}

/// Parses a search query; a missing trailing value yields `Ok(None)`, which
/// callers answer with an empty response.
fn search_query(params: &[String]) -> Result<Option<OwnedQuery>, AckError> {
    match parse_query(params, search_field) {
        Ok(query) => Ok(Some(query)),
        Err(QueryError::MissingValue) => Ok(None),
        Err(QueryError::UnknownField) => Err(incorrect_arguments()),
    }
}

fn run_search(
    dispatcher: &Dispatcher,
    query: OwnedQuery,
    exact: bool,
) -> Result<Vec<Track>, AckError> {
    dispatcher.core(move |core| core.library().search(&query, exact))
}

fn count(dispatcher: &mut Dispatcher, args: &Args) -> Result<Reply, AckError> {
    let query = parse_query(args.rest(), search_field).map_err(|_| incorrect_arguments())?;
    let tracks = run_search(dispatcher, query, true)?;
    let millis: u64 = tracks.iter().filter_map(|track| track.length).sum();
    let mut reply = Reply::field("songs", tracks.len());
    reply.push_field("playtime", millis / 1000);
    Ok(reply)
}

fn find(dispatcher: &mut Dispatcher, args: &Args) -> Result<Reply, AckError> {
    let Some(query) = search_query(args.rest())? else {
        return Ok(Reply::default());
    };
    Ok(tracks_reply(&run_search(dispatcher, query, true)?))
}

fn search(dispatcher: &mut Dispatcher, args: &Args) -> Result<Reply, AckError> {
    let Some(query) = search_query(args.rest())? else {
        return Ok(Reply::default());
    };
    Ok(tracks_reply(&run_search(dispatcher, query, false)?))
}

fn search_and_add(dispatcher: &Dispatcher, args: &Args, exact: bool) -> Result<Reply, AckError> {
    let Some(query) = search_query(args.rest())? else {
        return Ok(Reply::default());
    };
    dispatcher.core(move |core| {
        let tracks = core.library().search(&query, exact);
        core.add_tracks(tracks, None);
    })?;
    Ok(Reply::default())
}

fn findadd(dispatcher: &mut Dispatcher, args: &Args) -> Result<Reply, AckError> {
    search_and_add(dispatcher, args, true)
}

fn searchadd(dispatcher: &mut Dispatcher, args: &Args) -> Result<Reply, AckError> {
    search_and_add(dispatcher, args, false)
}

/// Appends search results to a stored playlist, creating it when missing.
fn searchaddpl(dispatcher: &mut Dispatcher, args: &Args) -> Result<Reply, AckError> {
    let Some((name, params)) = args.rest().split_first() else {
        return Err(incorrect_arguments());
    };
    let Some(query) = search_query(params)? else {
        return Ok(Reply::default());
    };
    let name = name.clone();
    let fallback = dispatcher.settings().default_playlist_scheme.clone();
    dispatcher.core(move |core| {
        let results = core.library().search(&query, false);
        let existing = stored_playlists::lookup_by_name(core, &name);
        let Some(mut playlist) = existing.or_else(|| core.create_playlist(&name, None)) else {
            return Err(AckError::failed_to_save_playlist(&fallback));
        };
        playlist.tracks.extend(results);
        core.save_playlist(playlist);
        Ok(())
    })??;
    Ok(Reply::default())
}

fn list(dispatcher: &mut Dispatcher, args: &Args) -> Result<Reply, AckError> {
    let Some((field_name, params)) = args.rest().split_first() else {
        return Err(incorrect_arguments());
    };
    let field = list_field(&field_name.to_lowercase()).ok_or_else(incorrect_arguments)?;
    let query = if let [artist] = params {
        if field != SearchField::Album {
            return Err(AckError::arg("should be \"Album\" for 3 arguments"));
        }
        if artist.trim().is_empty() {
            Vec::new()
        } else {
            vec![(SearchField::Artist, artist.clone())]
        }
    } else {
        match parse_query(params, list_field) {
            Ok(query) => query,
            Err(QueryError::UnknownField) => return Err(AckError::arg("not able to parse args")),
            Err(QueryError::MissingValue) => return Ok(Reply::default()),
        }
    };
    let values = dispatcher.core(move |core| core.library().distinct(field, &query))?;
    let tag = list_tag(field);
    Ok(values.into_iter().map(|value| (tag, value)).collect())
}

/// An entry found while walking the library by path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum BrowseEntry {
    Directory(String),
    Track { path: String, uri: String },
}

/// Resolves `path` by matching directory names from the library root, then
/// lists what lies below it. `None` when a path segment names nothing.
fn walk(library: &dyn Library, path: &str, recursive: bool) -> Option<Vec<BrowseEntry>> {
    let parts: Vec<&str> = path.split('/').filter(|part| !part.is_empty()).collect();
    let root_path: String = parts.iter().map(|part| format!("/{part}")).collect();
    let mut uri = None;
    for part in &parts {
        let found = library
            .browse(uri.as_deref())
            .into_iter()
            .find(|entry| entry.kind != RefKind::Track && entry.name == *part)?;
        uri = Some(found.uri);
    }

    let mut entries = Vec::new();
    if recursive && !root_path.is_empty() {
        entries.push(BrowseEntry::Directory(root_path.clone()));
    }
    let mut pending = vec![(root_path, uri)];
    while let Some((base, uri)) = pending.pop() {
        for item in library.browse(uri.as_deref()) {
            let path = format!("{base}/{}", item.name.replace('/', ""));
            if item.kind == RefKind::Track {
                entries.push(BrowseEntry::Track {
                    path,
                    uri: item.uri,
                });
                continue;
            }
            entries.push(BrowseEntry::Directory(path.clone()));
            if recursive {
                pending.push((path, Some(item.uri)));
            }
        }
    }
    Some(entries)
}

/// Walks the library below `path`; `Ok(None)` when the path does not exist.
pub(super) fn browse(
    dispatcher: &Dispatcher,
    path: Option<&str>,
    recursive: bool,
) -> Result<Option<Vec<BrowseEntry>>, AckError> {
    let path = path.unwrap_or_default().to_owned();
    dispatcher.core(move |core| walk(core.library(), &path, recursive))
}

/// A browse entry with its tracks looked up.
enum Listing {
    Directory(String),
    Tracks(Vec<Track>),
}

fn browse_with_tracks(
    dispatcher: &Dispatcher,
    path: Option<&str>,
    recursive: bool,
) -> Result<Vec<Listing>, AckError> {
    let path = path.unwrap_or_default().to_owned();
    dispatcher
        .core(move |core| {
            let library = core.library();
            walk(library, &path, recursive).map(|entries| {
                entries
                    .into_iter()
                    .map(|entry| match entry {
                        BrowseEntry::Directory(path) => Listing::Directory(path),
                        BrowseEntry::Track { uri, .. } => Listing::Tracks(library.lookup(&uri)),
                    })
                    .collect::<Vec<_>>()
            })
        })?
        .ok_or_else(not_found)
}

fn listall(dispatcher: &mut Dispatcher, args: &Args) -> Result<Reply, AckError> {
    let entries = browse(dispatcher, args.opt_text("uri"), true)?.ok_or_else(not_found)?;
    if entries.is_empty() {
        return Err(not_found());
    }
    let mut reply = Reply::default();
    for entry in entries {
        match entry {
            BrowseEntry::Directory(path) => reply.push_field("directory", path),
            BrowseEntry::Track { uri, .. } => reply.push_field("file", uri),
        }
    }
    Ok(reply)
}

fn listallinfo(dispatcher: &mut Dispatcher, args: &Args) -> Result<Reply, AckError> {
    let mut reply = Reply::default();
    for listing in browse_with_tracks(dispatcher, args.opt_text("uri"), true)? {
        match listing {
            Listing::Directory(path) => reply.push_field("directory", path),
            Listing::Tracks(tracks) => reply.append(tracks_reply(&tracks)),
        }
    }
    Ok(reply)
}

fn listfiles(_: &mut Dispatcher, _: &Args) -> Result<Reply, AckError> {
    Err(AckError::not_implemented())
}

/// Lists one directory level; the root also lists stored playlists.
fn lsinfo(dispatcher: &mut Dispatcher, args: &Args) -> Result<Reply, AckError> {
    let uri = args.opt_text("uri");
    let mut reply = Reply::default();
    for listing in browse_with_tracks(dispatcher, uri, false)? {
        match listing {
            Listing::Directory(path) => {
                reply.push_field("directory", path.trim_start_matches('/'));
            }
            Listing::Tracks(tracks) => {
                if let Some(track) = tracks.first() {
                    reply.append(track_reply(track, None));
                }
            }
        }
    }
    if matches!(uri, None | Some("" | "/")) {
        reply.append(stored_playlists::playlists_reply(dispatcher)?);
    }
    Ok(reply)
}

fn update(_: &mut Dispatcher, _: &Args) -> Result<Reply, AckError> {
    Ok(Reply::field("updating_db", 0))
}
