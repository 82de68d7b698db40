//! Renders core models as MPD `key: value` blocks.

use std::time::Duration;

use cadenza_core::{Artist, TlTrack, Tlid, Track};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::warn;

use super::DISPATCH_TARGET;
use super::reply::Reply;

/// Tag names every MPD client knows; rendered only when non-empty.
pub(crate) const TAG_TYPES: &[&str] = &[
    "Artist",
    "ArtistSort",
    "Album",
    "AlbumArtist",
    "AlbumArtistSort",
    "Title",
    "Track",
    "Name",
    "Genre",
    "Date",
    "Composer",
    "Performer",
    "Comment",
    "Disc",
    "MUSICBRAINZ_ARTISTID",
    "MUSICBRAINZ_ALBUMID",
    "MUSICBRAINZ_ALBUMARTISTID",
    "MUSICBRAINZ_TRACKID",
];

/// Formats Unix seconds as `YYYY-MM-DDTHH:MM:SSZ`.
pub(crate) fn iso_timestamp(seconds: i64) -> Option<String> {
    OffsetDateTime::from_unix_timestamp(seconds)
        .ok()?
        .format(&Rfc3339)
        .ok()
}

fn joined<'a>(values: impl Iterator<Item = &'a str>) -> String {
    values.collect::<Vec<_>>().join(";")
}

fn names(artists: &[Artist]) -> String {
    joined(artists.iter().map(|artist| artist.name.as_str()))
}

fn musicbrainz_ids(artists: &[Artist]) -> String {
    joined(artists.iter().filter_map(|artist| artist.musicbrainz_id.as_deref()))
}

struct Block(Reply);

impl Block {
    /// Adds a tag line, skipping empty values of well-known tags.
    fn tag(&mut self, key: &str, value: impl ToString) {
        let rendered = value.to_string();
        if rendered.is_empty() && TAG_TYPES.contains(&key) {
            return;
        }
        self.0.push_field(key, rendered);
    }
}

/// Describes one track; `position` adds its `Pos` and `Id` lines.
pub(crate) fn track_reply(track: &Track, position: Option<(usize, Tlid)>) -> Reply {
    if track.uri.is_empty() {
        warn!(target: DISPATCH_TARGET, "ignoring track without uri");
        return Reply::default();
    }
    let mut block = Block(Reply::default());
    let album = track.album.as_ref();
    block.tag("file", &track.uri);
    block.tag(
        "Time",
        Duration::from_millis(track.length.unwrap_or_default()).as_secs(),
    );
    block.tag("Artist", names(&track.artists));
    block.tag("Album", album.map_or("", |album| album.name.as_str()));
    block.tag("Title", track.name.as_deref().unwrap_or_default());
    if let Some(date) = &track.date {
        block.tag("Date", date);
    }
    let track_no = track.track_no.unwrap_or_default();
    match album.and_then(|album| album.num_tracks) {
        Some(total) => block.tag("Track", format!("{track_no}/{total}")),
        None if track_no > 0 => block.tag("Track", track_no),
        None => {}
    }
    if let Some((index, tlid)) = position {
        block.tag("Pos", index);
        block.tag("Id", tlid);
    }
    if let Some(album) = album {
        if let Some(id) = &album.musicbrainz_id {
            block.tag("MUSICBRAINZ_ALBUMID", id);
        }
        if !album.artists.is_empty() {
            block.tag("AlbumArtist", names(&album.artists));
            block.tag("MUSICBRAINZ_ALBUMARTISTID", musicbrainz_ids(&album.artists));
        }
    }
    block.tag("MUSICBRAINZ_ARTISTID", musicbrainz_ids(&track.artists));
    block.tag("Composer", names(&track.composers));
    block.tag("Performer", names(&track.performers));
    if let Some(genre) = &track.genre {
        block.tag("Genre", genre);
    }
    if let Some(disc) = track.disc_no.filter(|disc| *disc > 0) {
        block.tag("Disc", disc);
    }
    if let Some(stamp) = track
        .last_modified
        .filter(|millis| *millis > 0)
        .and_then(|millis| i64::try_from(Duration::from_millis(millis).as_secs()).ok())
        .and_then(iso_timestamp)
    {
        block.tag("Last-Modified", stamp);
    }
    if let Some(id) = &track.musicbrainz_id {
        block.tag("MUSICBRAINZ_TRACKID", id);
    }
    if let Some(uri) = album.and_then(|album| album.uri.as_ref()) {
        block.tag("X-AlbumUri", uri);
    }
    block.0
}

/// Describes queued entries; the first one sits at position `offset`.
pub(crate) fn tl_tracks_reply(entries: &[TlTrack], offset: usize) -> Reply {
    let mut reply = Reply::default();
    for (index, entry) in entries.iter().enumerate() {
        let position = offset.saturating_add(index);
        reply.append(track_reply(&entry.track, Some((position, entry.tlid))));
    }
    reply
}

/// Describes tracks that are not queued.
pub(crate) fn tracks_reply(tracks: &[Track]) -> Reply {
    let mut reply = Reply::default();
    for track in tracks {
        reply.append(track_reply(track, None));
    }
    reply
}

#[cfg(test)]
mod tests {
    use cadenza_core::Album;
    use rstest::rstest;

    use super::*;

    fn full_track() -> Track {
        let album = Album {
            uri: Some("library:album:moon".to_owned()),
            name: "Moon".to_owned(),
            artists: vec![Artist {
                name: "Band".to_owned(),
                musicbrainz_id: Some("band-id".to_owned()),
            }],
            num_tracks: Some(9),
            date: None,
            musicbrainz_id: Some("album-id".to_owned()),
        };
        Track {
            name: Some("Tide".to_owned()),
            artists: vec![Artist::named("Alice"), Artist::named("Bob")],
            album: Some(album),
            genre: Some("Ambient".to_owned()),
            date: Some("1999".to_owned()),
            track_no: Some(3),
            disc_no: Some(1),
            length: Some(215_900),
            last_modified: Some(1_425_211_200_000),
            ..Track::new("local:tide.flac")
        }
    }

    #[test]
    fn renders_every_known_field_in_order() {
        let lines = track_reply(&full_track(), Some((4, 17))).into_lines();
        assert_eq!(
            lines,
            [
                "file: local:tide.flac",
                "Time: 215",
                "Artist: Alice;Bob",
                "Album: Moon",
                "Title: Tide",
                "Date: 1999",
                "Track: 3/9",
                "Pos: 4",
                "Id: 17",
                "MUSICBRAINZ_ALBUMID: album-id",
                "AlbumArtist: Band",
                "MUSICBRAINZ_ALBUMARTISTID: band-id",
                "Genre: Ambient",
                "Disc: 1",
                "Last-Modified: 2015-03-01T12:00:00Z",
                "X-AlbumUri: library:album:moon",
            ]
        );
    }

    #[test]
    fn bare_tracks_render_only_file_and_time() {
        let lines = track_reply(&Track::new("dummy:a"), None).into_lines();
        assert_eq!(lines, ["file: dummy:a", "Time: 0"]);
    }

    #[rstest]
    #[case(Some(5), "Track: 5")]
    #[case(None, "")]
    fn track_numbers_without_album_totals(#[case] track_no: Option<u32>, #[case] expected: &str) {
        let track = Track {
            track_no,
            ..Track::new("dummy:a")
        };
        let lines = track_reply(&track, None).into_lines();
        let rendered = lines.iter().find(|line| line.starts_with("Track:"));
        assert_eq!(rendered.map_or("", String::as_str), expected);
    }

    #[test]
    fn tracks_without_uri_are_skipped() {
        assert!(track_reply(&Track::default(), None).is_empty());
    }

    #[test]
    fn queued_entries_number_positions_from_the_offset() {
        let entries = [
            TlTrack::new(7, Track::new("dummy:a")),
            TlTrack::new(9, Track::new("dummy:b")),
        ];
        let lines = tl_tracks_reply(&entries, 2).into_lines();
        assert_eq!(
            lines,
            [
                "file: dummy:a",
                "Time: 0",
                "Pos: 2",
                "Id: 7",
                "file: dummy:b",
                "Time: 0",
                "Pos: 3",
                "Id: 9",
            ]
        );
    }
}
