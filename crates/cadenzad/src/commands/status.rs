//! Status commands: `currentsong`, `idle`, `noidle`, `stats`, `status`.

use std::collections::BTreeSet;
use std::time::Duration;

use cadenza_core::{PlaybackOptions, PlaybackState, TlTrack, Tlid};

use crate::protocol::ack::AckError;
use crate::protocol::dispatcher::Dispatcher;
use crate::protocol::registry::{Args, CommandSpec, Registry, RegistryError};
use crate::protocol::reply::Reply;
use crate::protocol::subsystem::Subsystem;
use crate::protocol::translator::track_reply;

pub(super) fn register(registry: &mut Registry) -> Result<(), RegistryError> {
    registry.add(CommandSpec::new("clearerror", clearerror))?;
    registry.add(CommandSpec::new("currentsong", currentsong))?;
    registry.add(CommandSpec::new("idle", idle).variadic().unlisted())?;
    registry.add(CommandSpec::new("noidle", noidle).unlisted())?;
    registry.add(CommandSpec::new("stats", stats))?;
    registry.add(CommandSpec::new("status", status))?;
    Ok(())
}

fn clearerror(_: &mut Dispatcher, _: &Args) -> Result<Reply, AckError> {
    Err(AckError::not_implemented())
}

fn currentsong(dispatcher: &mut Dispatcher, _: &Args) -> Result<Reply, AckError> {
    let current = dispatcher.core(|core| {
        core.current_tl_track()
            .cloned()
            .map(|entry| (core.tracklist().index_of(entry.tlid), entry))
    })?;
    Ok(match current {
        Some((Some(position), entry)) => track_reply(&entry.track, Some((position, entry.tlid))),
        Some((None, entry)) => track_reply(&entry.track, None),
        None => Reply::default(),
    })
}

/// Subscribes to `subsystems` (all when none are named) and answers at once
/// if any of them already changed.
fn idle(dispatcher: &mut Dispatcher, args: &Args) -> Result<Reply, AckError> {
    let mut requested = BTreeSet::new();
    for name in args.rest() {
        let subsystem = name
            .parse::<Subsystem>()
            .map_err(|_| AckError::arg(format!("Unrecognized idle event: {name}")))?;
        requested.insert(subsystem);
    }
    if requested.is_empty() {
        requested = Dispatcher::all_subsystems();
    }
    dispatcher.session.subscriptions.extend(requested);
    let mut reply = Reply::default();
    for line in dispatcher.session.take_active().unwrap_or_default() {
        reply.push_line(line);
    }
    Ok(reply)
}

fn noidle(dispatcher: &mut Dispatcher, _: &Args) -> Result<Reply, AckError> {
    dispatcher.session.reset_idle();
    Ok(Reply::default())
}

fn stats(_: &mut Dispatcher, _: &Args) -> Result<Reply, AckError> {
    Ok([
        "artists",
        "albums",
        "songs",
        "uptime",
        "db_playtime",
        "db_update",
        "playtime",
    ]
    .into_iter()
    .map(|key| (key, 0))
    .collect())
}

/// Everything `status` reports, read in one core round trip.
struct Snapshot {
    volume: Option<u8>,
    options: PlaybackOptions,
    version: u64,
    length: usize,
    state: PlaybackState,
    current: Option<(Option<usize>, TlTrack)>,
    next: Option<(Option<usize>, Tlid)>,
    elapsed: Duration,
}

const fn flag(value: bool) -> u8 {
    if value { 1 } else { 0 }
}

const fn state_name(state: PlaybackState) -> &'static str {
    match state {
        PlaybackState::Playing => "play",
        PlaybackState::Stopped => "stop",
        PlaybackState::Paused => "pause",
    }
}

fn status(dispatcher: &mut Dispatcher, _: &Args) -> Result<Reply, AckError> {
    let snapshot = dispatcher.core(|core| {
        let next = core
            .next_tl_track()
            .map(|entry| (core.tracklist().index_of(entry.tlid), entry.tlid));
        let current = core
            .current_tl_track()
            .cloned()
            .map(|entry| (core.tracklist().index_of(entry.tlid), entry));
        Snapshot {
            volume: core.volume(),
            options: core.tracklist().options(),
            version: core.tracklist().version(),
            length: core.tracklist().len(),
            state: core.playback_state(),
            current,
            next,
            elapsed: core.time_position(),
        }
    })?;

    let mut reply = Reply::default();
    reply.push_field("volume", snapshot.volume.map_or(-1, i16::from));
    reply.push_field("repeat", flag(snapshot.options.repeat));
    reply.push_field("random", flag(snapshot.options.random));
    reply.push_field("single", flag(snapshot.options.single));
    reply.push_field("consume", flag(snapshot.options.consume));
    reply.push_field("playlist", snapshot.version);
    reply.push_field("playlistlength", snapshot.length);
    reply.push_field("xfade", 0);
    reply.push_field("state", state_name(snapshot.state));
    if let Some((position, entry)) = &snapshot.current {
        if let Some(position) = position {
            reply.push_field("song", position);
        }
        reply.push_field("songid", entry.tlid);
    }
    if let Some((position, tlid)) = snapshot.next {
        if let Some(position) = position {
            reply.push_field("nextsong", position);
        }
        reply.push_field("nextsongid", tlid);
    }
    if matches!(snapshot.state, PlaybackState::Playing | PlaybackState::Paused) {
        let track = snapshot.current.as_ref().map(|(_, entry)| &entry.track);
        let total = track
            .and_then(|track| track.length)
            .map_or(0, |millis| Duration::from_millis(millis).as_secs());
        reply.push_field(
            "time",
            format!("{}:{total}", snapshot.elapsed.as_secs()),
        );
        reply.push_field("elapsed", format!("{:.3}", snapshot.elapsed.as_secs_f64()));
        reply.push_field(
            "bitrate",
            track.and_then(|track| track.bitrate).unwrap_or_default(),
        );
    }
    Ok(reply)
}
