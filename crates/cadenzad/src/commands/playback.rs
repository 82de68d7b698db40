//! Playback options and transport control.

use std::time::Duration;

use cadenza_core::{Core, PlaybackState};

use crate::protocol::ack::AckError;
use crate::protocol::dispatcher::Dispatcher;
use crate::protocol::registry::{Args, CommandSpec, Handler, Registry, RegistryError, Validator};
use crate::protocol::reply::Reply;

pub(super) fn register(registry: &mut Registry) -> Result<(), RegistryError> {
    for (name, handler) in [
        ("consume", consume as Handler),
        ("random", random),
        ("repeat", repeat),
        ("single", single),
    ] {
        registry.add(
            CommandSpec::new(name, handler)
                .required("state")
                .validate("state", Validator::Bool),
        )?;
    }
    registry.add(
        CommandSpec::new("crossfade", not_implemented)
            .required("seconds")
            .validate("seconds", Validator::Uint),
    )?;
    registry.add(CommandSpec::new("mixrampdb", not_implemented).required("decibels"))?;
    registry.add(
        CommandSpec::new("mixrampdelay", not_implemented)
            .required("seconds")
            .validate("seconds", Validator::Uint),
    )?;
    registry.add(CommandSpec::new("next", next))?;
    registry.add(
        CommandSpec::new("pause", pause)
            .optional("state")
            .validate("state", Validator::Bool),
    )?;
    registry.add(
        CommandSpec::new("play", play)
            .optional("songpos")
            .validate("songpos", Validator::Int),
    )?;
    registry.add(
        CommandSpec::new("playid", playid)
            .optional("tlid")
            .validate("tlid", Validator::Int),
    )?;
    registry.add(CommandSpec::new("previous", previous))?;
    registry.add(CommandSpec::new("replay_gain_mode", not_implemented).required("mode"))?;
    registry.add(CommandSpec::new("replay_gain_status", replay_gain_status))?;
    registry.add(
        CommandSpec::new("seek", seek)
            .required("songpos")
            .required("seconds")
            .validate("songpos", Validator::Uint)
            .validate("seconds", Validator::Uint),
    )?;
    registry.add(
        CommandSpec::new("seekid", seekid)
            .required("tlid")
            .required("seconds")
            .validate("tlid", Validator::Uint)
            .validate("seconds", Validator::Uint),
    )?;
    registry.add(CommandSpec::new("seekcur", seekcur).required("time"))?;
    registry.add(
        CommandSpec::new("setvol", setvol)
            .required("volume")
            .validate("volume", Validator::Int),
    )?;
    registry.add(CommandSpec::new("stop", stop))?;
    registry.add(
        CommandSpec::new("volume", volume)
            .required("change")
            .validate("change", Validator::Int),
    )?;
    Ok(())
}

fn set_option(
    dispatcher: &Dispatcher,
    args: &Args,
    apply: fn(&mut Core, bool),
) -> Result<Reply, AckError> {
    let state = args.bool("state")?;
    dispatcher.core(move |core| apply(core, state))?;
    Ok(Reply::default())
}

fn consume(dispatcher: &mut Dispatcher, args: &Args) -> Result<Reply, AckError> {
    set_option(dispatcher, args, Core::set_consume)
}

fn random(dispatcher: &mut Dispatcher, args: &Args) -> Result<Reply, AckError> {
    set_option(dispatcher, args, Core::set_random)
}

fn repeat(dispatcher: &mut Dispatcher, args: &Args) -> Result<Reply, AckError> {
    set_option(dispatcher, args, Core::set_repeat)
}

fn single(dispatcher: &mut Dispatcher, args: &Args) -> Result<Reply, AckError> {
    set_option(dispatcher, args, Core::set_single)
}

fn not_implemented(_: &mut Dispatcher, _: &Args) -> Result<Reply, AckError> {
    Err(AckError::not_implemented())
}

fn next(dispatcher: &mut Dispatcher, _: &Args) -> Result<Reply, AckError> {
    dispatcher.core(Core::next)?;
    Ok(Reply::default())
}

fn previous(dispatcher: &mut Dispatcher, _: &Args) -> Result<Reply, AckError> {
    dispatcher.core(Core::previous)?;
    Ok(Reply::default())
}

fn stop(dispatcher: &mut Dispatcher, _: &Args) -> Result<Reply, AckError> {
    dispatcher.core(Core::stop)?;
    Ok(Reply::default())
}

/// Without an argument, toggles between playing and paused.
fn pause(dispatcher: &mut Dispatcher, args: &Args) -> Result<Reply, AckError> {
    let requested = args.opt_bool("state");
    dispatcher.core(move |core| match requested {
        Some(true) => core.pause(),
        Some(false) => core.resume(),
        None => match core.playback_state() {
            PlaybackState::Playing => core.pause(),
            PlaybackState::Paused => core.resume(),
            PlaybackState::Stopped => {}
        },
    })?;
    Ok(Reply::default())
}

fn bad_song_index() -> AckError {
    AckError::arg("Bad song index")
}

fn no_such_song() -> AckError {
    AckError::no_exist("No such song")
}

/// Resumes, replays the current entry, or starts the first one.
fn play_current_or_first(dispatcher: &Dispatcher) -> Result<(), AckError> {
    dispatcher.core(|core| match core.playback_state() {
        PlaybackState::Playing => {}
        PlaybackState::Paused => core.resume(),
        PlaybackState::Stopped => {
            let target = core
                .current_tl_track()
                .cloned()
                .or_else(|| core.tracklist().get(0).cloned());
            if let Some(entry) = target {
                core.play(Some(entry));
            }
        }
    })
}

fn play_position(dispatcher: &Dispatcher, position: usize) -> Result<(), AckError> {
    let played = dispatcher.core(move |core| {
        let Some(entry) = core.tracklist().get(position).cloned() else {
            return false;
        };
        core.play(Some(entry));
        true
    })?;
    if played { Ok(()) } else { Err(bad_song_index()) }
}

fn play_tlid(dispatcher: &Dispatcher, tlid: u64) -> Result<(), AckError> {
    if dispatcher.core(move |core| core.play_tlid(tlid))? {
        Ok(())
    } else {
        Err(no_such_song())
    }
}

fn play(dispatcher: &mut Dispatcher, args: &Args) -> Result<Reply, AckError> {
    match args.opt_int("songpos") {
        None => dispatcher.core(|core| core.play(None))?,
        Some(-1) => play_current_or_first(dispatcher)?,
        Some(position) => {
            let position = usize::try_from(position).map_err(|_| bad_song_index())?;
            play_position(dispatcher, position)?;
        }
    }
    Ok(Reply::default())
}

fn playid(dispatcher: &mut Dispatcher, args: &Args) -> Result<Reply, AckError> {
    match args.opt_int("tlid") {
        None | Some(-1) => play_current_or_first(dispatcher)?,
        Some(tlid) => {
            let tlid = u64::try_from(tlid).map_err(|_| no_such_song())?;
            play_tlid(dispatcher, tlid)?;
        }
    }
    Ok(Reply::default())
}

fn replay_gain_status(_: &mut Dispatcher, _: &Args) -> Result<Reply, AckError> {
    Ok(Reply::field("replay_gain_mode", "off"))
}

fn seek_to(dispatcher: &Dispatcher, position: Duration) -> Result<(), AckError> {
    dispatcher.core(move |core| core.seek(position))?;
    Ok(())
}

/// Seeks inside the entry at `songpos`, switching to it first if needed.
fn seek(dispatcher: &mut Dispatcher, args: &Args) -> Result<Reply, AckError> {
    let position = args.position("songpos")?;
    let seconds = args.uint("seconds")?;
    let current = dispatcher.core(|core| {
        core.current_tl_track()
            .and_then(|entry| core.tracklist().index_of(entry.tlid))
    })?;
    if current != Some(position) {
        play_position(dispatcher, position)?;
    }
    seek_to(dispatcher, Duration::from_secs(seconds))?;
    Ok(Reply::default())
}

fn seekid(dispatcher: &mut Dispatcher, args: &Args) -> Result<Reply, AckError> {
    let tlid = args.uint("tlid")?;
    let seconds = args.uint("seconds")?;
    let current = dispatcher.core(|core| core.current_tl_track().map(|entry| entry.tlid))?;
    if current != Some(tlid) {
        play_tlid(dispatcher, tlid)?;
    }
    seek_to(dispatcher, Duration::from_secs(seconds))?;
    Ok(Reply::default())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SeekTarget {
    Absolute(u64),
    Relative(i64),
}

impl SeekTarget {
    /// `+N` and `-N` are relative to the current position; anything else must
    /// be a plain number of seconds.
    fn parse(raw: &str) -> Option<Self> {
        if raw.starts_with(['+', '-']) {
            return raw.parse().ok().map(Self::Relative);
        }
        if raw.is_empty() || !raw.bytes().all(|byte| byte.is_ascii_digit()) {
            return None;
        }
        raw.parse().ok().map(Self::Absolute)
    }

    fn resolve(self, now: Duration) -> Duration {
        match self {
            Self::Absolute(seconds) => Duration::from_secs(seconds),
            Self::Relative(delta) => {
                let shift = Duration::from_secs(delta.unsigned_abs());
                if delta < 0 {
                    now.saturating_sub(shift)
                } else {
                    now.saturating_add(shift)
                }
            }
        }
    }
}

fn seekcur(dispatcher: &mut Dispatcher, args: &Args) -> Result<Reply, AckError> {
    let target = SeekTarget::parse(args.text("time")?)
        .ok_or_else(|| AckError::arg("incorrect arguments"))?;
    dispatcher.core(move |core| {
        let position = target.resolve(core.time_position());
        core.seek(position)
    })?;
    Ok(Reply::default())
}

fn clamp_volume(volume: i64) -> u8 {
    u8::try_from(volume.clamp(0, 100)).unwrap_or(100)
}

fn volume_set(applied: bool) -> Result<(), AckError> {
    if applied {
        Ok(())
    } else {
        Err(AckError::system("problems setting volume"))
    }
}

fn setvol(dispatcher: &mut Dispatcher, args: &Args) -> Result<Reply, AckError> {
    let clamped = clamp_volume(args.int("volume")?);
    volume_set(dispatcher.core(move |core| core.set_volume(clamped))?)?;
    Ok(Reply::default())
}

/// Changes the volume by a relative amount in `-100..=100`.
/// Reads and writes the level in a single core turn.
fn volume(dispatcher: &mut Dispatcher, args: &Args) -> Result<Reply, AckError> {
    let change = args.int("change")?;
    if !(-100..=100).contains(&change) {
        return Err(AckError::arg("Invalid volume value"));
    }
    dispatcher.core(move |core| {
        let current = core
            .volume()
            .ok_or_else(|| AckError::system("problems setting volume"))?;
        volume_set(core.set_volume(clamp_volume(i64::from(current) + change)))
    })??;
    Ok(Reply::default())
}

#[cfg(test)]
mod tests {
    use cadenza_core::Collaborators;
    use rstest::{fixture, rstest};

    use super::*;
    use crate::commands::test_support::{Harness, dummy_tracks};

    #[fixture]
    fn queued() -> Harness {
        let mut harness = Harness::with_library(dummy_tracks(3));
        for index in 0..3 {
            harness.ok(&format!("add dummy:{index}"));
        }
        harness
    }

    fn state(harness: &mut Harness) -> String {
        harness.field("status", "state").unwrap_or_default()
    }

    #[test]
    fn play_on_an_empty_tracklist_stays_stopped() {
        let mut harness = Harness::new(Collaborators::default());
        harness.ok("play");
        harness.ok("play -1");
        assert_eq!(state(&mut harness), "stop");
    }

    #[rstest]
    #[case("play 2", "2")]
    #[case("playid 1", "1")]
    #[case("play -1", "0")]
    fn play_selects_the_requested_entry(
        mut queued: Harness,
        #[case] line: &str,
        #[case] songid: &str,
    ) {
        queued.ok(line);
        assert_eq!(state(&mut queued), "play");
        assert_eq!(queued.field("status", "songid").as_deref(), Some(songid));
    }

    #[rstest]
    #[case("play 3", "ACK [2@0] {play} Bad song index")]
    #[case("play -2", "ACK [2@0] {play} Bad song index")]
    #[case("playid 42", "ACK [50@0] {playid} No such song")]
    #[case("playid -5", "ACK [50@0] {playid} No such song")]
    #[case("seekid 42 1", "ACK [50@0] {seekid} No such song")]
    #[case("seekcur soon", "ACK [2@0] {seekcur} incorrect arguments")]
    #[case("volume 101", "ACK [2@0] {volume} Invalid volume value")]
    #[case("consume 2", "ACK [2@0] {consume} incorrect arguments")]
    #[case("crossfade 3", "ACK [0@0] {crossfade} Not implemented")]
    fn invalid_requests_are_acknowledged(
        mut queued: Harness,
        #[case] line: &str,
        #[case] ack: &str,
    ) {
        assert_eq!(queued.send(line), [ack]);
    }

    #[rstest]
    fn pause_toggles_and_respects_explicit_state(mut queued: Harness) {
        queued.ok("pause");
        assert_eq!(state(&mut queued), "stop");
        queued.ok("play");
        queued.ok("pause");
        assert_eq!(state(&mut queued), "pause");
        queued.ok("pause");
        assert_eq!(state(&mut queued), "play");
        queued.ok("pause 1");
        queued.ok("pause 1");
        assert_eq!(state(&mut queued), "pause");
        queued.ok("pause 0");
        assert_eq!(state(&mut queued), "play");
    }

    #[rstest]
    fn next_and_previous_walk_the_tracklist(mut queued: Harness) {
        queued.ok("play 0");
        queued.ok("next");
        assert_eq!(queued.field("status", "song").as_deref(), Some("1"));
        queued.ok("previous");
        assert_eq!(queued.field("status", "song").as_deref(), Some("0"));
        queued.ok("stop");
        assert_eq!(state(&mut queued), "stop");
    }

    #[rstest]
    fn consume_removes_the_finished_entry_on_next(mut queued: Harness) {
        queued.ok("consume 1");
        queued.ok("play 0");
        queued.ok("next");
        assert_eq!(queued.field("status", "playlistlength").as_deref(), Some("2"));
        assert_eq!(queued.field("status", "consume").as_deref(), Some("1"));
    }

    #[rstest]
    fn seek_switches_to_the_requested_entry(mut queued: Harness) {
        queued.ok("seek 1 30");
        assert_eq!(queued.field("status", "song").as_deref(), Some("1"));
        let elapsed = queued.field("status", "elapsed").expect("elapsed");
        assert!(elapsed.starts_with("30."), "{elapsed}");
    }

    #[rstest]
    fn seekcur_moves_relative_to_the_current_position(mut queued: Harness) {
        queued.ok("play 0");
        queued.ok("seekcur 30");
        queued.ok("seekcur -10");
        let elapsed = queued.field("status", "elapsed").expect("elapsed");
        assert!(elapsed.starts_with("20."), "{elapsed}");
        queued.ok("seekcur -100");
        let elapsed = queued.field("status", "elapsed").expect("elapsed");
        assert!(elapsed.starts_with("0."), "{elapsed}");
    }

    #[rstest]
    #[case("setvol 150", "100")]
    #[case("setvol -4", "0")]
    #[case("setvol 35", "35")]
    fn setvol_clamps(#[case] line: &str, #[case] expected: &str) {
        let mut harness = Harness::new(Collaborators::default());
        harness.ok(line);
        assert_eq!(harness.field("status", "volume").as_deref(), Some(expected));
    }

    #[test]
    fn volume_changes_relative_to_the_current_level() {
        let mut harness = Harness::new(Collaborators::default());
        harness.ok("setvol 50");
        harness.ok("volume -20");
        assert_eq!(harness.field("status", "volume").as_deref(), Some("30"));
        harness.ok("volume 100");
        assert_eq!(harness.field("status", "volume").as_deref(), Some("100"));
    }

    #[test]
    fn volume_steps_build_on_the_stored_level() {
        let mut harness = Harness::new(Collaborators::default());
        harness.ok("setvol 30");
        harness.ok("volume -100");
        assert_eq!(harness.field("status", "volume").as_deref(), Some("0"));
        harness.send("command_list_begin");
        harness.send("volume 5");
        harness.send("volume 5");
        assert_eq!(harness.send("command_list_end"), ["OK"]);
        assert_eq!(harness.field("status", "volume").as_deref(), Some("10"));
    }

    #[rstest]
    #[case("+5", Some(SeekTarget::Relative(5)))]
    #[case("-5", Some(SeekTarget::Relative(-5)))]
    #[case("12", Some(SeekTarget::Absolute(12)))]
    #[case("1.5", None)]
    #[case("", None)]
    fn seek_targets_parse(#[case] raw: &str, #[case] expected: Option<SeekTarget>) {
        assert_eq!(SeekTarget::parse(raw), expected);
    }

    #[test]
    fn options_toggle_through_status() {
        let mut harness = Harness::new(Collaborators::default());
        for option in ["random", "repeat", "single"] {
            harness.ok(&format!("{option} 1"));
            assert_eq!(harness.field("status", option).as_deref(), Some("1"));
        }
        assert_eq!(
            harness.ok("replay_gain_status"),
            ["replay_gain_mode: off"]
        );
    }
}
