//! Playback transitions: play, pause, resume, stop, skip, seek, and the
//! end-of-track advance driven by the actor's tick.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::audio::AudioSink;
use crate::clock::ElapsedClock;
use crate::engine::Core;
use crate::events::CoreEvent;
use crate::model::{PlaybackState, TlTrack, Tlid};

pub(crate) struct Playback {
    pub(crate) state: PlaybackState,
    pub(crate) current: Option<TlTrack>,
    clock: ElapsedClock,
    audio: Box<dyn AudioSink>,
}

impl Playback {
    pub(crate) fn new(audio: Box<dyn AudioSink>) -> Self {
        Self {
            state: PlaybackState::Stopped,
            current: None,
            clock: ElapsedClock::default(),
            audio,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Forward,
    Backward,
}

impl Core {
    /// Position inside the current track.
    #[must_use]
    pub fn time_position(&self) -> Duration {
        self.position_at(Instant::now())
    }

    fn position_at(&self, now: Instant) -> Duration {
        match self.playback.state {
            PlaybackState::Stopped => Duration::ZERO,
            PlaybackState::Playing | PlaybackState::Paused => self.playback.clock.position(now),
        }
    }

    /// Starts playback.
    ///
    /// With a target, that entry plays. Without one, a paused track resumes,
    /// a stopped-on track restarts, and otherwise the first entry plays. An
    /// empty tracklist leaves the core stopped.
    pub fn play(&mut self, target: Option<TlTrack>) {
        if target.is_none() && self.playback.state == PlaybackState::Paused {
            self.resume();
            return;
        }
        let original = self.playback.current.clone();
        let Some(pending) = target
            .or_else(|| original.clone())
            .or_else(|| self.tracklist.next_track(None))
        else {
            debug!(target: crate::CORE_TARGET, "nothing to play");
            return;
        };
        if original.as_ref() != Some(&pending) && self.playback.state != PlaybackState::Stopped {
            self.emit(CoreEvent::TrackPlaybackEnded);
        }
        self.change_with_fallback(Some(pending), PlaybackState::Playing, Direction::Forward);
        if original != self.playback.current {
            self.mark_played(original);
        }
    }

    /// Plays the entry carrying `tlid`; `false` when there is none.
    pub fn play_tlid(&mut self, tlid: Tlid) -> bool {
        let Some(entry) = self.tracklist.find(tlid).cloned() else {
            return false;
        };
        self.play(Some(entry));
        true
    }

    /// Pauses a playing track.
    pub fn pause(&mut self) {
        if self.playback.state != PlaybackState::Playing {
            return;
        }
        if !self.playback.audio.pause() {
            warn!(target: crate::CORE_TARGET, "audio sink refused to pause");
            return;
        }
        self.playback.clock.freeze(Instant::now());
        self.set_state(PlaybackState::Paused);
        if self.playback.current.is_some() {
            self.emit(CoreEvent::TrackPlaybackPaused);
        }
    }

    /// Resumes a paused track.
    pub fn resume(&mut self) {
        if self.playback.state != PlaybackState::Paused {
            return;
        }
        if !self.playback.audio.resume() {
            warn!(target: crate::CORE_TARGET, "audio sink refused to resume");
            return;
        }
        self.playback.clock.start(Instant::now());
        self.set_state(PlaybackState::Playing);
        if self.playback.current.is_some() {
            self.emit(CoreEvent::TrackPlaybackResumed);
        }
    }

    /// Stops playback, keeping the current entry.
    pub fn stop(&mut self) {
        if self.playback.state == PlaybackState::Stopped {
            return;
        }
        if !self.playback.audio.stop() {
            warn!(target: crate::CORE_TARGET, "audio sink refused to stop");
            return;
        }
        self.playback.clock.reset();
        self.set_state(PlaybackState::Stopped);
        if self.playback.current.is_some() {
            self.emit(CoreEvent::TrackPlaybackEnded);
        }
    }

    /// Skips forward, keeping the playback state. The skipped entry is
    /// consumed when consume is on; running off the end clears the current
    /// entry.
    pub fn next(&mut self) {
        let state = self.playback.state;
        let Some(current) = self.playback.current.clone() else {
            return;
        };
        self.emit(CoreEvent::TrackPlaybackEnded);
        let candidate = self.tracklist.next_track(Some(&current));
        self.mark_played(Some(current));
        let pending = candidate.filter(|entry| self.tracklist.index_of(entry.tlid).is_some());
        self.change_with_fallback(pending, state, Direction::Forward);
    }

    /// Skips back, keeping the playback state.
    pub fn previous(&mut self) {
        let state = self.playback.state;
        let Some(current) = self.playback.current.clone() else {
            return;
        };
        self.emit(CoreEvent::TrackPlaybackEnded);
        let pending = self.tracklist.previous_track(Some(&current));
        self.change_with_fallback(pending, state, Direction::Backward);
    }

    /// Jumps inside the current track, starting playback first when stopped.
    /// The position is clamped to the track length.
    pub fn seek(&mut self, position: Duration) -> bool {
        if self.tracklist.is_empty() {
            return false;
        }
        if self.playback.state == PlaybackState::Stopped {
            self.play(None);
        }
        let Some(length) = self
            .playback
            .current
            .as_ref()
            .and_then(|current| current.track.length)
        else {
            return false;
        };
        let clamped = position.min(Duration::from_millis(length));
        if !self.playback.audio.seek(clamped) {
            return false;
        }
        self.playback.clock.set(clamped, Instant::now());
        self.emit(CoreEvent::Seeked);
        true
    }

    /// Advances past the current track once its length has elapsed.
    pub fn tick(&mut self, now: Instant) {
        if self.playback.state != PlaybackState::Playing {
            return;
        }
        let Some(current) = self.playback.current.clone() else {
            return;
        };
        let Some(length) = current.track.length else {
            return;
        };
        if self.playback.clock.position(now) < Duration::from_millis(length) {
            return;
        }
        debug!(target: crate::CORE_TARGET, tlid = current.tlid, "end of track");
        self.emit(CoreEvent::TrackPlaybackEnded);
        let candidate = self.tracklist.eot_track(Some(&current));
        self.mark_played(Some(current));
        let pending = candidate.filter(|entry| self.tracklist.index_of(entry.tlid).is_some());
        self.change_with_fallback(pending, PlaybackState::Playing, Direction::Forward);
    }

    fn set_state(&mut self, state: PlaybackState) {
        debug!(
            target: crate::CORE_TARGET,
            from = %self.playback.state,
            to = %state,
            "playback state"
        );
        self.playback.state = state;
        self.emit(CoreEvent::PlaybackStateChanged);
    }

    /// Tries `pending`, then its neighbours in `direction`, until one loads.
    /// Gives up after one pass over the tracklist and stops.
    fn change_with_fallback(
        &mut self,
        mut pending: Option<TlTrack>,
        state: PlaybackState,
        direction: Direction,
    ) {
        for _ in 0..=self.tracklist.len() {
            let Some(entry) = pending else {
                self.change_to_end();
                return;
            };
            if self.change(&entry, state) {
                return;
            }
            warn!(
                target: crate::CORE_TARGET,
                uri = %entry.track.uri,
                "track is unplayable"
            );
            self.tracklist.mark_unplayable(&entry);
            pending = match direction {
                Direction::Forward => self.tracklist.next_track(Some(&entry)),
                Direction::Backward => self.tracklist.previous_track(Some(&entry)),
            };
        }
        self.change_to_end();
    }

    fn change_to_end(&mut self) {
        self.stop();
        self.playback.current = None;
    }

    fn change(&mut self, entry: &TlTrack, state: PlaybackState) -> bool {
        if !self.playback.audio.change_track(&entry.track) {
            return false;
        }
        let started = match state {
            PlaybackState::Playing => self.playback.audio.play(),
            PlaybackState::Paused => self.playback.audio.pause(),
            PlaybackState::Stopped => true,
        };
        if !started {
            return false;
        }
        self.playback.current = Some(entry.clone());
        self.playback.clock.reset();
        if state == PlaybackState::Playing {
            self.playback.clock.start(Instant::now());
            self.tracklist.mark_playing(entry);
        }
        self.set_state(state);
        if state == PlaybackState::Playing {
            self.emit(CoreEvent::TrackPlaybackStarted);
        }
        true
    }

    fn mark_played(&mut self, entry: Option<TlTrack>) {
        let Some(played) = entry else {
            return;
        };
        if self.tracklist.options().consume {
            self.mutate_tracklist(|tracklist| tracklist.remove(&[played.tlid]));
        }
    }
}
