//! Facade over the component that actually renders sound.

use std::time::Duration;

use crate::model::Track;

/// Output primitives the playback state machine drives.
///
/// Each method reports success; a failing [`AudioSink::change_track`] marks
/// the track unplayable and playback moves on to the next candidate.
pub trait AudioSink: Send {
    /// Loads `track`, replacing whatever was loaded before.
    fn change_track(&mut self, track: &Track) -> bool;
    /// Starts or continues output of the loaded track.
    fn play(&mut self) -> bool;
    /// Holds output at the current position.
    fn pause(&mut self) -> bool;
    /// Continues output after [`AudioSink::pause`].
    fn resume(&mut self) -> bool;
    /// Stops output and unloads the track.
    fn stop(&mut self) -> bool;
    /// Moves the output position.
    fn seek(&mut self, position: Duration) -> bool;
}

/// Sink that accepts every request and produces no sound.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAudioSink;

impl AudioSink for NullAudioSink {
    fn change_track(&mut self, _track: &Track) -> bool {
        true
    }

    fn play(&mut self) -> bool {
        true
    }

    fn pause(&mut self) -> bool {
        true
    }

    fn resume(&mut self) -> bool {
        true
    }

    fn stop(&mut self) -> bool {
        true
    }

    fn seek(&mut self, _position: Duration) -> bool {
        true
    }
}
