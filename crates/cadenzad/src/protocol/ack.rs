//! Wire-visible protocol failures.
//!
//! Every error a client can observe is an [`AckError`]. Handlers and the
//! earlier dispatch stages build them through the named constructors below;
//! only the error-catching dispatch stage turns one into an `ACK` line, via
//! [`AckError::render`].

use std::fmt;

use cadenza_core::{CoreError, TracklistError};
use thiserror::Error;

/// Numeric error class carried in an `ACK` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum AckCode {
    /// Failures MPD has no dedicated code for.
    Unspecified,
    /// A list-only command arrived outside a list.
    NotList,
    /// Malformed or out-of-range argument.
    Arg,
    /// Wrong password.
    Password,
    /// Command requires authentication.
    Permission,
    /// Unknown or malformed command.
    Unknown,
    /// Referenced entity does not exist.
    NoExist,
    /// Stored playlist is full.
    PlaylistMax,
    /// Internal failure.
    System,
    /// Stored playlist could not be loaded.
    PlaylistLoad,
    /// A database update is already running.
    UpdateAlready,
    /// Player state is out of sync.
    PlayerSync,
    /// Entity already exists.
    Exist,
}

impl AckCode {
    /// Number written between the brackets of an `ACK` line.
    pub(crate) const fn number(self) -> u8 {
        match self {
            Self::Unspecified => 0,
            Self::NotList => 1,
            Self::Arg => 2,
            Self::Password => 3,
            Self::Permission => 4,
            Self::Unknown => 5,
            Self::NoExist => 50,
            Self::PlaylistMax => 51,
            Self::System => 52,
            Self::PlaylistLoad => 53,
            Self::UpdateAlready => 54,
            Self::PlayerSync => 55,
            Self::Exist => 56,
        }
    }
}

impl fmt::Display for AckCode {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.number())
    }
}

/// Failure reported to the client as a single `ACK` line.
///
/// `command` stays `None` until the dispatcher tags the error with the
/// command that raised it. Some errors name the command explicitly, and
/// a few deliberately report an empty command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("ACK {code} {message}")]
pub(crate) struct AckError {
    code: AckCode,
    command: Option<String>,
    message: String,
}

impl AckError {
    fn new(code: AckCode, message: impl Into<String>) -> Self {
        Self {
            code,
            command: None,
            message: message.into(),
        }
    }

    /// Bad argument (code 2).
    pub(crate) fn arg(message: impl Into<String>) -> Self {
        Self::new(AckCode::Arg, message)
    }

    /// Password mismatch (code 3).
    pub(crate) fn password(message: impl Into<String>) -> Self {
        Self::new(AckCode::Password, message)
    }

    /// Permission denied for `command` (code 4).
    pub(crate) fn permission(command: &str) -> Self {
        Self::new(
            AckCode::Permission,
            format!("you don't have permission for \"{command}\""),
        )
        .with_command(command)
    }

    /// Unknown command (code 5). The command slot is left empty on the wire.
    pub(crate) fn unknown(command: &str) -> Self {
        Self::new(AckCode::Unknown, format!("unknown command \"{command}\"")).with_command("")
    }

    /// Malformed command word (code 5, empty command).
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::new(AckCode::Unknown, message).with_command("")
    }

    /// Referenced entity is missing (code 50).
    pub(crate) fn no_exist(message: impl Into<String>) -> Self {
        Self::new(AckCode::NoExist, message)
    }

    /// Internal failure (code 52).
    pub(crate) fn system(message: impl Into<String>) -> Self {
        Self::new(AckCode::System, message)
    }

    /// Entity already exists (code 56).
    pub(crate) fn exist(message: impl Into<String>) -> Self {
        Self::new(AckCode::Exist, message)
    }

    /// Command accepted by the table but not supported (code 0).
    pub(crate) fn not_implemented() -> Self {
        Self::new(AckCode::Unspecified, "Not implemented")
    }

    /// Command refused by the server's denylist (code 0).
    pub(crate) fn disabled(command: &str) -> Self {
        Self::new(
            AckCode::Unspecified,
            format!("\"{command}\" has been disabled in the server"),
        )
        .with_command(command)
    }

    /// Stored playlist name with forbidden characters (code 2).
    pub(crate) fn invalid_playlist_name() -> Self {
        Self::arg(
            "playlist name is invalid: playlist names may not contain slashes, newlines or \
             carriage returns",
        )
    }

    /// Stored playlist backend refused a track (code 0).
    pub(crate) fn invalid_track_for_playlist(playlist_scheme: &str, track_scheme: &str) -> Self {
        Self::new(
            AckCode::Unspecified,
            format!(
                "Playlist with scheme \"{playlist_scheme}\" can't store track scheme \
                 \"{track_scheme}\""
            ),
        )
    }

    /// Stored playlist backend failed to persist (code 0).
    pub(crate) fn failed_to_save_playlist(scheme: &str) -> Self {
        Self::new(
            AckCode::Unspecified,
            format!("Backend with scheme \"{scheme}\" failed to save playlist"),
        )
    }

    /// Sets the command reported on the wire.
    #[must_use]
    pub(crate) fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    /// Sets the command only when none was recorded yet.
    #[must_use]
    pub(crate) fn or_command(self, command: &str) -> Self {
        if self.command.is_some() {
            self
        } else {
            self.with_command(command)
        }
    }

    pub(crate) const fn code(&self) -> AckCode {
        self.code
    }

    pub(crate) fn message(&self) -> &str {
        &self.message
    }

    /// Formats the `ACK [code@index] {command} message` line.
    pub(crate) fn render(&self, index: usize) -> String {
        format!(
            "ACK [{}@{index}] {{{}}} {}",
            self.code,
            self.command.as_deref().unwrap_or_default(),
            self.message
        )
    }
}

impl From<CoreError> for AckError {
    fn from(error: CoreError) -> Self {
        Self::system(error.to_string())
    }
}

impl From<TracklistError> for AckError {
    fn from(_: TracklistError) -> Self {
        Self::arg("Bad song index")
    }
}
