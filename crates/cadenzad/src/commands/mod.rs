//! Command handlers, grouped the way the MPD protocol reference groups them.
//!
//! Each submodule exposes `register`, which declares its commands in the
//! shared [`Registry`]. The table is built once per process by [`registry`].

mod audio_output;
mod command_list;
mod connection;
mod current_playlist;
mod music_db;
mod playback;
mod reflection;
mod status;
mod stored_playlists;
mod unsupported;

use once_cell::sync::OnceCell;

use crate::protocol::RegistryError;
use crate::protocol::registry::Registry;

static REGISTRY: OnceCell<Registry> = OnceCell::new();

/// Returns the command table, building it on first use.
///
/// # Errors
///
/// Returns [`RegistryError`] when a declaration is malformed.
pub(crate) fn registry() -> Result<&'static Registry, RegistryError> {
    REGISTRY.get_or_try_init(build)
}

fn build() -> Result<Registry, RegistryError> {
    let mut registry = Registry::default();
    audio_output::register(&mut registry)?;
    command_list::register(&mut registry)?;
    connection::register(&mut registry)?;
    current_playlist::register(&mut registry)?;
    music_db::register(&mut registry)?;
    playback::register(&mut registry)?;
    reflection::register(&mut registry)?;
    status::register(&mut registry)?;
    stored_playlists::register(&mut registry)?;
    unsupported::register(&mut registry)?;
    Ok(registry)
}
