//! Listen socket for MPD clients.
//!
//! The transport binds the configured endpoint and accepts connections on a
//! background thread; each connection is served by a [`ConnectionHandler`].

mod errors;
mod handler;
mod listener;
#[cfg(test)]
mod test_utils;

pub(crate) use self::errors::ListenerError;
pub(crate) use self::handler::{ConnectionHandler, ConnectionStream};
pub(crate) use self::listener::{ListenerHandle, SocketListener};
#[cfg(test)]
pub(crate) use self::test_utils::CountingHandler;

pub(crate) const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
