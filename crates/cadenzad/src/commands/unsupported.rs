//! Client-to-client messaging, mounts, neighbours, and stickers. Accepted so
//! clients get a clean `Not implemented` rather than `unknown command`.

use crate::protocol::ack::AckError;
use crate::protocol::dispatcher::Dispatcher;
use crate::protocol::registry::{Args, CommandSpec, Registry, RegistryError};
use crate::protocol::reply::Reply;

const COMMANDS: &[&str] = &[
    "channels",
    "listmounts",
    "listneighbors",
    "mount",
    "readmessages",
    "sendmessage",
    "sticker",
    "subscribe",
    "unmount",
    "unsubscribe",
];

pub(super) fn register(registry: &mut Registry) -> Result<(), RegistryError> {
    for &name in COMMANDS {
        registry.add(CommandSpec::new(name, not_implemented).variadic())?;
    }
    Ok(())
}

fn not_implemented(_: &mut Dispatcher, _: &Args) -> Result<Reply, AckError> {
    Err(AckError::not_implemented())
}
