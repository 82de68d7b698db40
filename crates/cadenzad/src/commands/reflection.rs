//! Reflection commands describing what this server supports.

use std::collections::BTreeSet;

use crate::protocol::ack::AckError;
use crate::protocol::dispatcher::Dispatcher;
use crate::protocol::registry::{Args, CommandSpec, Registry, RegistryError};
use crate::protocol::reply::Reply;
use crate::protocol::translator::TAG_TYPES;

pub(super) fn register(registry: &mut Registry) -> Result<(), RegistryError> {
    registry.add(CommandSpec::new("commands", commands).public())?;
    registry.add(CommandSpec::new("config", config).unlisted())?;
    registry.add(CommandSpec::new("decoders", decoders))?;
    registry.add(CommandSpec::new("notcommands", notcommands).public())?;
    registry.add(CommandSpec::new("tagtypes", tagtypes))?;
    registry.add(CommandSpec::new("urlhandlers", urlhandlers))?;
    Ok(())
}

/// Only reachable over local sockets in MPD proper; always refused here.
fn config(_: &mut Dispatcher, _: &Args) -> Result<Reply, AckError> {
    Err(AckError::permission("config"))
}

/// Commands the session may run right now.
fn commands(dispatcher: &mut Dispatcher, _: &Args) -> Result<Reply, AckError> {
    let authenticated = dispatcher.session.authenticated;
    Ok(dispatcher
        .registry()
        .iter()
        .filter(|spec| spec.list_eligible() && (authenticated || !spec.auth_required()))
        .map(|spec| ("command", spec.name()))
        .collect())
}

/// Commands the session may not run; `config` and `kill` are always listed.
fn notcommands(dispatcher: &mut Dispatcher, _: &Args) -> Result<Reply, AckError> {
    let mut names: BTreeSet<&str> = BTreeSet::from(["config", "kill"]);
    if !dispatcher.session.authenticated {
        names.extend(
            dispatcher
                .registry()
                .iter()
                .filter(|spec| spec.list_eligible() && spec.auth_required())
                .map(|spec| spec.name()),
        );
    }
    Ok(names.into_iter().map(|name| ("command", name)).collect())
}

fn decoders(_: &mut Dispatcher, _: &Args) -> Result<Reply, AckError> {
    Ok(Reply::default())
}

fn tagtypes(_: &mut Dispatcher, _: &Args) -> Result<Reply, AckError> {
    Ok(TAG_TYPES.iter().map(|tag| ("tagtype", tag)).collect())
}

fn urlhandlers(dispatcher: &mut Dispatcher, _: &Args) -> Result<Reply, AckError> {
    let schemes = dispatcher.core(|core| core.uri_schemes())?;
    Ok(schemes.into_iter().map(|scheme| ("handler", scheme)).collect())
}
