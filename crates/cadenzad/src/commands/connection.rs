//! Connection commands: `close`, `kill`, `password`, `ping`.

use tracing::info;

use crate::protocol::DISPATCH_TARGET;
use crate::protocol::ack::AckError;
use crate::protocol::dispatcher::Dispatcher;
use crate::protocol::registry::{Args, CommandSpec, Registry, RegistryError};
use crate::protocol::reply::Reply;

pub(super) fn register(registry: &mut Registry) -> Result<(), RegistryError> {
    registry.add(CommandSpec::new("close", close).public())?;
    registry.add(CommandSpec::new("kill", kill).unlisted())?;
    registry.add(
        CommandSpec::new("password", password)
            .required("password")
            .public(),
    )?;
    registry.add(CommandSpec::new("ping", ping).public())?;
    Ok(())
}

/// Closes the connection without a response.
fn close(dispatcher: &mut Dispatcher, _: &Args) -> Result<Reply, AckError> {
    dispatcher.session.closing = true;
    Ok(Reply::default())
}

/// Ends the issuing session; the server keeps running.
fn kill(dispatcher: &mut Dispatcher, _: &Args) -> Result<Reply, AckError> {
    info!(target: DISPATCH_TARGET, "kill requested; closing session");
    dispatcher.session.closing = true;
    Ok(Reply::default())
}

fn password(dispatcher: &mut Dispatcher, args: &Args) -> Result<Reply, AckError> {
    let given = args.text("password")?;
    if dispatcher.settings().password.as_deref() == Some(given) {
        dispatcher.session.authenticated = true;
        return Ok(Reply::default());
    }
    Err(AckError::password("incorrect password"))
}

fn ping(_: &mut Dispatcher, _: &Args) -> Result<Reply, AckError> {
    Ok(Reply::default())
}
