//! Command list batching.

use crate::protocol::ack::AckError;
use crate::protocol::dispatcher::{COMMAND_LIST_END, CommandListMode, Dispatcher};
use crate::protocol::registry::{Args, CommandSpec, Registry, RegistryError};
use crate::protocol::reply::Reply;

const LIST_OK: &str = "list_OK";

pub(super) fn register(registry: &mut Registry) -> Result<(), RegistryError> {
    registry.add(CommandSpec::new("command_list_begin", begin).unlisted())?;
    registry.add(CommandSpec::new("command_list_ok_begin", ok_begin).unlisted())?;
    registry.add(CommandSpec::new(COMMAND_LIST_END, end).unlisted())?;
    Ok(())
}

fn start(dispatcher: &mut Dispatcher, mode: CommandListMode) -> Result<Reply, AckError> {
    dispatcher.session.command_list = mode;
    dispatcher.session.command_list_buffer.clear();
    Ok(Reply::default())
}

fn begin(dispatcher: &mut Dispatcher, _: &Args) -> Result<Reply, AckError> {
    start(dispatcher, CommandListMode::Plain)
}

fn ok_begin(dispatcher: &mut Dispatcher, _: &Args) -> Result<Reply, AckError> {
    start(dispatcher, CommandListMode::Acknowledged)
}

/// Replays the buffered lines, stopping at the first ACK.
fn end(dispatcher: &mut Dispatcher, _: &Args) -> Result<Reply, AckError> {
    let mode = std::mem::take(&mut dispatcher.session.command_list);
    if mode == CommandListMode::Off {
        return Err(AckError::unknown(COMMAND_LIST_END));
    }
    let buffered = std::mem::take(&mut dispatcher.session.command_list_buffer);
    let mut reply = Reply::default();
    for (index, line) in buffered.iter().enumerate() {
        let response = dispatcher.handle_list_item(line, index);
        let failed = response.last().is_some_and(|last| last.starts_with("ACK"));
        for output in response {
            reply.push_line(output);
        }
        if failed {
            break;
        }
        if mode == CommandListMode::Acknowledged {
            reply.push_line(LIST_OK);
        }
    }
    Ok(reply)
}
