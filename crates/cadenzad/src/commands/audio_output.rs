//! Audio output commands. The mixer's mute switch is presented as the single
//! output `0`, named `Mute`.

use crate::protocol::ack::AckError;
use crate::protocol::dispatcher::Dispatcher;
use crate::protocol::registry::{Args, CommandSpec, Handler, Registry, RegistryError, Validator};
use crate::protocol::reply::Reply;

const MUTE_OUTPUT: u64 = 0;

pub(super) fn register(registry: &mut Registry) -> Result<(), RegistryError> {
    for (name, handler) in [
        ("disableoutput", disableoutput as Handler),
        ("enableoutput", enableoutput),
        ("toggleoutput", toggleoutput),
    ] {
        registry.add(
            CommandSpec::new(name, handler)
                .required("outputid")
                .validate("outputid", Validator::Uint),
        )?;
    }
    registry.add(CommandSpec::new("outputs", outputs))?;
    Ok(())
}

fn check_output(args: &Args) -> Result<(), AckError> {
    if args.uint("outputid")? != MUTE_OUTPUT {
        return Err(AckError::no_exist("No such audio output"));
    }
    Ok(())
}

fn set_mute(dispatcher: &Dispatcher, mute: bool, failure: &str) -> Result<Reply, AckError> {
    if !dispatcher.core(move |core| core.set_mute(mute))? {
        return Err(AckError::system(failure));
    }
    Ok(Reply::default())
}

fn disableoutput(dispatcher: &mut Dispatcher, args: &Args) -> Result<Reply, AckError> {
    check_output(args)?;
    set_mute(dispatcher, false, "problems disabling output")
}

fn enableoutput(dispatcher: &mut Dispatcher, args: &Args) -> Result<Reply, AckError> {
    check_output(args)?;
    set_mute(dispatcher, true, "problems enabling output")
}

fn toggleoutput(dispatcher: &mut Dispatcher, args: &Args) -> Result<Reply, AckError> {
    check_output(args)?;
    let muted = dispatcher.core(|core| core.mute())?.unwrap_or_default();
    set_mute(dispatcher, !muted, "problems toggling output")
}

fn outputs(dispatcher: &mut Dispatcher, _: &Args) -> Result<Reply, AckError> {
    let muted = dispatcher.core(|core| core.mute())?.unwrap_or_default();
    let mut reply = Reply::field("outputid", MUTE_OUTPUT);
    reply.push_field("outputname", "Mute");
    reply.push_field("outputenabled", u8::from(muted));
    Ok(reply)
}
