//! Per-session request pipeline.
//!
//! A request line travels through a fixed list of [`Stage`]s. Each stage
//! receives the request, the response gathered so far, and the stages still
//! ahead of it; it either answers directly or delegates to the rest of the
//! chain. The stages, in order:
//!
//! 1. catch ACK errors and render them as the only response line,
//! 2. enforce authentication when a password is configured,
//! 3. buffer command lists and strip per-item `OK`s while replaying them,
//! 4. gate idle mode, where only `noidle` is accepted,
//! 5. append the terminating `OK`,
//! 6. tokenize, look up, bind, and run the handler.

use std::collections::BTreeSet;
use std::sync::Arc;

use cadenza_config::Config;
use cadenza_core::{Core, CoreHandle};
use strum::IntoEnumIterator;
use tracing::{debug, warn};

use super::DISPATCH_TARGET;
use super::ack::AckError;
use super::registry::Registry;
use super::subsystem::Subsystem;
use super::tokenizer::{self, TokenizeError};

pub(crate) const COMMAND_LIST_END: &str = "command_list_end";
const NOIDLE: &str = "noidle";
const OK: &str = "OK";

/// Server-wide settings every session consults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct DispatchSettings {
    pub(crate) password: Option<String>,
    pub(crate) denylist: Vec<String>,
    pub(crate) default_playlist_scheme: String,
}

impl DispatchSettings {
    pub(crate) fn from_config(config: &Config) -> Self {
        Self {
            password: config.password().map(str::to_owned),
            denylist: config.command_denylist.clone(),
            default_playlist_scheme: config.default_playlist_scheme.clone(),
        }
    }

    fn is_denied(&self, command: &str) -> bool {
        self.denylist.iter().any(|denied| denied == command)
    }
}

/// How the session is treating incoming lines with respect to command lists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum CommandListMode {
    /// Lines are executed as they arrive.
    #[default]
    Off,
    /// Lines are buffered until `command_list_end`.
    Plain,
    /// Lines are buffered, and each successful item is followed by `list_OK`.
    Acknowledged,
}

/// State owned by exactly one connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct SessionState {
    pub(crate) authenticated: bool,
    pub(crate) command_list: CommandListMode,
    pub(crate) command_list_buffer: Vec<String>,
    pub(crate) subscriptions: BTreeSet<Subsystem>,
    pub(crate) events: BTreeSet<Subsystem>,
    pub(crate) closing: bool,
}

impl SessionState {
    const fn is_receiving_command_list(&self) -> bool {
        !matches!(self.command_list, CommandListMode::Off)
    }

    /// Clears idle bookkeeping after a notification was delivered or
    /// cancelled.
    pub(crate) fn reset_idle(&mut self) {
        self.subscriptions.clear();
        self.events.clear();
    }

    /// Subsystems both subscribed to and changed, or `None` when none match.
    pub(crate) fn take_active(&mut self) -> Option<Vec<String>> {
        let active: Vec<String> = self
            .subscriptions
            .intersection(&self.events)
            .map(|subsystem| format!("changed: {subsystem}"))
            .collect();
        if active.is_empty() {
            return None;
        }
        self.reset_idle();
        Some(active)
    }
}

/// One step of the request pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    CatchAckErrors,
    Authenticate,
    CommandList,
    IdleFilter,
    AddOk,
    CallHandler,
}

const PIPELINE: [Stage; 6] = [
    Stage::CatchAckErrors,
    Stage::Authenticate,
    Stage::CommandList,
    Stage::IdleFilter,
    Stage::AddOk,
    Stage::CallHandler,
];

#[derive(Debug, Clone, Copy)]
struct Request<'a> {
    line: &'a str,
    /// Position inside the command list being replayed, if any.
    list_index: Option<usize>,
}

/// Runs request lines for one session against the shared core.
pub(crate) struct Dispatcher {
    core: CoreHandle,
    settings: Arc<DispatchSettings>,
    registry: &'static Registry,
    pub(crate) session: SessionState,
}

impl Dispatcher {
    pub(crate) fn new(
        core: CoreHandle,
        settings: Arc<DispatchSettings>,
        registry: &'static Registry,
    ) -> Self {
        Self {
            core,
            settings,
            registry,
            session: SessionState::default(),
        }
    }

    pub(crate) fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    pub(crate) const fn registry(&self) -> &'static Registry {
        self.registry
    }

    /// Whether the session is parked in `idle`.
    pub(crate) fn is_idling(&self) -> bool {
        !self.session.subscriptions.is_empty()
    }

    /// Whether the connection should be closed after this request.
    pub(crate) const fn is_closing(&self) -> bool {
        self.session.closing
    }

    /// Runs `job` on the core actor.
    pub(crate) fn core<R, F>(&self, job: F) -> Result<R, AckError>
    where
        F: FnOnce(&mut Core) -> R + Send + 'static,
        R: Send + 'static,
    {
        self.core.call(job).map_err(|error| {
            warn!(target: DISPATCH_TARGET, %error, "core is unavailable");
            AckError::from(error)
        })
    }

    /// Handles one request line and returns the response lines.
    pub(crate) fn handle_request(&mut self, line: &str) -> Vec<String> {
        self.dispatch(Request {
            line,
            list_index: None,
        })
    }

    /// Replays a buffered command-list line as item `index`.
    pub(crate) fn handle_list_item(&mut self, line: &str, index: usize) -> Vec<String> {
        self.dispatch(Request {
            line,
            list_index: Some(index),
        })
    }

    /// Records a change in `subsystem`; returns the notification to push
    /// when the session was waiting for it.
    pub(crate) fn handle_idle(&mut self, subsystem: Subsystem) -> Vec<String> {
        self.session.events.insert(subsystem);
        let Some(mut lines) = self.session.take_active() else {
            return Vec::new();
        };
        lines.push(OK.to_owned());
        lines
    }

    /// Every subsystem, for an `idle` without arguments.
    pub(crate) fn all_subsystems() -> BTreeSet<Subsystem> {
        Subsystem::iter().collect()
    }

    fn dispatch(&mut self, request: Request<'_>) -> Vec<String> {
        debug!(
            target: DISPATCH_TARGET,
            line = request.line,
            list_index = ?request.list_index,
            "request received"
        );
        let lines = self
            .call_next(request, Vec::new(), &PIPELINE)
            .unwrap_or_else(|error| vec![error.render(request.list_index.unwrap_or_default())]);
        debug!(
            target: DISPATCH_TARGET,
            lines = lines.len(),
            "response ready"
        );
        lines
    }

    fn call_next(
        &mut self,
        request: Request<'_>,
        response: Vec<String>,
        chain: &[Stage],
    ) -> Result<Vec<String>, AckError> {
        let Some((stage, rest)) = chain.split_first() else {
            return Ok(response);
        };
        match stage {
            Stage::CatchAckErrors => Ok(self.catch_ack_errors(request, response, rest)),
            Stage::Authenticate => self.authenticate(request, response, rest),
            Stage::CommandList => self.command_list(request, response, rest),
            Stage::IdleFilter => self.idle_filter(request, response, rest),
            Stage::AddOk => self.add_ok(request, response, rest),
            Stage::CallHandler => self.call_handler(request, response),
        }
    }

    fn catch_ack_errors(
        &mut self,
        request: Request<'_>,
        response: Vec<String>,
        rest: &[Stage],
    ) -> Vec<String> {
        self.call_next(request, response, rest)
            .unwrap_or_else(|error| {
                debug!(
                    target: DISPATCH_TARGET,
                    code = %error.code(),
                    message = error.message(),
                    "request failed"
                );
                vec![error.render(request.list_index.unwrap_or_default())]
            })
    }

    fn authenticate(
        &mut self,
        request: Request<'_>,
        response: Vec<String>,
        rest: &[Stage],
    ) -> Result<Vec<String>, AckError> {
        if self.session.authenticated {
            return self.call_next(request, response, rest);
        }
        if self.settings.password.is_none() {
            self.session.authenticated = true;
            return self.call_next(request, response, rest);
        }
        let name = request.line.split(' ').next().unwrap_or_default();
        if self
            .registry
            .get(name)
            .is_some_and(|spec| !spec.auth_required())
        {
            return self.call_next(request, response, rest);
        }
        Err(AckError::permission(name))
    }

    fn command_list(
        &mut self,
        request: Request<'_>,
        response: Vec<String>,
        rest: &[Stage],
    ) -> Result<Vec<String>, AckError> {
        let ends_list = request.line == COMMAND_LIST_END;
        if self.session.is_receiving_command_list() && !ends_list {
            self.session
                .command_list_buffer
                .push(request.line.to_owned());
            return Ok(Vec::new());
        }
        let mut lines = self.call_next(request, response, rest)?;
        let inside_list = !ends_list
            && (self.session.is_receiving_command_list() || request.list_index.is_some());
        if inside_list && lines.last().is_some_and(|line| line == OK) {
            lines.pop();
        }
        Ok(lines)
    }

    fn idle_filter(
        &mut self,
        request: Request<'_>,
        response: Vec<String>,
        rest: &[Stage],
    ) -> Result<Vec<String>, AckError> {
        let is_noidle = request.line == NOIDLE;
        if self.is_idling() && !is_noidle {
            warn!(
                target: DISPATCH_TARGET,
                line = request.line,
                "only noidle is allowed while idling; closing connection"
            );
            self.session.closing = true;
            return Ok(Vec::new());
        }
        if !self.is_idling() && is_noidle {
            return Ok(Vec::new());
        }
        let lines = self.call_next(request, response, rest)?;
        if self.is_idling() {
            return Ok(Vec::new());
        }
        Ok(lines)
    }

    fn add_ok(
        &mut self,
        request: Request<'_>,
        response: Vec<String>,
        rest: &[Stage],
    ) -> Result<Vec<String>, AckError> {
        let mut lines = self.call_next(request, response, rest)?;
        if !lines.last().is_some_and(|line| line.starts_with("ACK")) {
            lines.push(OK.to_owned());
        }
        Ok(lines)
    }

    fn call_handler(
        &mut self,
        request: Request<'_>,
        mut response: Vec<String>,
    ) -> Result<Vec<String>, AckError> {
        let tokens = tokenizer::split(request.line)?;
        let Some((name, params)) = tokens.split_first() else {
            return Err(TokenizeError::NoCommand.into());
        };
        if self.settings.is_denied(name) {
            warn!(target: DISPATCH_TARGET, command = %name, "denylisted command refused");
            return Err(AckError::disabled(name));
        }
        let registry = self.registry;
        let spec = registry.get(name).ok_or_else(|| AckError::unknown(name))?;
        let args = spec.bind(params).map_err(|error| error.or_command(name))?;
        let reply = (spec.handler())(self, &args).map_err(|error| error.or_command(name))?;
        response.extend(reply.into_lines());
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use cadenza_core::Collaborators;
    use rstest::{fixture, rstest};

    use super::*;
    use crate::commands::test_support::{Harness, dummy_tracks};

    fn harness_with(settings: DispatchSettings) -> Harness {
        Harness::configured(Collaborators::default(), settings)
    }

    fn send_all(harness: &mut Harness, lines: &[&str]) -> Vec<String> {
        lines.iter().flat_map(|line| harness.send(line)).collect()
    }

    #[fixture]
    fn harness() -> Harness {
        harness_with(DispatchSettings::default())
    }

    #[fixture]
    fn guarded() -> Harness {
        harness_with(DispatchSettings {
            password: Some("secret".to_owned()),
            ..DispatchSettings::default()
        })
    }

    #[rstest]
    fn unauthenticated_requests_are_refused(mut guarded: Harness) {
        assert_eq!(
            guarded.send("status"),
            ["ACK [4@0] {status} you don't have permission for \"status\""]
        );
    }

    #[rstest]
    fn public_commands_bypass_authentication(mut guarded: Harness) {
        assert_eq!(guarded.send("ping"), ["OK"]);
        assert_eq!(
            guarded.send("password wrong"),
            ["ACK [3@0] {password} incorrect password"]
        );
        assert_eq!(guarded.send("password secret"), ["OK"]);
        assert_eq!(guarded.send("status").last().map(String::as_str), Some("OK"));
    }

    #[rstest]
    fn open_servers_answer_with_output_and_ok(mut harness: Harness) {
        let lines = harness.send("status");
        assert_eq!(lines.first().map(String::as_str), Some("volume: 100"));
        assert_eq!(lines.last().map(String::as_str), Some("OK"));
        assert!(harness.dispatcher.session.authenticated);
    }

    #[rstest]
    #[case("frobnicate", "ACK [5@0] {} unknown command \"frobnicate\"")]
    #[case("", "ACK [5@0] {} No command given")]
    #[case("play x", "ACK [2@0] {play} incorrect arguments")]
    #[case("play 1 2", "ACK [2@0] {play} wrong number of arguments for \"play\"")]
    #[case("play \"1", "ACK [2@0] {play} Missing closing '\"'")]
    #[case("play 5", "ACK [2@0] {play} Bad song index")]
    fn failures_yield_a_single_ack(mut harness: Harness, #[case] line: &str, #[case] ack: &str) {
        assert_eq!(harness.send(line), [ack]);
    }

    #[test]
    fn denylisted_commands_are_disabled() {
        let mut harness = harness_with(DispatchSettings {
            denylist: vec!["listall".to_owned()],
            ..DispatchSettings::default()
        });
        assert_eq!(
            harness.send("listall"),
            ["ACK [0@0] {listall} \"listall\" has been disabled in the server"]
        );
    }

    #[test]
    fn ok_lists_acknowledge_each_item() {
        let mut harness = Harness::with_library(dummy_tracks(2));
        harness.send("add dummy:0");
        let lines = send_all(&mut harness, &[
            "command_list_ok_begin",
            "play",
            "ping",
            "command_list_end",
        ]);
        assert_eq!(lines, ["list_OK", "list_OK", "OK"]);
    }

    #[rstest]
    fn lists_stop_at_the_first_failure(mut harness: Harness) {
        let lines = send_all(&mut harness, &[
            "command_list_begin",
            "ping",
            "play x",
            "ping",
            "command_list_end",
        ]);
        assert_eq!(lines, ["ACK [2@1] {play} incorrect arguments"]);
    }

    #[rstest]
    fn list_items_are_buffered_until_the_end(mut harness: Harness) {
        assert!(harness.send("command_list_begin").is_empty());
        assert!(harness.send("clear").is_empty());
        assert!(harness.send("status").is_empty());
        let lines = harness.send("command_list_end");
        assert!(lines.iter().any(|line| line == "playlist: 1"));
        assert_eq!(lines.last().map(String::as_str), Some("OK"));
        assert_eq!(lines.iter().filter(|line| *line == "OK").count(), 1);
    }

    #[rstest]
    fn ending_a_list_that_never_began_is_unknown(mut harness: Harness) {
        assert_eq!(
            harness.send("command_list_end"),
            ["ACK [5@0] {} unknown command \"command_list_end\""]
        );
    }

    #[rstest]
    fn idle_suppresses_the_response_until_an_event(mut harness: Harness) {
        assert!(harness.send("idle playlist player").is_empty());
        assert!(harness.dispatcher.is_idling());
        assert!(harness.dispatcher.handle_idle(Subsystem::Mixer).is_empty());
        assert_eq!(
            harness.dispatcher.handle_idle(Subsystem::Playlist),
            ["changed: playlist", "OK"]
        );
        assert!(!harness.dispatcher.is_idling());
        assert!(harness.dispatcher.session.events.is_empty());
    }

    #[rstest]
    fn pending_events_answer_idle_immediately(mut harness: Harness) {
        assert!(harness.dispatcher.handle_idle(Subsystem::Options).is_empty());
        assert_eq!(harness.send("idle"), ["changed: options", "OK"]);
        assert!(!harness.dispatcher.is_idling());
    }

    #[rstest]
    fn noidle_cancels_and_is_ignored_otherwise(mut harness: Harness) {
        assert!(harness.send("noidle").is_empty());
        assert!(harness.send("idle").is_empty());
        assert_eq!(harness.send("noidle"), ["OK"]);
        assert!(!harness.dispatcher.is_idling());
    }

    #[rstest]
    fn other_commands_while_idling_close_the_session(mut harness: Harness) {
        harness.send("idle");
        assert!(harness.send("status").is_empty());
        assert!(harness.dispatcher.is_closing());
    }

    #[rstest]
    fn unknown_idle_subsystems_are_rejected(mut harness: Harness) {
        assert_eq!(
            harness.send("idle bogus"),
            ["ACK [2@0] {idle} Unrecognized idle event: bogus"]
        );
        assert!(!harness.dispatcher.is_idling());
    }
}
