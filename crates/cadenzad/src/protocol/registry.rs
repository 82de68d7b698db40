//! Static command table: names, parameter shapes, validators, and flags.
//!
//! Every command is declared once through [`CommandSpec`] and checked when the
//! table is built, so a malformed declaration fails at startup instead of on
//! the first request that reaches it.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use thiserror::Error;

use super::ack::AckError;
use super::dispatcher::Dispatcher;
use super::reply::Reply;

/// Signature shared by every command handler.
pub(crate) type Handler = fn(&mut Dispatcher, &Args) -> Result<Reply, AckError>;

/// Declaration mistakes detected while building the table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Two commands share a name.
    #[error("command {name} is already registered")]
    Duplicate {
        /// Offending command name.
        name: String,
    },
    /// A variadic parameter was combined with other parameters.
    #[error("command {name} mixes a variadic parameter with other parameters")]
    MixedArity {
        /// Offending command name.
        name: String,
    },
    /// A required parameter follows an optional one.
    #[error("command {name} declares required parameter {parameter} after an optional one")]
    ParameterOrder {
        /// Offending command name.
        name: String,
        /// Misplaced parameter.
        parameter: String,
    },
    /// A validator names a parameter the command does not declare.
    #[error("command {name} validates unknown parameter {parameter}")]
    UnknownParameter {
        /// Offending command name.
        name: String,
        /// Parameter the validator refers to.
        parameter: String,
    },
}

/// Coercion applied to a raw argument token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Validator {
    /// Signed decimal integer.
    Int,
    /// Unsigned decimal integer made of digits only.
    Uint,
    /// `0` or `1`.
    Bool,
    /// `N`, `N:` or `N:M` with `M > N`.
    Range,
}

/// Half-open span of tracklist positions; `end` of `None` means "to the end".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SongRange {
    pub(crate) start: usize,
    pub(crate) end: Option<usize>,
}

impl SongRange {
    /// Resolves an open end against a list of `length` entries.
    pub(crate) fn end_or(self, length: usize) -> usize {
        self.end.unwrap_or(length)
    }
}

/// A bound argument after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Value {
    Text(String),
    Int(i64),
    Uint(u64),
    Bool(bool),
    Range(SongRange),
}

impl Validator {
    /// Coerces `raw`, or returns `None` when it does not parse.
    pub(crate) fn apply(self, raw: &str) -> Option<Value> {
        match self {
            Self::Int => parse_int(raw).map(Value::Int),
            Self::Uint => parse_uint(raw).map(Value::Uint),
            Self::Bool => match raw {
                "0" => Some(Value::Bool(false)),
                "1" => Some(Value::Bool(true)),
                _ => None,
            },
            Self::Range => parse_range(raw).map(Value::Range),
        }
    }
}

fn parse_int(raw: &str) -> Option<i64> {
    raw.trim().parse().ok()
}

fn parse_uint(raw: &str) -> Option<u64> {
    if raw.is_empty() || !raw.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

fn parse_position(raw: &str) -> Option<usize> {
    parse_uint(raw).and_then(|value| usize::try_from(value).ok())
}

fn parse_range(raw: &str) -> Option<SongRange> {
    let Some((start, end)) = raw.split_once(':') else {
        let start = parse_position(raw)?;
        return Some(SongRange {
            start,
            end: Some(start.checked_add(1)?),
        });
    };
    let first = parse_position(start)?;
    if end.trim().is_empty() {
        return Some(SongRange {
            start: first,
            end: None,
        });
    }
    let last = parse_position(end)?;
    (last > first).then_some(SongRange {
        start: first,
        end: Some(last),
    })
}

/// Shape of one declared parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Param {
    /// Must be supplied.
    Required(&'static str),
    /// May be omitted; absent from [`Args`] when it is.
    Optional(&'static str),
    /// May be omitted; bound to the given value, unvalidated, when it is.
    Defaulted(&'static str, Value),
    /// Collects every token, unvalidated.
    Variadic,
}

impl Param {
    const fn name(&self) -> Option<&'static str> {
        match self {
            Self::Required(name) | Self::Optional(name) | Self::Defaulted(name, _) => Some(*name),
            Self::Variadic => None,
        }
    }
}

/// One entry of the command table.
#[derive(Debug, Clone)]
pub(crate) struct CommandSpec {
    name: &'static str,
    handler: Handler,
    params: Vec<Param>,
    validators: Vec<(&'static str, Validator)>,
    auth_required: bool,
    list_eligible: bool,
}

impl CommandSpec {
    /// Declares a command that takes no arguments, requires authentication,
    /// and is listed by `commands`.
    pub(crate) fn new(name: &'static str, handler: Handler) -> Self {
        Self {
            name,
            handler,
            params: Vec::new(),
            validators: Vec::new(),
            auth_required: true,
            list_eligible: true,
        }
    }

    pub(crate) fn required(mut self, name: &'static str) -> Self {
        self.params.push(Param::Required(name));
        self
    }

    pub(crate) fn optional(mut self, name: &'static str) -> Self {
        self.params.push(Param::Optional(name));
        self
    }

    pub(crate) fn defaulted(mut self, name: &'static str, value: Value) -> Self {
        self.params.push(Param::Defaulted(name, value));
        self
    }

    pub(crate) fn variadic(mut self) -> Self {
        self.params.push(Param::Variadic);
        self
    }

    pub(crate) fn validate(mut self, name: &'static str, validator: Validator) -> Self {
        self.validators.push((name, validator));
        self
    }

    /// Usable before authenticating.
    pub(crate) fn public(mut self) -> Self {
        self.auth_required = false;
        self
    }

    /// Hidden from `commands` and `notcommands`.
    pub(crate) fn unlisted(mut self) -> Self {
        self.list_eligible = false;
        self
    }

    pub(crate) const fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) const fn handler(&self) -> Handler {
        self.handler
    }

    pub(crate) const fn auth_required(&self) -> bool {
        self.auth_required
    }

    pub(crate) const fn list_eligible(&self) -> bool {
        self.list_eligible
    }

    fn is_variadic(&self) -> bool {
        self.params.contains(&Param::Variadic)
    }

    fn check(&self) -> Result<(), RegistryError> {
        if self.is_variadic() && self.params.len() > 1 {
            return Err(RegistryError::MixedArity {
                name: self.name.to_owned(),
            });
        }
        let mut seen_optional = false;
        for param in &self.params {
            match param {
                Param::Required(parameter) if seen_optional => {
                    return Err(RegistryError::ParameterOrder {
                        name: self.name.to_owned(),
                        parameter: (*parameter).to_owned(),
                    });
                }
                Param::Optional(_) | Param::Defaulted(..) => seen_optional = true,
                Param::Required(_) | Param::Variadic => {}
            }
        }
        for (parameter, _) in &self.validators {
            if !self.params.iter().any(|param| param.name() == Some(*parameter)) {
                return Err(RegistryError::UnknownParameter {
                    name: self.name.to_owned(),
                    parameter: (*parameter).to_owned(),
                });
            }
        }
        Ok(())
    }

    fn validator_for(&self, parameter: &str) -> Option<Validator> {
        self.validators
            .iter()
            .find(|(name, _)| *name == parameter)
            .map(|(_, validator)| *validator)
    }

    /// Binds `tokens` to the declared parameters and validates them.
    ///
    /// Validators only see supplied tokens; omitted parameters keep their
    /// declared default untouched.
    pub(crate) fn bind(&self, tokens: &[String]) -> Result<Args, AckError> {
        if self.is_variadic() {
            return Ok(Args {
                named: BTreeMap::new(),
                rest: tokens.to_vec(),
            });
        }
        let required = self
            .params
            .iter()
            .filter(|param| matches!(param, Param::Required(_)))
            .count();
        if tokens.len() < required || tokens.len() > self.params.len() {
            return Err(AckError::arg(format!(
                "wrong number of arguments for \"{}\"",
                self.name
            )));
        }

        let mut named = BTreeMap::new();
        for (position, param) in self.params.iter().enumerate() {
            let Some(name) = param.name() else { continue };
            let value = match (tokens.get(position), param) {
                (Some(raw), _) => match self.validator_for(name) {
                    Some(validator) => validator
                        .apply(raw)
                        .ok_or_else(|| AckError::arg("incorrect arguments"))?,
                    None => Value::Text(raw.clone()),
                },
                (None, Param::Defaulted(_, default)) => default.clone(),
                (None, _) => continue,
            };
            named.insert(name, value);
        }
        Ok(Args {
            named,
            rest: Vec::new(),
        })
    }
}

/// Arguments bound to one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Args {
    named: BTreeMap<&'static str, Value>,
    rest: Vec<String>,
}

fn missing(name: &str) -> AckError {
    AckError::arg(format!("missing argument {name}"))
}

impl Args {
    /// Tokens collected by a variadic command.
    pub(crate) fn rest(&self) -> &[String] {
        &self.rest
    }

    pub(crate) fn has(&self, name: &str) -> bool {
        self.named.contains_key(name)
    }

    pub(crate) fn opt_text(&self, name: &str) -> Option<&str> {
        match self.named.get(name) {
            Some(Value::Text(text)) => Some(text),
            _ => None,
        }
    }

    pub(crate) fn text(&self, name: &str) -> Result<&str, AckError> {
        self.opt_text(name).ok_or_else(|| missing(name))
    }

    pub(crate) fn opt_int(&self, name: &str) -> Option<i64> {
        match self.named.get(name) {
            Some(Value::Int(value)) => Some(*value),
            _ => None,
        }
    }

    pub(crate) fn int(&self, name: &str) -> Result<i64, AckError> {
        self.opt_int(name).ok_or_else(|| missing(name))
    }

    pub(crate) fn opt_uint(&self, name: &str) -> Option<u64> {
        match self.named.get(name) {
            Some(Value::Uint(value)) => Some(*value),
            _ => None,
        }
    }

    pub(crate) fn uint(&self, name: &str) -> Result<u64, AckError> {
        self.opt_uint(name).ok_or_else(|| missing(name))
    }

    /// Unsigned argument used as a position or count.
    pub(crate) fn position(&self, name: &str) -> Result<usize, AckError> {
        usize::try_from(self.uint(name)?).map_err(|_| AckError::arg("Bad song index"))
    }

    pub(crate) fn opt_position(&self, name: &str) -> Result<Option<usize>, AckError> {
        self.opt_uint(name)
            .map(|value| usize::try_from(value).map_err(|_| AckError::arg("Bad song index")))
            .transpose()
    }

    pub(crate) fn opt_bool(&self, name: &str) -> Option<bool> {
        match self.named.get(name) {
            Some(Value::Bool(value)) => Some(*value),
            _ => None,
        }
    }

    pub(crate) fn bool(&self, name: &str) -> Result<bool, AckError> {
        self.opt_bool(name).ok_or_else(|| missing(name))
    }

    pub(crate) fn opt_range(&self, name: &str) -> Option<SongRange> {
        match self.named.get(name) {
            Some(Value::Range(range)) => Some(*range),
            _ => None,
        }
    }

    pub(crate) fn range(&self, name: &str) -> Result<SongRange, AckError> {
        self.opt_range(name).ok_or_else(|| missing(name))
    }
}

/// Lookup table from command name to declaration.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    commands: BTreeMap<&'static str, CommandSpec>,
}

impl Registry {
    /// Adds `spec` after checking its declaration.
    pub(crate) fn add(&mut self, spec: CommandSpec) -> Result<(), RegistryError> {
        spec.check()?;
        match self.commands.entry(spec.name) {
            Entry::Occupied(_) => Err(RegistryError::Duplicate {
                name: spec.name.to_owned(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(spec);
                Ok(())
            }
        }
    }

    pub(crate) fn get(&self, name: &str) -> Option<&CommandSpec> {
        self.commands.get(name)
    }

    /// Declarations in name order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &CommandSpec> {
        self.commands.values()
    }
}
