//! MPD line protocol: tokenizing, command declarations, the request pipeline,
//! and rendering of core models.

pub(crate) mod ack;
pub(crate) mod dispatcher;
pub(crate) mod registry;
pub(crate) mod reply;
pub(crate) mod subsystem;
pub(crate) mod tokenizer;
pub(crate) mod translator;

pub use registry::RegistryError;

/// Tracing target for request handling.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");
