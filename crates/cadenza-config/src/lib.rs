//! Shared configuration for the cadenza MPD server.
//!
//! Values are layered by `ortho_config`: built-in defaults, then an optional
//! configuration file (`--config-path` or `CADENZA_CONFIG_PATH`), then
//! `CADENZA_*` environment variables, then command-line flags. The resolved
//! [`Config`] is consumed by the daemon when it binds its listener, installs
//! telemetry, and seeds the in-memory library.

mod defaults;
mod endpoint;
mod logging;

use std::time::Duration;

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_CONNECTION_TIMEOUT_SECS, DEFAULT_HOSTNAME, DEFAULT_LOG_FILTER,
    DEFAULT_MAX_CONNECTIONS, DEFAULT_PLAYLIST_SCHEME, DEFAULT_PORT, default_hostname,
    default_log_filter, default_log_filter_string, default_log_format, default_playlist_scheme,
};
pub use endpoint::{EndpointPreparationError, ListenEndpoint, UNIX_HOSTNAME_PREFIX};
pub use logging::{LogFormat, LogFormatParseError};

/// Resolved server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "CADENZA")]
pub struct Config {
    /// Host or address to bind; `unix:/path` selects a Unix socket.
    #[ortho_config(default = defaults::default_hostname())]
    pub hostname: String,
    /// TCP port to bind.
    #[ortho_config(default = defaults::DEFAULT_PORT)]
    pub port: u16,
    /// Password clients must present before using protected commands.
    pub password: Option<String>,
    /// Upper bound on concurrently connected sessions.
    #[ortho_config(default = defaults::DEFAULT_MAX_CONNECTIONS)]
    pub max_connections: usize,
    /// Seconds a silent, non-idling connection is kept open; `0` disables.
    #[ortho_config(default = defaults::DEFAULT_CONNECTION_TIMEOUT_SECS)]
    pub connection_timeout: u64,
    /// Commands refused with a "disabled" acknowledgement.
    #[serde(default)]
    pub command_denylist: Vec<String>,
    /// Scheme used when a stored playlist has to be created from scratch.
    #[ortho_config(default = defaults::default_playlist_scheme())]
    pub default_playlist_scheme: String,
    /// JSON catalogue used to seed the in-memory music library.
    pub library_path: Option<Utf8PathBuf>,
    /// `tracing` filter directive.
    #[ortho_config(default = defaults::default_log_filter_string())]
    pub log_filter: String,
    /// Log output encoding.
    #[ortho_config(default = defaults::default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hostname: defaults::default_hostname(),
            port: defaults::DEFAULT_PORT,
            password: None,
            max_connections: defaults::DEFAULT_MAX_CONNECTIONS,
            connection_timeout: defaults::DEFAULT_CONNECTION_TIMEOUT_SECS,
            command_denylist: Vec::new(),
            default_playlist_scheme: defaults::default_playlist_scheme(),
            library_path: None,
            log_filter: defaults::default_log_filter_string(),
            log_format: defaults::default_log_format(),
        }
    }
}

impl Config {
    /// Endpoint derived from the host name and port.
    #[must_use]
    pub fn endpoint(&self) -> ListenEndpoint {
        ListenEndpoint::from_hostname(&self.hostname, self.port)
    }

    /// Configured password, ignoring an empty string.
    #[must_use]
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref().filter(|password| !password.is_empty())
    }

    /// Inactivity budget for a connection, or `None` when disabled.
    #[must_use]
    pub fn connection_timeout(&self) -> Option<Duration> {
        (self.connection_timeout > 0).then(|| Duration::from_secs(self.connection_timeout))
    }

    /// Whether `command` appears in the denylist.
    #[must_use]
    pub fn is_denied(&self, command: &str) -> bool {
        self.command_denylist.iter().any(|denied| denied == command)
    }

    /// `tracing` filter directive.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output encoding.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }
}
