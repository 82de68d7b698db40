use crate::logging::LogFormat;

/// Port registered for the MPD protocol.
pub const DEFAULT_PORT: u16 = 6600;

/// Interface the server binds to unless told otherwise.
pub const DEFAULT_HOSTNAME: &str = "127.0.0.1";

/// Default log filter expression used by the daemon.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Concurrent sessions accepted before new connections are turned away.
pub const DEFAULT_MAX_CONNECTIONS: usize = 20;

/// Seconds of silence tolerated before a connection is dropped.
pub const DEFAULT_CONNECTION_TIMEOUT_SECS: u64 = 60;

/// Scheme used for stored playlists when no better backend can hold them.
pub const DEFAULT_PLAYLIST_SCHEME: &str = "m3u";

/// Default host name, owned for serde and the CLI layer.
pub fn default_hostname() -> String {
    DEFAULT_HOSTNAME.to_owned()
}

/// Default log filter expression used by the daemon.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the daemon.
pub fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Default stored-playlist scheme, owned for serde and the CLI layer.
pub fn default_playlist_scheme() -> String {
    DEFAULT_PLAYLIST_SCHEME.to_owned()
}
