//! Defines the unified error surface for daemon launch and supervision.

use thiserror::Error;

use cadenza_core::{CatalogueError, CoreError};

use crate::bootstrap::BootstrapError;
use crate::protocol::RegistryError;
use crate::transport::ListenerError;

use super::shutdown::ShutdownError;

/// Errors surfaced while launching or supervising the daemon process.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Configuration, telemetry, or socket preparation failed.
    #[error("daemon bootstrap failed: {source}")]
    Bootstrap {
        /// Underlying bootstrap error.
        #[source]
        source: BootstrapError,
    },
    /// The command table is inconsistent.
    #[error("failed to build the command table: {source}")]
    Registry {
        /// Underlying registry error.
        #[source]
        source: RegistryError,
    },
    /// The configured library catalogue could not be loaded.
    #[error("failed to load the music library: {source}")]
    Catalogue {
        /// Underlying catalogue error.
        #[source]
        source: CatalogueError,
    },
    /// The core actor could not be started.
    #[error("failed to start the player core: {source}")]
    Core {
        /// Underlying actor error.
        #[source]
        source: CoreError,
    },
    /// Socket listener startup failed.
    #[error("listener failed: {source}")]
    Listener {
        /// Underlying listener error.
        #[source]
        source: ListenerError,
    },
    /// Waiting for the shutdown signal failed.
    #[error("shutdown signal handling failed: {source}")]
    Shutdown {
        /// Underlying signal error.
        #[source]
        source: ShutdownError,
    },
}

impl From<BootstrapError> for LaunchError {
    fn from(source: BootstrapError) -> Self {
        Self::Bootstrap { source }
    }
}

impl From<RegistryError> for LaunchError {
    fn from(source: RegistryError) -> Self {
        Self::Registry { source }
    }
}

impl From<CatalogueError> for LaunchError {
    fn from(source: CatalogueError) -> Self {
        Self::Catalogue { source }
    }
}

impl From<CoreError> for LaunchError {
    fn from(source: CoreError) -> Self {
        Self::Core { source }
    }
}

impl From<ListenerError> for LaunchError {
    fn from(source: ListenerError) -> Self {
        Self::Listener { source }
    }
}

impl From<ShutdownError> for LaunchError {
    fn from(source: ShutdownError) -> Self {
        Self::Shutdown { source }
    }
}
