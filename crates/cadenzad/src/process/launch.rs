//! Supervises daemon launch sequencing and runtime orchestration.

use std::sync::Arc;

use cadenza_config::Config;
use cadenza_core::{
    Collaborators, Core, CoreActor, CoreListener, MemoryLibrary, MemoryPlaylistStore,
};
use tracing::info;

use crate::bootstrap::{ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::broadcaster::Broadcaster;
use crate::commands;
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::protocol::dispatcher::DispatchSettings;
use crate::session::{MpdConnectionHandler, SessionLimits};
use crate::transport::SocketListener;

use super::PROCESS_TARGET;
use super::errors::LaunchError;
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};

/// Collaborators required to launch the daemon runtime.
pub(crate) struct LaunchPlan<L, S> {
    pub(crate) loader: L,
    pub(crate) reporter: Arc<dyn HealthReporter>,
    pub(crate) shutdown: S,
}

/// Runs the daemon in the foreground until a termination signal arrives.
///
/// # Errors
///
/// Returns [`LaunchError`] when any startup step fails or the signal handlers
/// cannot be installed.
pub fn run_daemon() -> Result<(), LaunchError> {
    run_daemon_with(LaunchPlan {
        loader: SystemConfigLoader,
        reporter: Arc::new(StructuredHealthReporter::new()),
        shutdown: SystemShutdownSignal,
    })
}

/// Runs the daemon with injected collaborators.
pub(crate) fn run_daemon_with<L, S>(plan: LaunchPlan<L, S>) -> Result<(), LaunchError>
where
    L: ConfigLoader,
    S: ShutdownSignal,
{
    let LaunchPlan {
        loader,
        reporter,
        shutdown,
    } = plan;

    let config = bootstrap_with(&loader, reporter.as_ref())?.into_config();
    info!(
        target: PROCESS_TARGET,
        endpoint = %config.endpoint(),
        "starting daemon runtime"
    );
    let registry = commands::registry()?;
    let broadcaster = Arc::new(Broadcaster::default());
    let core_listener: Arc<dyn CoreListener> = broadcaster.clone();
    let core = Core::new(collaborators(&config)?, core_listener);
    let (actor, core_handle) = CoreActor::spawn(core)?;

    let listener = SocketListener::bind(&config.endpoint())?;
    let endpoint = listener.bound_endpoint();
    let handler = Arc::new(MpdConnectionHandler::new(
        core_handle,
        DispatchSettings::from_config(&config),
        registry,
        broadcaster,
        SessionLimits::from_config(&config),
    ));
    let listener_handle = listener.start(handler)?;
    reporter.listener_started(&endpoint);

    shutdown.wait()?;
    listener_handle.shutdown();
    listener_handle.join()?;
    actor.shutdown();
    reporter.shutdown_completed();
    info!(
        target: PROCESS_TARGET,
        "shutdown sequence completed"
    );
    Ok(())
}

/// In-memory collaborators seeded from the configured catalogue.
fn collaborators(config: &Config) -> Result<Collaborators, LaunchError> {
    let library = match &config.library_path {
        Some(path) => MemoryLibrary::from_catalogue(path.as_std_path())?,
        None => MemoryLibrary::default(),
    };
    Ok(Collaborators {
        library: Box::new(library),
        playlists: Box::new(MemoryPlaylistStore::new(
            config.default_playlist_scheme.clone(),
        )),
        ..Collaborators::default()
    })
}
