//! Controller Handle - lifecycle of the polling session
//!
//! Owns the shared slot table, the poller thread and the command surface.
//! [`ControllerHandle::start`] spawns the poller; [`ControllerHandle::stop`]
//! clears the running flag under the shared lock, joins the thread and throws
//! away whatever is still queued. Queries keep answering after `stop` with the
//! state of the last completed cycle.
//!
//! ```text
//! Backend ──► DevicePoller ──► PadTable (slots + queue) ──► drain() ──► EventHandler
//!             (own thread)      Mutex                        (consumer thread)
//! ```

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, error, info};

use crate::config::{ConfigError, RelaySettings};
use crate::controller::backend::GamepadBackend;
use crate::controller::commands::Commands;
use crate::controller::event_collector::{CollectorSettings, DevicePoller};
use crate::controller::event_processor::{DispatchError, EventHandler, EventProcessor, HostClock};
use crate::controller::shared::{PadTable, SharedState};

/// Errors that can occur while starting or stopping the session
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("Failed to spawn poller thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Poller thread panicked")]
    PollerPanicked,

    #[error("Invalid settings: {0}")]
    Settings(#[from] ConfigError),
}

pub struct ControllerHandle {
    shared: Arc<SharedState>,
    commands: Commands,
    poller: Option<JoinHandle<()>>,
}

impl ControllerHandle {
    /// Spawns the poller against `backend`.
    ///
    /// Uses default settings if `settings` is `None`.
    pub fn start(
        backend: Arc<dyn GamepadBackend>,
        settings: Option<RelaySettings>,
    ) -> Result<Self, ControllerError> {
        let settings = settings.unwrap_or_default();
        settings.validate()?;
        info!("Starting controller session with settings: {:?}", settings);

        let shared = Arc::new(SharedState::new(PadTable {
            running: true,
            ..PadTable::default()
        }));

        let collector_settings = CollectorSettings::from(&settings);
        let poller = DevicePoller::create(shared.clone(), backend.clone(), collector_settings);

        let thread = thread::Builder::new()
            .name("gamepad-poller".to_string())
            .spawn(move || {
                let mut polling = poller.initialize();
                polling.run_poll_loop();
            })?;
        debug!("Poller thread spawned");

        Ok(Self {
            commands: Commands::new(shared.clone(), backend),
            shared,
            poller: Some(thread),
        })
    }

    /// Stops the poller and discards queued events. Calling it twice is harmless.
    pub fn stop(&mut self) -> Result<(), ControllerError> {
        let Some(thread) = self.poller.take() else {
            return Ok(());
        };

        info!("Stopping controller session");
        self.shared.set_running(false);
        let joined = thread.join();

        let discarded = self.shared.take_events().len();
        if discarded > 0 {
            debug!("Discarded {} undelivered events", discarded);
        }

        joined.map_err(|_| {
            error!("Poller thread terminated with a panic");
            ControllerError::PollerPanicked
        })
    }

    pub fn is_running(&self) -> bool {
        self.poller.is_some()
    }

    /// Dispatches every queued event to `handler`. Meant to be called from the host tick.
    pub fn drain(
        &self,
        handler: &mut impl EventHandler,
        clock: &impl HostClock,
    ) -> Result<usize, DispatchError> {
        EventProcessor::drain(&self.shared, handler, clock)
    }

    /// Number of events waiting for the next drain.
    pub fn pending_events(&self) -> usize {
        self.shared.queued_events()
    }

    pub fn commands(&self) -> &Commands {
        &self.commands
    }
}

impl Drop for ControllerHandle {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            error!("Error while shutting down controller session: {}", e);
        }
    }
}
