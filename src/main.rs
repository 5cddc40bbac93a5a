use std::sync::Arc;
use std::thread;

use color_eyre::{eyre::eyre, Result};
use gamepad_relay::controller::simulated::SimulatedBackend;
use gamepad_relay::{
    BatteryReading, Button, Commands, ControllerHandle, DispatchedEvent, GamepadBackend,
    GamepadState, HookFailure, HookRegistry, InputKind, RelaySettings, Side, WallClock,
};
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn main() -> Result<()> {
    setup()?;

    let settings = RelaySettings::load_or_default()?;
    let (backend, mut demo) = create_backend();

    info!("Starting controller session");
    let mut session = ControllerHandle::start(backend, Some(settings.clone()))
        .map_err(|e| eyre!("Failed to start controller session: {}", e))?;

    let mut hooks = HookRegistry::new();
    install_hooks(&mut hooks, session.commands().clone())?;
    info!("Registered {} hooks", hooks.len());

    // Host tick: drain and dispatch, like a game's think hook.
    let clock = WallClock;
    loop {
        if let Some(demo) = demo.as_mut() {
            if !demo.step() {
                break;
            }
        }

        let dispatched = session.drain(&mut hooks, &clock)?;
        if dispatched > 0 {
            debug!("Dispatched {} events", dispatched);
        }

        thread::sleep(settings.dispatch_interval());
    }

    session.stop()?;
    info!("Controller session stopped");
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    setup_logging_env();
    Ok(())
}

/// Honours `RUST_LOG` directives (e.g. `gamepad_relay=debug`), `info` otherwise.
fn setup_logging_env() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();
}

fn install_hooks(hooks: &mut HookRegistry, commands: Commands) -> Result<()> {
    hooks.add("xinputConnected", move |event: &DispatchedEvent| {
        info!("Controller {} connected at {:.3}", event.device, event.when);
        match commands.get_battery_level(event.device) {
            Ok(BatteryReading::Level(level)) => info!("  battery at {:.0}%", level * 100.0),
            Ok(BatteryReading::Unavailable(reason)) => info!("  battery unavailable: {}", reason),
            Err(e) => return Err(HookFailure::Message(e.to_string())),
        }
        info!("  connected controllers: {:?}", commands.get_controllers());
        Ok(())
    })?;

    hooks.add("xinputDisconnected", |event: &DispatchedEvent| {
        warn!("Controller {} disconnected at {:.3}", event.device, event.when);
        Ok(())
    })?;

    for hook in ["xinputPressed", "xinputReleased"] {
        hooks.add(hook, |event: &DispatchedEvent| {
            if let InputKind::ButtonDown { button } | InputKind::ButtonUp { button } = event.kind
            {
                info!(
                    "Controller {} {} {} (0x{:04x}) at {:.3}",
                    event.device,
                    event.hook_name(),
                    button.name(),
                    button.mask(),
                    event.when
                );
            }
            Ok(())
        })?;
    }

    hooks.add("xinputTrigger", |event: &DispatchedEvent| {
        if let InputKind::TriggerMoved { side, value } = event.kind {
            debug!(
                "Controller {} trigger {} = {}",
                event.device,
                side.index(),
                value
            );
        }
        Ok(())
    })?;

    hooks.add("xinputStick", |event: &DispatchedEvent| {
        if let InputKind::StickMoved { side, x, y } = event.kind {
            debug!(
                "Controller {} stick {} = ({}, {})",
                event.device,
                side.index(),
                x,
                y
            );
        }
        Ok(())
    })?;

    Ok(())
}

#[cfg(target_os = "windows")]
fn create_backend() -> (Arc<dyn GamepadBackend>, Option<Demo>) {
    info!("Using XInput backend");
    (
        Arc::new(gamepad_relay::controller::xinput::XInputBackend::new()),
        None,
    )
}

#[cfg(not(target_os = "windows"))]
fn create_backend() -> (Arc<dyn GamepadBackend>, Option<Demo>) {
    info!("XInput is unavailable on this platform, running a simulated controller");
    let backend = Arc::new(SimulatedBackend::new());
    (backend.clone(), Some(Demo::new(backend)))
}

/// Scripted input for the simulated backend, one step per host tick.
#[cfg_attr(target_os = "windows", allow(dead_code))]
struct Demo {
    backend: Arc<SimulatedBackend>,
    tick: u32,
}

#[cfg_attr(target_os = "windows", allow(dead_code))]
impl Demo {
    fn new(backend: Arc<SimulatedBackend>) -> Self {
        Self { backend, tick: 0 }
    }

    /// Advances the script; returns `false` once it has finished.
    fn step(&mut self) -> bool {
        let pad = GamepadState::default();
        match self.tick {
            0 => self.backend.set_state(0, pad),
            30 => self.backend.set_state(0, pad.with_button(Button::A)),
            45 => self
                .backend
                .set_state(0, pad.with_trigger(Side::Left, 200)),
            60 => self
                .backend
                .set_state(0, pad.with_stick(Side::Right, 12_000, -8_000)),
            90 => self.backend.unplug(0),
            120 => return false,
            _ => {}
        }
        self.tick += 1;
        true
    }
}
