//! Device poller: samples every controller slot and turns state changes into events.
//!
//! [`poll_devices`] is one poll cycle. It compares each freshly sampled slot
//! with the stored one and appends edge events to the queue in a fixed order:
//!
//! ```text
//! Connected → buttons (enumeration order) → left trigger → right trigger
//!           → left stick → right stick → Disconnected
//! ```
//!
//! A failed hardware query counts as "not connected" with an all-zero sample.
//! Nothing is suppressed around connection edges: a pad that drops while a
//! button is held reports the release before `Disconnected`, and a pad that
//! comes back reports whatever differs from the stored snapshot right after
//! `Connected`.
//!
//! [`DevicePoller`] runs cycles on its own thread until the shared running flag
//! is cleared.

use std::sync::Arc;
use std::time::{Duration, Instant};

use statum::{machine, state};
use tracing::{debug, info, trace, warn};

use crate::controller::backend::GamepadBackend;
use crate::controller::shared::{PadTable, SharedState};
use crate::controller::state::{Button, DeviceSlot, Side, MAX_DEVICES};

/// What changed on a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Connected,
    Disconnected,
    ButtonDown { button: Button },
    ButtonUp { button: Button },
    TriggerMoved { side: Side, value: u8 },
    /// Carries both axes even if only one of them moved.
    StickMoved { side: Side, x: i16, y: i16 },
}

impl InputKind {
    /// Name of the host hook that receives this kind of event.
    pub const fn hook_name(&self) -> &'static str {
        match self {
            InputKind::Connected => "xinputConnected",
            InputKind::Disconnected => "xinputDisconnected",
            InputKind::ButtonDown { .. } => "xinputPressed",
            InputKind::ButtonUp { .. } => "xinputReleased",
            InputKind::TriggerMoved { .. } => "xinputTrigger",
            InputKind::StickMoved { .. } => "xinputStick",
        }
    }
}

/// A change detected by the poller, stamped with the poller's monotonic clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEvent {
    pub at: Instant,
    pub device: usize,
    pub kind: InputKind,
}

#[derive(Clone, Debug)]
pub struct CollectorSettings {
    /// Sleep between two poll cycles.
    pub poll_interval: Duration,
    /// How long a slot that just disconnected is left alone.
    pub disconnected_backoff: Duration,
    /// Period of the debug statistics line.
    pub stats_interval: Duration,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1),
            disconnected_backoff: Duration::from_secs(4),
            stats_interval: Duration::from_secs(10),
        }
    }
}

/// Runs one poll cycle over every slot and returns how many events it queued.
///
/// All events of the cycle share the timestamp `now`. The cycle is staged
/// locally and written to `table` only once every slot has been sampled, so a
/// backend that panics halfway leaves the table as it was.
pub fn poll_devices(
    table: &mut PadTable,
    backend: &dyn GamepadBackend,
    now: Instant,
    disconnected_backoff: Duration,
) -> usize {
    let mut slots = table.slots;
    let mut next_poll_at = table.next_poll_at;
    let mut events = Vec::new();

    for index in 0..MAX_DEVICES {
        let before = slots[index];

        if !before.connected {
            if let Some(eligible_at) = next_poll_at[index] {
                if now < eligible_at {
                    continue;
                }
            }
        }

        let after = match backend.query(index) {
            // Same packet means the driver has nothing new for this pad.
            Ok(raw)
                if raw.connected
                    && before.connected
                    && raw.packet_number == before.packet_number =>
            {
                continue;
            }
            Ok(raw) => DeviceSlot {
                connected: raw.connected,
                packet_number: raw.packet_number,
                gamepad: raw.gamepad,
            },
            Err(e) => {
                trace!("Query of controller {} failed: {}", index, e);
                DeviceSlot::default()
            }
        };

        if after.connected && !before.connected {
            info!("Controller {} connected", index);
        }
        if !after.connected && before.connected {
            warn!(
                "Controller {} disconnected, next probe in {:?}",
                index, disconnected_backoff
            );
            next_poll_at[index] = Some(now + disconnected_backoff);
        }

        diff_slot(index, &before, &after, now, &mut events);
        slots[index] = after;
    }

    table.slots = slots;
    table.next_poll_at = next_poll_at;
    let queued = events.len();
    table.events.extend(events);
    queued
}

/// Appends the events leading from `before` to `after` for one device.
fn diff_slot(
    device: usize,
    before: &DeviceSlot,
    after: &DeviceSlot,
    at: Instant,
    events: &mut impl Extend<InputEvent>,
) {
    let mut emit = |kind: InputKind| events.extend(Some(InputEvent { at, device, kind }));
    let (old, new) = (&before.gamepad, &after.gamepad);

    if after.connected && !before.connected {
        emit(InputKind::Connected);
    }

    if old.buttons != new.buttons {
        for button in Button::ALL {
            let pressed_now = new.is_pressed(button);
            if pressed_now != old.is_pressed(button) {
                emit(if pressed_now {
                    InputKind::ButtonDown { button }
                } else {
                    InputKind::ButtonUp { button }
                });
            }
        }
    }

    for side in [Side::Left, Side::Right] {
        let value = new.trigger(side);
        if value != old.trigger(side) {
            emit(InputKind::TriggerMoved { side, value });
        }
    }

    for side in [Side::Left, Side::Right] {
        let (x, y) = new.stick(side);
        if (x, y) != old.stick(side) {
            emit(InputKind::StickMoved { side, x, y });
        }
    }

    if !after.connected && before.connected {
        emit(InputKind::Disconnected);
    }
}

// Poller lifecycle
#[state]
#[derive(Debug, Clone)]
pub enum PollerState {
    Initializing,
    Polling,
}

#[machine]
pub struct DevicePoller<S: PollerState> {
    // Slots, queue and running flag
    shared: Arc<SharedState>,

    // Hardware access
    backend: Arc<dyn GamepadBackend>,

    settings: CollectorSettings,
}

impl DevicePoller<Initializing> {
    pub fn create(
        shared: Arc<SharedState>,
        backend: Arc<dyn GamepadBackend>,
        settings: CollectorSettings,
    ) -> Self {
        debug!("Creating device poller with settings: {:?}", settings);
        Self::new(shared, backend, settings)
    }

    pub fn initialize(self) -> DevicePoller<Polling> {
        info!(
            "Device poller ready: {} slots, poll interval {:?}, disconnect backoff {:?}",
            MAX_DEVICES, self.settings.poll_interval, self.settings.disconnected_backoff
        );
        self.transition()
    }
}

impl DevicePoller<Polling> {
    /// Runs one cycle while holding the shared lock.
    ///
    /// Returns `None` once the running flag has been cleared.
    pub fn poll_once(&mut self) -> Option<usize> {
        let mut table = self.shared.lock();
        if !table.running {
            return None;
        }
        Some(poll_devices(
            &mut table,
            self.backend.as_ref(),
            Instant::now(),
            self.settings.disconnected_backoff,
        ))
    }

    /// Polls until the running flag is cleared.
    pub fn run_poll_loop(&mut self) {
        info!("Starting device poll loop");

        let mut cycle_count: u64 = 0;
        let mut event_count: usize = 0;
        let mut last_log_time = Instant::now();

        while let Some(queued) = self.poll_once() {
            cycle_count += 1;
            event_count += queued;

            let elapsed = last_log_time.elapsed();
            if elapsed >= self.settings.stats_interval {
                debug!(
                    "Device poller stats: {} cycles, {} events in last {:.1} seconds",
                    cycle_count,
                    event_count,
                    elapsed.as_secs_f64()
                );
                cycle_count = 0;
                event_count = 0;
                last_log_time = Instant::now();
            }

            std::thread::sleep(self.settings.poll_interval);
        }

        info!("Device poll loop stopped");
    }
}
