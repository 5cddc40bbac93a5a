//! Event dispatcher: drains the shared queue on the consumer thread.
//!
//! A drain swaps the whole queue out under the lock and then hands each event
//! to an [`EventHandler`] with the lock released, so a slow handler never stalls
//! the poller. Timestamps are moved from the poller's monotonic clock onto the
//! host's time base:
//!
//! ```text
//! when = host_now - (producer_now - event.at)
//! ```
//!
//! where `host_now` and `producer_now` are read once per drain.
//!
//! A failing handler ends the drain. Events of the same batch that were not
//! dispatched yet are dropped rather than re-queued.

use std::time::Instant;

use chrono::Local;
use tracing::{debug, error, trace};

use crate::controller::event_collector::{InputEvent, InputKind};
use crate::controller::shared::SharedState;

/// Source of the host's "current time", in seconds.
pub trait HostClock {
    fn now(&self) -> f64;
}

impl<F: Fn() -> f64> HostClock for F {
    fn now(&self) -> f64 {
        self()
    }
}

/// Wall-clock time in seconds since the Unix epoch.
#[derive(Debug, Default, Clone, Copy)]
pub struct WallClock;

impl HostClock for WallClock {
    fn now(&self) -> f64 {
        let now = Local::now();
        now.timestamp() as f64 + f64::from(now.timestamp_subsec_nanos()) * 1e-9
    }
}

/// Seconds elapsed since the clock was created, like a game's real-time counter.
#[derive(Debug, Clone, Copy)]
pub struct SessionClock {
    origin: Instant,
}

impl SessionClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::new()
    }
}

impl HostClock for SessionClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Correlation between the poller clock and the host clock at one instant.
#[derive(Debug, Clone, Copy)]
pub struct ClockOffset {
    producer_now: Instant,
    host_now: f64,
}

impl ClockOffset {
    pub fn new(producer_now: Instant, host_now: f64) -> Self {
        Self {
            producer_now,
            host_now,
        }
    }

    /// Reads both clocks back to back.
    pub fn capture(clock: &impl HostClock) -> Self {
        Self::new(Instant::now(), clock.now())
    }

    /// Converts a poller timestamp to host seconds.
    pub fn host_time(&self, at: Instant) -> f64 {
        let age = self.producer_now.saturating_duration_since(at);
        self.host_now - age.as_secs_f64()
    }
}

/// An event as seen by host hooks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DispatchedEvent {
    pub device: usize,
    pub kind: InputKind,
    /// Detection time in the host's time base.
    pub when: f64,
}

impl DispatchedEvent {
    pub fn hook_name(&self) -> &'static str {
        self.kind.hook_name()
    }
}

/// Failure reported by a host hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookFailure {
    Message(String),
    /// The hook failed with a value that has no textual form.
    Opaque,
}

impl From<String> for HookFailure {
    fn from(message: String) -> Self {
        HookFailure::Message(message)
    }
}

impl From<&str> for HookFailure {
    fn from(message: &str) -> Self {
        HookFailure::Message(message.to_string())
    }
}

pub trait EventHandler {
    fn handle(&mut self, event: &DispatchedEvent) -> Result<(), HookFailure>;
}

impl<F: FnMut(&DispatchedEvent) -> Result<(), HookFailure>> EventHandler for F {
    fn handle(&mut self, event: &DispatchedEvent) -> Result<(), HookFailure> {
        self(event)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("{message}")]
    HookFailed { hook: &'static str, message: String },
}

impl DispatchError {
    fn from_failure(hook: &'static str, failure: HookFailure) -> Self {
        let message = match failure {
            HookFailure::Message(message) => message,
            HookFailure::Opaque => format!(
                "hook \"{}\" failed with an error that could not be converted to a string",
                hook
            ),
        };
        DispatchError::HookFailed { hook, message }
    }
}

pub struct EventProcessor;

impl EventProcessor {
    /// Drains the queue and dispatches every event, oldest first.
    ///
    /// Returns the number of events handed to `handler`.
    pub fn drain(
        shared: &SharedState,
        handler: &mut impl EventHandler,
        clock: &impl HostClock,
    ) -> Result<usize, DispatchError> {
        let batch = shared.take_events();
        if batch.is_empty() {
            return Ok(0);
        }
        let offset = ClockOffset::capture(clock);
        debug!("Dispatching batch of {} events", batch.len());

        Self::dispatch(batch, handler, &offset)
    }

    /// Dispatches an already drained batch using `offset`.
    pub fn dispatch(
        batch: impl IntoIterator<Item = InputEvent>,
        handler: &mut impl EventHandler,
        offset: &ClockOffset,
    ) -> Result<usize, DispatchError> {
        let mut dispatched = 0;

        for event in batch {
            let dispatched_event = DispatchedEvent {
                device: event.device,
                kind: event.kind,
                when: offset.host_time(event.at),
            };
            trace!("Dispatching {:?}", dispatched_event);

            if let Err(failure) = handler.handle(&dispatched_event) {
                let err = DispatchError::from_failure(event.kind.hook_name(), failure);
                error!("Aborting drain after {} events: {}", dispatched, err);
                return Err(err);
            }
            dispatched += 1;
        }

        Ok(dispatched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::state::{Button, Side};
    use std::time::Duration;

    fn event(at: Instant, device: usize, kind: InputKind) -> InputEvent {
        InputEvent { at, device, kind }
    }

    #[test]
    fn host_time_subtracts_event_age() {
        let producer_now = Instant::now();
        let offset = ClockOffset::new(producer_now, 1_000.0);

        let delta = Duration::from_millis(250);
        let corrected = offset.host_time(producer_now - delta);
        assert!((corrected - 999.75).abs() < 1e-9, "{corrected}");
        assert_eq!(offset.host_time(producer_now), 1_000.0);
    }

    #[test]
    fn events_from_the_future_clamp_to_host_now() {
        let producer_now = Instant::now();
        let offset = ClockOffset::new(producer_now, 5.0);
        assert_eq!(offset.host_time(producer_now + Duration::from_secs(1)), 5.0);
    }

    #[test]
    fn drain_dispatches_in_fifo_order_and_empties_queue() {
        let shared = SharedState::default();
        let at = Instant::now();
        {
            let mut table = shared.lock();
            table.events.push_back(event(at, 0, InputKind::Connected));
            table
                .events
                .push_back(event(at, 0, InputKind::ButtonDown { button: Button::A }));
            table.events.push_back(event(
                at,
                1,
                InputKind::TriggerMoved {
                    side: Side::Right,
                    value: 3,
                },
            ));
        }

        let mut seen = Vec::new();
        let mut handler = |e: &DispatchedEvent| -> Result<(), HookFailure> {
            seen.push((e.device, e.kind));
            Ok(())
        };
        let count = EventProcessor::drain(&shared, &mut handler, &|| 10.0).expect("drain");

        assert_eq!(count, 3);
        assert_eq!(
            seen,
            vec![
                (0, InputKind::Connected),
                (0, InputKind::ButtonDown { button: Button::A }),
                (
                    1,
                    InputKind::TriggerMoved {
                        side: Side::Right,
                        value: 3
                    }
                ),
            ]
        );
        assert_eq!(shared.queued_events(), 0);
    }

    #[test]
    fn empty_queue_dispatches_nothing() {
        let shared = SharedState::default();
        let mut calls = 0;
        let mut handler = |_: &DispatchedEvent| -> Result<(), HookFailure> {
            calls += 1;
            Ok(())
        };
        assert_eq!(
            EventProcessor::drain(&shared, &mut handler, &SessionClock::new()),
            Ok(0)
        );
        assert_eq!(calls, 0);
    }

    #[test]
    fn handler_failure_aborts_and_drops_rest_of_batch() {
        let shared = SharedState::default();
        let at = Instant::now();
        {
            let mut table = shared.lock();
            table.events.push_back(event(at, 0, InputKind::Connected));
            table.events.push_back(event(at, 0, InputKind::Disconnected));
            table.events.push_back(event(at, 1, InputKind::Connected));
        }

        let mut calls = 0;
        let mut handler = |e: &DispatchedEvent| -> Result<(), HookFailure> {
            calls += 1;
            match e.kind {
                InputKind::Disconnected => Err("boom".into()),
                _ => Ok(()),
            }
        };
        let err = EventProcessor::drain(&shared, &mut handler, &|| 0.0).unwrap_err();

        assert_eq!(
            err,
            DispatchError::HookFailed {
                hook: "xinputDisconnected",
                message: "boom".to_string()
            }
        );
        assert_eq!(calls, 2);
        // Nothing is re-queued.
        assert_eq!(shared.queued_events(), 0);
    }

    #[test]
    fn opaque_failure_names_the_hook() {
        let at = Instant::now();
        let batch = vec![event(
            at,
            3,
            InputKind::StickMoved {
                side: Side::Left,
                x: 1,
                y: 2,
            },
        )];
        let mut handler = |_: &DispatchedEvent| -> Result<(), HookFailure> { Err(HookFailure::Opaque) };

        let err = EventProcessor::dispatch(batch, &mut handler, &ClockOffset::new(at, 0.0))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "hook \"xinputStick\" failed with an error that could not be converted to a string"
        );
    }
}
