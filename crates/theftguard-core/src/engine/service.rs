//! Thread-safe front of the protection state machine.
//!
//! Host callbacks may arrive from any thread. Each `on_*` call runs the
//! machine under one mutex, so trust is never computed from a half-updated
//! context. The lock actuator runs after that mutex is released, but inside a
//! shared actuation gate; `stop()` takes the gate exclusively, which drains
//! in-flight triggers and guarantees no actuator call after it returns.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use chrono::Utc;
use tokio::sync::broadcast;

use super::machine::{ProtectionMachine, ProtectionState};
use crate::error::PlatformError;
use crate::events::Event;
use crate::places::{GeoPoint, TrustedPlaceSet};
use crate::platform::LockActuator;
use crate::sensor::AccelSample;
use crate::threshold::{MotionThreshold, SensitivityLevel};
use crate::trust::EvaluationContext;

const EVENT_CAPACITY: usize = 64;

pub struct ProtectionService {
    machine: Mutex<ProtectionMachine>,
    actuation: RwLock<()>,
    actuator: Arc<dyn LockActuator>,
    events: broadcast::Sender<Event>,
}

impl ProtectionService {
    pub fn new(actuator: Arc<dyn LockActuator>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            machine: Mutex::new(ProtectionMachine::new()),
            actuation: RwLock::new(()),
            actuator,
            events,
        }
    }

    /// Receive every event emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub fn state(&self) -> ProtectionState {
        self.machine().state()
    }

    pub fn snapshot(&self) -> Event {
        self.machine().snapshot()
    }

    /// Copy of the current evaluation context; `None` while disarmed.
    pub fn context(&self) -> Option<EvaluationContext> {
        self.machine().context().cloned()
    }

    pub fn start(&self, threshold: MotionThreshold, places: TrustedPlaceSet) -> Option<Event> {
        let event = self.machine().start(threshold, places);
        self.publish(event)
    }

    /// Disarm. Returns only after any trigger already in progress has finished;
    /// no actuator call happens after this returns.
    pub fn stop(&self) -> Option<Event> {
        let _quiesced = self
            .actuation
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let event = self.machine().stop();
        self.publish(event)
    }

    pub fn on_location_update(&self, fix: GeoPoint) -> Option<Event> {
        let event = self.machine().on_location_update(fix);
        self.publish(event)
    }

    pub fn on_wifi_state_change(&self, ssid: Option<&str>, enabled: bool) -> Option<Event> {
        let event = self.machine().on_wifi_state_change(ssid, enabled);
        self.publish(event)
    }

    pub fn on_trusted_set_changed(&self, places: TrustedPlaceSet) -> Option<Event> {
        let event = self.machine().on_trusted_set_changed(places);
        self.publish(event)
    }

    pub fn on_screen_event(&self, on: bool) -> Option<Event> {
        let event = self.machine().on_screen_event(on);
        self.publish(event)
    }

    pub fn on_config_changed(&self, level: SensitivityLevel) -> Option<Event> {
        let event = self.machine().on_config_changed(level);
        self.publish(event)
    }

    pub fn on_accel_sample(&self, sample: &AccelSample) -> Option<Event> {
        self.on_motion_sample(sample.magnitude())
    }

    pub fn on_motion_sample(&self, magnitude: f64) -> Option<Event> {
        let _gate = self
            .actuation
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        // Machine lock is dropped at the end of this statement.
        let event = self.machine().on_motion_sample(magnitude);
        let event = self.publish(event)?;
        if let Err(err) = self.actuator.trigger_lock() {
            self.report_unavailable(err);
        }
        Some(event)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn machine(&self) -> MutexGuard<'_, ProtectionMachine> {
        // Machine handlers never panic halfway through a mutation, so a
        // poisoned lock still guards valid state.
        self.machine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, event: Option<Event>) -> Option<Event> {
        if let Some(ref e) = event {
            // No subscribers is fine.
            let _ = self.events.send(e.clone());
        }
        event
    }

    fn report_unavailable(&self, err: PlatformError) {
        tracing::warn!(error = %err, "Lock trigger dropped; actuator not available");
        let _ = self.events.send(Event::LockUnavailable {
            reason: err.to_string(),
            at: Utc::now(),
        });
    }
}

impl std::fmt::Debug for ProtectionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtectionService")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::places::TrustedPlace;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingActuator {
        calls: AtomicUsize,
    }

    impl LockActuator for CountingActuator {
        fn trigger_lock(&self) -> Result<(), PlatformError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct InactiveActuator;

    impl LockActuator for InactiveActuator {
        fn trigger_lock(&self) -> Result<(), PlatformError> {
            Err(PlatformError::ActuatorUnavailable("device admin not active".into()))
        }
    }

    fn service() -> (ProtectionService, Arc<CountingActuator>) {
        let actuator = Arc::new(CountingActuator::default());
        (ProtectionService::new(actuator.clone()), actuator)
    }

    #[test]
    fn qualifying_sample_calls_actuator_once() {
        let (svc, actuator) = service();
        svc.start(MotionThreshold(40.0), TrustedPlaceSet::new());

        assert!(svc.on_motion_sample(41.0).is_some());
        assert_eq!(actuator.calls.load(Ordering::SeqCst), 1);

        assert!(svc.on_motion_sample(39.9).is_none());
        assert_eq!(actuator.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn trusted_wifi_suppresses_trigger() {
        let (svc, actuator) = service();
        let places: TrustedPlaceSet = vec![TrustedPlace::wifi("Home").unwrap()].into();
        svc.start(MotionThreshold(40.0), places);
        svc.on_wifi_state_change(Some("Home"), true);

        assert!(svc.on_motion_sample(100.0).is_none());
        assert_eq!(actuator.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn stop_twice_is_noop_and_silences_actuator() {
        let (svc, actuator) = service();
        svc.start(MotionThreshold(40.0), TrustedPlaceSet::new());

        assert!(svc.stop().is_some());
        assert!(svc.stop().is_none());
        assert!(svc.on_motion_sample(500.0).is_none());
        assert_eq!(actuator.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unavailable_actuator_is_reported_not_fatal() {
        let svc = ProtectionService::new(Arc::new(InactiveActuator));
        let mut rx = svc.subscribe();
        svc.start(MotionThreshold(20.0), TrustedPlaceSet::new());

        assert!(svc.on_motion_sample(30.0).is_some());
        assert!(svc.on_motion_sample(30.0).is_some());
        assert_eq!(svc.state().mode(), crate::engine::ProtectionMode::Armed);

        let mut unavailable = 0;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, Event::LockUnavailable { .. }) {
                unavailable += 1;
            }
        }
        assert_eq!(unavailable, 2);
    }

    #[test]
    fn events_are_broadcast() {
        let (svc, _) = service();
        let mut rx = svc.subscribe();
        svc.start(MotionThreshold(40.0), TrustedPlaceSet::new());
        svc.on_screen_event(false);
        svc.stop();

        assert!(matches!(rx.try_recv(), Ok(Event::ProtectionStarted { .. })));
        assert!(matches!(rx.try_recv(), Ok(Event::ScreenChanged { on: false, .. })));
        assert!(matches!(rx.try_recv(), Ok(Event::ProtectionStopped { .. })));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn accel_sample_uses_magnitude() {
        let (svc, actuator) = service();
        svc.start(MotionThreshold(20.0), TrustedPlaceSet::new());
        assert!(svc.on_accel_sample(&AccelSample::new(0, [12.0, 16.0, 0.0])).is_none());
        assert!(svc.on_accel_sample(&AccelSample::new(1, [12.0, 16.0, 1.0])).is_some());
        assert_eq!(actuator.calls.load(Ordering::SeqCst), 1);
    }
}
