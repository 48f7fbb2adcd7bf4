//! Protection state machine.
//!
//! Single-threaded and lock-free: every handler takes `&mut self`, mutates the
//! evaluation context and returns `Some(Event)` when something observable
//! happened. Concurrency is the job of [`ProtectionService`](super::ProtectionService).
//!
//! ## State Transitions
//!
//! ```text
//! Disarmed -> Armed(threshold, trusted = false, screen_on = true) -> Disarmed
//! ```
//!
//! While armed, `trusted` flips only through re-evaluation after a location,
//! Wi-Fi or trusted-place event; `screen_on` flips only through screen events.
//! Motion triggers a lock when `!trusted && screen_on && magnitude > threshold`.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::events::Event;
use crate::places::{GeoPoint, TrustedPlaceSet};
use crate::threshold::{compute_threshold, MotionThreshold, SensitivityLevel};
use crate::trust::{is_trusted, EvaluationContext, WifiState};

/// What the UI shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtectionMode {
    Disarmed,
    Armed,
    /// Armed but inside a trusted zone.
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum ProtectionState {
    Disarmed,
    Armed {
        threshold: MotionThreshold,
        trusted: bool,
        screen_on: bool,
    },
}

impl ProtectionState {
    pub fn mode(&self) -> ProtectionMode {
        match self {
            ProtectionState::Disarmed => ProtectionMode::Disarmed,
            ProtectionState::Armed { trusted: true, .. } => ProtectionMode::Paused,
            ProtectionState::Armed { trusted: false, .. } => ProtectionMode::Armed,
        }
    }

    /// Whether a motion sample would currently be evaluated at all.
    pub fn is_gate_open(&self) -> bool {
        matches!(
            self,
            ProtectionState::Armed {
                trusted: false,
                screen_on: true,
                ..
            }
        )
    }
}

/// State that lives exactly as long as one armed session.
#[derive(Debug, Clone)]
struct ArmedSession {
    threshold: MotionThreshold,
    trusted: bool,
    screen_on: bool,
    context: EvaluationContext,
    /// Sensitivity written while armed; applies at the next start.
    pending: Option<SensitivityLevel>,
}

#[derive(Debug, Clone, Default)]
pub struct ProtectionMachine {
    session: Option<ArmedSession>,
}

impl ProtectionMachine {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> ProtectionState {
        match &self.session {
            None => ProtectionState::Disarmed,
            Some(s) => ProtectionState::Armed {
                threshold: s.threshold,
                trusted: s.trusted,
                screen_on: s.screen_on,
            },
        }
    }

    pub fn mode(&self) -> ProtectionMode {
        self.state().mode()
    }

    pub fn is_armed(&self) -> bool {
        self.session.is_some()
    }

    pub fn context(&self) -> Option<&EvaluationContext> {
        self.session.as_ref().map(|s| &s.context)
    }

    pub fn pending_sensitivity(&self) -> Option<SensitivityLevel> {
        self.session.as_ref().and_then(|s| s.pending)
    }

    pub fn snapshot(&self) -> Event {
        let state = self.state();
        let (threshold, trusted, screen_on) = match state {
            ProtectionState::Disarmed => (None, false, false),
            ProtectionState::Armed {
                threshold,
                trusted,
                screen_on,
            } => (Some(threshold), trusted, screen_on),
        };
        Event::StatusSnapshot {
            mode: state.mode(),
            threshold,
            trusted,
            screen_on,
            at: Utc::now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Arm with a threshold fixed for the whole session.
    pub fn start(&mut self, threshold: MotionThreshold, places: TrustedPlaceSet) -> Option<Event> {
        if self.session.is_some() {
            return None; // Already armed.
        }
        self.session = Some(ArmedSession {
            threshold,
            trusted: false,
            screen_on: true,
            context: EvaluationContext::new(places),
            pending: None,
        });
        tracing::info!(threshold = threshold.value(), "Protection started");
        Some(Event::ProtectionStarted {
            threshold,
            at: Utc::now(),
        })
    }

    pub fn stop(&mut self) -> Option<Event> {
        self.session.take()?;
        tracing::info!("Protection stopped");
        Some(Event::ProtectionStopped { at: Utc::now() })
    }

    pub fn on_location_update(&mut self, fix: GeoPoint) -> Option<Event> {
        let session = self.session.as_mut()?;
        session.context.location = Some(fix);
        Self::reevaluate(session)
    }

    pub fn on_wifi_state_change(&mut self, ssid: Option<&str>, enabled: bool) -> Option<Event> {
        let session = self.session.as_mut()?;
        session.context.wifi = WifiState::new(ssid, enabled);
        Self::reevaluate(session)
    }

    pub fn on_trusted_set_changed(&mut self, places: TrustedPlaceSet) -> Option<Event> {
        let session = self.session.as_mut()?;
        tracing::debug!(count = places.len(), "Trusted places reloaded");
        session.context.places = places;
        Self::reevaluate(session)
    }

    pub fn on_screen_event(&mut self, on: bool) -> Option<Event> {
        let session = self.session.as_mut()?;
        if session.screen_on == on {
            return None;
        }
        session.screen_on = on;
        if on {
            tracing::debug!("Screen unlocked. Motion detection is active.");
        } else {
            tracing::debug!("Screen turned off. Motion detection is paused.");
        }
        Some(Event::ScreenChanged { on, at: Utc::now() })
    }

    /// Every qualifying sample yields its own trigger; there is no debounce.
    pub fn on_motion_sample(&mut self, magnitude: f64) -> Option<Event> {
        let session = self.session.as_ref()?;
        if session.trusted || !session.screen_on {
            return None;
        }
        if !session.threshold.is_exceeded_by(magnitude) {
            return None;
        }
        tracing::info!(
            magnitude,
            threshold = session.threshold.value(),
            "Unauthorized motion detected"
        );
        Some(Event::LockTriggered {
            magnitude,
            threshold: session.threshold,
            at: Utc::now(),
        })
    }

    /// The running threshold is never changed; the new level is kept for the
    /// next start.
    pub fn on_config_changed(&mut self, level: SensitivityLevel) -> Option<Event> {
        let session = self.session.as_mut()?;
        let pending_threshold = compute_threshold(level);
        if pending_threshold == session.threshold {
            session.pending = None;
            return None;
        }
        if session.pending == Some(level) {
            return None;
        }
        session.pending = Some(level);
        tracing::info!(
            level = level.value(),
            current = session.threshold.value(),
            pending = pending_threshold.value(),
            "Sensitivity changed while armed; applies on next start"
        );
        Some(Event::SensitivityDeferred {
            level: level.value(),
            pending_threshold,
            at: Utc::now(),
        })
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Recompute trust; report only paused <-> resumed edges.
    fn reevaluate(session: &mut ArmedSession) -> Option<Event> {
        let was_trusted = session.trusted;
        session.trusted = is_trusted(&session.context);
        match (was_trusted, session.trusted) {
            (false, true) => {
                tracing::info!("Protection paused (trusted location or Wi-Fi)");
                Some(Event::ProtectionPaused { at: Utc::now() })
            }
            (true, false) => {
                tracing::info!("Protection resumed (left trusted area)");
                Some(Event::ProtectionResumed { at: Utc::now() })
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::places::TrustedPlace;

    fn home() -> GeoPoint {
        GeoPoint::new(40.0, -74.0).unwrap()
    }

    fn places() -> TrustedPlaceSet {
        vec![
            TrustedPlace::location("Home", home()).unwrap(),
            TrustedPlace::wifi("HomeNet").unwrap(),
        ]
        .into()
    }

    fn armed(threshold: f64) -> ProtectionMachine {
        let mut machine = ProtectionMachine::new();
        machine.start(MotionThreshold(threshold), places());
        machine
    }

    #[test]
    fn start_stop() {
        let mut machine = ProtectionMachine::new();
        assert_eq!(machine.state(), ProtectionState::Disarmed);

        assert!(machine.start(MotionThreshold(40.0), places()).is_some());
        assert_eq!(
            machine.state(),
            ProtectionState::Armed {
                threshold: MotionThreshold(40.0),
                trusted: false,
                screen_on: true
            }
        );
        assert!(machine.start(MotionThreshold(20.0), places()).is_none());

        assert!(machine.stop().is_some());
        assert_eq!(machine.state(), ProtectionState::Disarmed);
        assert!(machine.stop().is_none());
        assert!(machine.context().is_none());
    }

    #[test]
    fn motion_gating() {
        let mut machine = armed(40.0);
        assert!(matches!(
            machine.on_motion_sample(41.0),
            Some(Event::LockTriggered { magnitude, .. }) if magnitude == 41.0
        ));
        assert!(machine.on_motion_sample(39.9).is_none());
        assert!(machine.on_motion_sample(40.0).is_none());

        machine.on_wifi_state_change(Some("HomeNet"), true);
        assert_eq!(machine.mode(), ProtectionMode::Paused);
        assert!(machine.on_motion_sample(100.0).is_none());
    }

    #[test]
    fn every_qualifying_sample_triggers() {
        let mut machine = armed(40.0);
        let triggers = [41.0, 55.0, 41.0]
            .iter()
            .filter_map(|&m| machine.on_motion_sample(m))
            .count();
        assert_eq!(triggers, 3);
    }

    #[test]
    fn screen_off_discards_motion() {
        let mut machine = armed(40.0);
        assert!(machine.on_screen_event(false).is_some());
        assert!(machine.on_screen_event(false).is_none());
        assert!(machine.on_motion_sample(100.0).is_none());
        machine.on_screen_event(true);
        assert!(machine.on_motion_sample(100.0).is_some());
    }

    #[test]
    fn trust_edges_are_reported_once() {
        let mut machine = armed(40.0);
        assert!(matches!(
            machine.on_location_update(home()),
            Some(Event::ProtectionPaused { .. })
        ));
        // Unchanged trust: no event.
        assert!(machine.on_location_update(home()).is_none());
        assert!(machine.on_wifi_state_change(Some("HomeNet"), true).is_none());

        let far = GeoPoint::new(41.0, -74.0).unwrap();
        // Wi-Fi still trusted.
        assert!(machine.on_location_update(far).is_none());
        assert!(matches!(
            machine.on_wifi_state_change(None, true),
            Some(Event::ProtectionResumed { .. })
        ));
        assert_eq!(machine.mode(), ProtectionMode::Armed);
    }

    #[test]
    fn trusted_set_change_rechecks_with_last_fix() {
        let mut machine = ProtectionMachine::new();
        machine.start(MotionThreshold(40.0), TrustedPlaceSet::new());
        assert!(machine.on_location_update(home()).is_none());
        assert_eq!(machine.mode(), ProtectionMode::Armed);

        assert!(matches!(
            machine.on_trusted_set_changed(places()),
            Some(Event::ProtectionPaused { .. })
        ));
        assert!(matches!(
            machine.on_trusted_set_changed(TrustedPlaceSet::new()),
            Some(Event::ProtectionResumed { .. })
        ));
    }

    #[test]
    fn config_change_keeps_running_threshold() {
        let mut machine = armed(50.0);
        let level = SensitivityLevel::new(5.0).unwrap();
        assert!(matches!(
            machine.on_config_changed(level),
            Some(Event::SensitivityDeferred { pending_threshold, .. }) if pending_threshold == MotionThreshold(20.0)
        ));
        assert!(machine.on_config_changed(level).is_none());
        assert_eq!(machine.pending_sensitivity(), Some(level));
        assert!(machine.on_motion_sample(30.0).is_none());
        assert!(machine.on_motion_sample(51.0).is_some());

        // Back to the running level clears the pending change.
        assert!(machine
            .on_config_changed(SensitivityLevel::default())
            .is_none());
        assert_eq!(machine.pending_sensitivity(), None);
    }

    #[test]
    fn disarmed_ignores_everything() {
        let mut machine = ProtectionMachine::new();
        assert!(machine.on_motion_sample(1_000.0).is_none());
        assert!(machine.on_location_update(home()).is_none());
        assert!(machine.on_wifi_state_change(Some("HomeNet"), true).is_none());
        assert!(machine.on_screen_event(false).is_none());
        assert!(machine
            .on_config_changed(SensitivityLevel::default())
            .is_none());
        assert_eq!(machine.state(), ProtectionState::Disarmed);
    }

    #[test]
    fn restart_begins_untrusted_with_fresh_context() {
        let mut machine = armed(40.0);
        machine.on_location_update(home());
        machine.on_screen_event(false);
        machine.stop();
        machine.start(MotionThreshold(40.0), places());
        assert!(machine.state().is_gate_open());
        assert_eq!(machine.context().unwrap().location, None);
    }

    #[test]
    fn snapshot_reflects_state() {
        let mut machine = armed(35.0);
        machine.on_wifi_state_change(Some("HomeNet"), true);
        match machine.snapshot() {
            Event::StatusSnapshot {
                mode,
                threshold,
                trusted,
                screen_on,
                ..
            } => {
                assert_eq!(mode, ProtectionMode::Paused);
                assert_eq!(threshold, Some(MotionThreshold(35.0)));
                assert!(trusted);
                assert!(screen_on);
            }
            _ => panic!("Expected StatusSnapshot"),
        }
    }
}
