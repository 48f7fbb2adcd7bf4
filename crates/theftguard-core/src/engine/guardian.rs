//! Wires the protection service to its host collaborators.
//!
//! Arming reads the sensitivity once, subscribes to configuration changes,
//! seeds trust from the current Wi-Fi status and last cached fix, then asks
//! for periodic location updates if the capability was granted. Disarming
//! quiesces the service first and releases subscriptions afterwards.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use super::service::ProtectionService;
use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::platform::{
    ConfigChange, ConfigStore, LocationProvider, LocationSink, LockActuator, WifiStatusProvider,
};
use crate::threshold::{compute_threshold, SensitivityLevel};

pub struct Guardian {
    service: Arc<ProtectionService>,
    store: Arc<dyn ConfigStore>,
    location: Arc<dyn LocationProvider>,
    wifi: Arc<dyn WifiStatusProvider>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl Guardian {
    pub fn new(
        store: Arc<dyn ConfigStore>,
        location: Arc<dyn LocationProvider>,
        wifi: Arc<dyn WifiStatusProvider>,
        actuator: Arc<dyn LockActuator>,
    ) -> Self {
        Self {
            service: Arc::new(ProtectionService::new(actuator)),
            store,
            location,
            wifi,
            listener: Mutex::new(None),
        }
    }

    /// The service the host feeds motion, screen and Wi-Fi events into.
    pub fn service(&self) -> Arc<ProtectionService> {
        Arc::clone(&self.service)
    }

    /// Start protection. Must be called from within a tokio runtime, which
    /// hosts the configuration listener. Returns `Ok(None)` when already armed.
    pub fn arm(&self) -> Result<Option<Event>> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| CoreError::Custom(format!("arming requires a tokio runtime: {e}")))?;

        // Held until arming completes so a concurrent disarm cannot interleave.
        let mut listener = self.listener();

        // Subscribe before reading so no change between read and start is lost.
        let changes = self.store.subscribe();
        let level = SensitivityLevel::clamped(self.store.sensitivity());
        let threshold = compute_threshold(level);

        let Some(started) = self.service.start(threshold, self.store.trusted_places()) else {
            return Ok(None);
        };

        self.service
            .on_wifi_state_change(self.wifi.current_ssid().as_deref(), self.wifi.is_enabled());
        self.subscribe_location();

        let spawned = runtime.spawn(listen_for_changes(
            changes,
            Arc::clone(&self.service),
            Arc::clone(&self.store),
        ));
        if let Some(stale) = listener.replace(spawned) {
            stale.abort();
        }

        Ok(Some(started))
    }

    /// Stop protection. A second call is a no-op. Waits for an arm in
    /// progress, so no subscription outlives the returned stop.
    pub fn disarm(&self) -> Option<Event> {
        let mut listener = self.listener();
        let stopped = self.service.stop()?;
        self.location.remove_updates();
        if let Some(task) = listener.take() {
            task.abort();
        }
        Some(stopped)
    }

    fn subscribe_location(&self) {
        if !self.location.has_permission() {
            tracing::warn!("Location permission denied; relying on Wi-Fi and motion only");
            return;
        }
        if let Some(fix) = self.location.last_known_fix() {
            self.service.on_location_update(fix);
        }
        let service = Arc::clone(&self.service);
        let sink: LocationSink = Arc::new(move |fix| {
            service.on_location_update(fix);
        });
        if let Err(err) = self
            .location
            .request_updates(self.store.location_interval(), sink)
        {
            tracing::warn!(error = %err, "Location updates unavailable");
        }
    }

    fn listener(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.listener.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Guardian {
    fn drop(&mut self) {
        self.disarm();
    }
}

async fn listen_for_changes(
    mut changes: tokio::sync::broadcast::Receiver<ConfigChange>,
    service: Arc<ProtectionService>,
    store: Arc<dyn ConfigStore>,
) {
    loop {
        match changes.recv().await {
            Ok(ConfigChange::TrustedPlaces) => {
                tracing::debug!("Trusted places list has changed. Reloading and re-checking.");
                service.on_trusted_set_changed(store.trusted_places());
            }
            Ok(ConfigChange::Sensitivity) => {
                service.on_config_changed(SensitivityLevel::clamped(store.sensitivity()));
            }
            Err(RecvError::Lagged(skipped)) => {
                // Missed notifications; the store holds the latest values.
                tracing::warn!(skipped, "Configuration listener lagged; reloading");
                service.on_trusted_set_changed(store.trusted_places());
                service.on_config_changed(SensitivityLevel::clamped(store.sensitivity()));
            }
            Err(RecvError::Closed) => break,
        }
    }
}
