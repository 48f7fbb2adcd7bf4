//! End-to-end scenarios over the public API.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use theftguard_core::{
    compute_threshold, Config, Event, GeoPoint, LockActuator, PlatformError, ProtectionMode,
    ProtectionService, SensitivityLevel, SettingsStore, TrustedPlace, TrustedPlaceSet,
};

#[derive(Default)]
struct CountingActuator(AtomicUsize);

impl LockActuator for CountingActuator {
    fn trigger_lock(&self) -> Result<(), PlatformError> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn commute_scenario() {
    let home = GeoPoint::new(48.1372, 11.5756).unwrap();
    let office_ssid = "ACME-Corp";
    let places: TrustedPlaceSet = vec![
        TrustedPlace::location("Home", home).unwrap(),
        TrustedPlace::wifi(office_ssid).unwrap(),
    ]
    .into();

    let actuator = Arc::new(CountingActuator::default());
    let service = ProtectionService::new(actuator.clone());
    let threshold = compute_threshold(SensitivityLevel::new(3.0).unwrap());
    service.start(threshold, places);

    // At home: jostling the phone does nothing.
    service.on_location_update(home);
    assert_eq!(service.state().mode(), ProtectionMode::Paused);
    assert!(service.on_motion_sample(90.0).is_none());

    // On the train: snatched.
    let train = GeoPoint::new(48.1400, 11.5600).unwrap();
    assert!(matches!(
        service.on_location_update(train),
        Some(Event::ProtectionResumed { .. })
    ));
    assert!(service.on_motion_sample(49.0).is_none());
    assert!(service.on_motion_sample(72.5).is_some());
    assert_eq!(actuator.0.load(Ordering::SeqCst), 1);

    // Pocketed with the screen off: ignored.
    service.on_screen_event(false);
    assert!(service.on_motion_sample(72.5).is_none());
    service.on_screen_event(true);

    // At the office, location still says "train" but Wi-Fi is trusted.
    assert!(matches!(
        service.on_wifi_state_change(Some(office_ssid), true),
        Some(Event::ProtectionPaused { .. })
    ));
    assert!(service.on_motion_sample(100.0).is_none());

    assert!(service.stop().is_some());
    assert!(service.stop().is_none());
    assert_eq!(actuator.0.load(Ordering::SeqCst), 1);
}

#[test]
fn trusted_places_roundtrip_through_both_encodings() {
    let mut places = TrustedPlaceSet::new();
    places.add(TrustedPlace::location("Home", GeoPoint::new(-33.8688, 151.2093).unwrap()).unwrap());
    places.add(TrustedPlace::wifi("\"Beach House\"").unwrap());

    let json = places.to_json().unwrap();
    assert_eq!(TrustedPlaceSet::from_json(&json).unwrap(), places);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    let config = Config {
        trusted_places: places.clone(),
        ..Config::default()
    };
    config.save_to(&path).unwrap();
    let store = SettingsStore::with_path(&path).unwrap();
    assert_eq!(store.config().trusted_places, places);
}

#[test]
fn rename_and_delete_do_not_reorder_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    let store = SettingsStore::with_path(&path).unwrap();

    for (label, lat) in [("A", 1.0), ("B", 2.0), ("C", 3.0), ("D", 4.0)] {
        store
            .add_place(TrustedPlace::location(label, GeoPoint::new(lat, 0.0).unwrap()).unwrap())
            .unwrap();
    }
    store.rename_place(2, "C2").unwrap();
    store.remove_place(1).unwrap();

    let reopened = SettingsStore::with_path(&path).unwrap();
    let labels: Vec<String> = reopened
        .config()
        .trusted_places
        .iter()
        .map(|p| p.label().to_string())
        .collect();
    assert_eq!(labels, ["A", "C2", "D"]);
}
