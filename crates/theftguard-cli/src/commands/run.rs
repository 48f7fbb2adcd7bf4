//! Replays a JSON-lines script of host events through a live guardian.
//!
//! Each non-blank line not starting with `#` is one input, tagged by `input`:
//!
//! ```text
//! {"input": "location", "latitude": 48.1372, "longitude": 11.5756}
//! {"input": "wifi", "ssid": "HomeNet"}
//! {"input": "screen", "on": false}
//! {"input": "accel", "accel": [0.0, 60.0, 9.8]}
//! {"input": "trust_wifi", "ssid": "Office"}
//! {"input": "sensitivity", "level": 4.0}
//! ```
//!
//! Every event the engine emits is printed to stdout as one JSON object.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use clap::Args;
use serde::Deserialize;
use theftguard_core::{
    AccelSample, Config, ConfigStore, Event, GeoPoint, Guardian, LocationProvider, LocationSink,
    LockActuator, PlatformError, SettingsStore, TrustedPlace, WifiStatusProvider,
};
use tokio::sync::broadcast;

/// Time given to the configuration listener after a settings write.
const SETTLE: Duration = Duration::from_millis(20);

#[derive(Args)]
pub struct RunArgs {
    /// Path to the JSON-lines script
    script: PathBuf,
    /// Deny location permission
    #[arg(long)]
    no_location: bool,
    /// Simulate an inactive lock capability
    #[arg(long)]
    admin_inactive: bool,
    /// SSID connected at start
    #[arg(long)]
    ssid: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "input", rename_all = "snake_case")]
enum ScriptInput {
    Arm,
    Disarm,
    Location {
        latitude: f64,
        longitude: f64,
    },
    Wifi {
        ssid: Option<String>,
        #[serde(default = "enabled")]
        enabled: bool,
    },
    Screen {
        on: bool,
    },
    Accel(AccelSample),
    Sensitivity {
        level: f64,
    },
    TrustWifi {
        ssid: String,
    },
    TrustLocation {
        label: String,
        latitude: f64,
        longitude: f64,
    },
    Status,
    Wait {
        ms: u64,
    },
}

fn enabled() -> bool {
    true
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let script = std::fs::read_to_string(&args.script)?;
    let inputs = parse_script(&script)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(replay(inputs, &args))
}

fn parse_script(script: &str) -> Result<Vec<ScriptInput>, String> {
    script
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(n, line)| serde_json::from_str(line).map_err(|e| format!("line {}: {e}", n + 1)))
        .collect()
}

async fn replay(inputs: Vec<ScriptInput>, args: &RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    // Work on a copy so a replay never rewrites the user's config file.
    let store = Arc::new(SettingsStore::in_memory(Config::load_or_default()));
    let location = Arc::new(ScriptLocation::new(!args.no_location));
    let wifi = Arc::new(ScriptWifi::new(args.ssid.clone()));
    let actuator = Arc::new(ConsoleActuator::new(!args.admin_inactive));

    let guardian = Guardian::new(
        Arc::clone(&store) as Arc<dyn ConfigStore>,
        Arc::clone(&location) as Arc<dyn LocationProvider>,
        Arc::clone(&wifi) as Arc<dyn WifiStatusProvider>,
        Arc::clone(&actuator) as Arc<dyn LockActuator>,
    );
    let service = guardian.service();
    let mut events = service.subscribe();

    guardian.arm()?;
    print_events(&mut events)?;

    for input in inputs {
        tracing::debug!(?input, "Replaying");
        match input {
            ScriptInput::Arm => {
                guardian.arm()?;
            }
            ScriptInput::Disarm => {
                guardian.disarm();
            }
            ScriptInput::Location {
                latitude,
                longitude,
            } => location.push(GeoPoint::new(latitude, longitude)?),
            ScriptInput::Wifi { ssid, enabled } => {
                wifi.set(ssid.clone(), enabled);
                service.on_wifi_state_change(ssid.as_deref(), enabled);
            }
            ScriptInput::Screen { on } => {
                service.on_screen_event(on);
            }
            ScriptInput::Accel(sample) => {
                service.on_accel_sample(&sample);
            }
            ScriptInput::Sensitivity { level } => {
                store.set_sensitivity(level)?;
                tokio::time::sleep(SETTLE).await;
            }
            ScriptInput::TrustWifi { ssid } => {
                store.add_place(TrustedPlace::wifi(&ssid)?)?;
                tokio::time::sleep(SETTLE).await;
            }
            ScriptInput::TrustLocation {
                label,
                latitude,
                longitude,
            } => {
                store.add_place(TrustedPlace::location(label, GeoPoint::new(latitude, longitude)?)?)?;
                tokio::time::sleep(SETTLE).await;
            }
            ScriptInput::Status => {
                println!("{}", serde_json::to_string(&service.snapshot())?);
            }
            ScriptInput::Wait { ms } => {
                tokio::time::sleep(Duration::from_millis(ms)).await;
            }
        }
        print_events(&mut events)?;
    }

    guardian.disarm();
    print_events(&mut events)?;
    tracing::info!(locks = actuator.calls(), "Replay finished");
    Ok(())
}

fn print_events(events: &mut broadcast::Receiver<Event>) -> Result<(), serde_json::Error> {
    loop {
        match events.try_recv() {
            Ok(event) => println!("{}", serde_json::to_string(&event)?),
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Event output lagged");
            }
            Err(_) => return Ok(()),
        }
    }
}

/// Location source fed by the script.
struct ScriptLocation {
    permitted: bool,
    sink: Mutex<Option<LocationSink>>,
}

impl ScriptLocation {
    fn new(permitted: bool) -> Self {
        Self {
            permitted,
            sink: Mutex::new(None),
        }
    }

    fn push(&self, fix: GeoPoint) {
        let sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner).clone();
        match sink {
            Some(sink) => sink(fix),
            None => tracing::debug!(%fix, "No location subscriber; fix dropped"),
        }
    }
}

impl LocationProvider for ScriptLocation {
    fn has_permission(&self) -> bool {
        self.permitted
    }

    fn request_updates(&self, interval: Duration, sink: LocationSink) -> Result<(), PlatformError> {
        tracing::debug!(?interval, "Location updates requested");
        *self.sink.lock().unwrap_or_else(PoisonError::into_inner) = Some(sink);
        Ok(())
    }

    fn remove_updates(&self) {
        self.sink.lock().unwrap_or_else(PoisonError::into_inner).take();
    }
}

/// Wi-Fi status as last set by the script.
struct ScriptWifi {
    state: Mutex<(Option<String>, bool)>,
}

impl ScriptWifi {
    fn new(ssid: Option<String>) -> Self {
        let enabled = ssid.is_some();
        Self {
            state: Mutex::new((ssid, enabled)),
        }
    }

    fn set(&self, ssid: Option<String>, enabled: bool) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = (ssid, enabled);
    }
}

impl WifiStatusProvider for ScriptWifi {
    fn is_enabled(&self) -> bool {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).1
    }

    fn current_ssid(&self) -> Option<String> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).0.clone()
    }
}

/// Logs lock requests instead of locking anything.
struct ConsoleActuator {
    active: bool,
    calls: AtomicUsize,
}

impl ConsoleActuator {
    fn new(active: bool) -> Self {
        Self {
            active,
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl LockActuator for ConsoleActuator {
    fn trigger_lock(&self) -> Result<(), PlatformError> {
        if !self.active {
            return Err(PlatformError::ActuatorUnavailable("device admin not active".into()));
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        tracing::info!("Lock requested");
        Ok(())
    }
}
