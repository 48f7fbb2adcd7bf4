//! One-shot trust and threshold queries against the stored configuration.

use clap::Args;
use theftguard_core::trust::{distance_meters, within_trusted_radius};
use theftguard_core::{
    compute_threshold, is_trusted, ConfigStore, EvaluationContext, GeoPoint, SensitivityLevel,
    SettingsStore, TrustedPlace, WifiState,
};

#[derive(Args)]
pub struct CheckArgs {
    /// Latitude of the current fix
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    lat: Option<f64>,
    /// Longitude of the current fix
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    lon: Option<f64>,
    /// SSID of the connected network
    #[arg(long)]
    ssid: Option<String>,
    /// Treat Wi-Fi as disabled even if an SSID is given
    #[arg(long)]
    wifi_off: bool,
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

pub fn threshold(level: Option<f64>) -> Result<(), Box<dyn std::error::Error>> {
    let level = match level {
        Some(level) => SensitivityLevel::new(level)?,
        None => SettingsStore::open()?.config().sensitivity(),
    };
    println!("{}", compute_threshold(level));
    Ok(())
}

pub fn run(args: CheckArgs) -> Result<(), Box<dyn std::error::Error>> {
    let store = SettingsStore::open()?;
    let location = match (args.lat, args.lon) {
        (Some(lat), Some(lon)) => Some(GeoPoint::new(lat, lon)?),
        _ => None,
    };
    let context = EvaluationContext {
        location,
        wifi: WifiState::new(args.ssid.as_deref(), !args.wifi_off),
        places: store.trusted_places(),
    };
    let trusted = is_trusted(&context);
    let matched = matching_labels(&context);

    if args.json {
        let out = serde_json::json!({
            "trusted": trusted,
            "matched": matched,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else if trusted {
        println!("trusted ({})", matched.join(", "));
    } else {
        println!("untrusted");
    }
    Ok(())
}

/// Labels of every place that vouches for the context.
fn matching_labels(context: &EvaluationContext) -> Vec<String> {
    context
        .places
        .iter()
        .filter(|place| match place {
            TrustedPlace::Location { point, .. } => context
                .location
                .is_some_and(|fix| within_trusted_radius(distance_meters(&fix, point))),
            TrustedPlace::Wifi { ssid, .. } => {
                context.wifi.enabled && context.wifi.ssid.as_deref() == Some(ssid.as_str())
            }
        })
        .map(|place| place.label().to_string())
        .collect()
}
