//! Trusted place management commands for CLI.

use clap::Subcommand;
use theftguard_core::{ConfigStore, GeoPoint, PlaceKind, SettingsStore, TrustedPlace, TrustedPlaceSet};

#[derive(Subcommand)]
pub enum PlacesAction {
    /// List trusted places
    List {
        /// Only show one kind (location or wifi)
        #[arg(long)]
        kind: Option<PlaceKind>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Trust a location
    AddLocation {
        /// Display label
        label: String,
        /// Latitude in degrees
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        /// Longitude in degrees
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
    },
    /// Trust a Wi-Fi network; the label is the SSID
    AddWifi {
        /// Network SSID, quoted or not
        ssid: String,
    },
    /// Rename a place
    Rename {
        /// Index as shown by `places list`
        index: usize,
        /// New label
        label: String,
    },
    /// Remove a place
    Remove {
        /// Index as shown by `places list`
        index: usize,
    },
    /// Print all places as JSON
    Export,
    /// Replace all places with the contents of a JSON file
    Import {
        /// Path to a file written by `places export`
        file: std::path::PathBuf,
    },
}

pub fn run(action: PlacesAction) -> Result<(), Box<dyn std::error::Error>> {
    let store = SettingsStore::open()?;
    match action {
        PlacesAction::List { kind, json } => {
            let places = store.trusted_places();
            let listed: Vec<(usize, &TrustedPlace)> = match kind {
                Some(kind) => places.filter(kind),
                None => places.iter().enumerate().collect(),
            };
            if json {
                let entries: Vec<serde_json::Value> = listed
                    .iter()
                    .map(|(index, place)| -> Result<serde_json::Value, serde_json::Error> {
                        let mut value = serde_json::to_value(place)?;
                        value["index"] = serde_json::json!(index);
                        Ok(value)
                    })
                    .collect::<Result<_, _>>()?;
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else if listed.is_empty() {
                println!("No trusted places.");
            } else {
                for (index, place) in listed {
                    println!("{index:>3}  {}", describe(place));
                }
            }
        }
        PlacesAction::AddLocation { label, lat, lon } => {
            let place = TrustedPlace::location(label, GeoPoint::new(lat, lon)?)?;
            let index = store.add_place(place)?;
            println!("Added place {index}");
        }
        PlacesAction::AddWifi { ssid } => {
            let place = TrustedPlace::wifi(&ssid)?;
            let index = store.add_place(place)?;
            println!("Added place {index}");
        }
        PlacesAction::Rename { index, label } => {
            store.rename_place(index, &label)?;
            println!("Renamed place {index}");
        }
        PlacesAction::Remove { index } => {
            let removed = store.remove_place(index)?;
            println!("Removed {}", describe(&removed));
        }
        PlacesAction::Export => {
            println!("{}", store.trusted_places().to_json()?);
        }
        PlacesAction::Import { file } => {
            let json = std::fs::read_to_string(&file)?;
            let places = TrustedPlaceSet::from_json(&json)?;
            let count = places.len();
            store.set_trusted_places(places)?;
            println!("Imported {count} places");
        }
    }
    Ok(())
}

fn describe(place: &TrustedPlace) -> String {
    match place {
        TrustedPlace::Location { label, point } => format!("[location] {label} ({point})"),
        TrustedPlace::Wifi { label, ssid } if label == ssid => format!("[wifi] {label}"),
        TrustedPlace::Wifi { label, ssid } => format!("[wifi] {label} (SSID {ssid})"),
    }
}
