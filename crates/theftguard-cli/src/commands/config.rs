use clap::Subcommand;
use theftguard_core::SettingsStore;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Config key (e.g. "sensitivity_level", "location_interval_secs")
        key: String,
    },
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// New value
        value: String,
    },
    /// List all config values
    List,
    /// Print the config file path
    Path,
    /// Reset config to defaults
    Reset,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    let store = SettingsStore::open()?;
    match action {
        ConfigAction::Get { key } => match store.config().get(&key) {
            Some(value) => println!("{value}"),
            None => return Err(format!("unknown key: {key}").into()),
        },
        ConfigAction::Set { key, value } => {
            store.set_value(&key, &value)?;
            println!("ok");
        }
        ConfigAction::List => {
            let json = serde_json::to_string_pretty(&store.config())?;
            println!("{json}");
        }
        ConfigAction::Path => {
            if let Some(path) = store.path() {
                println!("{}", path.display());
            }
        }
        ConfigAction::Reset => {
            store.reset()?;
            println!("config reset to defaults");
        }
    }
    Ok(())
}
