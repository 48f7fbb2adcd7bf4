use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "theftguard", version, about = "Motion-triggered device lock with trusted places")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Trusted place management
    Places {
        #[command(subcommand)]
        action: commands::places::PlacesAction,
    },
    /// Show the motion threshold for a sensitivity level
    Threshold {
        /// Sensitivity level (1.0-5.0); defaults to the stored value
        #[arg(long)]
        level: Option<f64>,
    },
    /// Evaluate trust for a location and/or Wi-Fi network
    Check(commands::check::CheckArgs),
    /// Replay a JSON-lines input script through the protection engine
    Run(commands::run::RunArgs),
    /// Generate shell completions
    Completions {
        shell: clap_complete::Shell,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("THEFTGUARD_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Config { action } => commands::config::run(action),
        Commands::Places { action } => commands::places::run(action),
        Commands::Threshold { level } => commands::check::threshold(level),
        Commands::Check(args) => commands::check::run(args),
        Commands::Run(args) => commands::run::run(args),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "theftguard", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
