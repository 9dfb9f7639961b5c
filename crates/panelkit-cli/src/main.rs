//! Panelkit CLI - run a front panel on the host.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "panelkit")]
#[command(author, version, about = "Panelkit front-panel simulator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scripted panel session and print status reports
    Simulate(commands::simulate::SimulateArgs),

    /// Inspect or reset a settings file
    Settings(commands::settings::SettingsArgs),
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,panelkit::status=warn".into());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate(args) => commands::simulate::run(args),
        Commands::Settings(args) => commands::settings::run(args),
    }
}
