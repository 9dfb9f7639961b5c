//! Settings file commands.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Subcommand};
use panelkit_config::{FilePersistence, Persistence, Settings};

#[derive(Args)]
pub struct SettingsArgs {
    #[command(subcommand)]
    command: SettingsCommand,
}

#[derive(Subcommand)]
enum SettingsCommand {
    /// Print a settings file (defaults when it does not exist)
    Show {
        /// Settings file
        #[arg(short, long)]
        settings: PathBuf,
    },

    /// Overwrite a settings file with defaults
    Reset {
        /// Settings file
        #[arg(short, long)]
        settings: PathBuf,
    },
}

pub fn run(args: SettingsArgs) -> anyhow::Result<()> {
    match args.command {
        SettingsCommand::Show { settings } => show(&settings),
        SettingsCommand::Reset { settings } => reset(&settings),
    }
}

fn show(path: &Path) -> anyhow::Result<()> {
    let loaded = FilePersistence::new(path)
        .load()
        .with_context(|| format!("failed to load {}", path.display()))?;

    let settings = match loaded {
        Some(settings) => {
            println!("# {}", path.display());
            if !settings.is_valid() {
                println!("# signature mismatch: the panel will restore defaults");
            }
            settings
        }
        None => {
            println!("# {} does not exist, showing defaults", path.display());
            Settings::default()
        }
    };

    print!("{}", toml::to_string_pretty(&settings)?);
    Ok(())
}

fn reset(path: &Path) -> anyhow::Result<()> {
    FilePersistence::new(path)
        .save(&Settings::default())
        .with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), "settings: reset to defaults");
    println!("Reset {}", path.display());
    Ok(())
}
