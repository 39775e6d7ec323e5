//! fixtrail CLI - Command-line interface
//!
//! This binary provides a command-line interface to the fixtrail library.

mod commands;
mod error;
mod runner;

use clap::{Parser, Subcommand};

use commands::config::ConfigCommands;
use commands::history::HistoryCommands;
use commands::replay::ReplayArgs;
use commands::settings::SettingsCommands;
use commands::stats::StatsArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "fixtrail")]
#[command(
    version,
    about = "Continuous location tracking: filtered history and trip stats",
    long_about = None
)]
struct Cli {
    /// Enable debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded fix trace through the tracking engine
    Replay(ReplayArgs),

    /// Show trip statistics from the stored history
    Stats(StatsArgs),

    /// Manage the recorded history
    History {
        #[command(subcommand)]
        command: HistoryCommands,
    },

    /// View or change tracking settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },

    /// Manage ~/.fixtrail/config.ini
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result: Result<(), CliError> = match cli.command {
        Commands::Replay(args) => commands::replay::run(args, cli.verbose).await,
        Commands::Stats(args) => commands::stats::run(args).await,
        Commands::History { command } => commands::history::run(command).await,
        Commands::Settings { command } => commands::settings::run(command).await,
        Commands::Config { command } => commands::config::run(command),
    };

    if let Err(e) = result {
        e.exit();
    }
}
