use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use relaunch::commands::{
    autostart, checkpoint, install, list, maintain, pause, restore, start, status,
};
use relaunch::fs::DataDir;
use relaunch::logging;

#[derive(Parser)]
#[command(name = "relaunch")]
#[command(about = "Checkpoint running applications and bring them back after restarts", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register relaunch to start at login
    Install,

    /// Remove the login registration (checkpoints are kept)
    Uninstall,

    /// Start the monitoring daemon
    Start {
        /// Run in this process instead of spawning a background daemon
        #[arg(long)]
        foreground: bool,
    },

    /// Create a checkpoint now
    Checkpoint {
        /// Ignore the pause marker, CPU load and battery level
        #[arg(short, long)]
        force: bool,
    },

    /// Relaunch the applications of a checkpoint
    Restore {
        /// Only print the summary
        #[arg(short, long)]
        silent: bool,

        /// Checkpoint ID to restore (default: latest)
        #[arg(short, long)]
        checkpoint: Option<String>,
    },

    /// List checkpoints, newest first
    List,

    /// Show daemon, checkpoint and learning status
    Status,

    /// Run retention cleanup and compression now
    Maintain,

    /// Pause automatic checkpoints
    Pause,

    /// Resume automatic checkpoints
    Resume,

    /// Re-enable auto-start and clear the crash history
    EnableAutostart,

    /// Disable auto-start without uninstalling
    DisableAutostart,
}

fn main() {
    let cli = Cli::parse();

    if let Ok(data_dir) = DataDir::from_env() {
        if let Err(e) = logging::init(&data_dir.logs_dir()) {
            eprintln!("{} Logging disabled: {e:#}", "!".yellow().bold());
        }
    }

    if let Err(e) = run(cli.command) {
        let message = format!("{e:#}");
        tracing::error!(error = %message, "command failed");
        eprintln!("{} {message}", "✗".red().bold());
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Install => install::install(),
        Commands::Uninstall => install::uninstall(),
        Commands::Start { foreground } => start::execute(foreground),
        Commands::Checkpoint { force } => checkpoint::execute(force),
        Commands::Restore { silent, checkpoint } => restore::execute(checkpoint, silent),
        Commands::List => list::execute(),
        Commands::Status => status::execute(),
        Commands::Maintain => maintain::execute(),
        Commands::Pause => pause::pause(),
        Commands::Resume => pause::resume(),
        Commands::EnableAutostart => autostart::enable(),
        Commands::DisableAutostart => autostart::disable(),
    }
}
