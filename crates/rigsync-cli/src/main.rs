//! rigsync CLI - Command-line front end for the capture engine
//!
//! Provides `rigsync save`, `rigsync apply`, `rigsync profile`, and the
//! supporting backup, revert, and status commands.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use rigsync_core::{DeviceId, SyncRoot};

use commands::profile::ProfileCommands;

#[derive(Parser)]
#[command(name = "rigsync")]
#[command(about = "rigsync - workstation device configuration synchronizer")]
#[command(version)]
struct Cli {
    /// Sync root directory (overrides RIGSYNC_ROOT and the platform default)
    #[arg(long, global = true, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage profiles
    Profile {
        #[command(subcommand)]
        action: ProfileCommands,
    },
    /// Capture live device configuration into a profile
    Save {
        /// Profile name (defaults to the last selected profile)
        profile: Option<String>,

        /// Restrict the batch to these devices (repeatable)
        #[arg(short, long, value_name = "DEVICE")]
        device: Vec<DeviceId>,
    },
    /// Write a profile's captured configuration onto this machine
    Apply {
        /// Profile name (defaults to the last selected profile)
        profile: Option<String>,

        /// Restrict the batch to these devices (repeatable)
        #[arg(short, long, value_name = "DEVICE")]
        device: Vec<DeviceId>,
    },
    /// Snapshot a device's live configuration into the revert vault
    Backup {
        /// Device to snapshot
        device: DeviceId,
    },
    /// Restore a device's live configuration from the revert vault
    Revert {
        /// Device to restore
        device: DeviceId,
    },
    /// Show the sync root, profiles, and per-device state
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List devices and toggle which ones batches touch by default
    Devices {
        /// Enable devices for future batches (repeatable)
        #[arg(long, value_name = "DEVICE")]
        enable: Vec<DeviceId>,

        /// Disable devices for future batches (repeatable)
        #[arg(long, value_name = "DEVICE")]
        disable: Vec<DeviceId>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let root = resolve_root(cli.root);
    tracing::debug!(root = %root.base().display(), "Resolved sync root");

    match cli.command {
        Commands::Profile { action } => commands::profile::execute(action, root),
        Commands::Save { profile, device } => commands::device::save(root, profile, &device).await,
        Commands::Apply { profile, device } => {
            commands::device::apply(root, profile, &device).await
        }
        Commands::Backup { device } => commands::device::backup(root, device).await,
        Commands::Revert { device } => commands::device::revert(root, device).await,
        Commands::Status { json } => commands::device::status(root, json),
        Commands::Devices { enable, disable } => {
            commands::device::devices(&root, &enable, &disable)
        }
    }
}

/// Pick the sync root: `--root`, then `RIGSYNC_ROOT`, then the platform
/// default under the documents directory.
fn resolve_root(flag: Option<PathBuf>) -> SyncRoot {
    if let Some(dir) = flag {
        return SyncRoot::new(dir);
    }
    if let Ok(dir) = std::env::var("RIGSYNC_ROOT") {
        if !dir.trim().is_empty() {
            return SyncRoot::new(dir);
        }
    }
    SyncRoot::discover()
}

/// Logging goes to stderr; stdout is reserved for command output.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
