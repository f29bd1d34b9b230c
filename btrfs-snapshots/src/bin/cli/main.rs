// SPDX-License-Identifier: GPL-3.0-only

//! CLI for timestamped BTRFS snapshots. Results are printed to stdout as JSON.

mod logging;

use std::path::PathBuf;

use anyhow::{Context, Result};
use btrfs_snapshots::{
    AssumeYes, Confirm, Config, SnapshotManager, TerminalPrompt, sort_chronologically,
};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "btrfs-snapshots")]
#[command(about = "Create, list, delete and diff timestamped BTRFS snapshots", long_about = None)]
struct Cli {
    /// Configuration file (defaults to $BTRFS_SNAPSHOTS_CONFIG or the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all subvolumes of the filesystem containing a path
    List {
        /// Any path on the BTRFS filesystem
        root: PathBuf,
        /// Only show subvolumes below this path
        #[arg(long)]
        prefix: Option<PathBuf>,
    },
    /// List subvolumes named after a timestamp
    Snapshots {
        /// Any path on the BTRFS filesystem
        root: PathBuf,
        /// Only show snapshots below this path
        #[arg(long)]
        prefix: Option<PathBuf>,
        /// Order oldest first instead of listing order
        #[arg(long)]
        sort: bool,
    },
    /// Show the newest timestamped snapshot
    Latest {
        /// Any path on the BTRFS filesystem
        root: PathBuf,
        /// Only consider snapshots below this path
        #[arg(long)]
        prefix: Option<PathBuf>,
    },
    /// Create a snapshot at an explicit destination
    Create {
        /// Source subvolume path
        source: PathBuf,
        /// Destination snapshot path
        destination: PathBuf,
    },
    /// Create a snapshot named after the current time
    SnapshotNow {
        /// Source subvolume path
        source: PathBuf,
        /// Directory that receives the snapshot
        destination_dir: PathBuf,
    },
    /// Delete a snapshot
    Delete {
        /// Path to the snapshot to delete
        path: PathBuf,
        /// Do not ask for confirmation
        #[arg(long)]
        yes: bool,
    },
    /// List files changed between two snapshots
    Diff {
        /// Older snapshot
        old: PathBuf,
        /// Newer snapshot
        new: PathBuf,
        /// Print full find-new records instead of paths
        #[arg(long)]
        extents: bool,
    },
    /// Print the current generation of a snapshot
    Generation {
        /// Snapshot path
        snapshot: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::discover(cli.config.as_deref()).context("failed to load configuration")?;
    logging::init(&config);

    let manager = SnapshotManager::from_config(&config)?;

    match cli.command {
        Commands::List { root, prefix } => {
            let subvolumes = manager.list_subvolumes(&root, prefix.as_deref())?;
            println!("{}", serde_json::to_string(&subvolumes)?);
        }
        Commands::Snapshots { root, prefix, sort } => {
            let mut snapshots = manager.list_timestamped_snapshots(&root, prefix.as_deref())?;
            if sort {
                sort_chronologically(&mut snapshots);
            }
            println!("{}", serde_json::to_string(&snapshots)?);
        }
        Commands::Latest { root, prefix } => {
            let latest = manager.latest_snapshot(&root, prefix.as_deref())?;
            println!("{}", serde_json::to_string(&latest)?);
        }
        Commands::Create {
            source,
            destination,
        } => {
            let created = manager.create_snapshot(&source, &destination)?;
            println!("{}", serde_json::json!({ "success": true, "path": created }));
        }
        Commands::SnapshotNow {
            source,
            destination_dir,
        } => {
            let created = manager.create_timestamped_snapshot(&source, &destination_dir)?;
            println!("{}", serde_json::json!({ "success": true, "path": created }));
        }
        Commands::Delete { path, yes } => {
            let confirm: &dyn Confirm = if yes { &AssumeYes } else { &TerminalPrompt };
            let outcome = manager.delete_snapshot(&path, confirm)?;
            println!("{}", serde_json::json!({ "outcome": outcome }));
        }
        Commands::Diff { old, new, extents } => {
            if extents {
                let changed = manager.diff_extents(&old, &new)?;
                println!("{}", serde_json::to_string(&changed)?);
            } else {
                let changed = manager.diff(&old, &new)?;
                println!("{}", serde_json::to_string(&changed)?);
            }
        }
        Commands::Generation { snapshot } => {
            let generation = manager.generation(&snapshot)?;
            println!("{}", serde_json::json!({ "generation": generation }));
        }
    }

    Ok(())
}
