//! CLI argument definitions using clap
//!
//! Commands:
//! - rtmirror list [--sort id|created]
//! - rtmirror add <json>
//! - rtmirror update <id> <json>
//! - rtmirror remove <id>
//! - rtmirror clear
//! - rtmirror watch [--events N]

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// rtmirror - A live client-side mirror of a JSON collection
#[derive(Parser, Debug)]
#[command(name = "rtmirror")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Store file, overrides `store_path` from the config
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Collection name, overrides `collection` from the config
    #[arg(long, global = true)]
    pub collection: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print every record in the collection
    List {
        /// Sort order of the output
        #[arg(long, value_enum, default_value_t = SortKey::Id)]
        sort: SortKey,
    },

    /// Insert a record from a JSON object
    Add {
        /// Record fields as a JSON object
        json: String,
    },

    /// Merge JSON fields onto a record
    Update {
        /// Record id; quote it as a JSON string (`'"007"'`) to keep a numeric-looking text id
        id: String,
        /// Fields to merge as a JSON object
        json: String,
    },

    /// Delete a record
    Remove {
        /// Record id; quote it as a JSON string (`'"007"'`) to keep a numeric-looking text id
        id: String,
    },

    /// Delete every record in the collection
    Clear,

    /// Print a snapshot on every change; mutations are read from stdin
    Watch {
        /// Exit after this many snapshots, including the initial one
        #[arg(long)]
        events: Option<usize>,
    },
}

/// Output order for `list`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortKey {
    /// By record id
    Id,
    /// By creation time, records without one last
    Created,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
