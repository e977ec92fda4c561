//! CLI module for rtmirror
//!
//! Provides a command-line front end over a file-backed store:
//! - list: Print the mirrored collection
//! - add / update / remove / clear: Submit one mutation
//! - watch: Follow the collection, applying JSON requests read from stdin

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command, SortKey};
pub use commands::{list, run, run_command, submit, watch, Config, WatchRequest};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{parse_request, write_error, write_response};
