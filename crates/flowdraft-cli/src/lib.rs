//! FlowDraft command-line shell
//!
//! Manages stored diagrams and drives editing sessions from recorded
//! gesture events.

mod cli;
mod commands;

pub use cli::{Cli, Command, GridArg, ImportModeArg};
pub use commands::{CliError, run, run_with};
