//! Command-line arguments.

use clap::{Parser, Subcommand, ValueEnum};
use flowdraft_core::ImportMode;
use flowdraft_render::GridStyle;
use std::path::PathBuf;

/// Create, inspect and edit FlowDraft flowchart diagrams
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Directory holding the diagram files (default: platform data dir)
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Editor configuration JSON file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List stored diagrams, most recently modified first
    List,
    /// Create an empty diagram
    New {
        /// Diagram name; suffixed with (1), (2), ... if taken
        #[arg(default_value = "")]
        name: String,
    },
    /// Delete a diagram
    Delete { id: String },
    /// Copy a diagram under a new id
    Duplicate { id: String },
    /// Print a diagram's nodes and connections
    Show { id: String },
    /// Write a diagram as portable JSON
    Export {
        id: String,
        /// Output file (default: <name>_<date>.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Read a diagram JSON file into the store
    Import {
        file: PathBuf,
        /// What to do when the diagram id is already stored
        #[arg(short, long, value_enum, default_value_t = ImportModeArg::Create)]
        mode: ImportModeArg,
    },
    /// Render a diagram to SVG
    Render {
        id: String,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, value_enum, default_value_t = GridArg::Dots)]
        grid: GridArg,
        /// Fit the view to the diagram content first
        #[arg(long)]
        fit: bool,
    },
    /// Apply recorded gesture events (a JSON array) to a diagram and save it
    Replay {
        id: String,
        events: PathBuf,
        /// Also render the result to this SVG file
        #[arg(long)]
        svg: Option<PathBuf>,
        /// Apply the events without saving
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the keyboard shortcuts
    Shortcuts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ImportModeArg {
    Create,
    Replace,
    Cancel,
}

impl From<ImportModeArg> for ImportMode {
    fn from(mode: ImportModeArg) -> Self {
        match mode {
            ImportModeArg::Create => ImportMode::Create,
            ImportModeArg::Replace => ImportMode::Replace,
            ImportModeArg::Cancel => ImportMode::Cancel,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GridArg {
    None,
    Dots,
    Lines,
}

impl From<GridArg> for GridStyle {
    fn from(grid: GridArg) -> Self {
        match grid {
            GridArg::None => GridStyle::None,
            GridArg::Dots => GridStyle::Dots,
            GridArg::Lines => GridStyle::Lines,
        }
    }
}
