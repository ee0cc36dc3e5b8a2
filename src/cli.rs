use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::logging::LogLevel;

#[derive(Parser, Debug)]
#[command(name = "prooftree")]
#[command(about = "Mirror a proof workspace as a directory tree", long_about = None)]
pub struct Cli {
    /// Data directory to serve (ignored when --url is given)
    #[arg(short = 'C', long, env = "DATA_DIR", default_value = ".")]
    pub root: PathBuf,

    /// Base URL of a proof server to use instead of a local directory
    #[arg(long, env = "PROOFTREE_URL")]
    pub url: Option<String>,

    /// Harness file to pre-select, by file name or full path
    #[arg(long, env = "PROOFTREE_HARNESS")]
    pub harness: Option<String>,

    /// Also list dot-files and CBMC build internals
    #[arg(long)]
    pub include_hidden: bool,

    /// Render collapsed directories too
    #[arg(short = 'a', long)]
    pub expand_all: bool,

    #[arg(long, default_value = "warn", value_enum)]
    pub log_level: LogLevel,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the tree (default)
    Show,
    /// Create a file, or a directory with --dir, then print the tree
    Create {
        path: String,
        #[arg(long)]
        dir: bool,
    },
    /// Delete a file or directory, then print the tree
    Delete { path: String },
    /// Select a path, then print the tree
    Select { path: String },
    /// Select a file and print its content
    Open { path: String },
    /// Replace a file's content with standard input
    Save { path: String },
}
