use std::path::PathBuf;

use clap::{Parser, Subcommand};
use cloudpan_protocol::ConflictPolicy;

#[derive(Parser, Debug)]
#[command(name = "cloudpan", version, about = "Cloud storage command-line client")]
pub struct Cli {
    /// Turn debug logging on
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Use this config file instead of the default location
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the account behind the configured token
    Whoami,
    /// Show storage usage
    Quota,
    /// List a remote directory
    Ls {
        #[arg(default_value = "/")]
        dir: String,
        /// Walk subdirectories
        #[arg(short = 'R', long)]
        recursive: bool,
    },
    /// Search remote files by name
    Search {
        key: String,
        #[arg(long, default_value = "/")]
        dir: String,
        #[arg(short = 'R', long)]
        recursive: bool,
    },
    /// Upload a file or a directory tree
    Upload(UploadArgs),
    /// Create a remote directory
    Mkdir { remote: String },
    /// Download a remote file, or a directory tree with -R
    Download {
        remote: String,
        local: PathBuf,
        /// Replace existing local files
        #[arg(long)]
        overwrite: bool,
        /// Treat REMOTE as a directory and fetch everything under it
        #[arg(short = 'R', long)]
        recursive: bool,
    },
    /// Delete remote files or directories
    Rm {
        #[arg(required = true)]
        paths: Vec<String>,
    },
    /// Move a remote entry into another directory
    Mv { from: String, to_dir: String },
    /// Copy a remote entry into another directory
    Cp { from: String, to_dir: String },
    /// Rename a remote entry in place
    Rename { path: String, new_name: String },
}

#[derive(Parser, Debug)]
pub struct UploadArgs {
    pub local: PathBuf,
    /// Remote destination. Relative paths land under the configured app directory.
    pub remote: String,

    /// rename, rename-on-mismatch or overwrite
    #[arg(long, value_name = "POLICY")]
    pub policy: Option<ConflictPolicy>,

    /// Glob pattern to skip (repeatable, directories only)
    #[arg(long = "exclude", value_name = "PATTERN")]
    pub exclude: Vec<String>,

    #[arg(long, value_name = "N")]
    pub file_workers: Option<usize>,

    #[arg(long, value_name = "N")]
    pub chunk_workers: Option<usize>,
}
