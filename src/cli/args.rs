//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Pydepot - Shared Python package cache for serverless workers
///
/// Locks project requirements, installs distributions into an
/// interpreter-versioned shared cache, and serves queued install jobs.
#[derive(Parser, Debug)]
#[command(name = "pydepot")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "PYDEPOT_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve project requirements into a lockfile
    Lock(LockArgs),

    /// Install locked packages into the shared cache
    Install(InstallArgs),

    /// Emit the interpreter path-injection snippet for a lockfile
    Inject(InjectArgs),

    /// Poll the job queue and run a command per message
    Serve(ServeArgs),

    /// Show or edit configuration
    Config(ConfigArgs),
}

/// Arguments for the lock command
#[derive(Parser, Debug)]
pub struct LockArgs {
    /// Project directory holding the requirements files
    /// (defaults to current directory)
    #[arg(short, long)]
    pub project: Option<PathBuf>,

    /// Lockfile to write (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Target interpreter version, e.g. 3.12 (defaults to config)
    #[arg(long)]
    pub python: Option<String>,
}

/// Arguments for the install command
#[derive(Parser, Debug)]
pub struct InstallArgs {
    /// Lockfile to install from (defaults to stdin)
    #[arg(short, long)]
    pub lockfile: Option<PathBuf>,

    /// Cache root directory (defaults to config)
    #[arg(long)]
    pub cache_root: Option<PathBuf>,

    /// Package index base URL (defaults to config)
    #[arg(long)]
    pub index_url: Option<String>,
}

/// Arguments for the inject command
#[derive(Parser, Debug)]
pub struct InjectArgs {
    /// Lockfile to derive paths from (defaults to stdin)
    #[arg(short, long)]
    pub lockfile: Option<PathBuf>,

    /// File to write the snippet to (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Cache root directory (defaults to config)
    #[arg(long)]
    pub cache_root: Option<PathBuf>,
}

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Directory polled for incoming job messages (defaults to config)
    #[arg(long)]
    pub request_dir: Option<PathBuf>,

    /// Directory replies are written to (defaults to config)
    #[arg(long)]
    pub response_dir: Option<PathBuf>,

    /// Long-poll wait per receive, in seconds (defaults to config)
    #[arg(long)]
    pub wait: Option<u64>,

    /// Command to run per message; %Name% placeholders are replaced
    /// with message attributes and the body arrives on stdin
    #[arg(last = true, required = true)]
    pub command: Vec<String>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}
