//! Pydepot - shared Python package cache
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use pydepot::cli::{Cli, Commands};
use pydepot::config::ConfigManager;
use pydepot::error::DepotResult;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> DepotResult<()> {
    let cli = Cli::parse();

    // Initialize logging: 0 = warn, 1 = info, 2+ = debug. Logs go to
    // stderr so lockfiles and snippets can stream cleanly on stdout.
    let filter = match cli.verbose {
        0 => EnvFilter::new("pydepot=warn"),
        1 => EnvFilter::new("pydepot=info"),
        _ => EnvFilter::new("pydepot=debug"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    // Load configuration
    let config_manager = if let Some(ref path) = cli.config {
        ConfigManager::with_path(path.clone())
    } else {
        ConfigManager::new()
    };
    let config = config_manager.load().await?;

    // Dispatch to command
    match cli.command {
        Commands::Lock(args) => pydepot::cli::commands::lock(args, &config).await,
        Commands::Install(args) => pydepot::cli::commands::install(args, &config).await,
        Commands::Inject(args) => pydepot::cli::commands::inject(args, &config).await,
        Commands::Serve(args) => pydepot::cli::commands::serve(args, &config).await,
        Commands::Config(args) => {
            pydepot::cli::commands::config(args, &config, &config_manager).await
        }
    }
}
