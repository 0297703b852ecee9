//! Serve command - run the queue-driven job dispatcher

use crate::cli::args::ServeArgs;
use crate::config::Config;
use crate::error::DepotResult;
use crate::queue::{DirQueue, JobDispatcher};
use std::time::Duration;
use tracing::info;

/// Execute the serve command
pub async fn execute(args: ServeArgs, config: &Config) -> DepotResult<()> {
    let request_dir = args
        .request_dir
        .unwrap_or_else(|| config.queue.request_dir.clone());
    let response_dir = args
        .response_dir
        .unwrap_or_else(|| config.queue.response_dir.clone());
    let wait = Duration::from_secs(args.wait.unwrap_or(config.queue.wait_secs));

    info!(
        "Serving jobs from {} (replies to {})",
        request_dir.display(),
        response_dir.display()
    );

    let queue = DirQueue::new(request_dir, response_dir).with_wait(wait);
    let dispatcher = JobDispatcher::new(queue, args.command)?;

    tokio::select! {
        result = dispatcher.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Received interrupt, shutting down");
            Ok(())
        }
    }
}
