//! Inject command - emit the interpreter path-injection snippet

use crate::cache::CacheLayout;
use crate::cli::args::InjectArgs;
use crate::config::Config;
use crate::error::{DepotError, DepotResult};
use crate::interpreter::InterpreterVersion;
use crate::lockfile::LockStore;
use crate::paths;
use tracing::info;

/// Execute the inject command
pub async fn execute(args: InjectArgs, config: &Config) -> DepotResult<()> {
    let lockfile = LockStore::load(args.lockfile.as_deref()).await?;

    let interpreter = InterpreterVersion::parse(&lockfile.root.python)?;
    let cache_root = args
        .cache_root
        .unwrap_or_else(|| config.cache.root.clone());
    let layout = CacheLayout::new(cache_root, interpreter);

    let lib_dirs = paths::emit(&lockfile, &layout);
    let snippet = paths::render(&lib_dirs)?;

    match args.output {
        Some(path) => {
            tokio::fs::write(&path, &snippet)
                .await
                .map_err(|e| DepotError::io(format!("writing {}", path.display()), e))?;
            info!("Wrote path snippet for {} packages to {}", lib_dirs.len(), path.display());
        }
        None => print!("{}", snippet),
    }

    Ok(())
}
