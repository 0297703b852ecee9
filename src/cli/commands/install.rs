//! Install command - populate the shared cache from a lockfile

use crate::acquire::{AcquireConfig, Acquirer};
use crate::cache::CacheLayout;
use crate::cli::args::InstallArgs;
use crate::config::Config;
use crate::error::{DepotError, DepotResult};
use crate::interpreter::{CompatTags, InterpreterVersion};
use crate::install;
use crate::lockfile::LockStore;
use crate::ui::{InstallProgress, UiContext};

/// Execute the install command
pub async fn execute(args: InstallArgs, config: &Config) -> DepotResult<()> {
    let ctx = UiContext::detect();
    let lockfile = LockStore::load(args.lockfile.as_deref()).await?;

    // The lockfile decides the target interpreter, not local config
    let interpreter = InterpreterVersion::parse(&lockfile.root.python)?;
    let cache_root = args
        .cache_root
        .unwrap_or_else(|| config.cache.root.clone());
    let layout = CacheLayout::new(cache_root, interpreter);

    let project_root = std::env::current_dir()
        .map_err(|e| DepotError::io("getting current directory", e))?;
    let acquirer = Acquirer::new(AcquireConfig {
        index_url: args
            .index_url
            .unwrap_or_else(|| config.registry.index_url.clone()),
        tags: CompatTags::for_target(interpreter, &config.python.platforms),
        downloads_dir: layout.downloads_dir(),
        project_root,
    });

    let progress = InstallProgress::new(&ctx, lockfile.packages().len() as u64);
    let report = install::install_packages(&lockfile, &layout, &acquirer, |pkg, cached| {
        if !cached {
            progress.on_package(&pkg.name);
        }
        progress.package_done();
    })
    .await;
    progress.finish();
    let report = report?;

    println!(
        "Installed {} packages ({} already cached) under {}",
        report.installed,
        report.already_cached,
        layout.interpreter_dir().display()
    );

    Ok(())
}
