//! Lock command - resolve project requirements into a lockfile

use crate::cli::args::LockArgs;
use crate::config::Config;
use crate::error::{DepotError, DepotResult};
use crate::interpreter::InterpreterVersion;
use crate::lockfile::{LockStore, Lockfile, RootPackage};
use crate::requirements;
use crate::resolver::{self, PinnedResolver, Resolver, ResolverConfig};
use tracing::info;

/// Execute the lock command
pub async fn execute(args: LockArgs, config: &Config) -> DepotResult<()> {
    let project_root = match args.project {
        Some(path) => path,
        None => std::env::current_dir()
            .map_err(|e| DepotError::io("getting current directory", e))?,
    };

    let version = args.python.as_deref().unwrap_or(&config.python.version);
    let interpreter = InterpreterVersion::parse(version)?;

    let deps = requirements::load_project_deps(&project_root)?;
    info!(
        "Resolving {} requirements for python {}",
        deps.len(),
        interpreter
    );

    let resolver_config = ResolverConfig {
        project_root,
        interpreter,
        index_url: config.registry.index_url.clone(),
    };
    let resolution = PinnedResolver.resolve(&deps, &resolver_config).await?;
    let packages = resolver::expect_installs(resolution.operations)?;

    let mut lockfile = Lockfile::new(RootPackage::new(interpreter.constraint()));
    for pkg in packages {
        lockfile.add_package(pkg)?;
    }

    LockStore::persist(&lockfile, args.output.as_deref()).await?;

    if let Some(ref path) = args.output {
        info!(
            "Locked {} packages to {}",
            lockfile.packages().len(),
            path.display()
        );
    }

    Ok(())
}
