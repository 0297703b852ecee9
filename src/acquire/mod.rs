//! Artifact acquisition
//!
//! Turns one resolved package descriptor into a local installable archive,
//! dispatching on the source variant. Some acquisitions produce throwaway
//! archives (directory builds, editable checkouts); those are flagged
//! ephemeral and removed when the [`AcquiredArchive`] is dropped, so
//! cleanup happens on every exit path of the install step.

pub mod registry;

use crate::archive;
use crate::error::{DepotError, DepotResult};
use crate::interpreter::CompatTags;
use crate::package::{PackageDescriptor, PackageSource};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// A locally available installable archive, with cleanup ownership
#[derive(Debug)]
pub struct AcquiredArchive {
    path: PathBuf,
    ephemeral: bool,
}

impl AcquiredArchive {
    pub fn persistent(path: PathBuf) -> Self {
        Self {
            path,
            ephemeral: false,
        }
    }

    pub fn ephemeral(path: PathBuf) -> Self {
        Self {
            path,
            ephemeral: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_ephemeral(&self) -> bool {
        self.ephemeral
    }
}

impl Drop for AcquiredArchive {
    fn drop(&mut self) {
        if self.ephemeral {
            debug!("Removing ephemeral archive {}", self.path.display());
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

/// Pluggable acquisition strategy, one call per package
#[async_trait]
pub trait Acquire: Send + Sync {
    async fn acquire(&self, pkg: &PackageDescriptor) -> DepotResult<AcquiredArchive>;
}

/// Acquisition context, computed once per run
#[derive(Debug, Clone)]
pub struct AcquireConfig {
    /// Package index base URL
    pub index_url: String,
    /// Target compatibility tags for registry selection
    pub tags: CompatTags,
    /// Persistent download cache
    pub downloads_dir: PathBuf,
    /// Base for resolving relative local source paths
    pub project_root: PathBuf,
}

/// The standard acquirer: one strategy per source variant
pub struct Acquirer {
    config: AcquireConfig,
}

impl Acquirer {
    pub fn new(config: AcquireConfig) -> Self {
        Self { config }
    }

    /// Checkout the referenced revision and pack it into an archive.
    ///
    /// The built archive is kept in the download cache unless the package is
    /// in editable mode, in which case it is discarded after install.
    async fn acquire_vcs(
        &self,
        pkg: &PackageDescriptor,
        url: &str,
        reference: &str,
        editable: bool,
    ) -> DepotResult<AcquiredArchive> {
        let workspace = tempfile::tempdir()
            .map_err(|e| DepotError::io("creating checkout workspace", e))?;
        let checkout = workspace.path().join("src");

        info!("Checking out {} @ {}", url, reference);
        run_git(&["clone", url, &checkout.display().to_string()]).await?;
        run_git(&[
            "-C",
            &checkout.display().to_string(),
            "checkout",
            "--detach",
            reference,
        ])
        .await?;

        // The repository metadata is not part of the artifact
        let _ = std::fs::remove_dir_all(checkout.join(".git"));

        let dest = self.archive_dest(pkg)?;
        archive::pack_dir(&checkout, &dest, "lib")?;

        if editable {
            Ok(AcquiredArchive::ephemeral(dest))
        } else {
            Ok(AcquiredArchive::persistent(dest))
        }
    }

    /// Pack a local directory tree into a throwaway archive
    fn acquire_directory(&self, pkg: &PackageDescriptor, path: &Path) -> DepotResult<AcquiredArchive> {
        let dir = self.resolve_local(path);
        if !dir.is_dir() {
            return Err(DepotError::acquire(
                pkg.unique_name(),
                format!("source directory {} does not exist", dir.display()),
            ));
        }
        let dest = self.archive_dest(pkg)?;
        archive::pack_dir(&dir, &dest, "lib")?;
        Ok(AcquiredArchive::ephemeral(dest))
    }

    /// Use an archive already on the local filesystem
    fn acquire_file(&self, pkg: &PackageDescriptor, path: &Path) -> DepotResult<AcquiredArchive> {
        let file = self.resolve_local(path);
        if !file.is_file() {
            return Err(DepotError::acquire(
                pkg.unique_name(),
                format!("archive {} does not exist", file.display()),
            ));
        }
        Ok(AcquiredArchive::persistent(file))
    }

    /// Fetch an archive from an arbitrary URL into the download cache
    fn acquire_url(&self, pkg: &PackageDescriptor, url: &str) -> DepotResult<AcquiredArchive> {
        let filename = url
            .rsplit('/')
            .next()
            .and_then(|f| f.split(['?', '#']).next())
            .filter(|f| !f.is_empty())
            .ok_or_else(|| {
                DepotError::acquire(pkg.unique_name(), format!("cannot name download for {}", url))
            })?;
        let dest = self.config.downloads_dir.join(filename);
        if !dest.exists() {
            registry::download(url, &dest)?;
        }
        Ok(AcquiredArchive::persistent(dest))
    }

    fn resolve_local(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.config.project_root.join(path)
        }
    }

    fn archive_dest(&self, pkg: &PackageDescriptor) -> DepotResult<PathBuf> {
        std::fs::create_dir_all(&self.config.downloads_dir).map_err(|e| {
            DepotError::io(
                format!("creating {}", self.config.downloads_dir.display()),
                e,
            )
        })?;
        Ok(self
            .config
            .downloads_dir
            .join(format!("{}.tar.gz", pkg.unique_name())))
    }
}

#[async_trait]
impl Acquire for Acquirer {
    async fn acquire(&self, pkg: &PackageDescriptor) -> DepotResult<AcquiredArchive> {
        debug!("Acquiring {} from {} source", pkg.unique_name(), pkg.source.kind());
        match &pkg.source {
            PackageSource::Registry => {
                let path = registry::download_release(
                    pkg,
                    &self.config.index_url,
                    &self.config.tags,
                    &self.config.downloads_dir,
                )?;
                Ok(AcquiredArchive::persistent(path))
            }
            PackageSource::Vcs {
                url,
                reference,
                editable,
            } => self.acquire_vcs(pkg, url, reference, *editable).await,
            PackageSource::LocalFile { path } => self.acquire_file(pkg, path),
            PackageSource::LocalDirectory { path } => self.acquire_directory(pkg, path),
            PackageSource::RemoteUrl { url } => self.acquire_url(pkg, url),
        }
    }
}

async fn run_git(args: &[&str]) -> DepotResult<()> {
    let output = Command::new("git")
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| DepotError::command_failed(format!("git {:?}", args), e))?;

    if output.status.success() {
        Ok(())
    } else {
        Err(DepotError::command_exec(
            format!("git {:?}", args),
            String::from_utf8_lossy(&output.stderr),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::{CompatTags, InterpreterVersion, DEFAULT_PLATFORMS};
    use tempfile::TempDir;

    fn acquirer(base: &Path) -> Acquirer {
        let platforms: Vec<String> = DEFAULT_PLATFORMS.iter().map(|p| p.to_string()).collect();
        Acquirer::new(AcquireConfig {
            index_url: "https://pypi.org/pypi".to_string(),
            tags: CompatTags::for_target(InterpreterVersion::new(3, 12), &platforms),
            downloads_dir: base.join("downloads"),
            project_root: base.to_path_buf(),
        })
    }

    #[tokio::test]
    async fn local_file_passthrough() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("pkg-1.0.tar.gz");
        std::fs::write(&archive, b"data").unwrap();

        let pkg = PackageDescriptor::registry("pkg", "1.0")
            .with_source(PackageSource::LocalFile {
                path: PathBuf::from("pkg-1.0.tar.gz"),
            });
        let acquired = acquirer(dir.path()).acquire(&pkg).await.unwrap();

        assert_eq!(acquired.path(), archive.as_path());
        assert!(!acquired.is_ephemeral());
        drop(acquired);
        assert!(archive.exists(), "persistent archives survive drop");
    }

    #[tokio::test]
    async fn local_file_missing_errors() {
        let dir = TempDir::new().unwrap();
        let pkg = PackageDescriptor::registry("pkg", "1.0")
            .with_source(PackageSource::LocalFile {
                path: PathBuf::from("absent.tar.gz"),
            });
        let err = acquirer(dir.path()).acquire(&pkg).await.unwrap_err();
        assert!(matches!(err, DepotError::Acquire { .. }));
    }

    #[tokio::test]
    async fn directory_build_is_ephemeral() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("mytool");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::write(src.join("mytool.py"), "x = 1\n").unwrap();

        let pkg = PackageDescriptor::registry("mytool", "0.1.0")
            .with_source(PackageSource::LocalDirectory {
                path: PathBuf::from("mytool"),
            });
        let acquired = acquirer(dir.path()).acquire(&pkg).await.unwrap();

        let archive_path = acquired.path().to_path_buf();
        assert!(archive_path.exists());
        assert!(acquired.is_ephemeral());
        drop(acquired);
        assert!(!archive_path.exists(), "ephemeral archives are removed on drop");
    }

    #[tokio::test]
    async fn url_filename_required() {
        let dir = TempDir::new().unwrap();
        let pkg = PackageDescriptor::registry("pkg", "1.0")
            .with_source(PackageSource::RemoteUrl {
                url: "https://example.com/".to_string(),
            });
        let err = acquirer(dir.path()).acquire(&pkg).await.unwrap_err();
        assert!(matches!(err, DepotError::Acquire { .. }));
    }
}
