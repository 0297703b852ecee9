//! Atomic cache installation
//!
//! Unpacks one acquired archive into the shared cache. Files are streamed
//! into a private staging directory while a content hash is computed for
//! each, then the whole entry is published with a single atomic rename, so
//! concurrent scanners never observe a partially-populated entry. When two
//! installers race on the same (name, version), the first rename wins and
//! the loser discards its staging tree.

use crate::acquire::Acquire;
use crate::archive;
use crate::cache::{CacheIndex, CacheLayout};
use crate::error::{DepotError, DepotResult};
use crate::lockfile::Lockfile;
use crate::package::PackageDescriptor;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Name of the per-entry integrity record file
pub const RECORD_FILE: &str = "RECORD.json";
/// Name of the per-entry installing-tool marker
pub const INSTALLER_MARKER: &str = "INSTALLER";

/// Integrity metadata for one installed file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IntegrityRecord {
    /// Path relative to the cache entry root
    pub path: String,
    pub sha256: String,
    pub size: u64,
}

/// The integrity record written alongside each cache entry
#[derive(Debug, Serialize, Deserialize)]
struct EntryRecord {
    installer: String,
    installed_at: DateTime<Utc>,
    files: Vec<IntegrityRecord>,
}

/// Outcome of one install run
#[derive(Debug, Default, PartialEq, Eq)]
pub struct InstallReport {
    pub installed: usize,
    pub already_cached: usize,
}

/// Installs one archive into the shared cache
pub struct Installer<'a> {
    layout: &'a CacheLayout,
}

/// Staging tree that cleans itself up unless published
struct Staging {
    path: PathBuf,
    published: bool,
}

impl Drop for Staging {
    fn drop(&mut self) {
        if !self.published {
            let _ = std::fs::remove_dir_all(&self.path);
        }
    }
}

impl<'a> Installer<'a> {
    pub fn new(layout: &'a CacheLayout) -> Self {
        Self { layout }
    }

    /// Unpack `archive_path` into the cache entry for `pkg`.
    ///
    /// Returns the integrity records of the written files. If a concurrent
    /// installer published the entry first, the staged copy is discarded
    /// and the entry is treated as installed.
    pub fn install(
        &self,
        pkg: &PackageDescriptor,
        archive_path: &Path,
    ) -> DepotResult<Vec<IntegrityRecord>> {
        let staging_root = self.layout.staging_dir();
        std::fs::create_dir_all(&staging_root)
            .map_err(|e| DepotError::io(format!("creating {}", staging_root.display()), e))?;

        let stage = Staging {
            path: staging_root.join(format!(
                "{}-{}",
                pkg.unique_name(),
                uuid::Uuid::new_v4().simple()
            )),
            published: false,
        };
        std::fs::create_dir_all(&stage.path)
            .map_err(|e| DepotError::io(format!("creating {}", stage.path.display()), e))?;

        let records = self.unpack_into(pkg, archive_path, &stage.path)?;
        self.write_markers(&stage.path, &records)?;
        self.publish(pkg, stage)?;
        Ok(records)
    }

    fn unpack_into(
        &self,
        pkg: &PackageDescriptor,
        archive_path: &Path,
        stage: &Path,
    ) -> DepotResult<Vec<IntegrityRecord>> {
        let mut reader = archive::open_archive(archive_path)?;
        let mut records = Vec::new();

        reader.for_each_entry(&mut |entry, data| {
            let target = stage.join(&entry.path);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DepotError::io(format!("creating {}", parent.display()), e))?;
            }

            let mut file = std::fs::File::create(&target)
                .map_err(|e| DepotError::io(format!("creating {}", target.display()), e))?;
            let (sha256, size) = copy_hashing(data, &mut file).map_err(|e| {
                DepotError::io(format!("writing {}", target.display()), e)
            })?;

            if entry.executable {
                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    std::fs::set_permissions(&target, std::fs::Permissions::from_mode(0o755))
                        .map_err(|e| {
                            DepotError::io(format!("marking {} executable", target.display()), e)
                        })?;
                }
            }

            records.push(IntegrityRecord {
                path: entry.path.display().to_string(),
                sha256,
                size,
            });
            Ok(())
        })?;

        if records.is_empty() {
            return Err(DepotError::Install {
                package: pkg.unique_name(),
                reason: format!("archive {} contains no files", archive_path.display()),
            });
        }
        Ok(records)
    }

    fn write_markers(&self, stage: &Path, records: &[IntegrityRecord]) -> DepotResult<()> {
        let record = EntryRecord {
            installer: format!("pydepot {}", env!("CARGO_PKG_VERSION")),
            installed_at: Utc::now(),
            files: records.to_vec(),
        };
        let json = serde_json::to_string_pretty(&record)?;
        std::fs::write(stage.join(RECORD_FILE), json)
            .map_err(|e| DepotError::io("writing integrity record", e))?;
        std::fs::write(
            stage.join(INSTALLER_MARKER),
            concat!("pydepot ", env!("CARGO_PKG_VERSION"), "\n"),
        )
        .map_err(|e| DepotError::io("writing installer marker", e))?;
        Ok(())
    }

    /// Single atomic rename from staging into the final entry path
    fn publish(&self, pkg: &PackageDescriptor, mut stage: Staging) -> DepotResult<()> {
        let entry = self.layout.entry_dir(&pkg.name, &pkg.version);
        let parent = entry
            .parent()
            .ok_or_else(|| DepotError::Internal("cache entry has no parent".to_string()))?;
        std::fs::create_dir_all(parent)
            .map_err(|e| DepotError::io(format!("creating {}", parent.display()), e))?;

        if entry.exists() {
            debug!("{} published by a concurrent installer", pkg.unique_name());
            return Ok(());
        }

        match std::fs::rename(&stage.path, &entry) {
            Ok(()) => {
                stage.published = true;
                Ok(())
            }
            // Lost the race after the existence check
            Err(_) if entry.exists() => {
                debug!("{} published by a concurrent installer", pkg.unique_name());
                Ok(())
            }
            Err(e) => Err(DepotError::io(
                format!("publishing {} to {}", pkg.unique_name(), entry.display()),
                e,
            )),
        }
    }
}

/// Install every not-yet-cached package of a lockfile, in lockfile order.
///
/// A single acquisition or install failure aborts the whole run; ephemeral
/// archives are still cleaned up on that path.
pub async fn install_packages<A, F>(
    lockfile: &Lockfile,
    layout: &CacheLayout,
    acquirer: &A,
    mut observe: F,
) -> DepotResult<InstallReport>
where
    A: Acquire,
    F: FnMut(&PackageDescriptor, bool),
{
    let index = CacheIndex::scan(layout)?;
    let mut report = InstallReport::default();
    let installer = Installer::new(layout);

    for pkg in lockfile.packages() {
        if index.has_package(pkg) {
            info!("{} already in cache", pkg.unique_name());
            report.already_cached += 1;
            observe(pkg, true);
            continue;
        }

        let archive = acquirer.acquire(pkg).await?;
        info!("Installing {}", pkg.unique_name());
        installer.install(pkg, archive.path())?;
        report.installed += 1;
        observe(pkg, false);
        // `archive` drops here; ephemeral files are removed on every path
    }

    Ok(report)
}

fn copy_hashing<R, W>(reader: &mut R, writer: &mut W) -> std::io::Result<(String, u64)>
where
    R: Read + ?Sized,
    W: Write,
{
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    let mut size = 0u64;
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        writer.write_all(&buf[..n])?;
        hasher.update(&buf[..n]);
        size += n as u64;
    }
    Ok((hex::encode(hasher.finalize()), size))
}
