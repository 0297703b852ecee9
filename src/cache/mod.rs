//! Shared cache layout and installed-package index
//!
//! The cache root is a shared, multi-writer filesystem area partitioned
//! first by interpreter tag:
//!
//! `<root>/<tag>/<name>/<version>/{lib,include,bin,data}/...`
//!
//! A completed directory at name/version depth is proof of installation; no
//! integrity re-validation happens on scan. Installers stage under the
//! dot-prefixed `<tag>/.stage/` area and publish with a single atomic
//! rename, and the scan skips dot-prefixed entries, so a partially
//! populated install is never reported present.

use crate::error::{DepotError, DepotResult};
use crate::interpreter::InterpreterVersion;
use crate::package::PackageDescriptor;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Subtrees of one cache entry, in the fixed scheme order
pub const ENTRY_SUBDIRS: &[&str] = &["lib", "include", "bin", "data"];

/// Path arithmetic for one interpreter's slice of the cache
#[derive(Debug, Clone)]
pub struct CacheLayout {
    root: PathBuf,
    tag: String,
}

impl CacheLayout {
    pub fn new(cache_root: impl Into<PathBuf>, version: InterpreterVersion) -> Self {
        Self {
            root: cache_root.into(),
            tag: version.tag(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// `<root>/<tag>`
    pub fn interpreter_dir(&self) -> PathBuf {
        self.root.join(&self.tag)
    }

    /// `<root>/<tag>/<name>/<version>`
    pub fn entry_dir(&self, name: &str, version: &str) -> PathBuf {
        self.interpreter_dir().join(name).join(version)
    }

    /// Module-code subtree of an entry, the path consumers prepend
    pub fn lib_dir(&self, name: &str, version: &str) -> PathBuf {
        self.entry_dir(name, version).join("lib")
    }

    /// Private staging area, skipped by scans
    pub fn staging_dir(&self) -> PathBuf {
        self.interpreter_dir().join(".stage")
    }

    /// Persistent download cache shared across interpreter tags
    pub fn downloads_dir(&self) -> PathBuf {
        self.root.join(".downloads")
    }
}

/// What is already installed for one interpreter identity
#[derive(Debug)]
pub struct CacheIndex {
    installed: HashSet<(String, String)>,
}

impl CacheIndex {
    /// Enumerate installed (name, version) pairs under the interpreter dir.
    ///
    /// Directory existence at the second level is the installation signal.
    /// Dot-prefixed entries (the staging area, download cache) are skipped.
    /// A missing interpreter dir is an empty cache, not an error.
    pub fn scan(layout: &CacheLayout) -> DepotResult<Self> {
        let mut installed = HashSet::new();
        let interp_dir = layout.interpreter_dir();

        let packages = match std::fs::read_dir(&interp_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self { installed });
            }
            Err(e) => {
                return Err(DepotError::io(
                    format!("scanning cache {}", interp_dir.display()),
                    e,
                ))
            }
        };

        for package in packages.flatten() {
            let name = package.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') || !package.path().is_dir() {
                continue;
            }
            let versions = match std::fs::read_dir(package.path()) {
                Ok(entries) => entries,
                Err(_) => continue,
            };
            for version in versions.flatten() {
                let ver = version.file_name().to_string_lossy().into_owned();
                if ver.starts_with('.') || !version.path().is_dir() {
                    continue;
                }
                installed.insert((name.clone(), ver));
            }
        }

        debug!(
            "Cache scan of {} found {} installed packages",
            interp_dir.display(),
            installed.len()
        );
        Ok(Self { installed })
    }

    pub fn has_package(&self, pkg: &PackageDescriptor) -> bool {
        self.installed
            .contains(&(pkg.name.clone(), pkg.version.clone()))
    }

    pub fn len(&self) -> usize {
        self.installed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.installed.is_empty()
    }
}
