//! Lockfile model and persistence
//!
//! A lockfile is the fully-resolved dependency graph: root metadata (target
//! interpreter constraint) plus an ordered, name-unique package set. It is
//! persisted as TOML to a durable path, or — when no destination is given —
//! staged through a temporary file and echoed to stdout so callers can pipe
//! it onward (the temp file is discarded afterwards).

use crate::error::{DepotError, DepotResult};
use crate::package::PackageDescriptor;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::io::AsyncReadExt;

/// Root metadata recorded alongside the resolved package set
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RootPackage {
    pub name: String,
    pub version: String,
    /// Target interpreter version constraint, e.g. `3.12`
    pub python: String,
}

impl RootPackage {
    pub fn new(python: impl Into<String>) -> Self {
        Self {
            name: "root".to_string(),
            version: "0".to_string(),
            python: python.into(),
        }
    }
}

/// A pinned dependency graph: root metadata plus ordered packages
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Lockfile {
    pub root: RootPackage,
    #[serde(default, rename = "package")]
    packages: Vec<PackageDescriptor>,
}

impl Lockfile {
    pub fn new(root: RootPackage) -> Self {
        Self {
            root,
            packages: Vec::new(),
        }
    }

    /// Append a package, enforcing name uniqueness
    pub fn add_package(&mut self, package: PackageDescriptor) -> DepotResult<()> {
        if self.has_package(&package.name) {
            return Err(DepotError::DuplicatePackage(package.name));
        }
        self.packages.push(package);
        Ok(())
    }

    pub fn has_package(&self, name: &str) -> bool {
        self.packages.iter().any(|p| p.name == name)
    }

    /// Packages in lockfile order
    pub fn packages(&self) -> &[PackageDescriptor] {
        &self.packages
    }

    fn validate(&self) -> DepotResult<()> {
        for (i, pkg) in self.packages.iter().enumerate() {
            if self.packages[..i].iter().any(|p| p.name == pkg.name) {
                return Err(DepotError::DuplicatePackage(pkg.name.clone()));
            }
        }
        Ok(())
    }

    fn parse(content: &str, origin: &str) -> DepotResult<Self> {
        let lockfile: Lockfile =
            toml::from_str(content).map_err(|e| DepotError::LockfileParse {
                path: origin.to_string(),
                reason: e.to_string(),
            })?;
        lockfile.validate()?;
        Ok(lockfile)
    }

    fn to_toml(&self) -> DepotResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Reads and writes lockfiles from a durable path or a transient stream
pub struct LockStore;

impl LockStore {
    /// Load a lockfile. With no path, the entire stream on stdin is consumed.
    pub async fn load(path: Option<&Path>) -> DepotResult<Lockfile> {
        match path {
            Some(path) => {
                let content = tokio::fs::read_to_string(path).await.map_err(|e| {
                    DepotError::LockfileRead {
                        path: path.display().to_string(),
                        reason: e.to_string(),
                    }
                })?;
                Lockfile::parse(&content, &path.display().to_string())
            }
            None => {
                let mut content = String::new();
                tokio::io::stdin()
                    .read_to_string(&mut content)
                    .await
                    .map_err(|e| DepotError::io("reading lockfile from stdin", e))?;
                Lockfile::parse(&content, "<stdin>")
            }
        }
    }

    /// Persist a lockfile. With no path, the serialized graph is staged in a
    /// temporary file whose content is echoed to stdout before discarding.
    pub async fn persist(lockfile: &Lockfile, path: Option<&Path>) -> DepotResult<()> {
        let content = lockfile.to_toml()?;
        match path {
            Some(path) => {
                tokio::fs::write(path, &content).await.map_err(|e| {
                    DepotError::io(format!("writing lockfile to {}", path.display()), e)
                })?;
            }
            None => {
                let tmp = tempfile::NamedTempFile::new()
                    .map_err(|e| DepotError::io("creating transient lockfile", e))?;
                std::fs::write(tmp.path(), &content)
                    .map_err(|e| DepotError::io("writing transient lockfile", e))?;
                let echoed = std::fs::read_to_string(tmp.path())
                    .map_err(|e| DepotError::io("reading transient lockfile", e))?;
                print!("{}", echoed);
            }
        }
        Ok(())
    }
}
