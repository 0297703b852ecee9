//! Resolver boundary
//!
//! Version-constraint solving is delegated: anything implementing
//! [`Resolver`] can stand behind this seam. Resolution context travels by
//! value in [`ResolverConfig`] — there is no ambient solver session. The
//! bundled [`PinnedResolver`] covers the fully-pinned requirement sets the
//! platform actually ships; general constraint solving over a package
//! universe belongs to an external solver plugged into the same trait.

use crate::error::{DepotError, DepotResult};
use crate::interpreter::InterpreterVersion;
use crate::lockfile::RootPackage;
use crate::package::{PackageDescriptor, PackageSource};
use crate::requirements::{Constraint, Requirement};
use async_trait::async_trait;
use std::path::PathBuf;

/// Context passed by value into a resolve call
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Project root for resolving relative source paths
    pub project_root: PathBuf,
    /// Target interpreter the resolution is for
    pub interpreter: InterpreterVersion,
    /// Package index base URL
    pub index_url: String,
}

/// One operation in a resolver's install plan.
///
/// This pipeline only materializes fresh cache entries, so anything other
/// than `Install` is rejected as an unexpected state by [`expect_installs`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Install(PackageDescriptor),
    Update(PackageDescriptor),
    Remove(PackageDescriptor),
}

impl Operation {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Install(_) => "install",
            Self::Update(_) => "update",
            Self::Remove(_) => "remove",
        }
    }

    pub fn package(&self) -> &PackageDescriptor {
        match self {
            Self::Install(p) | Self::Update(p) | Self::Remove(p) => p,
        }
    }
}

/// A resolved graph: root metadata plus the ordered install plan
#[derive(Debug, Clone)]
pub struct Resolution {
    pub root: RootPackage,
    pub operations: Vec<Operation>,
}

/// Pluggable dependency resolver
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(
        &self,
        deps: &[Requirement],
        config: &ResolverConfig,
    ) -> DepotResult<Resolution>;
}

/// Reject any operation kind other than install, in plan order
pub fn expect_installs(operations: Vec<Operation>) -> DepotResult<Vec<PackageDescriptor>> {
    operations
        .into_iter()
        .map(|op| match op {
            Operation::Install(pkg) => Ok(pkg),
            other => Err(DepotError::UnsupportedOperation {
                kind: other.kind().to_string(),
                package: other.package().unique_name(),
            }),
        })
        .collect()
}

/// Resolver for fully-pinned requirement sets.
///
/// Maps `name==version` to a registry install and `name @ url` to a
/// remote-URL install; anything that would need constraint solving is an
/// error pointing at the external-resolver seam.
pub struct PinnedResolver;

#[async_trait]
impl Resolver for PinnedResolver {
    async fn resolve(
        &self,
        deps: &[Requirement],
        config: &ResolverConfig,
    ) -> DepotResult<Resolution> {
        let root = RootPackage::new(config.interpreter.constraint());
        let mut operations = Vec::with_capacity(deps.len());

        for req in deps {
            let pkg = match &req.constraint {
                Constraint::Pinned(version) => {
                    PackageDescriptor::registry(&req.name, version.clone())
                        .with_extras(req.extras.clone())
                }
                Constraint::Url(url) => {
                    let version = version_from_archive_url(&req.name, url)?;
                    PackageDescriptor::registry(&req.name, version)
                        .with_extras(req.extras.clone())
                        .with_source(PackageSource::RemoteUrl { url: url.clone() })
                }
                Constraint::Range(spec) => {
                    return Err(DepotError::UnpinnedRequirement {
                        name: req.name.clone(),
                        constraint: spec.clone(),
                    })
                }
                Constraint::Any => {
                    return Err(DepotError::UnpinnedRequirement {
                        name: req.name.clone(),
                        constraint: "*".to_string(),
                    })
                }
            };
            operations.push(Operation::Install(pkg));
        }

        Ok(Resolution { root, operations })
    }
}

/// Derive the version from a direct-reference archive URL.
///
/// Expects the final path segment to be `<name>-<version>.tar.gz` (any
/// archive extension); the name prefix is matched after normalization.
fn version_from_archive_url(name: &str, url: &str) -> DepotResult<String> {
    let filename = url
        .rsplit('/')
        .next()
        .unwrap_or("")
        .split(['?', '#'])
        .next()
        .unwrap_or("");
    let stem = filename
        .strip_suffix(".tar.gz")
        .or_else(|| filename.strip_suffix(".tgz"))
        .or_else(|| filename.strip_suffix(".whl"))
        .or_else(|| filename.strip_suffix(".zip"));

    // Find the name/version boundary: the first '-' whose left side
    // normalizes to the package name. The version itself keeps its dots.
    let version = stem.and_then(|s| {
        s.match_indices('-').find_map(|(i, _)| {
            if crate::package::normalize_name(&s[..i]) == name {
                // Wheel stems carry tags after the version; keep the first field
                let rest = &s[i + 1..];
                Some(rest.split('-').next().unwrap_or(rest).to_string())
            } else {
                None
            }
        })
    });

    version.filter(|v| !v.is_empty()).ok_or_else(|| {
        DepotError::RequirementInvalid {
            line: format!("{} @ {}", name, url),
            reason: "cannot derive a version from the archive name".to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ResolverConfig {
        ResolverConfig {
            project_root: PathBuf::from("."),
            interpreter: InterpreterVersion::new(3, 12),
            index_url: "https://pypi.org/pypi".to_string(),
        }
    }

    fn pinned(name: &str, version: &str) -> Requirement {
        Requirement {
            name: name.to_string(),
            extras: Vec::new(),
            constraint: Constraint::Pinned(version.to_string()),
        }
    }

    #[tokio::test]
    async fn pinned_requirements_become_installs() {
        let deps = vec![pinned("numpy", "1.26.4"), pinned("requests", "2.31.0")];
        let resolution = PinnedResolver.resolve(&deps, &config()).await.unwrap();

        assert_eq!(resolution.root.python, "3.12");
        let pkgs = expect_installs(resolution.operations).unwrap();
        assert_eq!(pkgs.len(), 2);
        assert_eq!(pkgs[0].unique_name(), "numpy-1.26.4");
        assert_eq!(pkgs[1].source, PackageSource::Registry);
    }

    #[tokio::test]
    async fn url_requirement_becomes_remote_url_install() {
        let deps = vec![Requirement {
            name: "mytool".to_string(),
            extras: Vec::new(),
            constraint: Constraint::Url("https://example.com/dl/mytool-0.3.1.tar.gz".to_string()),
        }];
        let resolution = PinnedResolver.resolve(&deps, &config()).await.unwrap();
        let pkgs = expect_installs(resolution.operations).unwrap();

        assert_eq!(pkgs[0].version, "0.3.1");
        assert!(matches!(pkgs[0].source, PackageSource::RemoteUrl { .. }));
    }

    #[tokio::test]
    async fn range_requirement_rejected() {
        let deps = vec![Requirement {
            name: "boto3".to_string(),
            extras: Vec::new(),
            constraint: Constraint::Range(">=1.28".to_string()),
        }];
        let err = PinnedResolver.resolve(&deps, &config()).await.unwrap_err();
        assert!(matches!(err, DepotError::UnpinnedRequirement { .. }));
    }

    #[test]
    fn non_install_operation_rejected() {
        let ops = vec![
            Operation::Install(PackageDescriptor::registry("a", "1")),
            Operation::Remove(PackageDescriptor::registry("b", "2")),
        ];
        let err = expect_installs(ops).unwrap_err();
        assert!(matches!(
            err,
            DepotError::UnsupportedOperation { ref kind, .. } if kind == "remove"
        ));
    }

    #[test]
    fn version_from_url_variants() {
        assert_eq!(
            version_from_archive_url("mytool", "https://x/mytool-1.2.3.tar.gz").unwrap(),
            "1.2.3"
        );
        assert_eq!(
            version_from_archive_url("my-tool", "https://x/my_tool-0.9.tgz").unwrap(),
            "0.9"
        );
        assert!(version_from_archive_url("other", "https://x/mytool-1.2.3.tar.gz").is_err());
        assert!(version_from_archive_url("mytool", "https://x/mytool.tar.gz").is_err());
    }
}
