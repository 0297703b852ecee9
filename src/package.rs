//! Resolved package descriptors and their acquisition sources

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Where a package's installable artifact comes from.
///
/// Each variant carries only the fields its acquisition strategy needs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PackageSource {
    /// Pre-built distribution from the package index (the default)
    Registry,
    /// Version-control checkout at a specific revision
    Vcs {
        url: String,
        reference: String,
        /// Editable/development mode: the built archive is discarded after
        /// install instead of being kept in the download cache.
        #[serde(default)]
        editable: bool,
    },
    /// Archive already present on the local filesystem
    LocalFile { path: PathBuf },
    /// Local directory tree packed into an archive at acquisition time
    LocalDirectory { path: PathBuf },
    /// Archive fetched from an arbitrary URL
    RemoteUrl { url: String },
}

impl PackageSource {
    /// Short label used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Registry => "registry",
            Self::Vcs { .. } => "vcs",
            Self::LocalFile { .. } => "file",
            Self::LocalDirectory { .. } => "directory",
            Self::RemoteUrl { .. } => "url",
        }
    }
}

impl Default for PackageSource {
    fn default() -> Self {
        Self::Registry
    }
}

/// One fully resolved package. Immutable once produced by the resolver.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackageDescriptor {
    /// Normalized package name (lowercase, runs of `-_.` collapsed to `-`)
    pub name: String,
    /// Exact version string (opaque; the version scheme is not semver)
    pub version: String,
    /// Requested extras, if any
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extras: Vec<String>,
    #[serde(default, skip_serializing_if = "is_registry")]
    pub source: PackageSource,
}

fn is_registry(source: &PackageSource) -> bool {
    matches!(source, PackageSource::Registry)
}

impl PackageDescriptor {
    pub fn registry(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: normalize_name(&name.into()),
            version: version.into(),
            source: PackageSource::Registry,
            extras: Vec::new(),
        }
    }

    pub fn with_source(mut self, source: PackageSource) -> Self {
        self.source = source;
        self
    }

    pub fn with_extras(mut self, extras: Vec<String>) -> Self {
        self.extras = extras;
        self
    }

    /// `name-version`, the identity used in logs and cache scans
    pub fn unique_name(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }
}

impl fmt::Display for PackageDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.name, self.version)
    }
}

/// PEP 503 name normalization: lowercase, runs of `-`, `_`, `.` become `-`
pub fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut prev_sep = false;
    for ch in name.trim().chars() {
        if ch == '-' || ch == '_' || ch == '.' {
            if !prev_sep && !out.is_empty() {
                out.push('-');
            }
            prev_sep = true;
        } else {
            out.push(ch.to_ascii_lowercase());
            prev_sep = false;
        }
    }
    if out.ends_with('-') {
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_lowercases() {
        assert_eq!(normalize_name("Flask"), "flask");
    }

    #[test]
    fn normalize_collapses_separator_runs() {
        assert_eq!(normalize_name("friendly.-.Bard"), "friendly-bard");
        assert_eq!(normalize_name("zope__interface"), "zope-interface");
        assert_eq!(normalize_name("ruamel.yaml"), "ruamel-yaml");
    }

    #[test]
    fn normalize_trims_edges() {
        assert_eq!(normalize_name("  requests "), "requests");
        assert_eq!(normalize_name("name-"), "name");
    }

    #[test]
    fn unique_name() {
        let pkg = PackageDescriptor::registry("NumPy", "1.26.4");
        assert_eq!(pkg.unique_name(), "numpy-1.26.4");
        assert_eq!(pkg.to_string(), "numpy-1.26.4");
    }

    #[test]
    fn source_kind_labels() {
        assert_eq!(PackageSource::Registry.kind(), "registry");
        assert_eq!(
            PackageSource::LocalFile {
                path: PathBuf::from("/tmp/x.tar.gz")
            }
            .kind(),
            "file"
        );
    }

    #[test]
    fn source_serde_tagged() {
        let src = PackageSource::Vcs {
            url: "https://example.com/repo.git".to_string(),
            reference: "v1.0".to_string(),
            editable: true,
        };
        let json = serde_json::to_string(&src).unwrap();
        assert!(json.contains("\"type\":\"vcs\""));
        let back: PackageSource = serde_json::from_str(&json).unwrap();
        assert_eq!(back, src);
    }

    #[test]
    fn registry_source_omitted_in_serialization() {
        let pkg = PackageDescriptor::registry("numpy", "1.26.4");
        let toml = toml::to_string(&pkg).unwrap();
        assert!(!toml.contains("source"));
    }
}
