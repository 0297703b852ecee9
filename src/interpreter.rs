//! Target interpreter identity and distribution compatibility tags
//!
//! The cache is namespaced by an interpreter tag derived from the *declared*
//! target version (`cp312` for Python 3.12), never the host interpreter.
//! Compatibility tags are computed once per run from that version and a fixed
//! target-platform allow-list, so a cache can be built for a platform other
//! than the one building it.

use crate::error::{DepotError, DepotResult};
use std::fmt;

/// Platforms accepted for pre-built distributions on the serverless target.
pub const DEFAULT_PLATFORMS: &[&str] = &[
    "manylinux_2_17_x86_64",
    "manylinux2014_x86_64",
    "manylinux2010_x86_64",
    "manylinux1_x86_64",
];

/// Declared target interpreter version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterpreterVersion {
    pub major: u32,
    pub minor: u32,
}

impl InterpreterVersion {
    pub fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Parse "3.12" or "3.12.1" (the patch component is ignored)
    pub fn parse(s: &str) -> DepotResult<Self> {
        let mut parts = s.trim().split('.');
        let major = parts.next().and_then(|p| p.parse().ok());
        let minor = parts.next().and_then(|p| p.parse().ok());
        match (major, minor) {
            (Some(major), Some(minor)) => Ok(Self { major, minor }),
            _ => Err(DepotError::InterpreterVersion(s.to_string())),
        }
    }

    /// Cache namespace tag, e.g. `cp312`
    pub fn tag(&self) -> String {
        format!("cp{}{}", self.major, self.minor)
    }

    /// Version constraint recorded in lockfile root metadata, e.g. `3.12`
    pub fn constraint(&self) -> String {
        format!("{}.{}", self.major, self.minor)
    }
}

impl fmt::Display for InterpreterVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// One `interpreter-abi-platform` compatibility tag
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag {
    pub interpreter: String,
    pub abi: String,
    pub platform: String,
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.interpreter, self.abi, self.platform)
    }
}

/// Ordered compatibility tags for one target interpreter and platform set.
///
/// Index 0 is the most specific (best) tag. Computed once per run.
#[derive(Debug, Clone)]
pub struct CompatTags {
    version: InterpreterVersion,
    tags: Vec<Tag>,
}

impl CompatTags {
    /// Compute the tag list for a target version and platform allow-list.
    ///
    /// Priority order mirrors the usual interpreter tag expansion: exact
    /// CPython ABI first, then stable-ABI and ABI-less wheels, then the
    /// generic `py`-interpreter fallbacks ending in `py3-none-any`.
    pub fn for_target(version: InterpreterVersion, platforms: &[String]) -> Self {
        let interp = version.tag();
        let mut tags = Vec::new();

        for abi in [interp.as_str(), "abi3", "none"] {
            for platform in platforms {
                tags.push(Tag {
                    interpreter: interp.clone(),
                    abi: abi.to_string(),
                    platform: platform.clone(),
                });
            }
        }

        tags.push(Tag {
            interpreter: interp.clone(),
            abi: "none".to_string(),
            platform: "any".to_string(),
        });

        // Generic interpreter fallbacks: py312-none-any, py3-none-any,
        // then older minor versions in descending order.
        let mut generic = vec![
            format!("py{}{}", version.major, version.minor),
            format!("py{}", version.major),
        ];
        for minor in (0..version.minor).rev() {
            generic.push(format!("py{}{}", version.major, minor));
        }
        for interpreter in generic {
            tags.push(Tag {
                interpreter,
                abi: "none".to_string(),
                platform: "any".to_string(),
            });
        }

        Self { version, tags }
    }

    pub fn version(&self) -> InterpreterVersion {
        self.version
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    /// Priority of a distribution file name, lower is better.
    ///
    /// Wheel names carry dot-compressed tag sets
    /// (`name-ver-cp312-cp312-manylinux_2_17_x86_64.linux_x86_64.whl`); the
    /// best expansion wins. Source tarballs are always acceptable but rank
    /// below every matching wheel. `None` means incompatible.
    pub fn priority(&self, filename: &str) -> Option<usize> {
        if filename.ends_with(".tar.gz") || filename.ends_with(".tgz") {
            return Some(self.tags.len());
        }
        let triple = parse_wheel_tags(filename)?;
        let mut best: Option<usize> = None;
        for interp in triple.0.split('.') {
            for abi in triple.1.split('.') {
                for platform in triple.2.split('.') {
                    let found = self.tags.iter().position(|t| {
                        t.interpreter == interp && t.abi == abi && t.platform == platform
                    });
                    if let Some(idx) = found {
                        best = Some(best.map_or(idx, |b: usize| b.min(idx)));
                    }
                }
            }
        }
        best
    }
}

/// Extract the `(interpreter, abi, platform)` tag sets from a wheel filename.
///
/// Wheel names are `dist-version(-build)?-interp-abi-platform.whl`; the last
/// three dash-separated fields are the tags.
fn parse_wheel_tags(filename: &str) -> Option<(String, String, String)> {
    let stem = filename.strip_suffix(".whl")?;
    let mut fields: Vec<&str> = stem.rsplitn(4, '-').collect();
    if fields.len() < 4 {
        return None;
    }
    fields.reverse();
    // fields = [rest, interp, abi, platform]
    Some((
        fields[1].to_string(),
        fields[2].to_string(),
        fields[3].to_string(),
    ))
}
