//! Requirements-file parsing
//!
//! A frozen or plain requirements file seeds a lock operation when no
//! lockfile exists yet. `requirements.frozen.txt` is preferred over
//! `requirements.txt`; a project with neither declares no dependencies.

use crate::error::{DepotError, DepotResult};
use crate::package::normalize_name;
use std::path::Path;

pub const FROZEN_FILE: &str = "requirements.frozen.txt";
pub const PLAIN_FILE: &str = "requirements.txt";

/// Version constraint attached to one declared dependency
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// Exact pin: `name==1.2.3`
    Pinned(String),
    /// Any other specifier set, kept verbatim (e.g. `>=1.0,<2.0`)
    Range(String),
    /// Direct reference: `name @ https://...`
    Url(String),
    /// No specifier at all
    Any,
}

/// One declared dependency, as written in a requirements file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub name: String,
    pub extras: Vec<String>,
    pub constraint: Constraint,
}

/// Load declared dependencies from a project directory.
///
/// Preference order matches the lock pipeline: frozen file first, then the
/// plain requirements file, then an empty set.
pub fn load_project_deps(project_dir: &Path) -> DepotResult<Vec<Requirement>> {
    for candidate in [FROZEN_FILE, PLAIN_FILE] {
        let path = project_dir.join(candidate);
        if path.exists() {
            let content = std::fs::read_to_string(&path)
                .map_err(|e| DepotError::io(format!("reading {}", path.display()), e))?;
            return parse_requirements(&content);
        }
    }
    Ok(Vec::new())
}

/// Parse a requirements file body into a dependency list.
///
/// Comment lines, blank lines, and pip option lines (`-r`, `--hash`, ...)
/// are skipped; environment markers after `;` are ignored.
pub fn parse_requirements(content: &str) -> DepotResult<Vec<Requirement>> {
    let mut reqs = Vec::new();
    for raw in content.lines() {
        let line = strip_comment(raw).trim();
        if line.is_empty() || line.starts_with('-') {
            continue;
        }
        reqs.push(parse_requirement(line)?);
    }
    Ok(reqs)
}

/// Parse one requirement line (comments already stripped)
pub fn parse_requirement(line: &str) -> DepotResult<Requirement> {
    // Environment markers do not affect resolution for a fixed target
    let spec = line.split(';').next().unwrap_or("").trim();

    if let Some((name_part, url)) = spec.split_once('@') {
        let (name, extras) = parse_name_extras(name_part.trim(), line)?;
        let url = url.trim();
        if url.is_empty() {
            return Err(DepotError::RequirementInvalid {
                line: line.to_string(),
                reason: "empty URL after '@'".to_string(),
            });
        }
        return Ok(Requirement {
            name,
            extras,
            constraint: Constraint::Url(url.to_string()),
        });
    }

    let op_start = spec.find(['=', '<', '>', '~', '!']);
    let (name_part, spec_part) = match op_start {
        Some(idx) => (&spec[..idx], &spec[idx..]),
        None => (spec, ""),
    };

    let (name, extras) = parse_name_extras(name_part.trim(), line)?;
    let constraint = parse_specifiers(spec_part, line)?;

    Ok(Requirement {
        name,
        extras,
        constraint,
    })
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

fn parse_name_extras(part: &str, line: &str) -> DepotResult<(String, Vec<String>)> {
    let (name, extras) = match part.split_once('[') {
        Some((name, rest)) => {
            let inner = rest.strip_suffix(']').ok_or_else(|| DepotError::RequirementInvalid {
                line: line.to_string(),
                reason: "unterminated extras bracket".to_string(),
            })?;
            let extras = inner
                .split(',')
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty())
                .collect();
            (name, extras)
        }
        None => (part, Vec::new()),
    };

    let name = normalize_name(name);
    if name.is_empty() {
        return Err(DepotError::RequirementInvalid {
            line: line.to_string(),
            reason: "missing package name".to_string(),
        });
    }
    Ok((name, extras))
}

fn parse_specifiers(spec: &str, line: &str) -> DepotResult<Constraint> {
    let spec = spec.trim();
    if spec.is_empty() {
        return Ok(Constraint::Any);
    }

    let clauses: Vec<&str> = spec.split(',').map(str::trim).collect();
    if clauses.len() == 1 {
        let clause = clauses[0];
        // `===` is an arbitrary-equality pin; treat like `==`
        for prefix in ["===", "=="] {
            if let Some(version) = clause.strip_prefix(prefix) {
                let version = version.trim();
                if version.is_empty() {
                    return Err(DepotError::RequirementInvalid {
                        line: line.to_string(),
                        reason: "empty version after '=='".to_string(),
                    });
                }
                return Ok(Constraint::Pinned(version.to_string()));
            }
        }
    }
    Ok(Constraint::Range(clauses.join(",")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parse_pinned() {
        let req = parse_requirement("numpy==1.26.4").unwrap();
        assert_eq!(req.name, "numpy");
        assert_eq!(req.constraint, Constraint::Pinned("1.26.4".to_string()));
        assert!(req.extras.is_empty());
    }

    #[test]
    fn parse_pinned_with_extras() {
        let req = parse_requirement("requests[socks, security]==2.31.0").unwrap();
        assert_eq!(req.name, "requests");
        assert_eq!(req.extras, vec!["socks", "security"]);
        assert_eq!(req.constraint, Constraint::Pinned("2.31.0".to_string()));
    }

    #[test]
    fn parse_range() {
        let req = parse_requirement("boto3>=1.28,<2.0").unwrap();
        assert_eq!(req.constraint, Constraint::Range(">=1.28,<2.0".to_string()));
    }

    #[test]
    fn parse_bare_name() {
        let req = parse_requirement("flask").unwrap();
        assert_eq!(req.constraint, Constraint::Any);
    }

    #[test]
    fn parse_url_reference() {
        let req = parse_requirement("mytool @ https://example.com/mytool-1.0.tar.gz").unwrap();
        assert_eq!(req.name, "mytool");
        assert_eq!(
            req.constraint,
            Constraint::Url("https://example.com/mytool-1.0.tar.gz".to_string())
        );
    }

    #[test]
    fn parse_ignores_marker() {
        let req = parse_requirement("colorama==0.4.6; sys_platform == \"win32\"").unwrap();
        assert_eq!(req.name, "colorama");
        assert_eq!(req.constraint, Constraint::Pinned("0.4.6".to_string()));
    }

    #[test]
    fn parse_normalizes_name() {
        let req = parse_requirement("Zope_Interface==6.0").unwrap();
        assert_eq!(req.name, "zope-interface");
    }

    #[test]
    fn parse_file_skips_noise() {
        let body = "\
# build deps
numpy==1.26.4  # pinned for lambda
-r other.txt

requests==2.31.0
";
        let reqs = parse_requirements(body).unwrap();
        let names: Vec<&str> = reqs.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["numpy", "requests"]);
    }

    #[test]
    fn parse_rejects_unterminated_extras() {
        assert!(parse_requirement("requests[socks==2.31.0").is_err());
    }

    #[test]
    fn parse_rejects_empty_pin() {
        assert!(parse_requirement("numpy==").is_err());
    }

    #[test]
    fn frozen_preferred_over_plain() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(PLAIN_FILE), "numpy>=1.0\n").unwrap();
        std::fs::write(dir.path().join(FROZEN_FILE), "numpy==1.26.4\n").unwrap();

        let reqs = load_project_deps(dir.path()).unwrap();
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].constraint, Constraint::Pinned("1.26.4".to_string()));
    }

    #[test]
    fn no_requirements_file_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(load_project_deps(dir.path()).unwrap().is_empty());
    }
}
