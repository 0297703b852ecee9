//! Package index metadata and artifact download
//!
//! Talks the index's per-release JSON endpoint, picks the best pre-built
//! distribution for the target compatibility tags, and downloads it into
//! the persistent download cache with digest verification.

use crate::error::{DepotError, DepotResult};
use crate::interpreter::CompatTags;
use crate::package::PackageDescriptor;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One downloadable file of a release, as reported by the index
#[derive(Debug, Clone, Deserialize)]
pub struct DistFile {
    pub filename: String,
    pub url: String,
    #[serde(default)]
    pub digests: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct ReleaseMeta {
    #[serde(default)]
    urls: Vec<DistFile>,
}

/// Pick the best-ranked compatible file, ties broken by index order
pub fn select_best<'a>(files: &'a [DistFile], tags: &CompatTags) -> Option<&'a DistFile> {
    files
        .iter()
        .filter_map(|f| tags.priority(&f.filename).map(|p| (p, f)))
        .min_by_key(|(p, _)| *p)
        .map(|(_, f)| f)
}

/// Resolve and download the best-matching distribution for a package.
///
/// Already-cached downloads are reused when their digest still matches.
pub fn download_release(
    pkg: &PackageDescriptor,
    index_url: &str,
    tags: &CompatTags,
    downloads_dir: &Path,
) -> DepotResult<PathBuf> {
    let meta_url = format!("{}/{}/{}/json", index_url, pkg.name, pkg.version);
    debug!("Fetching release metadata from {}", meta_url);

    let mut response = ureq::get(&meta_url).call().map_err(|e| DepotError::Download {
        url: meta_url.clone(),
        reason: e.to_string(),
    })?;
    let body = response
        .body_mut()
        .read_to_string()
        .map_err(|e| DepotError::Download {
            url: meta_url.clone(),
            reason: e.to_string(),
        })?;
    let meta: ReleaseMeta = serde_json::from_str(&body).map_err(|e| DepotError::Download {
        url: meta_url.clone(),
        reason: format!("invalid metadata: {}", e),
    })?;

    let file = select_best(&meta.urls, tags).ok_or_else(|| DepotError::NoCompatibleDist {
        package: pkg.unique_name(),
        tag: tags.version().tag(),
    })?;

    let dest = downloads_dir.join(&file.filename);
    let expected = file.digests.get("sha256").map(String::as_str);

    if dest.exists() {
        if let Some(expected) = expected {
            if file_sha256(&dest)? == expected {
                debug!("Reusing cached download {}", dest.display());
                return Ok(dest);
            }
            // Stale or truncated download, fetch again
        } else {
            return Ok(dest);
        }
    }

    info!("Downloading {}", file.url);
    download(&file.url, &dest)?;

    if let Some(expected) = expected {
        let actual = file_sha256(&dest)?;
        if actual != expected {
            let _ = std::fs::remove_file(&dest);
            return Err(DepotError::DigestMismatch {
                url: file.url.clone(),
                expected: expected.to_string(),
                actual,
            });
        }
    }
    Ok(dest)
}

/// Stream a URL to a destination file.
///
/// The body is staged under a dot-prefixed sibling name and renamed into
/// place once fully written, so an interrupted transfer never leaves a
/// truncated file at `dest` for later runs to reuse.
pub fn download(url: &str, dest: &Path) -> DepotResult<()> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| DepotError::io(format!("creating {}", parent.display()), e))?;
    }

    let mut response = ureq::get(url).call().map_err(|e| DepotError::Download {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    let staged = stage_path(dest);
    let mut file = std::fs::File::create(&staged)
        .map_err(|e| DepotError::io(format!("creating {}", staged.display()), e))?;
    let mut reader = response.body_mut().as_reader();
    if let Err(e) = std::io::copy(&mut reader, &mut file) {
        drop(file);
        let _ = std::fs::remove_file(&staged);
        return Err(DepotError::Download {
            url: url.to_string(),
            reason: e.to_string(),
        });
    }
    drop(file);
    std::fs::rename(&staged, dest)
        .map_err(|e| DepotError::io(format!("publishing {}", dest.display()), e))
}

/// Dot-prefixed sibling used to stage an in-flight download
fn stage_path(dest: &Path) -> PathBuf {
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "download".to_string());
    dest.with_file_name(format!(".{}.part", name))
}

fn file_sha256(path: &Path) -> DepotResult<String> {
    let mut file = std::fs::File::open(path)
        .map_err(|e| DepotError::io(format!("opening {}", path.display()), e))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file
            .read(&mut buf)
            .map_err(|e| DepotError::io(format!("hashing {}", path.display()), e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}
