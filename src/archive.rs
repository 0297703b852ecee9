//! Archive reading and packing
//!
//! The installer consumes archives through the [`ArchiveReader`] seam. Two
//! readers are bundled: gzip-compressed tarballs (the format this tool
//! itself packs and accepts from file, URL and registry sources) and binary
//! wheels, whose zip entries are mapped onto the cache entry's
//! `lib`/`include`/`bin`/`data` layout. Entry paths are validated against
//! extraction-root escapes before the installer sees them.

use crate::error::{DepotError, DepotResult};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::Read;
use std::path::{Component, Path, PathBuf};

/// Metadata for one file inside an archive
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    /// Path relative to the extraction root
    pub path: PathBuf,
    /// Whether the archive marks the file executable
    pub executable: bool,
    /// Uncompressed size in bytes
    pub size: u64,
}

/// Streaming access to an archive's files
pub trait ArchiveReader {
    /// Visit every regular file in the archive, in archive order.
    ///
    /// The callback receives the entry metadata and a reader positioned at
    /// the start of that entry's content.
    fn for_each_entry(
        &mut self,
        visit: &mut dyn FnMut(&ArchiveEntry, &mut dyn Read) -> DepotResult<()>,
    ) -> DepotResult<()>;
}

impl std::fmt::Debug for dyn ArchiveReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ArchiveReader")
    }
}

/// Open an archive for installation, dispatching on the file extension
pub fn open_archive(path: &Path) -> DepotResult<Box<dyn ArchiveReader>> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        Ok(Box::new(TarGzArchive::open(path)?))
    } else if name.ends_with(".whl") {
        Ok(Box::new(WheelArchive::open(path)?))
    } else {
        Err(DepotError::UnsupportedArchive(path.to_path_buf()))
    }
}

/// Gzip-compressed tarball reader
pub struct TarGzArchive {
    path: PathBuf,
}

impl TarGzArchive {
    pub fn open(path: &Path) -> DepotResult<Self> {
        if !path.exists() {
            return Err(DepotError::PathNotFound(path.to_path_buf()));
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }
}

impl ArchiveReader for TarGzArchive {
    fn for_each_entry(
        &mut self,
        visit: &mut dyn FnMut(&ArchiveEntry, &mut dyn Read) -> DepotResult<()>,
    ) -> DepotResult<()> {
        let read_err = |e: std::io::Error| DepotError::ArchiveRead {
            path: self.path.clone(),
            reason: e.to_string(),
        };

        let file = File::open(&self.path).map_err(read_err)?;
        let mut archive = tar::Archive::new(GzDecoder::new(file));

        for entry in archive.entries().map_err(read_err)? {
            let mut entry = entry.map_err(read_err)?;
            if !entry.header().entry_type().is_file() {
                continue;
            }

            let raw_path = entry.path().map_err(read_err)?.into_owned();
            let path = sanitize_entry_path(&raw_path)?;
            let mode = entry.header().mode().unwrap_or(0o644);

            let meta = ArchiveEntry {
                path,
                executable: mode & 0o111 != 0,
                size: entry.size(),
            };
            visit(&meta, &mut entry)?;
        }
        Ok(())
    }
}

/// Binary wheel reader.
///
/// A wheel is a plain zip container. Top-level entries (package modules and
/// the `.dist-info` directory) install under `lib/`; entries under the
/// `<name>-<version>.data/` tree are routed by category the way the cache
/// entry is laid out: `scripts` to `bin`, `headers` to `include`, `data` to
/// `data`, and `purelib`/`platlib` back to `lib`. Entries of a category
/// with no cache counterpart are skipped.
pub struct WheelArchive {
    path: PathBuf,
}

impl WheelArchive {
    pub fn open(path: &Path) -> DepotResult<Self> {
        if !path.exists() {
            return Err(DepotError::PathNotFound(path.to_path_buf()));
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }
}

impl ArchiveReader for WheelArchive {
    fn for_each_entry(
        &mut self,
        visit: &mut dyn FnMut(&ArchiveEntry, &mut dyn Read) -> DepotResult<()>,
    ) -> DepotResult<()> {
        let read_err = |reason: String| DepotError::ArchiveRead {
            path: self.path.clone(),
            reason,
        };

        let file = File::open(&self.path).map_err(|e| read_err(e.to_string()))?;
        let mut archive = zip::ZipArchive::new(file).map_err(|e| read_err(e.to_string()))?;

        for index in 0..archive.len() {
            let mut entry = archive
                .by_index(index)
                .map_err(|e| read_err(e.to_string()))?;
            if entry.is_dir() {
                continue;
            }

            let raw_path = PathBuf::from(entry.name());
            let clean = sanitize_entry_path(&raw_path)?;
            let Some(path) = wheel_target_path(&clean) else {
                continue;
            };
            let mode = entry.unix_mode().unwrap_or(0o644);

            let meta = ArchiveEntry {
                path,
                executable: mode & 0o111 != 0,
                size: entry.size(),
            };
            visit(&meta, &mut entry)?;
        }
        Ok(())
    }
}

/// Map a sanitized wheel entry path onto the cache entry layout
fn wheel_target_path(clean: &Path) -> Option<PathBuf> {
    let mut components = clean.iter();
    let first = components.next()?;
    if !first.to_string_lossy().ends_with(".data") {
        return Some(Path::new("lib").join(clean));
    }

    let category = components.next()?;
    let rest: PathBuf = components.collect();
    if rest.as_os_str().is_empty() {
        return None;
    }
    let dir = match category.to_str()? {
        "scripts" => "bin",
        "headers" => "include",
        "data" => "data",
        "purelib" | "platlib" => "lib",
        _ => return None,
    };
    Some(Path::new(dir).join(rest))
}

/// Reject absolute paths and parent-directory traversal
fn sanitize_entry_path(path: &Path) -> DepotResult<PathBuf> {
    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            _ => {
                return Err(DepotError::ArchivePathEscape(
                    path.display().to_string(),
                ))
            }
        }
    }
    if clean.as_os_str().is_empty() {
        return Err(DepotError::ArchivePathEscape(path.display().to_string()));
    }
    Ok(clean)
}

/// Pack a directory tree into a gzip-compressed tarball.
///
/// Files land under `prefix/` inside the archive, sorted by path so the
/// same tree always packs to the same entry order. File modes are kept, so
/// executable bits survive the round trip.
pub fn pack_dir(src: &Path, dest: &Path, prefix: &str) -> DepotResult<()> {
    let file = File::create(dest)
        .map_err(|e| DepotError::io(format!("creating archive {}", dest.display()), e))?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);

    let mut files = Vec::new();
    collect_files(src, src, &mut files)?;
    files.sort();

    for rel in files {
        let full = src.join(&rel);
        let name = Path::new(prefix).join(&rel);
        builder
            .append_path_with_name(&full, &name)
            .map_err(|e| DepotError::io(format!("archiving {}", full.display()), e))?;
    }

    builder
        .into_inner()
        .and_then(|encoder| encoder.finish())
        .map_err(|e| DepotError::io(format!("finalizing archive {}", dest.display()), e))?;
    Ok(())
}

fn collect_files(root: &Path, dir: &Path, out: &mut Vec<PathBuf>) -> DepotResult<()> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| DepotError::io(format!("reading directory {}", dir.display()), e))?;
    for entry in entries {
        let entry = entry.map_err(|e| DepotError::io("reading directory entry", e))?;
        let path = entry.path();
        if path.is_dir() {
            collect_files(root, &path, out)?;
        } else {
            let rel = path
                .strip_prefix(root)
                .map_err(|_| DepotError::Internal("walk escaped its root".to_string()))?;
            out.push(rel.to_path_buf());
        }
    }
    Ok(())
}
