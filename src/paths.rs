//! Cache path emission for consuming runtimes
//!
//! Pure data transformation from a lockfile to the ordered list of cache
//! library paths, plus the snippet a running process evaluates to prepend
//! them to its module search path. No check that the entries exist —
//! absence only surfaces when the emitted path is used.

use crate::cache::CacheLayout;
use crate::error::DepotResult;
use crate::lockfile::Lockfile;
use std::path::PathBuf;

/// One cache library path per package, in lockfile order
pub fn emit(lockfile: &Lockfile, layout: &CacheLayout) -> Vec<PathBuf> {
    lockfile
        .packages()
        .iter()
        .map(|pkg| layout.lib_dir(&pkg.name, &pkg.version))
        .collect()
}

/// Render the runtime fragment that puts `paths` ahead of every existing
/// module search path entry.
///
/// The path list is serialized as JSON, which doubles as a Python list
/// literal for plain string paths.
pub fn render(paths: &[PathBuf]) -> DepotResult<String> {
    let literals: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
    let list = serde_json::to_string(&literals)?;
    Ok(format!("import sys\nsys.path = {} + sys.path\n", list))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::InterpreterVersion;
    use crate::lockfile::RootPackage;
    use crate::package::PackageDescriptor;

    fn lockfile() -> Lockfile {
        let mut lockfile = Lockfile::new(RootPackage::new("3.12"));
        for (name, version) in [("alpha", "1.0"), ("beta", "2.0"), ("gamma", "3.0")] {
            lockfile
                .add_package(PackageDescriptor::registry(name, version))
                .unwrap();
        }
        lockfile
    }

    #[test]
    fn emit_preserves_lockfile_order() {
        let layout = CacheLayout::new("/mnt/efs", InterpreterVersion::new(3, 12));
        let paths = emit(&lockfile(), &layout);
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/mnt/efs/cp312/alpha/1.0/lib"),
                PathBuf::from("/mnt/efs/cp312/beta/2.0/lib"),
                PathBuf::from("/mnt/efs/cp312/gamma/3.0/lib"),
            ]
        );
    }

    #[test]
    fn render_prepends_before_existing_entries() {
        let layout = CacheLayout::new("/mnt/efs", InterpreterVersion::new(3, 12));
        let snippet = render(&emit(&lockfile(), &layout)).unwrap();
        assert_eq!(
            snippet,
            "import sys\nsys.path = [\"/mnt/efs/cp312/alpha/1.0/lib\",\
             \"/mnt/efs/cp312/beta/2.0/lib\",\"/mnt/efs/cp312/gamma/3.0/lib\"] + sys.path\n"
        );
    }

    #[test]
    fn render_empty_lockfile() {
        let snippet = render(&[]).unwrap();
        assert_eq!(snippet, "import sys\nsys.path = [] + sys.path\n");
    }
}
