use std::cell::Cell;
use std::collections::{BTreeMap, BTreeSet};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::error::ScanError;
use crate::models::Resolution;

/// Immutable listing of one directory, taken once and dropped after use.
#[derive(Debug, Clone)]
pub struct DirSnapshot {
    pub path: PathBuf,
    /// Immediate subdirectories as named on disk, sorted so traversal order
    /// is stable.
    pub dirs: BTreeSet<OsString>,
    /// Upper-cased file name → file name as it appears on disk.
    pub files: BTreeMap<String, OsString>,
}

impl DirSnapshot {
    /// List `path`. Symlinks are not followed and count as files.
    pub fn read(path: &Path) -> Result<Self, ScanError> {
        let read_dir_err = |source| ScanError::ReadDir {
            path: path.to_path_buf(),
            source,
        };

        let mut dirs = BTreeSet::new();
        let mut files = BTreeMap::new();
        for entry in std::fs::read_dir(path).map_err(read_dir_err)? {
            let entry = entry.map_err(read_dir_err)?;
            let file_type = entry.file_type().map_err(read_dir_err)?;
            let name = entry.file_name();
            if file_type.is_dir() {
                dirs.insert(name);
            } else {
                files.insert(name.to_string_lossy().to_uppercase(), name);
            }
        }

        Ok(DirSnapshot {
            path: path.to_path_buf(),
            dirs,
            files,
        })
    }
}

/// Decides whether a dependency subtree carries a license file.
///
/// A directory is licensed when it holds one of the configured license
/// files, or when it has at least one subdirectory and every subdirectory
/// is licensed. Recursion stops at the first unlicensed child.
pub struct Resolver {
    /// Upper-cased, in priority order.
    license_files: Vec<String>,
    visited: Cell<usize>,
    cancelled: Option<Arc<AtomicBool>>,
}

impl Resolver {
    pub fn new<I, S>(license_files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let license_files = license_files
            .into_iter()
            .map(|name| name.as_ref().trim().to_uppercase())
            .filter(|name| !name.is_empty())
            .collect();

        Self {
            license_files,
            visited: Cell::new(0),
            cancelled: None,
        }
    }

    /// Stop listing directories once `flag` is set. A cancelled walk
    /// resolves to [`ScanError::Cancelled`].
    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancelled = Some(flag);
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    /// Number of directories listed since this resolver was created.
    pub fn visited(&self) -> usize {
        self.visited.get()
    }

    /// Resolve `dir`, pushing every license file found onto `found`.
    pub fn resolve(&self, dir: &Path, found: &mut Vec<PathBuf>) -> Resolution {
        if self.is_cancelled() {
            return Resolution::Unreadable(ScanError::Cancelled);
        }
        let snapshot = match DirSnapshot::read(dir) {
            Ok(snapshot) => snapshot,
            Err(e) => return Resolution::Unreadable(e),
        };
        self.visited.set(self.visited.get() + 1);

        if let Some(file) = self.license_file(&snapshot) {
            debug!(path = %file.display(), "license file found");
            found.push(file);
            return Resolution::Licensed;
        }

        for sub in &snapshot.dirs {
            match self.resolve(&snapshot.path.join(sub), found) {
                Resolution::Licensed => {}
                other => return other,
            }
        }

        if snapshot.dirs.is_empty() {
            Resolution::Unlicensed
        } else {
            Resolution::Licensed
        }
    }

    /// Like [`Resolver::resolve`], with an unreadable subtree as an error.
    pub fn is_licensed(&self, dir: &Path, found: &mut Vec<PathBuf>) -> Result<bool, ScanError> {
        match self.resolve(dir, found) {
            Resolution::Unreadable(e) => Err(e),
            resolution => Ok(resolution.is_licensed()),
        }
    }

    fn license_file(&self, snapshot: &DirSnapshot) -> Option<PathBuf> {
        self.license_files
            .iter()
            .find_map(|name| snapshot.files.get(name))
            .map(|on_disk| snapshot.path.join(on_disk))
    }
}
