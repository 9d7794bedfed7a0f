//! Repository walker: enumerates content files under the root.
//!
//! The walk is lazy and sorted by file name. Excluded and dot-directories are
//! pruned. Symlinks are followed, with cycles reported as unreadable entries
//! instead of being traversed again.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::CheckError;

/// Kind of a walked file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// `.json` data file.
    Json,
    /// `.md` documentation file.
    Markdown,
    /// Anything else; only recorded in the path inventory.
    Other,
}

impl FileKind {
    fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("json") => FileKind::Json,
            Some("md") => FileKind::Markdown,
            _ => FileKind::Other,
        }
    }

    /// Returns true for JSON and Markdown files.
    pub fn is_candidate(self) -> bool {
        matches!(self, FileKind::Json | FileKind::Markdown)
    }
}

/// A file or directory found by the walker.
#[derive(Debug, Clone)]
pub struct ScannedFile {
    /// Absolute (or root-joined) path on disk.
    pub path: PathBuf,
    /// Path relative to the content root, with `/` separators.
    pub relative: String,
    /// Kind of file; directories are recorded as [`FileKind::Other`].
    pub kind: FileKind,
    /// True for directories.
    pub is_dir: bool,
}

/// One item produced by the walk.
#[derive(Debug, Clone)]
pub enum WalkEvent {
    /// A readable directory entry.
    Entry(ScannedFile),
    /// An entry that could not be visited (permissions, symlink cycle).
    Unreadable {
        /// Path relative to the content root.
        relative: String,
        /// Why the entry could not be visited.
        reason: String,
    },
}

/// Options controlling the walk.
#[derive(Debug, Clone, Default)]
pub struct WalkOptions {
    /// Directory names never descended into.
    pub excluded_dirs: Vec<String>,
    /// Files skipped entirely, e.g. the report output itself.
    pub skip_files: Vec<PathBuf>,
}

/// Lazy iterator over [`WalkEvent`]s.
pub struct Walk {
    root: PathBuf,
    skip_files: Vec<PathBuf>,
    inner: walkdir::FilterEntry<walkdir::IntoIter, Box<dyn FnMut(&walkdir::DirEntry) -> bool>>,
}

/// Starts a walk of `root`.
///
/// # Errors
///
/// Returns an error if `root` does not exist or is not a directory. Problems
/// with individual entries are yielded as [`WalkEvent::Unreadable`].
pub fn walk(root: &Path, options: &WalkOptions) -> Result<Walk, CheckError> {
    if !root.exists() {
        return Err(CheckError::RootNotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(CheckError::RootNotDirectory(root.to_path_buf()));
    }

    let excluded = options.excluded_dirs.clone();
    let keep: Box<dyn FnMut(&walkdir::DirEntry) -> bool> = Box::new(move |entry| {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return true;
        }
        let name = entry.file_name().to_string_lossy();
        !name.starts_with('.') && !excluded.iter().any(|x| *x == name)
    });

    let inner = WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(keep);

    Ok(Walk {
        root: root.to_path_buf(),
        skip_files: options.skip_files.clone(),
        inner,
    })
}

impl Walk {
    fn relative(&self, path: &Path) -> String {
        relative_path(&self.root, path)
    }

    fn is_skipped(&self, path: &Path) -> bool {
        self.skip_files.iter().any(|skip| same_file(skip, path))
    }
}

impl Iterator for Walk {
    type Item = WalkEvent;

    fn next(&mut self) -> Option<WalkEvent> {
        loop {
            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(err) => {
                    let relative = err
                        .path()
                        .map(|p| self.relative(p))
                        .unwrap_or_default();
                    let reason = if err.loop_ancestor().is_some() {
                        "symlink cycle".to_string()
                    } else {
                        err.to_string()
                    };
                    return Some(WalkEvent::Unreadable { relative, reason });
                }
            };

            if entry.depth() == 0 {
                continue;
            }
            let path = entry.path();
            if self.is_skipped(path) {
                continue;
            }
            let is_dir = entry.file_type().is_dir();
            return Some(WalkEvent::Entry(ScannedFile {
                relative: self.relative(path),
                kind: if is_dir {
                    FileKind::Other
                } else {
                    FileKind::from_path(path)
                },
                path: path.to_path_buf(),
                is_dir,
            }));
        }
    }
}

/// Returns `path` relative to `root` with `/` separators.
pub fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
