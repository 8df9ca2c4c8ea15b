use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::config::AnalyzerConfig;

/// One step of the candidate walk.
#[derive(Debug)]
pub enum WalkEntry {
    /// Regular file that passed the name filters.
    File(PathBuf),
    /// Hidden or ignored entry, symlink or other non-regular file.
    /// Directories are not descended into.
    Excluded(PathBuf),
    Error {
        path: PathBuf,
        error: walkdir::Error,
    },
}

pub struct FileScanner<'a> {
    config: &'a AnalyzerConfig,
}

impl<'a> FileScanner<'a> {
    pub fn new(config: &'a AnalyzerConfig) -> Self {
        Self { config }
    }

    /// Lazy, name-sorted walk under `root`. The root itself is never
    /// excluded, whatever its name.
    pub fn walk(&self, root: &Path) -> CandidateWalk<'a> {
        CandidateWalk {
            inner: WalkDir::new(root)
                .follow_links(false)
                .sort_by_file_name()
                .into_iter(),
            config: self.config,
            root: root.to_path_buf(),
        }
    }

    /// Every candidate file under `root`, in walk order.
    pub fn scan(&self, root: &Path) -> Vec<PathBuf> {
        self.walk(root)
            .filter_map(|entry| match entry {
                WalkEntry::File(path) => Some(path),
                _ => None,
            })
            .collect()
    }
}

pub struct CandidateWalk<'a> {
    inner: walkdir::IntoIter,
    config: &'a AnalyzerConfig,
    root: PathBuf,
}

impl Iterator for CandidateWalk<'_> {
    type Item = WalkEntry;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(error) => {
                    let path = error
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| self.root.clone());
                    return Some(WalkEntry::Error { path, error });
                }
            };
            if entry.depth() == 0 {
                continue;
            }

            let is_dir = entry.file_type().is_dir();
            let excluded = self
                .config
                .is_excluded_name(&entry.file_name().to_string_lossy(), is_dir);
            if excluded {
                if is_dir {
                    self.inner.skip_current_dir();
                }
                return Some(WalkEntry::Excluded(entry.into_path()));
            }
            if entry.file_type().is_file() {
                return Some(WalkEntry::File(entry.into_path()));
            }
            // symlinks are not followed; sockets and fifos are never source
            if !is_dir {
                return Some(WalkEntry::Excluded(entry.into_path()));
            }
        }
    }
}

/// `/` separated path of `path` under `root`, or the file name when `path`
/// is outside it.
pub fn relative_path(root: &Path, path: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(rel) if !rel.as_os_str().is_empty() => rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"),
        _ => path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
    }
}
