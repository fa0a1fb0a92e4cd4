//! Content sources - where the collector finds files

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Enumerates and reads the files below one content root.
///
/// Paths handed out and accepted are relative to the root.
pub trait ContentSource: Send + Sync {
    /// Human-readable root name used when reporting files
    fn label(&self) -> &str;

    /// Every file below the root, in any order.
    ///
    /// Fails only when the root itself cannot be listed; entries that cannot
    /// be visited are returned in [`Listing::unreadable`].
    fn list(&self) -> io::Result<Listing>;

    /// Full text of one file
    fn read(&self, relative: &Path) -> io::Result<String>;
}

/// Files found below a root, plus entries the walk could not visit
#[derive(Debug, Default)]
pub struct Listing {
    pub files: Vec<PathBuf>,
    pub unreadable: Vec<(PathBuf, io::Error)>,
}

impl Listing {
    pub fn from_files(files: Vec<PathBuf>) -> Self {
        Self {
            files,
            unreadable: Vec::new(),
        }
    }
}

/// Display form of a file: `<label>/<relative>` with `/` separators
pub fn display_path(label: &str, relative: &Path) -> String {
    let relative = slash_path(relative);
    if label.is_empty() {
        relative
    } else {
        format!("{}/{}", label.trim_end_matches('/'), relative)
    }
}

/// Relative path joined with `/` regardless of platform
pub fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// A directory on disk
#[derive(Debug, Clone)]
pub struct FsSource {
    root: PathBuf,
    label: String,
}

impl FsSource {
    pub fn new<P: AsRef<Path>>(root: P, label: impl Into<String>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            label: label.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn relative(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.root).unwrap_or(path).to_path_buf()
    }
}

impl ContentSource for FsSource {
    fn label(&self) -> &str {
        &self.label
    }

    fn list(&self) -> io::Result<Listing> {
        if !self.root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{:?} is not a directory", self.root),
            ));
        }

        let mut listing = Listing::default();
        let walker = WalkDir::new(&self.root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            // Hidden files and directories (.git, .DS_Store) are never content
            .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    // Dangling symlinks and unreadable directories only cost their own entry
                    let relative = e
                        .path()
                        .map(|p| self.relative(p))
                        .unwrap_or_default();
                    if relative.as_os_str().is_empty() {
                        return Err(io::Error::from(e));
                    }
                    tracing::warn!("Cannot read {:?}: {}", relative, e);
                    listing.unreadable.push((relative, io::Error::from(e)));
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = self.relative(entry.path());
            tracing::debug!("Discovered {:?}", relative);
            listing.files.push(relative);
        }

        Ok(listing)
    }

    fn read(&self, relative: &Path) -> io::Result<String> {
        fs::read_to_string(self.root.join(relative))
    }
}

/// Files held in memory, for tests and for content synthesized by callers
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    label: String,
    files: BTreeMap<PathBuf, String>,
}

impl MemorySource {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            files: BTreeMap::new(),
        }
    }

    /// Add (or replace) a file
    pub fn with_file(mut self, relative: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.insert(relative, content);
        self
    }

    pub fn insert(&mut self, relative: impl Into<PathBuf>, content: impl Into<String>) {
        self.files.insert(relative.into(), content.into());
    }
}

impl ContentSource for MemorySource {
    fn label(&self) -> &str {
        &self.label
    }

    fn list(&self) -> io::Result<Listing> {
        Ok(Listing::from_files(self.files.keys().cloned().collect()))
    }

    fn read(&self, relative: &Path) -> io::Result<String> {
        self.files.get(relative).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{:?} not found in {}", relative, self.label),
            )
        })
    }
}
