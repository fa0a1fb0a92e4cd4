//! Collection builder - walks content roots and parses every Markdown file

use anyhow::{anyhow, Result};
use chrono_tz::Tz;
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::item::{normalize_path, page_path, post_path};
use super::source::{display_path, slash_path, ContentSource};
use super::{ContentItem, FrontMatter, ItemKind};
use crate::build::CancelToken;
use crate::config::SiteConfig;
use crate::error::{BuildError, ContentError};

/// A per-file failure, reported but never fatal on its own
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileError {
    pub source: String,
    pub error: ContentError,
}

/// Every successfully parsed item of one build, in traversal order
#[derive(Debug, Clone, Default)]
pub struct Collection {
    items: Vec<ContentItem>,
    by_path: HashMap<String, usize>,
}

impl Collection {
    pub fn items(&self) -> &[ContentItem] {
        &self.items
    }

    pub fn get(&self, path: &str) -> Option<&ContentItem> {
        self.by_path.get(path).map(|&i| &self.items[i])
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_items(self) -> Vec<ContentItem> {
        self.items
    }
}

/// Result of a collection pass that ran to completion
#[derive(Debug)]
pub struct Collected {
    pub collection: Collection,
    pub errors: Vec<FileError>,
}

/// A collection pass that stopped without producing a collection.
/// Per-file errors found before the stop are kept for reporting.
#[derive(Debug, thiserror::Error)]
#[error("{fatal}")]
pub struct CollectError {
    pub fatal: BuildError,
    pub file_errors: Vec<FileError>,
}

/// Where a file sits below its root
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Location {
    Posts,
    Drafts,
    Pages,
}

/// Loads content items from one or more sources
pub struct Collector {
    posts_dir: PathBuf,
    drafts_dir: PathBuf,
    permalink: String,
    extensions: Vec<String>,
    exclude: Vec<glob::Pattern>,
    tz: Tz,
    cancel: CancelToken,
}

impl Collector {
    /// Create a collector from site configuration
    pub fn new(config: &SiteConfig, cancel: CancelToken) -> Result<Self> {
        let exclude = config
            .exclude
            .iter()
            .map(|p| {
                glob::Pattern::new(p).map_err(|e| anyhow!("Invalid exclude pattern {:?}: {}", p, e))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            posts_dir: PathBuf::from(&config.posts_dir),
            drafts_dir: PathBuf::from(&config.drafts_dir),
            permalink: config.permalink.clone(),
            extensions: config.markdown_extensions.clone(),
            exclude,
            tz: config.time_zone()?,
            cancel,
        })
    }

    /// Parse every eligible file of every source.
    ///
    /// Files are parsed in parallel; results are joined on the calling
    /// thread in traversal order (sources in the given order, files sorted by
    /// path within each source).
    pub fn collect(&self, sources: &[Box<dyn ContentSource>]) -> Result<Collected, CollectError> {
        let (files, mut errors) = self.discover(sources).map_err(|fatal| CollectError {
            fatal,
            file_errors: Vec::new(),
        })?;
        tracing::info!("Found {} content files", files.len());

        let results: Vec<Option<Result<ContentItem, FileError>>> = files
            .par_iter()
            .map(|(index, relative)| {
                if self.cancel.is_cancelled() {
                    return None;
                }
                Some(self.load(sources[*index].as_ref(), relative))
            })
            .collect();

        if self.cancel.is_cancelled() {
            return Err(CollectError {
                fatal: BuildError::Cancelled,
                file_errors: Vec::new(),
            });
        }

        let mut collection = Collection::default();

        for result in results.into_iter().flatten() {
            match result {
                Ok(item) => {
                    if let Some(&existing) = collection.by_path.get(item.path()) {
                        let first = collection.items[existing].source().to_string();
                        return Err(CollectError {
                            fatal: BuildError::DuplicatePath {
                                path: item.path().to_string(),
                                first,
                                second: item.source().to_string(),
                            },
                            file_errors: sorted(errors),
                        });
                    }
                    collection
                        .by_path
                        .insert(item.path().to_string(), collection.items.len());
                    collection.items.push(item);
                }
                Err(e) => {
                    tracing::warn!("Failed to load {}: {}", e.source, e.error);
                    errors.push(e);
                }
            }
        }

        tracing::info!(
            "Collected {} items ({} files failed)",
            collection.len(),
            errors.len()
        );

        Ok(Collected {
            collection,
            errors: sorted(errors),
        })
    }

    /// List eligible files as (source index, relative path), deterministically.
    /// Entries the walk could not visit come back as per-file errors.
    fn discover(
        &self,
        sources: &[Box<dyn ContentSource>],
    ) -> Result<(Vec<(usize, PathBuf)>, Vec<FileError>), BuildError> {
        let mut files = Vec::new();
        let mut errors = Vec::new();

        for (index, source) in sources.iter().enumerate() {
            let listing = source.list().map_err(|e| BuildError::Source {
                root: source.label().to_string(),
                message: e.to_string(),
            })?;

            for (relative, e) in listing.unreadable {
                if self.is_excluded(&relative) {
                    continue;
                }
                errors.push(FileError {
                    source: display_path(source.label(), &relative),
                    error: ContentError::Unreadable(e.to_string()),
                });
            }

            let mut listed: Vec<(String, PathBuf)> = listing
                .files
                .into_iter()
                .filter(|p| self.is_eligible(p))
                .map(|p| (slash_path(&p), p))
                .collect();

            // Traversal order from the OS is not reliable
            listed.sort();
            files.extend(listed.into_iter().map(|(_, p)| (index, p)));
        }

        Ok((files, errors))
    }

    fn is_eligible(&self, relative: &Path) -> bool {
        let is_markdown = relative
            .extension()
            .and_then(|e| e.to_str())
            .map(|ext| {
                self.extensions
                    .iter()
                    .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false);
        is_markdown && !self.is_excluded(relative)
    }

    fn is_excluded(&self, relative: &Path) -> bool {
        let slashed = slash_path(relative);
        self.exclude.iter().any(|p| p.matches(&slashed))
    }

    fn locate<'p>(&self, relative: &'p Path) -> (Location, &'p Path) {
        if let Ok(rest) = relative.strip_prefix(&self.posts_dir) {
            return (Location::Posts, rest);
        }
        if let Ok(rest) = relative.strip_prefix(&self.drafts_dir) {
            return (Location::Drafts, rest);
        }
        (Location::Pages, relative)
    }

    /// Load a single item from a file
    fn load(&self, source: &dyn ContentSource, relative: &Path) -> Result<ContentItem, FileError> {
        let shown = display_path(source.label(), relative);
        let fail = |error: ContentError| FileError {
            source: shown.clone(),
            error,
        };

        let content = source
            .read(relative)
            .map_err(|e| fail(ContentError::Unreadable(e.to_string())))?;
        let (fm, body) = FrontMatter::parse(&content, self.tz).map_err(fail)?;

        let (location, within) = self.locate(relative);
        let kind = fm.layout.unwrap_or(match location {
            Location::Posts | Location::Drafts => ItemKind::Post,
            Location::Pages => ItemKind::Page,
        });

        let path = match (&fm.permalink, kind, &fm.date) {
            (Some(permalink), _, _) => normalize_path(permalink),
            (None, ItemKind::Post, Some(date)) if location != Location::Pages => {
                post_path(&self.permalink, date, within)
            }
            _ => page_path(relative),
        };

        let item = ContentItem::new(path, shown.clone(), kind, fm, body.to_string()).map_err(fail)?;
        tracing::debug!("Loaded {} -> {:?}", shown, item.path());

        Ok(if location == Location::Drafts {
            item.force_draft()
        } else {
            item
        })
    }
}

/// Per-file errors in source path order
fn sorted(mut errors: Vec<FileError>) -> Vec<FileError> {
    errors.sort_by(|a, b| a.source.cmp(&b.source));
    errors
}
