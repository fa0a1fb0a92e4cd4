//! folio: collects Markdown content into a site model
//!
//! This crate scans content roots for Markdown files with front-matter,
//! validates the metadata and assembles posts, pages, tags and menus into a
//! deterministic, read-only model that a renderer can consume.

pub mod build;
pub mod commands;
pub mod config;
pub mod content;
pub mod error;
pub mod site;

use anyhow::Result;
use std::path::{Path, PathBuf};

use build::{Build, BuildContext, CancelToken};
use content::{ContentSource, FsSource};

/// Configuration file name inside the project directory
pub const CONFIG_FILE: &str = "_config.yml";

/// A site project on disk
#[derive(Debug, Clone)]
pub struct Project {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Primary content directory
    pub source_dir: PathBuf,
}

impl Project {
    /// Create a new project from a directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join(CONFIG_FILE);

        let config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            config::SiteConfig::default()
        };

        let source_dir = base_dir.join(&config.source_dir);

        Ok(Self {
            config,
            base_dir,
            source_dir,
        })
    }

    /// Every content root, primary first
    pub fn content_roots(&self) -> Vec<PathBuf> {
        std::iter::once(self.source_dir.clone())
            .chain(self.config.extra_roots.iter().map(|r| self.base_dir.join(r)))
            .collect()
    }

    /// Filesystem sources for all content roots
    pub fn sources(&self) -> Vec<Box<dyn ContentSource>> {
        let mut labels = vec![self.config.source_dir.clone()];
        labels.extend(self.config.extra_roots.iter().cloned());

        self.content_roots()
            .into_iter()
            .zip(labels)
            .map(|(root, label)| {
                Box::new(FsSource::new(root, label.trim_end_matches('/'))) as Box<dyn ContentSource>
            })
            .collect()
    }

    /// Run one build with a fresh context
    pub fn build(&self, cancel: CancelToken) -> Result<Build> {
        let context = BuildContext::new(self.config.clone(), self.sources(), cancel)?;
        Ok(context.run())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_project_defaults_without_config() {
        let dir = tempfile::tempdir().unwrap();
        let project = Project::new(dir.path()).unwrap();
        assert_eq!(project.source_dir, dir.path().join("source"));
        assert_eq!(project.content_roots().len(), 1);
    }

    #[test]
    fn test_project_build_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path();
        fs::write(
            base.join(CONFIG_FILE),
            "source_dir: content\nextra_roots: [shared]\n",
        )
        .unwrap();
        fs::create_dir_all(base.join("content/_posts")).unwrap();
        fs::create_dir_all(base.join("shared")).unwrap();
        fs::write(
            base.join("content/_posts/first.md"),
            "---\ntitle: First\ndate: 2024-05-01 12:00:00\ntags: [rust]\n---\nHello\n",
        )
        .unwrap();
        fs::write(
            base.join("shared/about.md"),
            "---\ntitle: About\nmenu: main\n---\n",
        )
        .unwrap();
        fs::write(base.join("shared/broken.md"), "oops").unwrap();

        let project = Project::new(base).unwrap();
        let build = project.build(CancelToken::new()).unwrap();
        assert!(build.is_success());
        assert_eq!(build.summary.warnings().count(), 1);
        assert_eq!(
            build.summary.warnings().next().unwrap().source.as_deref(),
            Some("shared/broken.md")
        );

        let site = build.site.unwrap();
        assert_eq!(site.list_by_tag("rust")[0].path(), "2024/05/01/first");
        assert_eq!(site.list_menu("main")[0].source(), "shared/about.md");
    }

    #[test]
    fn test_project_missing_content_root() {
        let dir = tempfile::tempdir().unwrap();
        let build = Project::new(dir.path())
            .unwrap()
            .build(CancelToken::new())
            .unwrap();
        assert!(!build.is_success());
        assert_eq!(
            build.summary.fatal().next().unwrap().kind,
            error::ErrorKind::Source
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_project_build_survives_dangling_symlink() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path();
        fs::create_dir_all(base.join("source")).unwrap();
        fs::write(base.join("source/good.md"), "---\ntitle: Good\n---\n").unwrap();
        std::os::unix::fs::symlink(base.join("source/nowhere.md"), base.join("source/broken.md"))
            .unwrap();

        let build = Project::new(base).unwrap().build(CancelToken::new()).unwrap();
        assert!(build.is_success());
        let warning = build.summary.warnings().next().unwrap();
        assert_eq!(warning.source.as_deref(), Some("source/broken.md"));
        assert_eq!(warning.kind, error::ErrorKind::Unreadable);
        assert!(build.site.unwrap().get_item_by_path("good").is_some());
    }
}
