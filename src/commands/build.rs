//! Build the site model and report the summary

use anyhow::Result;
use notify::{RecursiveMode, Watcher};
use notify_debouncer_mini::{new_debouncer, DebouncedEvent};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, RecvTimeoutError};
use std::time::Duration;

use crate::build::{Build, BuildSummary, CancelToken};
use crate::site::Manifest;
use crate::{Project, CONFIG_FILE};

/// Command-line overrides applied on top of `_config.yml`
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    pub drafts: bool,
    pub strict: bool,
    pub json: bool,
}

impl BuildOptions {
    /// Load the project and apply the overrides
    pub fn load_project(&self, base_dir: &Path) -> Result<Project> {
        let mut project = Project::new(base_dir)?;
        if self.drafts {
            project.config.include_drafts = true;
        }
        if self.strict {
            project.config.strict = true;
        }
        Ok(project)
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    success: bool,
    summary: &'a BuildSummary,
    site: Option<Manifest<'a>>,
}

/// Build once and print the summary (or the JSON manifest)
pub fn run(project: &Project, options: &BuildOptions, cancel: &CancelToken) -> Result<Build> {
    let build = project.build(cancel.clone())?;

    if options.json {
        let report = JsonReport {
            success: build.is_success(),
            summary: &build.summary,
            site: build.site.as_ref().map(|site| site.manifest()),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", build.summary);
    }

    Ok(build)
}

/// Watch for file changes and rebuild with a fresh context each time.
///
/// Events are debounced so a burst of writes (an editor's atomic save)
/// triggers one rebuild after it settles.
pub async fn watch(project: &Project, options: &BuildOptions, cancel: &CancelToken) -> Result<()> {
    let (tx, rx) = channel();
    let mut debouncer = new_debouncer(Duration::from_millis(500), tx)?;

    // Watch content roots
    for root in project.content_roots() {
        if root.exists() {
            debouncer.watcher().watch(&root, RecursiveMode::Recursive)?;
            tracing::debug!("Watching: {:?}", root);
        } else {
            tracing::warn!("Content root {:?} does not exist, not watching it", root);
        }
    }

    // Watch config file
    let config_path = project.base_dir.join(CONFIG_FILE);
    if config_path.exists() {
        debouncer
            .watcher()
            .watch(&config_path, RecursiveMode::NonRecursive)?;
        tracing::debug!("Watching: {:?}", config_path);
    }

    tracing::info!("Watching for changes. Press Ctrl+C to stop.");

    while !cancel.is_cancelled() {
        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(Ok(events)) => {
                let changed = relevant_paths(&events);
                if changed.is_empty() {
                    continue;
                }
                for path in &changed {
                    tracing::info!("File changed: {}", path.display());
                }

                // Reload so config edits take effect
                let result = options
                    .load_project(&project.base_dir)
                    .and_then(|fresh| run(&fresh, options, cancel));
                if let Err(e) = result {
                    tracing::error!("Build failed: {}", e);
                }
            }
            Ok(Err(e)) => {
                tracing::error!("Watch error: {:?}", e);
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    Ok(())
}

/// Changed paths worth a rebuild, without editor and VCS noise
fn relevant_paths(events: &[DebouncedEvent]) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = events
        .iter()
        .map(|e| e.path.clone())
        .filter(|path| {
            let hidden = path.components().any(|c| {
                c.as_os_str().to_string_lossy().starts_with('.')
            });
            let backup = path.to_string_lossy().ends_with('~');
            !hidden && !backup
        })
        .collect();
    paths.sort();
    paths.dedup();
    paths
}
