//! Build pipeline: parse → collect → assemble, plus the build summary

use anyhow::Result;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::SiteConfig;
use crate::content::{Collected, CollectError, Collector, ContentSource, FileError, ItemKind};
use crate::error::{BuildError, ErrorKind};
use crate::site::{Assembler, SiteModel};

/// Cooperative cancellation flag shared with the parser threads
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Everything one build needs. Created fresh for each build and consumed by
/// [`BuildContext::run`].
pub struct BuildContext {
    config: SiteConfig,
    sources: Vec<Box<dyn ContentSource>>,
    collector: Collector,
}

impl BuildContext {
    pub fn new(
        config: SiteConfig,
        sources: Vec<Box<dyn ContentSource>>,
        cancel: CancelToken,
    ) -> Result<Self> {
        let collector = Collector::new(&config, cancel)?;
        Ok(Self {
            config,
            sources,
            collector,
        })
    }

    /// Run the whole pipeline once
    pub fn run(self) -> Build {
        let start = Instant::now();
        let strict = self.config.strict;
        let mut summary = BuildSummary::default();

        let Collected { collection, errors } = match self.collector.collect(&self.sources) {
            Ok(collected) => collected,
            Err(CollectError { fatal, file_errors }) => {
                summary.record_file_errors(&file_errors, strict);
                summary.push_fatal(&fatal);
                summary.finish(start);
                return Build::failed(summary);
            }
        };
        summary.record_file_errors(&errors, strict);

        if !summary.is_success() {
            tracing::warn!("Strict mode: {} file error(s), no site produced", errors.len());
            summary.finish(start);
            return Build::failed(summary);
        }

        let (site, warnings) = match Assembler::new(&self.config).assemble(collection) {
            Ok(assembled) => assembled,
            Err(fatal) => {
                summary.push_fatal(&fatal);
                summary.finish(start);
                return Build::failed(summary);
            }
        };
        for warning in &warnings {
            summary.diagnostics.push(Diagnostic::from_build_error(warning, Severity::Warning));
        }

        summary.record_counts(&site);
        summary.finish(start);
        tracing::info!("Built site model in {:.2}s", summary.elapsed.as_secs_f64());

        Build {
            site: Some(site),
            summary,
        }
    }
}

/// Outcome of one build. `site` is present only on success.
#[derive(Debug)]
pub struct Build {
    pub site: Option<SiteModel>,
    pub summary: BuildSummary,
}

impl Build {
    fn failed(summary: BuildSummary) -> Self {
        for fatal in summary.fatal() {
            tracing::error!("{}", fatal);
        }
        Self {
            site: None,
            summary,
        }
    }

    pub fn is_success(&self) -> bool {
        self.summary.is_success()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Fatal,
}

/// One reported problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Offending file or root, if any
    pub source: Option<String>,
    pub kind: ErrorKind,
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    fn from_file_error(error: &FileError, severity: Severity) -> Self {
        Self {
            source: Some(error.source.clone()),
            kind: error.error.kind(),
            severity,
            message: error.error.to_string(),
        }
    }

    fn from_build_error(error: &BuildError, severity: Severity) -> Self {
        Self {
            source: error.source_path().map(str::to_string),
            kind: error.kind(),
            severity,
            message: error.to_string(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Warning => "warning",
            Severity::Fatal => "error",
        };
        match &self.source {
            Some(source) => write!(f, "{}: {}: {} ({})", level, source, self.kind, self.message),
            None => write!(f, "{}: {} ({})", level, self.kind, self.message),
        }
    }
}

/// Everything a build reports, successful or not
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildSummary {
    pub diagnostics: Vec<Diagnostic>,
    pub items: usize,
    pub posts: usize,
    pub pages: usize,
    pub drafts: usize,
    pub tags: usize,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl BuildSummary {
    /// Success iff nothing fatal was reported
    pub fn is_success(&self) -> bool {
        self.fatal().next().is_none()
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }

    pub fn fatal(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Fatal)
    }

    fn record_file_errors(&mut self, errors: &[FileError], strict: bool) {
        let severity = if strict {
            Severity::Fatal
        } else {
            Severity::Warning
        };
        self.diagnostics.extend(
            errors
                .iter()
                .map(|e| Diagnostic::from_file_error(e, severity)),
        );
    }

    fn push_fatal(&mut self, error: &BuildError) {
        self.diagnostics
            .push(Diagnostic::from_build_error(error, Severity::Fatal));
    }

    /// Warnings before fatal errors, each in source path order
    fn finish(&mut self, start: Instant) {
        self.diagnostics.sort_by(|a, b| {
            a.severity
                .cmp(&b.severity)
                .then_with(|| a.source.cmp(&b.source))
        });
        self.elapsed = start.elapsed();
    }

    fn record_counts(&mut self, site: &SiteModel) {
        self.items = site.len();
        self.posts = site.list_kind(ItemKind::Post).len();
        self.pages = site.list_kind(ItemKind::Page).len();
        self.drafts = site.drafts().len();
        self.tags = site.tags().len();
    }
}

impl fmt::Display for BuildSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for diagnostic in &self.diagnostics {
            writeln!(f, "{}", diagnostic)?;
        }
        let warnings = self.warnings().count();
        if self.is_success() {
            write!(
                f,
                "Build succeeded: {} items ({} posts, {} pages, {} drafts), {} tags, {} warning(s)",
                self.items, self.posts, self.pages, self.drafts, self.tags, warnings
            )
        } else {
            write!(
                f,
                "Build failed: {} error(s), {} warning(s)",
                self.fatal().count(),
                warnings
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::MemorySource;

    fn run(config: SiteConfig, sources: Vec<MemorySource>) -> Build {
        let sources = sources
            .into_iter()
            .map(|s| Box::new(s) as Box<dyn ContentSource>)
            .collect();
        BuildContext::new(config, sources, CancelToken::new())
            .unwrap()
            .run()
    }

    fn scenario() -> MemorySource {
        MemorySource::new("")
            .with_file("a.md", "---\ntitle: A\ndate: 2024-01-01\ntags: [x]\n---\nA body\n")
            .with_file("b.md", "---\ntitle: B\ndate: 2024-01-02\ntags: [x, y]\n---\nB body\n")
            .with_file("c.md", "# C\n\nForgot the front matter.\n")
    }

    fn titles(items: Vec<&crate::content::ContentItem>) -> Vec<&str> {
        items.into_iter().map(|i| i.title()).collect()
    }

    #[test]
    fn test_build_with_missing_front_matter_warns() {
        let build = run(SiteConfig::default(), vec![scenario()]);
        assert!(build.is_success());

        let warnings: Vec<_> = build.summary.warnings().collect();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].source.as_deref(), Some("c.md"));
        assert_eq!(warnings[0].kind, ErrorKind::MissingFrontMatter);

        let site = build.site.unwrap();
        assert_eq!(titles(site.list_chronological(false)), vec!["B", "A"]);
        assert_eq!(titles(site.list_by_tag("x")), vec!["B", "A"]);
        assert_eq!(titles(site.list_by_tag("y")), vec!["B"]);
        assert_eq!(build.summary.items, 2);
        assert_eq!(build.summary.tags, 2);
    }

    #[test]
    fn test_duplicate_path_fails_build() {
        let source = MemorySource::new("source")
            .with_file("about.md", "---\ntitle: About\n---\n")
            .with_file("about/index.md", "---\ntitle: About me\n---\n");
        let build = run(SiteConfig::default(), vec![source]);

        assert!(!build.is_success());
        assert!(build.site.is_none());
        let fatal: Vec<_> = build.summary.fatal().collect();
        assert_eq!(fatal.len(), 1);
        assert_eq!(fatal[0].kind, ErrorKind::DuplicatePath);
        assert!(fatal[0].message.contains("source/about.md"));
        assert!(fatal[0].message.contains("source/about/index.md"));
    }

    #[test]
    fn test_duplicate_keeps_earlier_file_errors() {
        let source = MemorySource::new("source")
            .with_file("a.md", "no metadata")
            .with_file("about.md", "---\ntitle: About\n---\n")
            .with_file("about/index.md", "---\ntitle: About me\n---\n");
        let build = run(SiteConfig::default(), vec![source]);

        assert_eq!(build.summary.warnings().count(), 1);
        assert_eq!(build.summary.fatal().count(), 1);
        assert_eq!(
            build.summary.diagnostics.last().map(|d| d.kind),
            Some(ErrorKind::DuplicatePath)
        );
    }

    #[test]
    fn test_diagnostics_in_source_order() {
        let mut config = SiteConfig::default();
        config.reserved_menus = vec!["admin".to_string()];
        let source = MemorySource::new("source")
            .with_file("a.md", "---\ntitle: A\nmenu: admin\n---\n")
            .with_file("m.md", "---\ntitle: M\nmenu: main\n---\n")
            .with_file("z.md", "no front matter");
        let build = run(config, vec![source]);

        let sources: Vec<_> = build
            .summary
            .diagnostics
            .iter()
            .map(|d| (d.source.as_deref(), d.kind))
            .collect();
        assert_eq!(
            sources,
            vec![
                (Some("source/a.md"), ErrorKind::UnresolvableMenuReference),
                (Some("source/z.md"), ErrorKind::MissingFrontMatter),
            ]
        );
    }

    #[test]
    fn test_zero_valid_items_is_reportable() {
        let source = MemorySource::new("source").with_file("only.md", "nothing here");
        let build = run(SiteConfig::default(), vec![source]);
        assert!(build.is_success());
        assert!(build.site.unwrap().is_empty());
        assert_eq!(build.summary.warnings().count(), 1);
    }

    #[test]
    fn test_strict_mode_turns_file_errors_fatal() {
        let mut config = SiteConfig::default();
        config.strict = true;
        let build = run(config, vec![scenario()]);
        assert!(!build.is_success());
        assert!(build.site.is_none());
        assert_eq!(build.summary.fatal().count(), 1);
    }

    #[test]
    fn test_drafts_follow_configuration() {
        let source = MemorySource::new("source")
            .with_file("a.md", "---\ntitle: A\ndate: 2024-01-01\ntags: [x]\n---\n")
            .with_file("_drafts/b.md", "---\ntitle: B\ndate: 2024-02-01\ntags: [x]\n---\n");

        let build = run(SiteConfig::default(), vec![source.clone()]);
        let site = build.site.unwrap();
        assert_eq!(titles(site.list_chronological(false)), vec!["A"]);
        assert_eq!(titles(site.list_chronological(true)), vec!["B", "A"]);
        assert_eq!(titles(site.list_by_tag("x")), vec!["A"]);
        assert_eq!(build.summary.drafts, 1);

        let mut config = SiteConfig::default();
        config.include_drafts = true;
        let site = run(config, vec![source]).site.unwrap();
        assert_eq!(titles(site.list_by_tag("x")), vec!["B", "A"]);
    }

    #[test]
    fn test_builds_are_deterministic() {
        let first = run(SiteConfig::default(), vec![scenario()]);
        let second = run(SiteConfig::default(), vec![scenario()]);
        let first = first.site.unwrap();
        let second = second.site.unwrap();
        assert_eq!(
            serde_json::to_string(&first.manifest()).unwrap(),
            serde_json::to_string(&second.manifest()).unwrap()
        );
    }

    #[test]
    fn test_cancelled_build_produces_nothing() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let sources: Vec<Box<dyn ContentSource>> = vec![Box::new(scenario())];
        let build = BuildContext::new(SiteConfig::default(), sources, cancel)
            .unwrap()
            .run();
        assert!(build.site.is_none());
        assert_eq!(
            build.summary.fatal().next().map(|d| d.kind),
            Some(ErrorKind::Cancelled)
        );
    }

    #[test]
    fn test_summary_display() {
        let build = run(SiteConfig::default(), vec![scenario()]);
        let text = build.summary.to_string();
        assert!(text.contains("warning: c.md: MissingFrontMatterError"));
        assert!(text.contains("Build succeeded: 2 items"));
    }
}
