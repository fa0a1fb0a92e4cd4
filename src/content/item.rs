//! Content item model

use chrono::{DateTime, FixedOffset};
use indexmap::IndexMap;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::Serialize;
use std::hash::{Hash, Hasher};
use std::path::{Component, Path};

use super::FrontMatter;
use crate::error::ContentError;

/// Characters escaped inside one URL path segment
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

const MORE_MARKER: &str = "<!-- more -->";

/// Whether an item is a dated post or a standalone page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Post,
    Page,
}

impl ItemKind {
    /// Map a front-matter `layout` value onto a kind
    pub fn from_layout(layout: &str) -> Option<Self> {
        match layout.trim() {
            "post" => Some(ItemKind::Post),
            "page" => Some(ItemKind::Page),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Post => "post",
            ItemKind::Page => "page",
        }
    }
}

/// One page or post. Immutable once built; equality is by `path`.
#[derive(Debug, Clone, Serialize)]
pub struct ContentItem {
    path: String,
    source: String,
    kind: ItemKind,
    title: String,
    date: Option<DateTime<FixedOffset>>,
    updated: Option<DateTime<FixedOffset>>,
    tags: Vec<String>,
    menu: Option<String>,
    weight: Option<i64>,
    draft: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    permalink: Option<String>,
    /// Kind set explicitly in front-matter, overriding location
    #[serde(skip_serializing_if = "Option::is_none")]
    layout: Option<ItemKind>,
    body: String,
    extra: IndexMap<String, serde_yaml::Value>,
}

impl ContentItem {
    /// Build an item from parsed front-matter.
    ///
    /// `source` names the file the item came from (used in diagnostics).
    /// Posts must carry a date.
    pub fn new(
        path: String,
        source: String,
        kind: ItemKind,
        fm: FrontMatter,
        body: String,
    ) -> Result<Self, ContentError> {
        if kind == ItemKind::Post && fm.date.is_none() {
            return Err(ContentError::invalid("date", "posts require a date"));
        }

        Ok(Self {
            path,
            source,
            kind,
            title: fm.title,
            date: fm.date,
            updated: fm.updated,
            tags: fm.tags,
            menu: fm.menu,
            weight: fm.weight,
            draft: fm.draft,
            permalink: fm.permalink,
            layout: fm.layout,
            body,
            extra: fm.extra,
        })
    }

    /// Drafts are marked regardless of what the front-matter says
    pub(crate) fn force_draft(mut self) -> Self {
        self.draft = true;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn kind(&self) -> ItemKind {
        self.kind
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn date(&self) -> Option<&DateTime<FixedOffset>> {
        self.date.as_ref()
    }

    pub fn updated(&self) -> Option<&DateTime<FixedOffset>> {
        self.updated.as_ref()
    }

    /// Tags in authored order
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn menu(&self) -> Option<&str> {
        self.menu.as_deref()
    }

    pub fn weight(&self) -> Option<i64> {
        self.weight
    }

    pub fn is_draft(&self) -> bool {
        self.draft
    }

    pub fn is_published(&self) -> bool {
        !self.draft
    }

    /// Raw Markdown after the front-matter block
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Unrecognized front-matter fields
    pub fn extra(&self) -> &IndexMap<String, serde_yaml::Value> {
        &self.extra
    }

    /// Markdown before the `<!-- more -->` marker, if the body has one
    pub fn excerpt(&self) -> Option<&str> {
        self.body
            .find(MORE_MARKER)
            .map(|pos| self.body[..pos].trim_end())
    }

    /// Site-relative URL, e.g. `/blog/2024/hello/`
    pub fn url(&self, root: &str) -> String {
        let root = format!("/{}", root.trim_matches('/'));
        let root = root.trim_end_matches('/');
        if self.path.is_empty() {
            return format!("{}/", root);
        }
        let encoded: Vec<String> = self
            .path
            .split('/')
            .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
            .collect();
        format!("{}/{}/", root, encoded.join("/"))
    }

    /// Absolute URL below the site `url`
    pub fn permalink(&self, site_url: &str, root: &str) -> String {
        format!("{}{}", site_url.trim_end_matches('/'), self.url(root))
    }

    /// Front-matter that reproduces this item when rendered
    pub fn to_front_matter(&self) -> FrontMatter {
        FrontMatter {
            title: self.title.clone(),
            date: self.date,
            updated: self.updated,
            tags: self.tags.clone(),
            menu: self.menu.clone(),
            weight: self.weight,
            draft: self.draft,
            permalink: self.permalink.clone(),
            layout: self.layout,
            extra: self.extra.clone(),
        }
    }
}

impl PartialEq for ContentItem {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for ContentItem {}

impl Hash for ContentItem {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

/// Trim slashes and collapse empty segments of a user-supplied path
pub fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Output path of a page: relative location without extension, with
/// `index` files standing for their directory
pub fn page_path(relative: &Path) -> String {
    let without_ext = relative.with_extension("");
    let mut segments: Vec<String> = without_ext
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if segments.last().map(String::as_str) == Some("index") {
        segments.pop();
    }
    segments.join("/")
}

/// Output path of a post from the permalink pattern
pub fn post_path(pattern: &str, date: &DateTime<FixedOffset>, relative: &Path) -> String {
    let name = relative
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("untitled");
    // Posts nested below the posts directory keep their folders in `:title`
    let title = match relative.parent().map(page_path) {
        Some(parent) if !parent.is_empty() => format!("{}/{}", parent, name),
        _ => name.to_string(),
    };

    let result = pattern
        .replace(":year", &date.format("%Y").to_string())
        .replace(":i_month", &date.format("%-m").to_string())
        .replace(":i_day", &date.format("%-d").to_string())
        .replace(":month", &date.format("%m").to_string())
        .replace(":day", &date.format("%d").to_string())
        .replace(":title", &title)
        .replace(":name", name);

    normalize_path(&result)
}
