//! Site model - the assembled collection and its read-only query interface

mod assembler;

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::content::{ContentItem, ItemKind};

pub use assembler::{newest_first, Assembler};

/// All content of one build plus the derived indices.
///
/// Indices refer into `items`; nothing is mutated after assembly. Draft
/// filtering happens at query time so a single model serves both modes.
#[derive(Debug, Clone)]
pub struct SiteModel {
    items: Vec<ContentItem>,
    by_path: HashMap<String, usize>,
    chronological: Vec<usize>,
    tags: BTreeMap<String, Vec<usize>>,
    menus: BTreeMap<String, Vec<usize>>,
    include_drafts: bool,
    site_url: String,
    root: String,
}

impl SiteModel {
    /// Items in traversal order, drafts included
    pub fn items(&self) -> &[ContentItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether the build was configured to publish drafts
    pub fn includes_drafts(&self) -> bool {
        self.include_drafts
    }

    /// Site-relative URL of an item
    pub fn url_for(&self, item: &ContentItem) -> String {
        item.url(&self.root)
    }

    /// Absolute URL of an item
    pub fn permalink_for(&self, item: &ContentItem) -> String {
        item.permalink(&self.site_url, &self.root)
    }

    /// Item at `path`; drafts only when the build publishes them
    pub fn get_item_by_path(&self, path: &str) -> Option<&ContentItem> {
        self.by_path
            .get(path)
            .map(|&i| &self.items[i])
            .filter(|item| self.visible(item, self.include_drafts))
    }

    /// Dated items, newest first; ties broken by path
    pub fn list_chronological(&self, include_drafts: bool) -> Vec<&ContentItem> {
        self.resolve(&self.chronological, include_drafts)
    }

    /// Chronological list under the build's draft setting
    pub fn chronological(&self) -> Vec<&ContentItem> {
        self.list_chronological(self.include_drafts)
    }

    /// Items carrying `tag`, newest first
    pub fn list_by_tag(&self, tag: &str) -> Vec<&ContentItem> {
        self.tags
            .get(tag)
            .map(|entries| self.resolve(entries, self.include_drafts))
            .unwrap_or_default()
    }

    /// Entries of one menu, in menu order
    pub fn list_menu(&self, key: &str) -> Vec<&ContentItem> {
        self.menus
            .get(key)
            .map(|entries| self.resolve(entries, self.include_drafts))
            .unwrap_or_default()
    }

    /// Tag names with the number of visible items, sorted by name
    pub fn tags(&self) -> Vec<(&str, usize)> {
        self.tags
            .keys()
            .map(|tag| (tag.as_str(), self.list_by_tag(tag).len()))
            .filter(|(_, count)| *count > 0)
            .collect()
    }

    /// Menu keys that have at least one visible entry, sorted
    pub fn menus(&self) -> Vec<&str> {
        self.menus
            .keys()
            .filter(|key| !self.list_menu(key).is_empty())
            .map(String::as_str)
            .collect()
    }

    /// Published items of one kind in traversal order
    pub fn list_kind(&self, kind: ItemKind) -> Vec<&ContentItem> {
        self.items
            .iter()
            .filter(|item| item.kind() == kind && self.visible(item, self.include_drafts))
            .collect()
    }

    pub fn drafts(&self) -> Vec<&ContentItem> {
        self.items.iter().filter(|item| item.is_draft()).collect()
    }

    /// Serializable view handed to renderers
    pub fn manifest(&self) -> Manifest<'_> {
        let paths = |items: Vec<&ContentItem>| -> Vec<String> {
            items.iter().map(|i| i.path().to_string()).collect()
        };
        let items: Vec<&ContentItem> = self
            .items
            .iter()
            .filter(|item| self.visible(item, self.include_drafts))
            .collect();
        Manifest {
            permalinks: items
                .iter()
                .map(|item| (item.path().to_string(), self.permalink_for(item)))
                .collect(),
            items,
            chronological: paths(self.chronological()),
            tags: self
                .tags()
                .into_iter()
                .map(|(tag, _)| (tag.to_string(), paths(self.list_by_tag(tag))))
                .collect(),
            menus: self
                .menus()
                .into_iter()
                .map(|key| (key.to_string(), paths(self.list_menu(key))))
                .collect(),
        }
    }

    fn visible(&self, item: &ContentItem, include_drafts: bool) -> bool {
        include_drafts || item.is_published()
    }

    fn resolve(&self, entries: &[usize], include_drafts: bool) -> Vec<&ContentItem> {
        entries
            .iter()
            .map(|&i| &self.items[i])
            .filter(|item| self.visible(item, include_drafts))
            .collect()
    }
}

/// JSON-friendly snapshot of a [`SiteModel`]
#[derive(Debug, Serialize)]
pub struct Manifest<'a> {
    pub items: Vec<&'a ContentItem>,
    pub permalinks: BTreeMap<String, String>,
    pub chronological: Vec<String>,
    pub tags: BTreeMap<String, Vec<String>>,
    pub menus: BTreeMap<String, Vec<String>>,
}
