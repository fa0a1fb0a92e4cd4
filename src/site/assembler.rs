//! Site assembler - derives the chronological, tag and menu indices

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use super::SiteModel;
use crate::config::{MenuOrderStrategy, SiteConfig};
use crate::content::{Collection, ContentItem};
use crate::error::BuildError;

/// Builds a [`SiteModel`] from a finished collection
pub struct Assembler<'a> {
    config: &'a SiteConfig,
}

impl<'a> Assembler<'a> {
    pub fn new(config: &'a SiteConfig) -> Self {
        Self { config }
    }

    /// Take ownership of the collection and derive every index.
    ///
    /// Returns the model together with non-fatal menu problems. Under
    /// `strict` the first menu problem is returned as an error instead.
    pub fn assemble(
        &self,
        collection: Collection,
    ) -> Result<(SiteModel, Vec<BuildError>), BuildError> {
        let items = collection.into_items();
        let mut warnings = Vec::new();

        let by_path: HashMap<String, usize> = items
            .iter()
            .enumerate()
            .map(|(i, item)| (item.path().to_string(), i))
            .collect();

        let mut chronological: Vec<usize> = (0..items.len())
            .filter(|&i| items[i].date().is_some())
            .collect();
        chronological.sort_by(|&a, &b| newest_first(&items[a], &items[b]));

        let mut tags: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (i, item) in items.iter().enumerate() {
            for tag in item.tags() {
                tags.entry(tag.clone()).or_default().push(i);
            }
        }
        for entries in tags.values_mut() {
            entries.sort_by(|&a, &b| newest_first(&items[a], &items[b]));
        }

        let mut menus: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (i, item) in items.iter().enumerate() {
            let Some(menu) = item.menu() else { continue };
            if self.config.is_reserved_menu(menu) {
                let error = BuildError::UnresolvableMenuReference {
                    menu: menu.to_string(),
                    file: item.source().to_string(),
                };
                if self.config.strict {
                    return Err(error);
                }
                tracing::warn!("{}", error);
                warnings.push(error);
                continue;
            }
            menus.entry(menu.to_string()).or_default().push(i);
        }
        if self.config.menu_order == MenuOrderStrategy::Weight {
            for entries in menus.values_mut() {
                // Stable: equal weights keep traversal order
                entries.sort_by_key(|&i| match items[i].weight() {
                    Some(w) => (0, w),
                    None => (1, 0),
                });
            }
        }

        tracing::info!(
            "Assembled {} items, {} tags, {} menus",
            items.len(),
            tags.len(),
            menus.len()
        );

        let site = SiteModel {
            items,
            by_path,
            chronological,
            tags,
            menus,
            include_drafts: self.config.include_drafts,
            site_url: self.config.url.clone(),
            root: self.config.root.clone(),
        };
        Ok((site, warnings))
    }
}

/// Date descending, undated last, then path ascending
pub fn newest_first(a: &ContentItem, b: &ContentItem) -> Ordering {
    let by_date = match (a.date(), b.date()) {
        (Some(x), Some(y)) => y.cmp(x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_date.then_with(|| a.path().cmp(b.path()))
}
