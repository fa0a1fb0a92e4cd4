//! Site configuration (_config.yml)

use anyhow::{anyhow, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub author: String,
    pub url: String,
    pub root: String,

    // Directory
    pub source_dir: String,
    pub extra_roots: Vec<String>,
    pub posts_dir: String,
    pub drafts_dir: String,
    pub markdown_extensions: Vec<String>,
    pub exclude: Vec<String>,

    // Writing
    pub permalink: String,
    pub new_post_name: String,
    pub timezone: String,

    // Build
    pub include_drafts: bool,
    pub menu_order: MenuOrderStrategy,
    pub reserved_menus: Vec<String>,
    pub strict: bool,

    // Store any additional fields
    #[serde(flatten)]
    pub extra: HashMap<String, serde_yaml::Value>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Folio".to_string(),
            author: String::new(),
            url: "http://example.com".to_string(),
            root: "/".to_string(),

            source_dir: "source".to_string(),
            extra_roots: Vec::new(),
            posts_dir: "_posts".to_string(),
            drafts_dir: "_drafts".to_string(),
            markdown_extensions: vec!["md".to_string(), "markdown".to_string()],
            exclude: Vec::new(),

            permalink: ":year/:month/:day/:title/".to_string(),
            new_post_name: ":title.md".to_string(),
            timezone: String::new(),

            include_drafts: false,
            menu_order: MenuOrderStrategy::default(),
            reserved_menus: Vec::new(),
            strict: false,

            extra: HashMap::new(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        // An empty file deserializes to unit, not to a mapping
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: SiteConfig = serde_yaml::from_str(&content)?;
        config.time_zone()?;
        Ok(config)
    }

    /// Zone used to resolve front-matter dates written without an offset
    pub fn time_zone(&self) -> Result<Tz> {
        let name = self.timezone.trim();
        if name.is_empty() {
            return Ok(Tz::UTC);
        }
        name.parse::<Tz>()
            .map_err(|e| anyhow!("Invalid timezone {:?}: {}", name, e))
    }

    /// Whether a menu key is rejected by configuration
    pub fn is_reserved_menu(&self, key: &str) -> bool {
        key.trim().is_empty() || self.reserved_menus.iter().any(|r| r == key)
    }
}

/// How entries inside one menu are ordered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MenuOrderStrategy {
    /// Directory traversal order
    #[default]
    DiscoveryOrder,
    /// `weight` ascending, then traversal order
    Weight,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SiteConfig::default();
        assert_eq!(config.source_dir, "source");
        assert!(!config.include_drafts);
        assert_eq!(config.menu_order, MenuOrderStrategy::DiscoveryOrder);
        assert_eq!(config.time_zone().unwrap(), Tz::UTC);
    }

    #[test]
    fn test_parse_config() {
        let yaml = r#"
title: My Blog
source_dir: content
include_drafts: true
menu_order: weight
reserved_menus: [admin]
timezone: Europe/Berlin
github_username: someone
"#;
        let config: SiteConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.title, "My Blog");
        assert_eq!(config.source_dir, "content");
        assert!(config.include_drafts);
        assert_eq!(config.menu_order, MenuOrderStrategy::Weight);
        assert!(config.is_reserved_menu("admin"));
        assert!(config.is_reserved_menu("  "));
        assert!(!config.is_reserved_menu("main"));
        assert_eq!(config.time_zone().unwrap(), chrono_tz::Europe::Berlin);
        assert!(config.extra.contains_key("github_username"));
    }

    #[test]
    fn test_load_rejects_unknown_timezone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("_config.yml");
        fs::write(&path, "timezone: Mars/Olympus\n").unwrap();
        assert!(SiteConfig::load(&path).is_err());
    }

    #[test]
    fn test_load_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("_config.yml");
        fs::write(&path, "\n").unwrap();
        let config = SiteConfig::load(&path).unwrap();
        assert_eq!(config.title, "Folio");
    }
}
