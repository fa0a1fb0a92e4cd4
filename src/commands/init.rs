//! Initialize a new site

use anyhow::Result;
use chrono::Utc;
use std::fs;
use std::path::Path;

use crate::content::FrontMatter;
use crate::CONFIG_FILE;

const DEFAULT_CONFIG: &str = r#"# Site
title: Folio
author: ''
url: http://example.com
root: /

# Directory
source_dir: source
extra_roots: []
posts_dir: _posts
drafts_dir: _drafts
markdown_extensions: [md, markdown]
exclude: []

# Writing
permalink: :year/:month/:day/:title/
new_post_name: :title.md
timezone: ''

# Build
include_drafts: false
menu_order: discovery-order
reserved_menus: []
strict: false
"#;

const SAMPLE_BODY: &str = r#"
Welcome! This is your very first post.

## Quick Start

### Create a new post

```bash
$ folio new "My New Post"
```

### Check the site

```bash
$ folio build
$ folio list tag
```
"#;

/// Initialize a new site in the given directory
pub fn init_site(target_dir: &Path) -> Result<()> {
    if target_dir.join(CONFIG_FILE).exists() {
        anyhow::bail!("{:?} already contains {}", target_dir, CONFIG_FILE);
    }

    // Create directory structure
    fs::create_dir_all(target_dir.join("source/_posts"))?;
    fs::create_dir_all(target_dir.join("source/_drafts"))?;

    fs::write(target_dir.join(CONFIG_FILE), DEFAULT_CONFIG)?;

    // Create a sample post
    let mut front_matter = FrontMatter::new("Hello World");
    front_matter.date = Some(Utc::now().fixed_offset());
    front_matter.tags = vec!["welcome".to_string()];
    let sample_post = front_matter.render(SAMPLE_BODY)?;

    fs::write(target_dir.join("source/_posts/hello-world.md"), sample_post)?;
    tracing::debug!("Initialized site layout in {:?}", target_dir);

    Ok(())
}
