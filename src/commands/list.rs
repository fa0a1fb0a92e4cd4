//! List site content

use anyhow::Result;

use crate::build::CancelToken;
use crate::content::{ContentItem, ItemKind};
use crate::site::SiteModel;
use crate::Project;

/// List site content by type
pub fn run(project: &Project, content_type: &str) -> Result<()> {
    let build = project.build(CancelToken::new())?;
    for diagnostic in &build.summary.diagnostics {
        eprintln!("{}", diagnostic);
    }
    let Some(site) = build.site else {
        anyhow::bail!("Build failed, nothing to list");
    };

    print!("{}", render(&site, content_type)?);
    Ok(())
}

/// Render the listing for one content type
pub fn render(site: &SiteModel, content_type: &str) -> Result<String> {
    let mut out = String::new();

    match content_type {
        "post" | "posts" => {
            let posts: Vec<_> = site
                .chronological()
                .into_iter()
                .filter(|item| item.kind() == ItemKind::Post)
                .collect();
            out.push_str(&format!("Posts ({}):\n", posts.len()));
            for post in posts {
                out.push_str(&format!("  {}\n", dated_line(post)));
            }
        }
        "page" | "pages" => {
            let pages = site.list_kind(ItemKind::Page);
            out.push_str(&format!("Pages ({}):\n", pages.len()));
            for page in pages {
                out.push_str(&format!("  {} [{}]\n", page.title(), page.source()));
            }
        }
        "draft" | "drafts" => {
            let drafts = site.drafts();
            out.push_str(&format!("Drafts ({}):\n", drafts.len()));
            for draft in drafts {
                out.push_str(&format!("  {} [{}]\n", draft.title(), draft.source()));
            }
        }
        "tag" | "tags" => {
            let mut tags = site.tags();
            tags.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
            out.push_str(&format!("Tags ({}):\n", tags.len()));
            for (tag, count) in tags {
                out.push_str(&format!("  {} ({})\n", tag, count));
            }
        }
        "menu" | "menus" => {
            let menus = site.menus();
            out.push_str(&format!("Menus ({}):\n", menus.len()));
            for key in menus {
                out.push_str(&format!("  {}\n", key));
                for entry in site.list_menu(key) {
                    out.push_str(&format!("    {} -> {}\n", entry.title(), site.url_for(entry)));
                }
            }
        }
        _ => {
            anyhow::bail!(
                "Unknown type: {}. Available: post, page, draft, tag, menu",
                content_type
            );
        }
    }

    Ok(out)
}

fn dated_line(item: &ContentItem) -> String {
    let date = item
        .date()
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "----------".to_string());
    format!("{} - {} [{}]", date, item.title(), item.source())
}
