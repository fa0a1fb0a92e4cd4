//! Create a new post or page

use anyhow::Result;
use chrono::Utc;
use std::fs;
use std::path::PathBuf;

use crate::content::FrontMatter;
use crate::Project;

/// Create a new post/page/draft, returning the written file
pub fn create_post(
    project: &Project,
    title: &str,
    layout: &str,
    path: Option<&str>,
) -> Result<PathBuf> {
    let now = Utc::now().fixed_offset();
    let config = &project.config;
    let slug = slug::slugify(title);
    if slug.is_empty() && path.is_none() {
        anyhow::bail!("Cannot derive a file name from title {:?}, pass --path", title);
    }

    // Determine the target directory based on layout
    let target_dir = match layout {
        "draft" => project.source_dir.join(&config.drafts_dir),
        "page" => project.source_dir.join(&slug),
        "post" => project.source_dir.join(&config.posts_dir),
        other => anyhow::bail!("Unknown layout: {}. Available: post, page, draft", other),
    };

    // Generate filename
    let file_path = if let Some(p) = path {
        project.source_dir.join(format!("{}.md", p.trim_end_matches(".md")))
    } else if layout == "page" {
        target_dir.join("index.md")
    } else {
        let name = config
            .new_post_name
            .replace(":title", &slug)
            .replace(":year", &now.format("%Y").to_string())
            .replace(":month", &now.format("%m").to_string())
            .replace(":day", &now.format("%d").to_string())
            .replace(":i_month", &now.format("%-m").to_string())
            .replace(":i_day", &now.format("%-d").to_string());
        target_dir.join(name)
    };

    // Check if file already exists
    if file_path.exists() {
        anyhow::bail!("File already exists: {:?}", file_path);
    }

    let mut front_matter = FrontMatter::new(title);
    front_matter.date = Some(now);
    let content = front_matter.render("\n")?;

    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&file_path, content)?;
    tracing::info!("Created {:?}", file_path);

    Ok(file_path)
}

/// Run the new command
pub fn run(project: &Project, title: &str, layout: &str, path: Option<&str>) -> Result<()> {
    let file_path = create_post(project, title, layout, path)?;
    println!("Created: {:?}", file_path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Tz;

    fn project() -> (tempfile::TempDir, Project) {
        let dir = tempfile::tempdir().unwrap();
        let project = Project::new(dir.path()).unwrap();
        (dir, project)
    }

    #[test]
    fn test_create_post() {
        let (_dir, project) = project();
        let path = create_post(&project, "Hello Rust World", "post", None).unwrap();
        assert_eq!(path, project.source_dir.join("_posts/hello-rust-world.md"));

        let content = fs::read_to_string(&path).unwrap();
        let (fm, _) = FrontMatter::parse(&content, Tz::UTC).unwrap();
        assert_eq!(fm.title, "Hello Rust World");
        assert!(fm.date.is_some());
    }

    #[test]
    fn test_create_page_and_draft() {
        let (_dir, project) = project();
        let page = create_post(&project, "About Me", "page", None).unwrap();
        assert_eq!(page, project.source_dir.join("about-me/index.md"));

        let draft = create_post(&project, "Someday", "draft", None).unwrap();
        assert_eq!(draft, project.source_dir.join("_drafts/someday.md"));
    }

    #[test]
    fn test_refuses_to_overwrite() {
        let (_dir, project) = project();
        create_post(&project, "Twice", "post", None).unwrap();
        assert!(create_post(&project, "Twice", "post", None).is_err());
    }

    #[test]
    fn test_title_without_slug_needs_path() {
        let (_dir, project) = project();
        assert!(create_post(&project, "!!!", "post", None).is_err());
        assert!(!project.source_dir.join("_posts/.md").exists());

        let path = create_post(&project, "!!!", "post", Some("_posts/bang")).unwrap();
        assert_eq!(path, project.source_dir.join("_posts/bang.md"));
    }

    #[test]
    fn test_unknown_layout() {
        let (_dir, project) = project();
        assert!(create_post(&project, "X", "gallery", None).is_err());
    }
}
