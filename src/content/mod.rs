//! Content module - front-matter parsing, content items and collection

pub mod collector;
mod frontmatter;
mod item;
mod source;

pub use collector::{Collected, CollectError, Collection, Collector, FileError};
pub use frontmatter::{parse_date, FrontMatter};
pub use item::{normalize_path, page_path, post_path, ContentItem, ItemKind};
pub use source::{display_path, slash_path, ContentSource, FsSource, Listing, MemorySource};
