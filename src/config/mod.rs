//! Configuration module

mod site;

pub use site::MenuOrderStrategy;
pub use site::SiteConfig;
