//! Error types for content parsing and site builds

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Errors scoped to a single content file.
///
/// These never abort a build on their own; the collector records them and
/// keeps going with the remaining files.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContentError {
    #[error("no front-matter block at the top of the file")]
    MissingFrontMatter,

    #[error("malformed front-matter: {0}")]
    MalformedFrontMatter(String),

    #[error("invalid field `{field}`: {message}")]
    InvalidField { field: String, message: String },

    #[error("unable to read file: {0}")]
    Unreadable(String),
}

impl ContentError {
    pub(crate) fn invalid(field: &str, message: impl Into<String>) -> Self {
        ContentError::InvalidField {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn missing(field: &str) -> Self {
        Self::invalid(field, "required field is missing")
    }

    /// Category used in build summaries
    pub fn kind(&self) -> ErrorKind {
        match self {
            ContentError::MissingFrontMatter => ErrorKind::MissingFrontMatter,
            ContentError::MalformedFrontMatter(_) => ErrorKind::MalformedFrontMatter,
            ContentError::InvalidField { .. } => ErrorKind::InvalidField,
            ContentError::Unreadable(_) => ErrorKind::Unreadable,
        }
    }
}

/// Errors that stop a build from producing a site model
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("duplicate path `{path}` produced by both {first} and {second}")]
    DuplicatePath {
        path: String,
        first: String,
        second: String,
    },

    #[error("menu `{menu}` referenced by {file} is reserved or invalid")]
    UnresolvableMenuReference { menu: String, file: String },

    #[error("content root {root} cannot be read: {message}")]
    Source { root: String, message: String },

    #[error("build cancelled")]
    Cancelled,
}

impl BuildError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BuildError::DuplicatePath { .. } => ErrorKind::DuplicatePath,
            BuildError::UnresolvableMenuReference { .. } => ErrorKind::UnresolvableMenuReference,
            BuildError::Source { .. } => ErrorKind::Source,
            BuildError::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// The content file the error points at, when there is one
    pub fn source_path(&self) -> Option<&str> {
        match self {
            BuildError::DuplicatePath { second, .. } => Some(second),
            BuildError::UnresolvableMenuReference { file, .. } => Some(file),
            BuildError::Source { root, .. } => Some(root),
            BuildError::Cancelled => None,
        }
    }
}

/// Flat error classification shared by per-file and fatal errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ErrorKind {
    MissingFrontMatter,
    MalformedFrontMatter,
    InvalidField,
    Unreadable,
    DuplicatePath,
    UnresolvableMenuReference,
    Source,
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::MissingFrontMatter => "MissingFrontMatterError",
            ErrorKind::MalformedFrontMatter => "MalformedFrontMatterError",
            ErrorKind::InvalidField => "InvalidFieldError",
            ErrorKind::Unreadable => "UnreadableFileError",
            ErrorKind::DuplicatePath => "DuplicatePathError",
            ErrorKind::UnresolvableMenuReference => "UnresolvableMenuReferenceError",
            ErrorKind::Source => "ContentRootError",
            ErrorKind::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_error_kinds() {
        assert_eq!(
            ContentError::MissingFrontMatter.kind(),
            ErrorKind::MissingFrontMatter
        );
        assert_eq!(
            ContentError::missing("title").kind(),
            ErrorKind::InvalidField
        );
        assert_eq!(
            ContentError::missing("title").to_string(),
            "invalid field `title`: required field is missing"
        );
    }

    #[test]
    fn test_duplicate_path_names_both_sources() {
        let err = BuildError::DuplicatePath {
            path: "about".to_string(),
            first: "source/about.md".to_string(),
            second: "source/about/index.md".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("source/about.md"));
        assert!(message.contains("source/about/index.md"));
        assert_eq!(err.kind().as_str(), "DuplicatePathError");
    }
}
