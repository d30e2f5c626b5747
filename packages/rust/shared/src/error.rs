//! Error types for Quire.
//!
//! Library crates use [`QuireError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all Quire operations.
#[derive(Debug, thiserror::Error)]
pub enum QuireError {
    /// Configuration loading or validation error. Fatal for a whole run.
    #[error("config error: {message}")]
    Config { message: String },

    /// A single provider call failed (HTTP, transport, or empty reply).
    #[error("provider error: {0}")]
    Provider(String),

    /// Provider reply was not valid structured data.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Frontmatter block could not be read or rendered.
    #[error("frontmatter error in {path:?}: {message}")]
    Frontmatter { path: PathBuf, message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A targeted content item does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, QuireError>;

impl QuireError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a frontmatter error tied to a file.
    pub fn frontmatter(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Frontmatter {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error is worth retrying the whole provider call for.
    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }
}
