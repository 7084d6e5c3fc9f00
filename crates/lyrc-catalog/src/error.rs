//! Error types for catalog loading

use std::path::PathBuf;

use thiserror::Error;

/// Problems found while loading remote definitions
///
/// None of these abort a catalog load: they are logged and the offending
/// line, remote or file is skipped.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Failed to read a file or directory
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A line could not be parsed
    #[error("{source_name}:{line}: {reason}")]
    Malformed {
        source_name: String,
        line: usize,
        reason: String,
    },

    /// A remote block ended without a `name`
    #[error("{0}: remote without a name")]
    MissingName(String),
}
