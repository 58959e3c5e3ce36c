//! Error types for corpus loading

use std::path::PathBuf;

/// Corpus loading errors
#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    /// Source path is missing or not a directory
    #[error("corpus source is not a directory: {}", path.display())]
    NotADirectory {
        /// Configured source directory
        path: PathBuf,
    },

    /// Directory listing failed
    #[error("cannot read corpus directory {}: {source}", path.display())]
    ReadDir {
        /// Directory being listed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A single document could not be read
    #[error("cannot read document {}: {source}", path.display())]
    ReadDocument {
        /// Document path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}
