//! Error types for the export module.

use thiserror::Error;

/// Errors that can occur during export.
#[derive(Debug, Error)]
pub enum ExportError {
    /// There were no completed outputs to export.
    #[error("nothing to export")]
    NothingToExport,

    /// A file name would escape the destination directory.
    #[error("invalid output file name: {name}")]
    InvalidFileName { name: String },

    /// I/O error during export.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
