//! Trait definitions for the export module.

use async_trait::async_trait;

use super::error::ExportError;
use super::types::{ExportFile, ExportSummary};

/// A destination for completed conversion outputs.
#[async_trait]
pub trait Exporter: Send + Sync {
    /// Returns the name of this exporter implementation.
    fn name(&self) -> &str;

    /// Exports a flat list of named byte blobs.
    async fn export(&self, files: Vec<ExportFile>) -> Result<ExportSummary, ExportError>;
}
