//! Bulk export of completed conversion outputs.
//!
//! The presentation layer hands the flat list of named byte blobs produced
//! by a batch to an [`Exporter`]. Archiving into a single container is an
//! external collaborator; this module ships the interface plus a simple
//! filesystem implementation that offers the files individually.

mod dir_exporter;
mod error;
mod traits;
mod types;

pub use dir_exporter::DirExporter;
pub use error::ExportError;
pub use traits::Exporter;
pub use types::{completed_outputs, ExportFile, ExportSummary};
