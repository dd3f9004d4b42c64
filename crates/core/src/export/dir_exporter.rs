//! Filesystem exporter writing each output individually.

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

use super::error::ExportError;
use super::traits::Exporter;
use super::types::{ExportFile, ExportSummary};

/// Writes each completed output as its own file in a destination directory.
pub struct DirExporter {
    dest_dir: PathBuf,
}

impl DirExporter {
    pub fn new(dest_dir: impl Into<PathBuf>) -> Self {
        Self {
            dest_dir: dest_dir.into(),
        }
    }

    pub fn dest_dir(&self) -> &Path {
        &self.dest_dir
    }

    /// Rejects names that would escape the destination directory.
    fn validate_name(name: &str) -> Result<(), ExportError> {
        let path = Path::new(name);
        let escapes = path.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
        if name.is_empty() || escapes {
            return Err(ExportError::InvalidFileName {
                name: name.to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Exporter for DirExporter {
    fn name(&self) -> &str {
        "dir"
    }

    async fn export(&self, files: Vec<ExportFile>) -> Result<ExportSummary, ExportError> {
        if files.is_empty() {
            return Err(ExportError::NothingToExport);
        }

        tokio::fs::create_dir_all(&self.dest_dir).await?;

        let mut total_bytes = 0u64;
        let count = files.len();
        for file in files {
            Self::validate_name(&file.file_name)?;
            let dest = self.dest_dir.join(&file.file_name);
            debug!(file = %dest.display(), bytes = file.data.len(), "writing export");
            tokio::fs::write(&dest, &file.data).await?;
            total_bytes += file.data.len() as u64;
        }

        info!(
            files = count,
            bytes = total_bytes,
            dir = %self.dest_dir.display(),
            "export finished"
        );
        Ok(ExportSummary {
            files_exported: count,
            total_bytes,
        })
    }
}
