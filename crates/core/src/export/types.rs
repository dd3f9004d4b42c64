//! Types for the export module.

use serde::{Deserialize, Serialize};

use crate::job::{JobStatus, SharedJob};

/// A named byte blob ready for export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub file_name: String,
    pub data: Vec<u8>,
}

/// Result of a successful export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSummary {
    pub files_exported: usize,
    pub total_bytes: u64,
}

/// Collects the converted outputs of all `Completed` jobs as a flat list.
///
/// Jobs in other states are skipped; the converted bytes are cloned so the
/// jobs remain intact for further inspection.
pub async fn completed_outputs(jobs: &[SharedJob]) -> Vec<ExportFile> {
    let mut files = Vec::new();
    for job in jobs {
        let job = job.read().await;
        if job.status != JobStatus::Completed {
            continue;
        }
        if let (Some(name), Some(data)) = (&job.converted_file_name, &job.converted_bytes) {
            files.push(ExportFile {
                file_name: name.clone(),
                data: data.clone(),
            });
        }
    }
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::ConversionJob;

    #[tokio::test]
    async fn test_completed_outputs_skips_non_completed() {
        let completed = {
            let mut job = ConversionJob::from_bytes("a.heic", vec![1]);
            job.start().unwrap();
            job.complete("a.jpg", vec![0xFF, 0xD8]).unwrap();
            job.into_shared()
        };
        let failed = {
            let mut job = ConversionJob::from_bytes("b.heic", vec![2]);
            job.fail("boom").unwrap();
            job.into_shared()
        };
        let pending = ConversionJob::from_bytes("c.heic", vec![3]).into_shared();

        let files = completed_outputs(&[completed, failed, pending]).await;
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].file_name, "a.jpg");
        assert_eq!(files[0].data, vec![0xFF, 0xD8]);
    }
}
