//! Batch exclusivity policy.

use crate::job::SourceType;

/// Computes the effective concurrency for a batch.
///
/// The transcoder engine is a single loaded instance whose virtual
/// filesystem state is corrupted by concurrent conversions, so any batch
/// containing a video/audio job is serialized to concurrency 1 regardless
/// of the requested parallelism. Image-only batches run at the requested
/// parallelism (at least 1).
///
/// This deliberately serializes the whole batch instead of partitioning
/// image jobs into a parallel lane; the engine-level call lock preserves
/// single-flight on the shared engine either way.
pub fn effective_parallelism(types: &[SourceType], requested: usize) -> usize {
    let needs_transcoder = types.iter().any(SourceType::requires_transcoder);
    if needs_transcoder {
        1
    } else {
        requested.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_only_batch_uses_requested_parallelism() {
        let types = vec![SourceType::Heic, SourceType::Heic, SourceType::Heic];
        assert_eq!(effective_parallelism(&types, 4), 4);
    }

    #[test]
    fn test_video_job_serializes_whole_batch() {
        let types = vec![SourceType::Heic, SourceType::Mov, SourceType::Heic];
        assert_eq!(effective_parallelism(&types, 4), 1);
    }

    #[test]
    fn test_audio_job_serializes_whole_batch() {
        let types = vec![SourceType::Heic, SourceType::Flac];
        assert_eq!(effective_parallelism(&types, 8), 1);
    }

    #[test]
    fn test_parallelism_is_at_least_one() {
        assert_eq!(effective_parallelism(&[SourceType::Heic], 0), 1);
        assert_eq!(effective_parallelism(&[], 0), 1);
    }

    #[test]
    fn test_unknown_types_do_not_serialize() {
        // Unsupported jobs fail before conversion and never touch the
        // transcoder, so they do not force serialization.
        let types = vec![SourceType::Heic, SourceType::Unknown];
        assert_eq!(effective_parallelism(&types, 3), 3);
    }
}
