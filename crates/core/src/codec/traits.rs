//! Trait definitions for the codec module.

use async_trait::async_trait;

use super::error::ConvertError;
use super::types::{ConvertOutput, ConvertRequest};

/// A codec family capable of converting one class of inputs.
#[async_trait]
pub trait CodecAdapter: Send + Sync {
    /// Returns the name of this adapter implementation.
    fn name(&self) -> &str;

    /// Ensures the underlying engine is ready.
    ///
    /// Idempotent and safe to call concurrently: concurrent callers observe
    /// a single underlying load attempt. Returns `true` once the family is
    /// usable, including when it operates on the synthetic fallback path;
    /// `false` only if even the fallback path cannot be constructed.
    async fn initialize(&self) -> bool;

    /// Converts one input, reporting coarse progress through the request's
    /// progress handle and honoring its cancellation token.
    async fn convert(&self, request: ConvertRequest) -> Result<ConvertOutput, ConvertError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoAdapter;

    #[async_trait]
    impl CodecAdapter for EchoAdapter {
        fn name(&self) -> &str {
            "echo"
        }

        async fn initialize(&self) -> bool {
            true
        }

        async fn convert(&self, request: ConvertRequest) -> Result<ConvertOutput, ConvertError> {
            Ok(ConvertOutput {
                file_name: request.output_file_name,
                data: request.data,
            })
        }
    }

    #[tokio::test]
    async fn test_adapter_object_safety() {
        let adapter: Box<dyn CodecAdapter> = Box::new(EchoAdapter);
        assert_eq!(adapter.name(), "echo");
        assert!(adapter.initialize().await);

        let output = adapter
            .convert(ConvertRequest::new("a.mov", "a.mp4", vec![7]))
            .await
            .unwrap();
        assert_eq!(output.file_name, "a.mp4");
        assert_eq!(output.data, vec![7]);
    }
}
