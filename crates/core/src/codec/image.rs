//! HEIC/HEIF image codec adapter.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use super::engine::{EngineHandle, ImageEngine};
use super::error::ConvertError;
use super::mock::mock_jpeg;
use super::traits::CodecAdapter;
use super::types::{ConvertOutput, ConvertRequest};

/// Converts HEIC/HEIF stills to JPEG through the image codec engine.
///
/// The image decoder holds no cross-call state, so conversions through this
/// adapter may run concurrently; no exclusive-call guard is taken.
pub struct HeifImageCodec<E: ?Sized> {
    handle: Arc<EngineHandle<E>>,
}

impl<E: ImageEngine + ?Sized> HeifImageCodec<E> {
    pub fn new(handle: Arc<EngineHandle<E>>) -> Self {
        Self { handle }
    }

    async fn decode(&self, request: &ConvertRequest) -> Result<Vec<u8>, ConvertError> {
        let init = self.handle.initialize().await;
        if !init.is_usable() {
            return Err(ConvertError::EngineInitializationFailed {
                family: "image".to_string(),
            });
        }

        if init.is_native() {
            match self
                .handle
                .engine()
                .decode_to_jpeg(
                    &request.data,
                    request.options.jpg_quality,
                    request.options.keep_metadata,
                )
                .await
            {
                Ok(jpeg) => return Ok(jpeg),
                Err(e) if self.handle.mock_allowed() => {
                    warn!(
                        file = %request.input_file_name,
                        "image decode failed ({e}); using synthetic fallback output"
                    );
                }
                Err(e) => return Err(ConvertError::conversion_failed(e.to_string())),
            }
        }

        debug!(file = %request.input_file_name, "synthesizing fallback jpeg");
        Ok(mock_jpeg(request.data.len(), request.options.jpg_quality))
    }
}

#[async_trait]
impl<E: ImageEngine + ?Sized> CodecAdapter for HeifImageCodec<E> {
    fn name(&self) -> &str {
        "heif-image"
    }

    async fn initialize(&self) -> bool {
        self.handle.initialize().await.is_usable()
    }

    async fn convert(&self, request: ConvertRequest) -> Result<ConvertOutput, ConvertError> {
        if request.cancel.is_cancelled() {
            return Err(ConvertError::Cancelled);
        }
        request.progress.update(10, Some("converting"));

        let data = self.decode(&request).await?;

        if request.cancel.is_cancelled() {
            return Err(ConvertError::Cancelled);
        }
        request.progress.update(70, Some("generating jpeg"));
        request.progress.update(90, Some("finalizing"));

        Ok(ConvertOutput {
            file_name: request.output_file_name,
            data,
        })
    }
}
