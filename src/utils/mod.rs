//! Utility functions shared across the pipeline: logging setup and small
//! image helpers.

use crate::core::errors::PipelineError;
use image::RgbImage;

/// Initializes the global tracing subscriber.
///
/// Respects `RUST_LOG` when set; defaults to `info` otherwise. Call once at
/// process start.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Re-encodes an in-memory image as PNG bytes for engines that consume
/// encoded images.
pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>, PipelineError> {
    let mut bytes = Vec::new();
    image
        .write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageFormat::Png,
        )
        .map_err(|e| PipelineError::Internal {
            message: format!("png re-encode failed: {e}"),
        })?;
    Ok(bytes)
}
