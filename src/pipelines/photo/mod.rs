// SPDX-License-Identifier: MPL-2.0

//! Still capture pipeline
//!
//! ```text
//! Render surface → Raster (RGBA) → Post-Processing → JPEG → data URI
//! ```
//!
//! Runs synchronously on the already-decoded frame; nothing here waits on
//! hardware.

pub mod encoding;
pub mod processing;

pub use encoding::{
    CapturedImage, EncodingQuality, PhotoEncoder, decode_data_uri, encode_data_uri,
};
pub use processing::{PostProcessingConfig, PostProcessor, ProcessedImage};

use crate::config::Config;
use crate::errors::PhotoError;
use image::RgbaImage;
use tracing::info;

/// Complete still pipeline: process then encode
pub struct PhotoPipeline {
    post_processor: PostProcessor,
    encoder: PhotoEncoder,
}

impl PhotoPipeline {
    pub fn new(config: &Config) -> Self {
        Self {
            post_processor: PostProcessor::new(PostProcessingConfig {
                mirror: config.mirror_capture,
            }),
            encoder: PhotoEncoder::new(config.jpeg_quality),
        }
    }

    /// Turn a raster of the current frame into an encoded still
    pub fn capture(&self, raster: &RgbaImage) -> Result<CapturedImage, PhotoError> {
        info!(
            width = raster.width(),
            height = raster.height(),
            "Encoding captured frame"
        );
        let processed = self.post_processor.process(raster)?;
        self.encoder.encode(processed)
    }
}

impl Default for PhotoPipeline {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}
