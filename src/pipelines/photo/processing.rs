// SPDX-License-Identifier: MPL-2.0

//! Post-processing for rasterized frames
//!
//! - RGBA to RGB conversion (drop alpha channel)
//! - Optional horizontal mirroring for selfie-style output

use crate::errors::PhotoError;
use image::{RgbImage, RgbaImage};
use tracing::debug;

/// Post-processing configuration
#[derive(Debug, Clone, Default)]
pub struct PostProcessingConfig {
    /// Flip the still horizontally so it matches a mirrored preview
    pub mirror: bool,
}

/// Processed image data
pub struct ProcessedImage {
    pub image: RgbImage,
    pub width: u32,
    pub height: u32,
}

/// Post-processor for rasterized frames
pub struct PostProcessor {
    config: PostProcessingConfig,
}

impl PostProcessor {
    pub fn new(config: PostProcessingConfig) -> Self {
        Self { config }
    }

    /// Convert a raster to an RGB still ready for encoding
    pub fn process(&self, raster: &RgbaImage) -> Result<ProcessedImage, PhotoError> {
        let (width, height) = raster.dimensions();
        let mut rgb_image = Self::convert_rgba_to_rgb(raster.as_raw(), width, height)?;

        if self.config.mirror {
            image::imageops::flip_horizontal_in_place(&mut rgb_image);
        }

        debug!(width, height, mirror = self.config.mirror, "Post-processing complete");

        Ok(ProcessedImage {
            image: rgb_image,
            width,
            height,
        })
    }

    /// Convert RGBA data to RGB image (drop alpha channel)
    fn convert_rgba_to_rgb(rgba_data: &[u8], width: u32, height: u32) -> Result<RgbImage, PhotoError> {
        let pixels = width as usize * height as usize;
        let expected_size = pixels * 4;
        if rgba_data.len() < expected_size {
            return Err(PhotoError::InvalidFrame(format!(
                "RGBA data too small: expected {}, got {}",
                expected_size,
                rgba_data.len()
            )));
        }

        let rgb_data: Vec<u8> = rgba_data
            .chunks_exact(4)
            .take(pixels)
            .flat_map(|rgba| [rgba[0], rgba[1], rgba[2]])
            .collect();

        RgbImage::from_raw(width, height, rgb_data).ok_or_else(|| {
            PhotoError::InvalidFrame("Failed to create RGB image from converted data".to_string())
        })
    }
}
