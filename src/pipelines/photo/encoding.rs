// SPDX-License-Identifier: GPL-3.0-only

//! Still encoding
//!
//! Encodes processed stills as JPEG and moves them between byte buffers and
//! `data:` URIs, the form in which the host form stores its picture field.

use super::processing::ProcessedImage;
use crate::constants::capture;
use crate::errors::PhotoError;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Local};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Encoding quality settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EncodingQuality {
    /// Low quality (high compression)
    Low,
    /// Medium quality (balanced)
    Medium,
    /// High quality (low compression)
    #[default]
    High,
    /// Maximum quality (minimal compression)
    Maximum,
}

impl EncodingQuality {
    /// Get JPEG quality value (0-100)
    pub fn jpeg_quality(&self) -> u8 {
        match self {
            EncodingQuality::Low => 60,
            EncodingQuality::Medium => 80,
            EncodingQuality::High => 92,
            EncodingQuality::Maximum => 98,
        }
    }
}

/// Encoded still handed to the host
#[derive(Clone)]
pub struct CapturedImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub captured_at: DateTime<Local>,
}

impl CapturedImage {
    /// `data:image/jpeg;base64,...`
    pub fn to_data_uri(&self) -> String {
        encode_data_uri(capture::MIME_TYPE, &self.data)
    }
}

impl std::fmt::Debug for CapturedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapturedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .field("captured_at", &self.captured_at)
            .finish()
    }
}

/// JPEG encoder for captured stills
pub struct PhotoEncoder {
    quality: EncodingQuality,
}

impl PhotoEncoder {
    pub fn new(quality: EncodingQuality) -> Self {
        Self { quality }
    }

    /// Encode a processed still
    pub fn encode(&self, processed: ProcessedImage) -> Result<CapturedImage, PhotoError> {
        let data = Self::encode_jpeg(&processed.image, self.quality)?;
        debug!(size = data.len(), quality = ?self.quality, "Encoding complete");

        Ok(CapturedImage {
            data,
            width: processed.width,
            height: processed.height,
            captured_at: Local::now(),
        })
    }

    fn encode_jpeg(image: &RgbImage, quality: EncodingQuality) -> Result<Vec<u8>, PhotoError> {
        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);

        let mut encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, quality.jpeg_quality());

        encoder
            .encode(
                image.as_raw(),
                image.width(),
                image.height(),
                image::ExtendedColorType::Rgb8,
            )
            .map_err(|e| PhotoError::EncodingFailed(format!("JPEG encoding failed: {}", e)))?;

        Ok(buffer)
    }
}

impl Default for PhotoEncoder {
    fn default() -> Self {
        Self::new(EncodingQuality::default())
    }
}

/// Build a base64 `data:` URI
pub fn encode_data_uri(mime: &str, data: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(data))
}

/// Split a base64 `data:` URI into its MIME type and decoded bytes
pub fn decode_data_uri(uri: &str) -> Result<(String, Vec<u8>), PhotoError> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| PhotoError::InvalidDataUri("missing data: scheme".to_string()))?;
    let (mime, payload) = rest
        .split_once(";base64,")
        .ok_or_else(|| PhotoError::InvalidDataUri("not base64 encoded".to_string()))?;
    let data = STANDARD
        .decode(payload)
        .map_err(|e| PhotoError::InvalidDataUri(e.to_string()))?;
    Ok((mime.to_string(), data))
}
