//! Image encoding: `DynamicImage` → base64 JPEG wrapped in [`EncodedImagePart`].
//!
//! Gemini accepts inline images as base64 strings tagged with a MIME type.
//! The page is flattened to RGB first because JPEG has no alpha channel and
//! pdfium hands back RGBA bitmaps.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use tracing::debug;

/// MIME type of every encoded page.
pub const JPEG_MIME_TYPE: &str = "image/jpeg";

/// A rasterised page ready to be embedded in a multimodal request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedImagePart {
    /// Always [`JPEG_MIME_TYPE`].
    pub mime_type: String,
    /// Standard base64 (padded) of the JPEG bytes.
    pub data: String,
}

impl EncodedImagePart {
    /// Wrap already-encoded JPEG bytes.
    pub fn from_jpeg_bytes(jpeg: &[u8]) -> Self {
        Self {
            mime_type: JPEG_MIME_TYPE.to_string(),
            data: STANDARD.encode(jpeg),
        }
    }

    /// Decode the payload back into JPEG bytes.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(&self.data)
    }
}

/// Encode a rasterised page as a base64 JPEG.
pub fn encode_page(img: &DynamicImage) -> Result<EncodedImagePart, image::ImageError> {
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());

    let mut buf = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Jpeg)?;

    let part = EncodedImagePart::from_jpeg_bytes(&buf);
    debug!(
        "Encoded {}x{} page → {} bytes JPEG, {} bytes base64",
        img.width(),
        img.height(),
        buf.len(),
        part.data.len()
    );

    Ok(part)
}
