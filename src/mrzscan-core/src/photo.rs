//! One-shot photo post-processing

use std::borrow::Cow;

use image::codecs::jpeg::JpegEncoder;
use mrzscan_processing::crop_to_cutout;
use tracing::debug;

use crate::error::ScanError;

const JPEG_QUALITY: u8 = 100;

/// Decode a captured still, optionally crop it to the whole document, and
/// re-encode it as JPEG
pub fn finish_photo(encoded: &[u8], crop: bool) -> Result<Vec<u8>, ScanError> {
    let photo = image::load_from_memory(encoded)
        .map_err(|e| ScanError::Capture(format!("failed to decode photo: {}", e)))?;

    let photo = if crop {
        crop_to_cutout(&photo, false)
    } else {
        Cow::Borrowed(&photo)
    };
    debug!("encoding {}x{} photo", photo.width(), photo.height());

    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY)
        .encode_image(&photo.to_rgb8())
        .map_err(|e| ScanError::Capture(format!("failed to encode photo: {}", e)))?;

    Ok(jpeg)
}
