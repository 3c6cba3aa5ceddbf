use image::ImageFormat;
use std::io::Cursor;

use super::OcrError;

/// Contrast boost applied after grayscale conversion.
const CONTRAST: f32 = 25.0;

/// Grayscale and contrast-stretch an image, re-encoded as PNG.
///
/// CPU bound; run it on the blocking pool.
pub fn enhance_image(data: &[u8]) -> Result<Vec<u8>, OcrError> {
    let img = image::load_from_memory(data).map_err(|e| OcrError::ImageError(e.to_string()))?;
    let enhanced = img.grayscale().adjust_contrast(CONTRAST);

    let mut buffer = Vec::new();
    let mut cursor = Cursor::new(&mut buffer);
    enhanced
        .write_to(&mut cursor, ImageFormat::Png)
        .map_err(|e| OcrError::ImageError(e.to_string()))?;

    Ok(buffer)
}
