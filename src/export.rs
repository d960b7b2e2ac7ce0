//! Lossless raster encoding of the composed canvas.
//!
//! The editor enforces the "anything visible?" precondition and hands the
//! rendered pixels here; what happens to the bytes afterwards (file, upload,
//! relay) is the caller's business.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, RgbaImage};
use log::error;

use crate::error::EditorError;

/// Encode the surface as PNG bytes.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, EditorError> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(image.clone())
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|err| {
            error!("PNG encode failed: {err}");
            EditorError::ExportFailed
        })?;
    Ok(bytes)
}
