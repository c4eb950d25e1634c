//! Fixed-size gallery thumbnails.
//!
//! The source is scaled uniformly to fit a square canvas, centered, and
//! composited over a neutral dark background.

use super::{LibraryError, LibraryResult};
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;

/// Canvas color behind letterboxed or transparent artwork.
pub const THUMBNAIL_BACKGROUND: Rgba<u8> = Rgba([40, 40, 40, 255]);

/// Size of `width`x`height` scaled to fit inside a `side`x`side` square.
pub fn fit_within(width: u32, height: u32, side: u32) -> (u32, u32) {
    if width == 0 || height == 0 || side == 0 {
        return (0, 0);
    }
    let scale = (side as f64 / width as f64).min(side as f64 / height as f64);
    let w = ((width as f64 * scale) as u32).clamp(1, side);
    let h = ((height as f64 * scale) as u32).clamp(1, side);
    (w, h)
}

/// Render the thumbnail canvas for a decoded image.
pub fn render(source: &DynamicImage, side: u32) -> RgbaImage {
    let mut canvas = RgbaImage::from_pixel(side, side, THUMBNAIL_BACKGROUND);
    let (w, h) = fit_within(source.width(), source.height(), side);
    if w == 0 || h == 0 {
        return canvas;
    }
    let scaled = imageops::resize(&source.to_rgba8(), w, h, FilterType::Triangle);
    let x = (side - w) / 2;
    let y = (side - h) / 2;
    imageops::overlay(&mut canvas, &scaled, x as i64, y as i64);
    canvas
}

/// Decode image bytes and encode their thumbnail as PNG.
pub fn generate(bytes: &[u8], side: u32) -> LibraryResult<Vec<u8>> {
    if side == 0 {
        return Err(LibraryError::Storage("Thumbnail size must be positive".to_string()));
    }
    let source = image::load_from_memory(bytes)
        .map_err(|e| LibraryError::Decode(format!("Failed to decode image: {}", e)))?;
    let canvas = render(&source, side);

    let mut png = Vec::new();
    DynamicImage::ImageRgba8(canvas)
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| LibraryError::Storage(format!("Failed to encode thumbnail: {}", e)))?;
    Ok(png)
}
