//! Pure Rust blur filter and JPEG codec, built on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP) | `image::load_from_memory` |
//! | Gaussian blur | `image::imageops::blur` |
//! | Pixellate | block averaging over `RgbaImage` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` |

use super::backend::{BackendError, BlurFilter};
use super::params::{FilterParams, JpegQuality};
use crate::settings::BlurStyle;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageEncoder, Rgba, RgbaImage};

/// Pure Rust blur filter using the `image` crate.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl BlurFilter for RustBackend {
    fn blur(&self, image: &DynamicImage, params: &FilterParams) -> Option<DynamicImage> {
        if image.width() == 0 || image.height() == 0 || !params.strength.is_finite() {
            return None;
        }
        let rgba = image.to_rgba8();
        let blurred = match params.style {
            BlurStyle::Pixellate => pixellate(&rgba, params.strength.round().max(1.0) as u32),
            BlurStyle::Gaussian => image::imageops::blur(&rgba, params.strength as f32),
        };
        Some(DynamicImage::ImageRgba8(blurred))
    }
}

/// Replace each `block`×`block` tile with its average color.
///
/// Tiles start at the top-left corner; edge tiles are truncated.
fn pixellate(image: &RgbaImage, block: u32) -> RgbaImage {
    let (width, height) = image.dimensions();
    let mut output = RgbaImage::new(width, height);

    for tile_y in (0..height).step_by(block as usize) {
        for tile_x in (0..width).step_by(block as usize) {
            let tile_w = block.min(width - tile_x);
            let tile_h = block.min(height - tile_y);

            let mut sums = [0u64; 4];
            for y in tile_y..tile_y + tile_h {
                for x in tile_x..tile_x + tile_w {
                    let pixel = image.get_pixel(x, y);
                    for (sum, channel) in sums.iter_mut().zip(pixel.0) {
                        *sum += channel as u64;
                    }
                }
            }
            let count = (tile_w as u64) * (tile_h as u64);
            let average = Rgba(sums.map(|sum| (sum / count) as u8));

            for y in tile_y..tile_y + tile_h {
                for x in tile_x..tile_x + tile_w {
                    output.put_pixel(x, y, average);
                }
            }
        }
    }
    output
}

/// Decode an image from raw file bytes.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, BackendError> {
    image::load_from_memory(bytes)
        .map_err(|e| BackendError::ProcessingFailed(format!("Failed to decode image: {}", e)))
}

/// Encode as baseline JPEG. Alpha is dropped.
pub fn encode_jpeg(image: &DynamicImage, quality: JpegQuality) -> Result<Vec<u8>, BackendError> {
    let rgb = image.to_rgb8();
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality.value())
        .write_image(
            rgb.as_raw(),
            rgb.width(),
            rgb.height(),
            image::ExtendedColorType::Rgb8,
        )
        .map_err(|e| BackendError::ProcessingFailed(format!("JPEG encode failed: {}", e)))?;
    Ok(buffer)
}
