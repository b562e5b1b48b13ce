//! Pure calculation functions for filter strength.
//!
//! Both strengths scale with image width so a given intensity looks the
//! same at any resolution.

use super::params::FilterParams;
use crate::settings::BlurStyle;

/// Smallest mosaic block, in pixels.
pub const MIN_PIXELLATE_BLOCK: f64 = 8.0;
/// Smallest gaussian radius, in pixels.
pub const MIN_GAUSSIAN_RADIUS: f64 = 2.0;

/// Mosaic block size: `max(8, width × intensity × 0.05)`.
///
/// # Examples
/// ```
/// # use face_blur::imaging::pixellate_block_size;
/// // 4000px wide at full intensity → 200px blocks
/// assert_eq!(pixellate_block_size(4000, 1.0), 200.0);
/// // tiny images never go below the floor
/// assert_eq!(pixellate_block_size(100, 0.5), 8.0);
/// ```
pub fn pixellate_block_size(image_width: u32, intensity: f64) -> f64 {
    (image_width as f64 * intensity * 0.05).max(MIN_PIXELLATE_BLOCK)
}

/// Gaussian radius: `max(2, width × intensity × 0.02)`.
///
/// # Examples
/// ```
/// # use face_blur::imaging::gaussian_radius;
/// assert_eq!(gaussian_radius(1000, 0.5), 10.0);
/// assert_eq!(gaussian_radius(50, 0.1), 2.0);
/// ```
pub fn gaussian_radius(image_width: u32, intensity: f64) -> f64 {
    (image_width as f64 * intensity * 0.02).max(MIN_GAUSSIAN_RADIUS)
}

/// Filter request for a whole image of `image_width` pixels.
pub fn filter_params(style: BlurStyle, intensity: f64, image_width: u32) -> FilterParams {
    let strength = match style {
        BlurStyle::Pixellate => pixellate_block_size(image_width, intensity),
        BlurStyle::Gaussian => gaussian_radius(image_width, intensity),
    };
    FilterParams { style, strength }
}
