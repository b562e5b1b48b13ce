//! Render engine: composite blurred circles onto a photo.
//!
//! One pass of the filter blurs the whole image; each blurred target then
//! copies the pixels of that blurred image lying inside its circle onto a
//! sharp copy of the base. Pixel membership is tested at pixel centers
//! (`x + 0.5`, `y + 0.5`) against the target's effective radius.
//!
//! Rendering never fails. When the filter declines, the sharp base comes
//! back unchanged.
//!
//! The output keeps the base's pixel format. Pixels outside every blurred
//! circle are copied untouched; pixels inside carry the filter's 8-bit
//! RGBA output converted into that format.

use crate::imaging::{BlurFilter, filter_params};
use crate::settings::BlurSettings;
use crate::target::BlurTarget;
use image::{DynamicImage, GenericImage, RgbaImage};
use std::sync::Arc;
use tracing::{debug, warn};

/// Render `targets` onto `base` with the current settings.
///
/// Returns `base` itself (same allocation) when there is nothing to blur or
/// the filter produced nothing; otherwise a new image.
pub fn render(
    base: &Arc<DynamicImage>,
    targets: &[BlurTarget],
    settings: &BlurSettings,
    filter: &dyn BlurFilter,
) -> Arc<DynamicImage> {
    if targets.is_empty() {
        return Arc::clone(base);
    }
    let blurred_targets: Vec<&BlurTarget> = targets.iter().filter(|t| t.is_blurred).collect();
    if blurred_targets.is_empty() {
        return Arc::clone(base);
    }

    let params = filter_params(settings.style, settings.intensity, base.width());
    let Some(blurred) = filter.blur(base, &params) else {
        warn!(
            style = settings.style.id(),
            strength = params.strength,
            "blur filter produced no image, showing original"
        );
        return Arc::clone(base);
    };
    let blurred = blurred.to_rgba8();
    if blurred.dimensions() != (base.width(), base.height()) {
        warn!("blur filter changed image size, showing original");
        return Arc::clone(base);
    }

    let mut canvas = (**base).clone();
    for target in &blurred_targets {
        composite_circle(&mut canvas, &blurred, target, settings.face_radius_scale);
    }

    debug!(
        targets = targets.len(),
        blurred = blurred_targets.len(),
        style = settings.style.id(),
        "rendered photo"
    );
    Arc::new(canvas)
}

/// Copy the pixels of `source` inside `target`'s circle onto `canvas`.
fn composite_circle(
    canvas: &mut DynamicImage,
    source: &RgbaImage,
    target: &BlurTarget,
    face_scale: f64,
) {
    let (width, height) = (canvas.width(), canvas.height());
    let bounds = target.bounding_rect(face_scale);
    let radius = bounds.width / 2.0;
    let center = bounds.center();

    // Clip the bounding square to the image
    let x0 = bounds.min_x().floor().max(0.0) as u32;
    let y0 = bounds.min_y().floor().max(0.0) as u32;
    let x1 = (bounds.max_x().ceil().max(0.0) as u32).min(width);
    let y1 = (bounds.max_y().ceil().max(0.0) as u32).min(height);

    let radius_sq = radius * radius;
    for y in y0..y1 {
        let dy = y as f64 + 0.5 - center.y;
        for x in x0..x1 {
            let dx = x as f64 + 0.5 - center.x;
            if dx * dx + dy * dy <= radius_sq {
                canvas.put_pixel(x, y, *source.get_pixel(x, y));
            }
        }
    }
}
