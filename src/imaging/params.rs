//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the render engine (which decides how strong a blur the
//! current settings call for) and the [`backend`](super::backend) (which does
//! the pixel work). This separation allows swapping the filter (e.g. for a
//! recording mock in tests) without changing render logic.
//!
//! ## Types
//!
//! - [`FilterParams`]: style plus the numeric strength the filter receives.
//! - [`JpegQuality`]: lossy encoding quality (1-100, default 95). Clamped on construction.

use crate::settings::BlurStyle;

/// A full-image blur request.
///
/// `strength` means different things per style:
/// - `Pixellate`: mosaic block edge length in pixels
/// - `Gaussian`: blur radius (standard deviation) in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterParams {
    pub style: BlurStyle,
    pub strength: f64,
}

/// Quality setting for JPEG encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JpegQuality(u8);

impl JpegQuality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for JpegQuality {
    fn default() -> Self {
        Self(95)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(JpegQuality::new(0).value(), 1);
        assert_eq!(JpegQuality::new(50).value(), 50);
        assert_eq!(JpegQuality::new(150).value(), 100);
    }

    #[test]
    fn quality_default_is_95() {
        assert_eq!(JpegQuality::default().value(), 95);
    }
}
