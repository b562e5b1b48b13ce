//! Shared test utilities for the face-blur test suite.
//!
//! Provides synthetic images, encoded source files, and a session builder
//! wired to the recording mocks (`MockDetector`, `MockFilter`).
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let detector = Arc::new(MockDetector::returning(vec![face_at(0.4, 0.4, 0.2)]));
//! let mut session = test_session(detector.clone());
//! session.load_photos(vec![PhotoSource::from_image(gradient_image(200, 100))]);
//! session.wait_idle();
//!
//! assert_eq!(session.photo(0).unwrap().targets().len(), 1);
//! ```

use crate::detect::FaceObservation;
use crate::detect::tests::MockDetector;
use crate::geometry::NormalizedRect;
use crate::imaging::backend::tests::MockFilter;
use crate::session::Session;
use image::{DynamicImage, Rgba, RgbaImage};
use std::sync::Arc;

// =========================================================================
// Images
// =========================================================================

/// An RGBA image with a diagonal gradient, so blurring visibly changes it.
pub fn gradient_image(width: u32, height: u32) -> DynamicImage {
    let image = RgbaImage::from_fn(width, height, |x, y| {
        let r = (x * 255 / width.max(1)) as u8;
        let g = (y * 255 / height.max(1)) as u8;
        let b = ((x + y) % 256) as u8;
        Rgba([r, g, b, 255])
    });
    DynamicImage::ImageRgba8(image)
}

/// A flat RGBA image of one color.
pub fn solid_image(width: u32, height: u32, color: Rgba<u8>) -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, color))
}

// =========================================================================
// Detections
// =========================================================================

/// A confident square face observation with its bottom-left corner at
/// `(x, y)` (normalized).
pub fn face_at(x: f64, y: f64, side: f64) -> FaceObservation {
    FaceObservation::new(NormalizedRect::new(x, y, side, side), 0.95)
}

// =========================================================================
// Sessions
// =========================================================================

/// Blue-painting mock filter, shared so tests can inspect its requests.
pub fn painting_filter() -> Arc<MockFilter> {
    Arc::new(MockFilter::painting(Rgba([0, 0, 255, 255])))
}

/// A two-thread session around `detector` and a painting filter.
pub fn test_session(detector: Arc<MockDetector>) -> Session {
    Session::builder(detector, painting_filter())
        .threads(2)
        .build()
        .unwrap()
}
