//! Detection adapter: opaque face detector in, `Face` targets out.
//!
//! The detector itself is a collaborator behind [`FaceDetector`]. This module
//! owns what happens to its raw observations:
//!
//! 1. **Score** each observation from confidence and box size
//!    ([`detection_score`]). Small boxes are penalized so a confident
//!    detection of a speck of texture doesn't win over a clear face.
//! 2. **Threshold** against the user's setting. A threshold of zero keeps
//!    everything.
//! 3. **Convert** the bottom-left-origin unit box to image pixels and build a
//!    blurred [`BlurTarget`] centered on it.

use crate::geometry::{NormalizedRect, Size};
use crate::settings::clamp_unit;
use crate::target::BlurTarget;
use image::DynamicImage;
use thiserror::Error;
use tracing::debug;

/// Fraction of the larger box side used as the target's base radius.
pub const FACE_RADIUS_FACTOR: f64 = 0.6;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("face detector unavailable: {0}")]
    Unavailable(String),
    #[error("face detection failed: {0}")]
    Failed(String),
}

/// One raw detection: a unit-square box plus the detector's confidence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceObservation {
    /// Bottom-left-origin, fractions of the image dimensions.
    pub bounds: NormalizedRect,
    pub confidence: f64,
}

impl FaceObservation {
    pub fn new(bounds: NormalizedRect, confidence: f64) -> Self {
        Self { bounds, confidence }
    }
}

/// A face detection primitive.
///
/// `Sync` so one detector can serve every background job.
pub trait FaceDetector: Send + Sync {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<FaceObservation>, DetectorError>;
}

/// Combined score in `[0, 1]`: 70% confidence, 30% size.
///
/// The size term saturates once the box side (square root of its area)
/// reaches a quarter of the image.
///
/// # Examples
/// ```
/// # use face_blur::detect::{FaceObservation, detection_score};
/// # use face_blur::geometry::NormalizedRect;
/// let big = FaceObservation::new(NormalizedRect::new(0.0, 0.0, 0.5, 0.5), 1.0);
/// assert!((detection_score(&big) - 1.0).abs() < 1e-12);
/// ```
pub fn detection_score(observation: &FaceObservation) -> f64 {
    let size_term = (observation.bounds.area().max(0.0).sqrt() * 4.0).min(1.0);
    (observation.confidence * 0.7 + size_term * 0.3).min(1.0)
}

/// Whether an observation survives `threshold` (already clamped).
fn passes(observation: &FaceObservation, threshold: f64) -> bool {
    threshold <= 0.0 || detection_score(observation) >= threshold
}

/// Turn a surviving observation into a blurred `Face` target.
pub fn observation_to_target(observation: &FaceObservation, image_size: Size) -> BlurTarget {
    let rect = observation.bounds.to_pixels(image_size);
    let radius = rect.width.max(rect.height) * FACE_RADIUS_FACTOR;
    BlurTarget::face(rect.center(), radius)
}

/// Run `detector` on `image` and return the targets passing `threshold`.
///
/// `threshold` is clamped into `[0, 1]`. An image without pixels yields no
/// targets without consulting the detector. Detector errors are passed
/// through; callers decide how to degrade.
pub fn detect_targets(
    detector: &dyn FaceDetector,
    image: &DynamicImage,
    threshold: f64,
) -> Result<Vec<BlurTarget>, DetectorError> {
    let image_size = Size::from_pixels(image.width(), image.height());
    if image_size.is_degenerate() {
        return Ok(Vec::new());
    }

    let threshold = clamp_unit(threshold);
    let observations = detector.detect(image)?;
    let targets: Vec<BlurTarget> = observations
        .iter()
        .filter(|o| passes(o, threshold))
        .map(|o| observation_to_target(o, image_size))
        .collect();

    debug!(
        observed = observations.len(),
        kept = targets.len(),
        threshold,
        "face detection complete"
    );
    Ok(targets)
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::geometry::Point;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Detector returning a fixed list of observations, or an error.
    ///
    /// The list can be swapped between calls to simulate a detector whose
    /// output changes with the threshold.
    pub struct MockDetector {
        observations: Mutex<Result<Vec<FaceObservation>, String>>,
        calls: AtomicUsize,
    }

    impl MockDetector {
        pub fn returning(observations: Vec<FaceObservation>) -> Self {
            Self {
                observations: Mutex::new(Ok(observations)),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn failing(message: &str) -> Self {
            Self {
                observations: Mutex::new(Err(message.to_string())),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn set_observations(&self, observations: Vec<FaceObservation>) {
            *self.observations.lock().unwrap() = Ok(observations);
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl FaceDetector for MockDetector {
        fn detect(&self, _image: &DynamicImage) -> Result<Vec<FaceObservation>, DetectorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.observations
                .lock()
                .unwrap()
                .clone()
                .map_err(DetectorError::Failed)
        }
    }

    fn observation(x: f64, y: f64, w: f64, h: f64, confidence: f64) -> FaceObservation {
        FaceObservation::new(NormalizedRect::new(x, y, w, h), confidence)
    }

    // =========================================================================
    // Scoring
    // =========================================================================

    #[test]
    fn score_weights_confidence_and_size() {
        // side = 0.1 → size term 0.4
        let o = observation(0.0, 0.0, 0.1, 0.1, 0.5);
        assert!((detection_score(&o) - (0.35 + 0.12)).abs() < 1e-9);
    }

    #[test]
    fn score_is_capped_at_one() {
        let o = observation(0.0, 0.0, 1.0, 1.0, 3.0);
        assert_eq!(detection_score(&o), 1.0);
    }

    #[test]
    fn negative_area_counts_as_zero() {
        let o = observation(0.0, 0.0, -0.2, 0.2, 0.5);
        assert!((detection_score(&o) - 0.35).abs() < 1e-9);
    }

    // =========================================================================
    // Thresholding
    // =========================================================================

    #[test]
    fn zero_threshold_keeps_everything() {
        let detector = MockDetector::returning(vec![observation(0.0, 0.0, 0.01, 0.01, 0.0)]);
        let image = DynamicImage::new_rgba8(100, 100);
        assert_eq!(detect_targets(&detector, &image, 0.0).unwrap().len(), 1);
        assert_eq!(detect_targets(&detector, &image, -3.0).unwrap().len(), 1);
    }

    #[test]
    fn threshold_filters_low_scores() {
        let detector = MockDetector::returning(vec![
            observation(0.0, 0.0, 0.3, 0.3, 0.9),
            observation(0.5, 0.5, 0.01, 0.01, 0.1),
        ]);
        let image = DynamicImage::new_rgba8(100, 100);
        assert_eq!(detect_targets(&detector, &image, 0.5).unwrap().len(), 1);
    }

    #[test]
    fn threshold_above_one_is_clamped() {
        let detector = MockDetector::returning(vec![
            observation(0.0, 0.0, 0.5, 0.5, 2.0),
            observation(0.0, 0.0, 0.5, 0.5, 0.9),
        ]);
        let image = DynamicImage::new_rgba8(100, 100);
        // only the saturated score reaches the clamped threshold of 1.0
        assert_eq!(detect_targets(&detector, &image, 7.0).unwrap().len(), 1);
    }

    // =========================================================================
    // Conversion
    // =========================================================================

    #[test]
    fn converts_bottom_left_box_to_pixel_target() {
        // Box at bottom-left quarter of a 200×100 image
        let o = observation(0.0, 0.0, 0.5, 0.5, 1.0);
        let target = observation_to_target(&o, Size::new(200.0, 100.0));
        assert_eq!(target.center, Point::new(50.0, 75.0));
        assert!((target.base_radius - 60.0).abs() < 1e-9);
        assert!(target.is_face());
        assert!(target.is_blurred);
    }

    #[test]
    fn empty_image_skips_detector() {
        let detector = MockDetector::returning(vec![observation(0.0, 0.0, 0.5, 0.5, 1.0)]);
        let targets = detect_targets(&detector, &DynamicImage::new_rgba8(0, 0), 0.2).unwrap();
        assert!(targets.is_empty());
        assert_eq!(detector.calls(), 0);
    }

    #[test]
    fn detector_errors_pass_through() {
        let detector = MockDetector::failing("model missing");
        let result = detect_targets(&detector, &DynamicImage::new_rgba8(10, 10), 0.2);
        assert!(matches!(result, Err(DetectorError::Failed(msg)) if msg == "model missing"));
    }
}
