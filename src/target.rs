//! Blur targets: the regions a photo may have blurred.
//!
//! A target is either a detected [`TargetKind::Face`] or a user-placed
//! [`TargetKind::Manual`] circle. Face radii follow the user's face-radius
//! multiplier; manual radii are chosen directly and ignore it. Whatever the
//! kind, a target never renders smaller than [`MIN_RENDER_RADIUS`].

use crate::geometry::{Point, Rect};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Floor applied to every rendered radius, in image pixels.
pub const MIN_RENDER_RADIUS: f64 = 8.0;

static NEXT_TARGET_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a target, unique within the process.
///
/// Identity survives clones and snapshots: a target copied into a background
/// job comes back with the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(u64);

impl TargetId {
    pub fn next() -> Self {
        Self(NEXT_TARGET_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "target-{}", self.0)
    }
}

/// Where a target came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    /// Produced by face detection; scales with the face-radius multiplier.
    Face,
    /// Placed by the user; radius is independent of the multiplier.
    Manual,
}

/// A circular region of a photo that can be blurred.
#[derive(Debug, Clone, PartialEq)]
pub struct BlurTarget {
    pub id: TargetId,
    /// Center in image pixels.
    pub center: Point,
    /// Radius in image pixels before scaling and flooring.
    pub base_radius: f64,
    pub is_blurred: bool,
    pub kind: TargetKind,
}

impl BlurTarget {
    /// A new blurred target with a fresh id.
    pub fn new(center: Point, base_radius: f64, kind: TargetKind) -> Self {
        Self {
            id: TargetId::next(),
            center,
            base_radius,
            is_blurred: true,
            kind,
        }
    }

    pub fn face(center: Point, base_radius: f64) -> Self {
        Self::new(center, base_radius, TargetKind::Face)
    }

    pub fn manual(center: Point, base_radius: f64) -> Self {
        Self::new(center, base_radius, TargetKind::Manual)
    }

    pub fn with_blurred(mut self, is_blurred: bool) -> Self {
        self.is_blurred = is_blurred;
        self
    }

    pub fn is_face(&self) -> bool {
        self.kind == TargetKind::Face
    }

    pub fn is_manual(&self) -> bool {
        self.kind == TargetKind::Manual
    }

    /// Radius actually rendered and hit-tested.
    pub fn effective_radius(&self, face_scale: f64) -> f64 {
        let radius = match self.kind {
            TargetKind::Face => self.base_radius * face_scale,
            TargetKind::Manual => self.base_radius,
        };
        radius.max(MIN_RENDER_RADIUS)
    }

    /// Square bounding box of the rendered circle.
    pub fn bounding_rect(&self, face_scale: f64) -> Rect {
        Rect::centered_square(self.center, self.effective_radius(face_scale))
    }
}
