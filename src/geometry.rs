//! Planar geometry shared by every stage.
//!
//! Two coordinate spaces appear throughout the crate:
//!
//! - **Image space**: pixels of the source photo, origin top-left, y down.
//! - **Screen space**: logical units of the viewport the photo is shown in.
//!
//! Detectors report a third, [`NormalizedRect`], which is unit-square and
//! bottom-left-origin; [`NormalizedRect::to_pixels`] is the only place that
//! flip happens.
//!
//! All functions here are pure and free of I/O.

use serde::{Deserialize, Serialize};

/// A point in image or screen space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance between two points.
    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Translate by an offset.
    pub fn offset(self, by: Vector) -> Point {
        Point::new(self.x + by.dx, self.y + by.dy)
    }
}

/// A 2D displacement (pan offsets, drag translations).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector {
    pub dx: f64,
    pub dy: f64,
}

impl Vector {
    pub const ZERO: Vector = Vector { dx: 0.0, dy: 0.0 };

    pub const fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }
}

impl std::ops::Add for Vector {
    type Output = Vector;

    fn add(self, rhs: Vector) -> Vector {
        Vector::new(self.dx + rhs.dx, self.dy + rhs.dy)
    }
}

/// Width and height.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Size of a pixel buffer.
    pub fn from_pixels(width: u32, height: u32) -> Self {
        Self::new(width as f64, height as f64)
    }

    pub fn min_dimension(self) -> f64 {
        self.width.min(self.height)
    }

    pub fn scaled(self, factor: f64) -> Size {
        Size::new(self.width * factor, self.height * factor)
    }

    /// True when either side is zero, negative or not finite.
    pub fn is_degenerate(self) -> bool {
        !(self.width.is_finite() && self.height.is_finite())
            || self.width <= 0.0
            || self.height <= 0.0
    }
}

/// Axis-aligned rectangle, origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_origin_size(origin: Point, size: Size) -> Self {
        Self::new(origin.x, origin.y, size.width, size.height)
    }

    /// Square of side `2 * half_extent` centered on `center`.
    pub fn centered_square(center: Point, half_extent: f64) -> Self {
        Self::new(
            center.x - half_extent,
            center.y - half_extent,
            half_extent * 2.0,
            half_extent * 2.0,
        )
    }

    pub fn min_x(&self) -> f64 {
        self.x
    }

    pub fn min_y(&self) -> f64 {
        self.y
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    pub fn mid_x(&self) -> f64 {
        self.x + self.width / 2.0
    }

    pub fn mid_y(&self) -> f64 {
        self.y + self.height / 2.0
    }

    pub fn center(&self) -> Point {
        Point::new(self.mid_x(), self.mid_y())
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Inclusive containment: points on any edge are inside.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.min_x()
            && point.x <= self.max_x()
            && point.y >= self.min_y()
            && point.y <= self.max_y()
    }
}

/// Clamp a point into `[0, width] x [0, height]`.
pub fn clamp_point(point: Point, bounds: Size) -> Point {
    Point::new(
        point.x.max(0.0).min(bounds.width),
        point.y.max(0.0).min(bounds.height),
    )
}

/// Largest rect with the aspect ratio of `aspect` that fits inside `container`,
/// centered in it (letterboxing).
///
/// Returns a zero-sized rect at the container center if `aspect` is degenerate.
pub fn aspect_fit(aspect: Size, container: Rect) -> Rect {
    if aspect.is_degenerate() {
        return Rect::new(container.mid_x(), container.mid_y(), 0.0, 0.0);
    }
    let scale = (container.width / aspect.width).min(container.height / aspect.height);
    let fitted = aspect.scaled(scale.max(0.0));
    Rect::new(
        container.mid_x() - fitted.width / 2.0,
        container.mid_y() - fitted.height / 2.0,
        fitted.width,
        fitted.height,
    )
}

/// A unit-square rectangle as reported by face detectors.
///
/// Origin is the **bottom-left** corner and all values are fractions of the
/// image dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizedRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl NormalizedRect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    /// Convert to a top-left-origin pixel rect for an image of `image_size`.
    pub fn to_pixels(&self, image_size: Size) -> Rect {
        Rect::new(
            self.x * image_size.width,
            (1.0 - self.max_y()) * image_size.height,
            self.width * image_size.width,
            self.height * image_size.height,
        )
    }
}
