//! Viewport transform and hit-testing.
//!
//! The photo is letterboxed into a container (the *base rect*), then zoomed
//! about the container center and panned. Everything the user touches
//! arrives in container coordinates and has to be mapped back into image
//! pixels before it can hit a target or place one.
//!
//! ## Gestures
//!
//! Zoom and pan each keep a committed value (from the last finished gesture)
//! and a live value (during the gesture):
//!
//! ```text
//! AtRest ──begin_zoom──▶ Zooming ──end_zoom──▶ AtRest   (commit zoom)
//! AtRest ──begin_pan───▶ Panning ──end_pan───▶ AtRest   (commit offset)
//! ```
//!
//! - Zoom is `committed × magnification`, clamped to `[1, 4]`. Landing on
//!   exactly 1 recenters the photo.
//! - Pan is ignored until the photo is zoomed in, and is clamped so the photo
//!   can overshoot the container edge by at most [`PAN_OVERSHOOT`] units.

use crate::geometry::{Point, Rect, Size, Vector};
use crate::target::{BlurTarget, TargetId, TargetKind};

pub const MIN_ZOOM: f64 = 1.0;
pub const MAX_ZOOM: f64 = 4.0;
/// How far past the container edge a zoomed photo may be dragged.
pub const PAN_OVERSHOOT: f64 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GestureState {
    #[default]
    AtRest,
    Zooming,
    Panning,
}

/// Zoom and pan state of the editor view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    zoom: f64,
    committed_zoom: f64,
    offset: Vector,
    committed_offset: Vector,
    state: GestureState,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            zoom: MIN_ZOOM,
            committed_zoom: MIN_ZOOM,
            offset: Vector::ZERO,
            committed_offset: Vector::ZERO,
            state: GestureState::AtRest,
        }
    }
}

impl Viewport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn offset(&self) -> Vector {
        self.offset
    }

    pub fn state(&self) -> GestureState {
        self.state
    }

    /// Back to unzoomed and centered, e.g. when the current photo changes.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn begin_zoom(&mut self) {
        self.state = GestureState::Zooming;
    }

    /// Apply a pinch `magnification` relative to the committed zoom.
    pub fn update_zoom(&mut self, magnification: f64) {
        if !magnification.is_finite() {
            return;
        }
        self.state = GestureState::Zooming;
        self.zoom = (self.committed_zoom * magnification).clamp(MIN_ZOOM, MAX_ZOOM);
        if self.zoom == MIN_ZOOM {
            self.offset = Vector::ZERO;
            self.committed_offset = Vector::ZERO;
        }
    }

    pub fn end_zoom(&mut self) {
        self.committed_zoom = self.zoom;
        self.state = GestureState::AtRest;
    }

    pub fn begin_pan(&mut self) {
        if self.zoom > MIN_ZOOM {
            self.state = GestureState::Panning;
        }
    }

    /// Apply a drag `translation` relative to the committed offset.
    pub fn update_pan(&mut self, translation: Vector, base_rect: Rect, container: Rect) {
        if self.zoom <= MIN_ZOOM {
            return;
        }
        self.state = GestureState::Panning;
        let proposed = self.committed_offset + translation;
        self.offset = clamped_offset(proposed, base_rect.size(), container.size(), self.zoom);
    }

    pub fn end_pan(&mut self) {
        if self.zoom > MIN_ZOOM {
            self.committed_offset = self.offset;
        }
        self.state = GestureState::AtRest;
    }

    /// Where the photo is drawn right now, in container coordinates.
    pub fn display_rect(&self, base_rect: Rect, container: Rect) -> Rect {
        current_display_rect(base_rect, container, self.zoom, self.offset)
    }
}

/// Zoomed base rect, centered in `container` and shifted by `offset`.
pub fn current_display_rect(base_rect: Rect, container: Rect, zoom: f64, offset: Vector) -> Rect {
    let size = base_rect.size().scaled(zoom);
    let center = container.center();
    Rect::new(
        center.x - size.width / 2.0 + offset.dx,
        center.y - size.height / 2.0 + offset.dy,
        size.width,
        size.height,
    )
}

/// Limit `offset` so the zoomed photo overshoots the container by at most
/// [`PAN_OVERSHOOT`] on each side.
pub fn clamped_offset(offset: Vector, base: Size, container: Size, zoom: f64) -> Vector {
    let scaled = base.scaled(zoom);
    let limit_x = ((scaled.width - container.width) / 2.0).max(0.0) + PAN_OVERSHOOT;
    let limit_y = ((scaled.height - container.height) / 2.0).max(0.0) + PAN_OVERSHOOT;
    Vector::new(
        offset.dx.clamp(-limit_x, limit_x),
        offset.dy.clamp(-limit_y, limit_y),
    )
}

/// A target's circle as drawn over the photo.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayCircle {
    pub target: TargetId,
    pub center: Point,
    pub diameter: f64,
    pub is_blurred: bool,
    pub kind: TargetKind,
}

/// The photo as currently displayed: where it sits in the container and
/// how large it really is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayMapping {
    pub display_rect: Rect,
    pub image_size: Size,
}

impl DisplayMapping {
    pub fn new(display_rect: Rect, image_size: Size) -> Self {
        Self {
            display_rect,
            image_size,
        }
    }

    /// Map a container point into image pixels.
    ///
    /// `None` outside the display rect (edges count as inside) or when
    /// either rect is degenerate.
    pub fn to_image_point(&self, point: Point) -> Option<Point> {
        let rect = &self.display_rect;
        if rect.size().is_degenerate() || self.image_size.is_degenerate() || !rect.contains(point) {
            return None;
        }
        let relative_x = (point.x - rect.min_x()) / rect.width;
        let relative_y = (point.y - rect.min_y()) / rect.height;
        Some(Point::new(
            relative_x * self.image_size.width,
            relative_y * self.image_size.height,
        ))
    }

    /// The target under a container point, preferring the nearest center.
    ///
    /// A target is hit when the image point lies within its effective
    /// radius. `kind` restricts candidates to one kind.
    pub fn hit_test<'a>(
        &self,
        point: Point,
        targets: &'a [BlurTarget],
        face_scale: f64,
        kind: Option<TargetKind>,
    ) -> Option<&'a BlurTarget> {
        let image_point = self.to_image_point(point)?;
        targets
            .iter()
            .filter(|t| kind.is_none_or(|k| t.kind == k))
            .map(|t| (t, t.center.distance(image_point)))
            .filter(|(t, distance)| *distance <= t.effective_radius(face_scale))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(t, _)| t)
    }

    /// Project a target into container coordinates for drawing.
    pub fn overlay_circle(&self, target: &BlurTarget, face_scale: f64) -> Option<OverlayCircle> {
        let scale = self.display_rect.width / self.image_size.width;
        if !scale.is_finite() {
            return None;
        }
        let rect = &self.display_rect;
        let center = Point::new(
            rect.min_x() + target.center.x / self.image_size.width * rect.width,
            rect.min_y() + target.center.y / self.image_size.height * rect.height,
        );
        let diameter = target.effective_radius(face_scale) * scale * 2.0;
        if !center.x.is_finite() || !center.y.is_finite() {
            return None;
        }
        Some(OverlayCircle {
            target: target.id,
            center,
            diameter,
            is_blurred: target.is_blurred,
            kind: target.kind,
        })
    }

    pub fn overlay_circles(&self, targets: &[BlurTarget], face_scale: f64) -> Vec<OverlayCircle> {
        targets
            .iter()
            .filter_map(|t| self.overlay_circle(t, face_scale))
            .collect()
    }
}

/// Whether taps place manual targets or toggle existing ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditMode {
    #[default]
    Toggle,
    PlaceManual,
}

/// What a tap or long press asks the editor to do.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TapAction {
    /// Flip a target's blurred flag.
    Toggle(TargetId),
    /// Select a manual target for resizing or removal.
    SelectManual(TargetId),
    /// Place a new manual target at this image point.
    PlaceManual(Point),
    None,
}

/// Resolve a tap at container point `point`.
pub fn resolve_tap(
    mapping: &DisplayMapping,
    point: Point,
    targets: &[BlurTarget],
    face_scale: f64,
    mode: EditMode,
) -> TapAction {
    match mode {
        EditMode::PlaceManual => {
            if let Some(target) = mapping.hit_test(point, targets, face_scale, Some(TargetKind::Manual)) {
                TapAction::SelectManual(target.id)
            } else if let Some(image_point) = mapping.to_image_point(point) {
                TapAction::PlaceManual(image_point)
            } else {
                TapAction::None
            }
        }
        EditMode::Toggle => mapping
            .hit_test(point, targets, face_scale, None)
            .map_or(TapAction::None, |t| TapAction::Toggle(t.id)),
    }
}

/// Resolve a long press: only manual targets respond, by being selected.
pub fn resolve_long_press(
    mapping: &DisplayMapping,
    point: Point,
    targets: &[BlurTarget],
    face_scale: f64,
) -> TapAction {
    mapping
        .hit_test(point, targets, face_scale, Some(TargetKind::Manual))
        .map_or(TapAction::None, |t| TapAction::SelectManual(t.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::aspect_fit;

    fn container() -> Rect {
        Rect::new(0.0, 0.0, 400.0, 400.0)
    }

    /// 200×100 image letterboxed into a 400×400 container → 400×200 base.
    fn base_rect() -> Rect {
        aspect_fit(Size::new(200.0, 100.0), container())
    }

    fn mapping() -> DisplayMapping {
        DisplayMapping::new(Rect::new(0.0, 0.0, 200.0, 100.0), Size::new(200.0, 100.0))
    }

    // =========================================================================
    // Zoom and pan
    // =========================================================================

    #[test]
    fn zoom_is_relative_to_committed_and_clamped() {
        let mut viewport = Viewport::new();
        viewport.begin_zoom();
        viewport.update_zoom(2.0);
        assert_eq!(viewport.zoom(), 2.0);
        assert_eq!(viewport.state(), GestureState::Zooming);
        viewport.end_zoom();
        assert_eq!(viewport.state(), GestureState::AtRest);

        viewport.begin_zoom();
        viewport.update_zoom(3.0);
        assert_eq!(viewport.zoom(), MAX_ZOOM);
        viewport.update_zoom(0.1);
        assert_eq!(viewport.zoom(), MIN_ZOOM);
    }

    #[test]
    fn zoom_back_to_one_recenters() {
        let mut viewport = Viewport::new();
        viewport.update_zoom(3.0);
        viewport.end_zoom();
        viewport.update_pan(Vector::new(50.0, 20.0), base_rect(), container());
        viewport.end_pan();
        assert_ne!(viewport.offset(), Vector::ZERO);

        viewport.update_zoom(0.2);
        assert_eq!(viewport.offset(), Vector::ZERO);
        viewport.end_zoom();
        viewport.update_pan(Vector::new(10.0, 10.0), base_rect(), container());
        assert_eq!(viewport.offset(), Vector::ZERO);
    }

    #[test]
    fn pan_ignored_when_not_zoomed() {
        let mut viewport = Viewport::new();
        viewport.begin_pan();
        assert_eq!(viewport.state(), GestureState::AtRest);
        viewport.update_pan(Vector::new(30.0, 30.0), base_rect(), container());
        viewport.end_pan();
        assert_eq!(viewport.offset(), Vector::ZERO);
    }

    #[test]
    fn pan_accumulates_across_gestures() {
        let mut viewport = Viewport::new();
        viewport.update_zoom(2.0);
        viewport.end_zoom();

        viewport.begin_pan();
        viewport.update_pan(Vector::new(10.0, 5.0), base_rect(), container());
        viewport.update_pan(Vector::new(20.0, 5.0), base_rect(), container());
        viewport.end_pan();
        viewport.update_pan(Vector::new(5.0, 0.0), base_rect(), container());
        assert_eq!(viewport.offset(), Vector::new(25.0, 5.0));
    }

    #[test]
    fn offset_clamp_limits() {
        // 400×200 base at 2× → 800×400 in a 400×400 container
        let size = base_rect().size();
        let clamped = clamped_offset(Vector::new(1000.0, -1000.0), size, container().size(), 2.0);
        assert_eq!(clamped, Vector::new(240.0, -40.0));
    }

    #[test]
    fn display_rect_centers_then_offsets() {
        let rect = current_display_rect(base_rect(), container(), 2.0, Vector::new(10.0, -5.0));
        assert_eq!(rect, Rect::new(-190.0, -5.0, 800.0, 400.0));
    }

    #[test]
    fn unzoomed_display_rect_is_base_rect() {
        let viewport = Viewport::new();
        assert_eq!(viewport.display_rect(base_rect(), container()), base_rect());
    }

    // =========================================================================
    // Image point conversion
    // =========================================================================

    #[test]
    fn conversion_is_inclusive_on_edges() {
        let m = DisplayMapping::new(Rect::new(100.0, 50.0, 200.0, 100.0), Size::new(400.0, 200.0));
        assert_eq!(m.to_image_point(Point::new(100.0, 50.0)), Some(Point::new(0.0, 0.0)));
        assert_eq!(m.to_image_point(Point::new(300.0, 150.0)), Some(Point::new(400.0, 200.0)));
        assert_eq!(m.to_image_point(Point::new(200.0, 100.0)), Some(Point::new(200.0, 100.0)));
    }

    #[test]
    fn conversion_outside_by_one_is_none() {
        let m = DisplayMapping::new(Rect::new(100.0, 50.0, 200.0, 100.0), Size::new(400.0, 200.0));
        assert_eq!(m.to_image_point(Point::new(301.0, 100.0)), None);
        assert_eq!(m.to_image_point(Point::new(200.0, 49.0)), None);
    }

    #[test]
    fn conversion_with_degenerate_rect_is_none() {
        let m = DisplayMapping::new(Rect::new(0.0, 0.0, 0.0, 100.0), Size::new(400.0, 200.0));
        assert_eq!(m.to_image_point(Point::new(0.0, 10.0)), None);
    }

    // =========================================================================
    // Hit testing
    // =========================================================================

    #[test]
    fn overlapping_targets_pick_nearest() {
        let far = BlurTarget::face(Point::new(110.0, 50.0), 30.0);
        let near = BlurTarget::face(Point::new(95.0, 50.0), 30.0);
        let targets = vec![far, near.clone()];

        let hit = mapping().hit_test(Point::new(100.0, 50.0), &targets, 1.0, None);
        assert_eq!(hit.map(|t| t.id), Some(near.id));
    }

    #[test]
    fn hit_respects_effective_radius() {
        let target = BlurTarget::face(Point::new(100.0, 50.0), 10.0);
        let targets = vec![target];
        assert!(mapping().hit_test(Point::new(115.0, 50.0), &targets, 1.0, None).is_none());
        assert!(mapping().hit_test(Point::new(115.0, 50.0), &targets, 2.0, None).is_some());
    }

    #[test]
    fn hit_kind_filter() {
        let face = BlurTarget::face(Point::new(100.0, 50.0), 20.0);
        let targets = vec![face];
        let m = mapping();
        assert!(m.hit_test(Point::new(100.0, 50.0), &targets, 1.0, Some(TargetKind::Manual)).is_none());
        assert!(m.hit_test(Point::new(100.0, 50.0), &targets, 1.0, Some(TargetKind::Face)).is_some());
    }

    #[test]
    fn hit_outside_display_is_none() {
        let targets = vec![BlurTarget::face(Point::new(0.0, 0.0), 50.0)];
        assert!(mapping().hit_test(Point::new(-1.0, 0.0), &targets, 1.0, None).is_none());
    }

    // =========================================================================
    // Overlay and taps
    // =========================================================================

    #[test]
    fn overlay_scales_with_display() {
        let m = DisplayMapping::new(Rect::new(10.0, 20.0, 400.0, 200.0), Size::new(200.0, 100.0));
        let target = BlurTarget::manual(Point::new(50.0, 25.0), 10.0);
        let circle = m.overlay_circle(&target, 1.0).unwrap();
        assert_eq!(circle.center, Point::new(110.0, 70.0));
        assert_eq!(circle.diameter, 40.0);
        assert_eq!(circle.target, target.id);
    }

    #[test]
    fn overlay_of_empty_image_is_none() {
        let m = DisplayMapping::new(Rect::new(0.0, 0.0, 100.0, 100.0), Size::new(0.0, 0.0));
        let target = BlurTarget::manual(Point::new(0.0, 0.0), 10.0);
        assert!(m.overlay_circle(&target, 1.0).is_none());
    }

    #[test]
    fn tap_toggles_any_target() {
        let face = BlurTarget::face(Point::new(100.0, 50.0), 20.0);
        let targets = vec![face.clone()];
        let action = resolve_tap(&mapping(), Point::new(100.0, 50.0), &targets, 1.0, EditMode::Toggle);
        assert_eq!(action, TapAction::Toggle(face.id));

        let miss = resolve_tap(&mapping(), Point::new(10.0, 10.0), &targets, 1.0, EditMode::Toggle);
        assert_eq!(miss, TapAction::None);
    }

    #[test]
    fn manual_mode_selects_or_places() {
        let manual = BlurTarget::manual(Point::new(150.0, 50.0), 10.0);
        let face = BlurTarget::face(Point::new(50.0, 50.0), 20.0);
        let targets = vec![manual.clone(), face];
        let m = mapping();

        assert_eq!(
            resolve_tap(&m, Point::new(150.0, 50.0), &targets, 1.0, EditMode::PlaceManual),
            TapAction::SelectManual(manual.id)
        );
        // Faces are ignored while placing
        assert_eq!(
            resolve_tap(&m, Point::new(50.0, 50.0), &targets, 1.0, EditMode::PlaceManual),
            TapAction::PlaceManual(Point::new(50.0, 50.0))
        );
        assert_eq!(
            resolve_tap(&m, Point::new(500.0, 50.0), &targets, 1.0, EditMode::PlaceManual),
            TapAction::None
        );
    }

    #[test]
    fn long_press_selects_manual_only() {
        let manual = BlurTarget::manual(Point::new(150.0, 50.0), 10.0);
        let face = BlurTarget::face(Point::new(50.0, 50.0), 20.0);
        let targets = vec![manual.clone(), face];
        let m = mapping();

        assert_eq!(
            resolve_long_press(&m, Point::new(150.0, 50.0), &targets, 1.0),
            TapAction::SelectManual(manual.id)
        );
        assert_eq!(resolve_long_press(&m, Point::new(50.0, 50.0), &targets, 1.0), TapAction::None);
    }
}
