//! Reconciliation of fresh detections with a photo's edited targets.
//!
//! Re-detection (after a threshold change or on request) produces a brand new
//! set of face targets. The user may already have unblurred some faces; those
//! choices should survive when the same face is found again. A new face
//! "is" an old one when its center lies within half the larger of the two
//! base radii of the nearest old face.
//!
//! Matching is greedy: each new face looks at every old face independently,
//! so two new faces may inherit from the same old one. Manual targets are
//! never touched by detection and are appended after the faces.

use crate::target::BlurTarget;
use tracing::debug;

/// Match tolerance as a fraction of the larger base radius.
const MATCH_FACTOR: f64 = 0.5;

/// Carry the blurred flag of matching `previous` faces over to `detected`.
///
/// With no previous faces the detections come back unchanged. Unmatched
/// detections are blurred.
pub fn merge_face_targets(detected: Vec<BlurTarget>, previous: &[BlurTarget]) -> Vec<BlurTarget> {
    if previous.is_empty() {
        return detected;
    }

    detected
        .into_iter()
        .map(|target| {
            let nearest = previous
                .iter()
                .map(|p| (p, p.center.distance(target.center)))
                .min_by(|a, b| a.1.total_cmp(&b.1));

            let inherited = nearest.and_then(|(prev, distance)| {
                let tolerance = prev.base_radius.max(target.base_radius) * MATCH_FACTOR;
                (distance <= tolerance).then_some(prev.is_blurred)
            });
            let is_blurred = inherited.unwrap_or(true);
            target.with_blurred(is_blurred)
        })
        .collect()
}

/// Full reconciliation: merged faces, then the existing manual targets.
///
/// `existing` is the photo's current target list; its face targets are the
/// match candidates and its manual targets are kept verbatim.
pub fn reconcile(detected: Vec<BlurTarget>, existing: &[BlurTarget]) -> Vec<BlurTarget> {
    let (previous_faces, manual): (Vec<BlurTarget>, Vec<BlurTarget>) =
        existing.iter().cloned().partition(BlurTarget::is_face);

    let mut merged = merge_face_targets(detected, &previous_faces);
    debug!(
        faces = merged.len(),
        manual = manual.len(),
        unblurred = merged.iter().filter(|t| !t.is_blurred).count(),
        "reconciled targets"
    );
    merged.extend(manual);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    fn face(x: f64, y: f64, radius: f64) -> BlurTarget {
        BlurTarget::face(Point::new(x, y), radius)
    }

    #[test]
    fn nearby_face_inherits_unblurred() {
        let previous = vec![face(100.0, 100.0, 20.0).with_blurred(false)];
        let merged = merge_face_targets(vec![face(105.0, 103.0, 22.0)], &previous);
        assert!(!merged[0].is_blurred);
    }

    #[test]
    fn distant_face_defaults_to_blurred() {
        let previous = vec![face(100.0, 100.0, 20.0).with_blurred(false)];
        let merged = merge_face_targets(vec![face(500.0, 500.0, 20.0)], &previous);
        assert!(merged[0].is_blurred);
    }

    #[test]
    fn tolerance_uses_larger_radius() {
        // distance 15; 0.5 × max(10, 30) = 15 → match
        let previous = vec![face(0.0, 0.0, 10.0).with_blurred(false)];
        let merged = merge_face_targets(vec![face(15.0, 0.0, 30.0)], &previous);
        assert!(!merged[0].is_blurred);

        let merged = merge_face_targets(vec![face(15.1, 0.0, 30.0)], &previous);
        assert!(merged[0].is_blurred);
    }

    #[test]
    fn nearest_previous_wins() {
        let previous = vec![
            face(0.0, 0.0, 40.0).with_blurred(true),
            face(12.0, 0.0, 40.0).with_blurred(false),
        ];
        let merged = merge_face_targets(vec![face(10.0, 0.0, 40.0)], &previous);
        assert!(!merged[0].is_blurred);
    }

    #[test]
    fn no_previous_returns_detections_unchanged() {
        let detected = vec![face(1.0, 1.0, 10.0).with_blurred(false)];
        let merged = merge_face_targets(detected.clone(), &[]);
        assert_eq!(merged, detected);
    }

    #[test]
    fn greedy_matches_share_previous() {
        let previous = vec![face(100.0, 100.0, 40.0).with_blurred(false)];
        let merged = merge_face_targets(
            vec![face(95.0, 100.0, 40.0), face(105.0, 100.0, 40.0)],
            &previous,
        );
        assert!(merged.iter().all(|t| !t.is_blurred));
    }

    #[test]
    fn manual_targets_kept_after_faces() {
        let manual = BlurTarget::manual(Point::new(5.0, 5.0), 30.0).with_blurred(false);
        let existing = vec![manual.clone(), face(100.0, 100.0, 20.0)];
        let result = reconcile(vec![face(300.0, 300.0, 20.0)], &existing);

        assert_eq!(result.len(), 2);
        assert!(result[0].is_face());
        assert_eq!(result[1], manual);
    }

    #[test]
    fn reconcile_is_idempotent_for_same_detections() {
        let existing = vec![
            face(100.0, 100.0, 20.0).with_blurred(false),
            face(400.0, 100.0, 25.0),
            BlurTarget::manual(Point::new(50.0, 50.0), 12.0),
        ];
        let redetect = || vec![face(100.0, 100.0, 20.0), face(400.0, 100.0, 25.0)];

        let once = reconcile(redetect(), &existing);
        let twice = reconcile(redetect(), &once);

        let flags = |targets: &[BlurTarget]| {
            targets
                .iter()
                .map(|t| (t.center, t.base_radius, t.is_blurred, t.kind))
                .collect::<Vec<_>>()
        };
        assert_eq!(flags(&once), flags(&twice));
        assert!(!flags(&once)[0].2);
    }
}
