//! Editable photos and where they come from.
//!
//! An [`EditablePhoto`] pairs an immutable original with the mutable edit
//! state: its targets and a cached render. Every edit drops the cached
//! render; the session schedules a fresh one.
//!
//! Snapshots are cheap: images sit behind `Arc`, so cloning a photo for a
//! background job copies only the target list.

use crate::geometry::{Point, Size, clamp_point};
use crate::imaging::{BackendError, decode_image};
use crate::metadata::{ImageMetadata, read_metadata};
use crate::target::{BlurTarget, TargetId};
use image::DynamicImage;
use std::fmt;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Manual radius bounds and default, as fractions of the shorter side.
pub const MANUAL_RADIUS_MIN_FRACTION: f64 = 0.03;
pub const MANUAL_RADIUS_MAX_FRACTION: f64 = 0.25;
pub const MANUAL_RADIUS_DEFAULT_FRACTION: f64 = 0.08;

static NEXT_PHOTO_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a loaded photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PhotoId(u64);

impl PhotoId {
    pub fn next() -> Self {
        Self(NEXT_PHOTO_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for PhotoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "photo-{}", self.0)
    }
}

/// A photo picked by the user, not yet decoded.
#[derive(Debug, Clone)]
pub enum PhotoSource {
    /// A file on disk.
    File(PathBuf),
    /// Encoded file contents (JPEG, PNG, TIFF, WebP).
    Encoded(Vec<u8>),
    /// Already-decoded pixels, with whatever metadata the provider had.
    Decoded {
        image: DynamicImage,
        metadata: Option<ImageMetadata>,
    },
}

impl PhotoSource {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self::Encoded(bytes)
    }

    pub fn from_image(image: DynamicImage) -> Self {
        Self::Decoded {
            image,
            metadata: None,
        }
    }

    /// Decode pixels and read embedded metadata.
    pub fn decode(self) -> Result<(DynamicImage, Option<ImageMetadata>), BackendError> {
        match self {
            Self::File(path) => {
                let bytes = std::fs::read(&path)?;
                let image = decode_image(&bytes).map_err(|e| match e {
                    BackendError::ProcessingFailed(msg) => {
                        BackendError::ProcessingFailed(format!("{}: {}", path.display(), msg))
                    }
                    other => other,
                })?;
                let metadata = read_metadata(&bytes, image.width(), image.height());
                Ok((image, Some(metadata)))
            }
            Self::Encoded(bytes) => {
                let image = decode_image(&bytes)?;
                let metadata = read_metadata(&bytes, image.width(), image.height());
                Ok((image, Some(metadata)))
            }
            Self::Decoded { image, metadata } => Ok((image, metadata)),
        }
    }
}

/// A loaded photo and its edit state.
#[derive(Debug, Clone)]
pub struct EditablePhoto {
    pub id: PhotoId,
    pub original: Arc<DynamicImage>,
    pub metadata: Option<Arc<ImageMetadata>>,
    processed: Option<Arc<DynamicImage>>,
    targets: Vec<BlurTarget>,
}

impl EditablePhoto {
    pub fn new(
        original: Arc<DynamicImage>,
        metadata: Option<Arc<ImageMetadata>>,
        targets: Vec<BlurTarget>,
    ) -> Self {
        Self {
            id: PhotoId::next(),
            original,
            metadata,
            processed: None,
            targets,
        }
    }

    pub fn targets(&self) -> &[BlurTarget] {
        &self.targets
    }

    pub fn target(&self, id: TargetId) -> Option<&BlurTarget> {
        self.targets.iter().find(|t| t.id == id)
    }

    /// The cached render, if one is current.
    pub fn processed(&self) -> Option<&Arc<DynamicImage>> {
        self.processed.as_ref()
    }

    /// What to show: the render when present, otherwise the original.
    pub fn display_image(&self) -> &Arc<DynamicImage> {
        self.processed.as_ref().unwrap_or(&self.original)
    }

    pub fn image_size(&self) -> Size {
        Size::from_pixels(self.original.width(), self.original.height())
    }

    pub(crate) fn set_processed(&mut self, image: Arc<DynamicImage>) {
        self.processed = Some(image);
    }

    pub(crate) fn invalidate(&mut self) {
        self.processed = None;
    }

    /// Replace the whole target list, e.g. with a reconciliation result.
    pub fn replace_targets(&mut self, targets: Vec<BlurTarget>) {
        self.targets = targets;
        self.invalidate();
    }

    /// Flip one target's blurred flag. Returns false for an unknown id.
    pub fn toggle_target(&mut self, id: TargetId) -> bool {
        let Some(target) = self.targets.iter_mut().find(|t| t.id == id) else {
            return false;
        };
        target.is_blurred = !target.is_blurred;
        self.invalidate();
        true
    }

    /// Set every target's blurred flag.
    pub fn set_all_blurred(&mut self, blurred: bool) {
        for target in &mut self.targets {
            target.is_blurred = blurred;
        }
        self.invalidate();
    }

    /// Allowed manual radii: 3% to 25% of the shorter side.
    pub fn manual_radius_range(&self) -> RangeInclusive<f64> {
        let min_dimension = self.image_size().min_dimension();
        (min_dimension * MANUAL_RADIUS_MIN_FRACTION)..=(min_dimension * MANUAL_RADIUS_MAX_FRACTION)
    }

    pub fn default_manual_radius(&self) -> f64 {
        self.image_size().min_dimension() * MANUAL_RADIUS_DEFAULT_FRACTION
    }

    /// Place a blurred manual target at `point`, pulled inside the image.
    pub fn add_manual_target(&mut self, point: Point) -> TargetId {
        let center = clamp_point(point, self.image_size());
        let target = BlurTarget::manual(center, self.default_manual_radius());
        let id = target.id;
        self.targets.push(target);
        self.invalidate();
        id
    }

    /// Base radius of a manual target; `None` for faces and unknown ids.
    pub fn manual_target_radius(&self, id: TargetId) -> Option<f64> {
        self.target(id)
            .filter(|t| t.is_manual())
            .map(|t| t.base_radius)
    }

    /// Resize a manual target, clamping into [`Self::manual_radius_range`].
    ///
    /// Returns false for faces, unknown ids and non-finite values.
    pub fn update_manual_target_radius(&mut self, id: TargetId, radius: f64) -> bool {
        if !radius.is_finite() {
            return false;
        }
        let range = self.manual_radius_range();
        let Some(target) = self
            .targets
            .iter_mut()
            .find(|t| t.id == id && t.is_manual())
        else {
            return false;
        };
        target.base_radius = radius.clamp(*range.start(), *range.end());
        self.invalidate();
        true
    }

    /// Remove a manual target. Face targets cannot be removed.
    pub fn remove_manual_target(&mut self, id: TargetId) -> bool {
        let before = self.targets.len();
        self.targets.retain(|t| !(t.id == id && t.is_manual()));
        let removed = self.targets.len() != before;
        if removed {
            self.invalidate();
        }
        removed
    }
}
