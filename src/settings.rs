//! Render and detection settings.
//!
//! [`BlurSettings`] is a plain value: the session compares old and new
//! values with [`BlurSettings::change_from`] to decide whether a change
//! needs a full re-detection or only a re-render.

use serde::{Deserialize, Serialize};

/// Accepted range for [`BlurSettings::face_radius_scale`].
pub const FACE_RADIUS_SCALE_RANGE: (f64, f64) = (0.5, 2.0);

/// Which blur filter fills the target circles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlurStyle {
    /// Mosaic of flat blocks.
    Pixellate,
    #[default]
    Gaussian,
}

impl BlurStyle {
    pub const ALL: [BlurStyle; 2] = [BlurStyle::Pixellate, BlurStyle::Gaussian];

    /// Stable identifier, identical to the config file spelling.
    pub fn id(self) -> &'static str {
        match self {
            BlurStyle::Pixellate => "pixellate",
            BlurStyle::Gaussian => "gaussian",
        }
    }
}

/// Style, strength and detection parameters for one session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BlurSettings {
    pub style: BlurStyle,
    /// 0.0 ..= 1.0, where 1.0 is the strongest blur.
    pub intensity: f64,
    /// 0.5 ..= 2.0 multiplier applied to detected face radii.
    pub face_radius_scale: f64,
    /// 0.0 ..= 1.0; lower is looser detection, 0 keeps every observation.
    pub detection_threshold: f64,
}

impl Default for BlurSettings {
    fn default() -> Self {
        Self {
            style: BlurStyle::Gaussian,
            intensity: 0.7,
            face_radius_scale: 1.0,
            detection_threshold: 0.2,
        }
    }
}

/// What a settings change requires of the session, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SettingsChange {
    Unchanged,
    /// Style, intensity or face scale changed: re-render every photo.
    Rerender,
    /// The detection threshold changed: re-detect and reconcile every photo.
    Redetect,
}

impl BlurSettings {
    /// Copy with every field pulled into its documented range.
    pub fn clamped(self) -> Self {
        let (min_scale, max_scale) = FACE_RADIUS_SCALE_RANGE;
        Self {
            style: self.style,
            intensity: clamp_unit(self.intensity),
            face_radius_scale: if self.face_radius_scale.is_nan() {
                1.0
            } else {
                self.face_radius_scale.clamp(min_scale, max_scale)
            },
            detection_threshold: clamp_unit(self.detection_threshold),
        }
    }

    /// Classify the transition from `previous` to `self`.
    pub fn change_from(&self, previous: &BlurSettings) -> SettingsChange {
        if self.detection_threshold != previous.detection_threshold {
            SettingsChange::Redetect
        } else if self != previous {
            SettingsChange::Rerender
        } else {
            SettingsChange::Unchanged
        }
    }
}

/// Options that only affect saving.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportOptions {
    /// Drop all source metadata (EXIF, GPS, IPTC) from the saved file.
    pub remove_metadata: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            remove_metadata: true,
        }
    }
}

/// Clamp into `[0, 1]`, mapping NaN to 0.
pub(crate) fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
