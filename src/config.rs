//! Editor configuration.
//!
//! Handles loading, validating, and merging `config.toml`. User files are
//! sparse: they are layered over the stock defaults, so only the keys being
//! changed need to appear.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [blur]
//! style = "gaussian"          # "gaussian" or "pixellate"
//! intensity = 0.7             # 0.0 - 1.0
//! face_radius_scale = 1.0     # 0.5 - 2.0
//! detection_threshold = 0.2   # 0.0 - 1.0 (0 keeps every detection)
//!
//! [export]
//! remove_metadata = true      # Strip EXIF/GPS/IPTC on save
//! jpeg_quality = 95           # 1 - 100
//!
//! [processing]
//! max_processes = 4           # Worker threads (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::settings::{BlurSettings, ExportOptions, FACE_RADIUS_SCALE_RANGE};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Editor configuration loaded from `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EditorConfig {
    /// Initial blur and detection settings for new sessions.
    pub blur: BlurSettings,
    /// Save behaviour.
    pub export: ExportConfig,
    /// Background worker settings.
    pub processing: ProcessingConfig,
}

impl EditorConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let blur = &self.blur;
        if !(0.0..=1.0).contains(&blur.intensity) {
            return Err(ConfigError::Validation(
                "blur.intensity must be 0.0-1.0".into(),
            ));
        }
        let (min_scale, max_scale) = FACE_RADIUS_SCALE_RANGE;
        if !(min_scale..=max_scale).contains(&blur.face_radius_scale) {
            return Err(ConfigError::Validation(format!(
                "blur.face_radius_scale must be {min_scale}-{max_scale}"
            )));
        }
        if !(0.0..=1.0).contains(&blur.detection_threshold) {
            return Err(ConfigError::Validation(
                "blur.detection_threshold must be 0.0-1.0".into(),
            ));
        }
        if !(1..=100).contains(&self.export.jpeg_quality) {
            return Err(ConfigError::Validation(
                "export.jpeg_quality must be 1-100".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Save behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    /// Strip all source metadata from saved files.
    pub remove_metadata: bool,
    /// JPEG encoding quality for file exports (1 = worst, 100 = best).
    pub jpeg_quality: u32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            remove_metadata: ExportOptions::default().remove_metadata,
            jpeg_quality: 95,
        }
    }
}

impl ExportConfig {
    pub fn options(&self) -> ExportOptions {
        ExportOptions {
            remove_metadata: self.remove_metadata,
        }
    }
}

/// Background processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of background workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged onto.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(EditorConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if no `config.toml` exists in the directory.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<EditorConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: EditorConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the given directory, over stock defaults.
pub fn load_config(dir: &Path) -> Result<EditorConfig, ConfigError> {
    resolve_config(stock_defaults_value(), load_raw_config(dir)?)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
pub fn stock_config_toml() -> &'static str {
    r##"# Face Blur Configuration
# =======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Blur and detection
# ---------------------------------------------------------------------------
[blur]
# Filter used inside blurred circles: "gaussian" or "pixellate".
style = "gaussian"

# Blur strength, 0.0 (lightest) to 1.0 (strongest). Scales with image width.
intensity = 0.7

# Multiplier for detected face radii, 0.5 to 2.0. Manual circles ignore it.
face_radius_scale = 1.0

# Minimum detection score, 0.0 to 1.0. Lower is looser; 0 keeps everything.
detection_threshold = 0.2

# ---------------------------------------------------------------------------
# Export
# ---------------------------------------------------------------------------
[export]
# Drop EXIF, GPS and IPTC metadata from saved images.
remove_metadata = true

# JPEG encoding quality (1 = worst, 100 = best).
jpeg_quality = 95

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum background workers for detection and rendering.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
