//! Embedded metadata of a source photo.
//!
//! A photo's metadata has two uses that pull in different directions:
//!
//! - **Display**: a flat string map the UI can show before the user decides
//!   whether to strip metadata on save (camera make, GPS presence, captions).
//! - **Round-trip**: the raw APP1 (EXIF/XMP) and APP13 (IPTC) segments, kept
//!   byte-for-byte so an export that keeps metadata writes exactly what the
//!   source carried.
//!
//! ## Property keys
//!
//! | Key | Source |
//! |-----|--------|
//! | `PixelWidth`, `PixelHeight` | decoded image |
//! | `Exif.Make`, `Exif.Model`, `Exif.Orientation`, `Exif.DateTime` | EXIF IFD0 |
//! | `GPS` | `present` when IFD0 points at a GPS IFD |
//! | `IPTC.ObjectName`, `IPTC.Caption` | IPTC 2:05, 2:120 |
//! | `IPTC.Keywords` | IPTC 2:25, joined with `, ` |
//!
//! Non-JPEG sources only get the pixel dimensions.

use crate::imaging::metadata_parser::{
    self, APP1, APP13, ExifSummary, IptcData, JpegSegment,
};
use std::collections::BTreeMap;

pub const KEY_PIXEL_WIDTH: &str = "PixelWidth";
pub const KEY_PIXEL_HEIGHT: &str = "PixelHeight";
pub const KEY_GPS: &str = "GPS";

/// Metadata read from a source file. Immutable once loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageMetadata {
    pub properties: BTreeMap<String, String>,
    pub(crate) segments: Vec<JpegSegment>,
}

impl ImageMetadata {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// True when the source carried GPS coordinates.
    pub fn has_location(&self) -> bool {
        self.properties.contains_key(KEY_GPS)
    }

    /// True when there is anything worth re-embedding on export.
    pub fn has_embedded_segments(&self) -> bool {
        !self.segments.is_empty()
    }

    pub(crate) fn segments(&self) -> &[JpegSegment] {
        &self.segments
    }
}

/// Build the metadata record for a decoded source.
///
/// `bytes` are the undecoded file contents; `(width, height)` come from the
/// decoded image so they are correct for every format.
pub fn read_metadata(bytes: &[u8], width: u32, height: u32) -> ImageMetadata {
    let mut properties = BTreeMap::new();
    properties.insert(KEY_PIXEL_WIDTH.to_string(), width.to_string());
    properties.insert(KEY_PIXEL_HEIGHT.to_string(), height.to_string());

    let segments = metadata_parser::metadata_segments(bytes);
    for segment in &segments {
        match segment.marker {
            APP1 => insert_exif(&mut properties, metadata_parser::read_exif_summary(&segment.payload)),
            APP13 => insert_iptc(&mut properties, metadata_parser::read_iptc(&segment.payload)),
            _ => {}
        }
    }

    ImageMetadata {
        properties,
        segments,
    }
}

fn insert_exif(properties: &mut BTreeMap<String, String>, exif: ExifSummary) {
    let fields = [
        ("Exif.Make", exif.make),
        ("Exif.Model", exif.model),
        ("Exif.Orientation", exif.orientation.map(|o| o.to_string())),
        ("Exif.DateTime", exif.date_time),
    ];
    for (key, value) in fields {
        if let Some(value) = value {
            properties.insert(key.to_string(), value);
        }
    }
    if exif.has_gps {
        properties.insert(KEY_GPS.to_string(), "present".to_string());
    }
}

fn insert_iptc(properties: &mut BTreeMap<String, String>, iptc: IptcData) {
    if let Some(title) = iptc.object_name {
        properties.insert("IPTC.ObjectName".to_string(), title);
    }
    if let Some(caption) = iptc.caption {
        properties.insert("IPTC.Caption".to_string(), caption);
    }
    if !iptc.keywords.is_empty() {
        properties.insert("IPTC.Keywords".to_string(), iptc.keywords.join(", "));
    }
}
