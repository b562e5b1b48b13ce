//! Minimal JPEG metadata reader and writer.
//!
//! Three jobs, all on raw bytes:
//! - Collect the APP1 (EXIF, XMP) and APP13 (Photoshop/IPTC) segments of a
//!   JPEG so they can be carried over to an exported file.
//! - Summarize EXIF IFD0: make, model, orientation, date/time, and whether a
//!   GPS sub-IFD is present.
//! - Extract IPTC Record 2: ObjectName (2:05), Caption-Abstract (2:120),
//!   Keywords (2:25, repeatable).
//!
//! Anything malformed yields an empty result rather than an error.

/// A raw JPEG marker segment, without the `0xFF marker` and length bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JpegSegment {
    pub marker: u8,
    pub payload: Vec<u8>,
}

pub const APP0: u8 = 0xE0;
pub const APP1: u8 = 0xE1;
pub const APP13: u8 = 0xED;
const SOI: u8 = 0xD8;
const SOS: u8 = 0xDA;

const EXIF_HEADER: &[u8] = b"Exif\0\0";
const PHOTOSHOP_HEADER: &[u8] = b"Photoshop 3.0\0";
const BIM_MARKER: &[u8] = b"8BIM";
const IPTC_RESOURCE_ID: u16 = 0x0404;

/// Walk the marker segments before the image data, calling `visit` with
/// `(marker, segment_start, payload)` for each one that carries a length.
fn walk_segments(data: &[u8], mut visit: impl FnMut(u8, usize, &[u8])) {
    if data.len() < 4 || data[0] != 0xFF || data[1] != SOI {
        return;
    }
    let mut pos = 2;
    while pos + 4 <= data.len() {
        if data[pos] != 0xFF {
            pos += 1;
            continue;
        }
        let marker = data[pos + 1];
        // SOS: entropy-coded data follows, stop scanning
        if marker == SOS {
            break;
        }
        // Fill bytes and markers without a length field
        if marker == 0xFF || marker == 0x00 {
            pos += 1;
            continue;
        }
        if marker == SOI || marker == 0xD9 || (0xD0..=0xD7).contains(&marker) {
            pos += 2;
            continue;
        }
        let seg_len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        if seg_len < 2 || pos + 2 + seg_len > data.len() {
            break;
        }
        visit(marker, pos, &data[pos + 4..pos + 2 + seg_len]);
        pos += 2 + seg_len;
    }
}

/// Collect the metadata-bearing segments (APP1, APP13) of a JPEG.
///
/// Returns an empty list for non-JPEG input.
pub fn metadata_segments(jpeg: &[u8]) -> Vec<JpegSegment> {
    let mut segments = Vec::new();
    walk_segments(jpeg, |marker, _, payload| {
        if marker == APP1 || marker == APP13 {
            segments.push(JpegSegment {
                marker,
                payload: payload.to_vec(),
            });
        }
    });
    segments
}

/// Insert `segments` into an encoded JPEG, after SOI and any leading APP0.
///
/// Segments whose payload exceeds the 16-bit length field are skipped.
/// Input that is not a JPEG is returned unchanged.
pub fn embed_segments(jpeg: &[u8], segments: &[JpegSegment]) -> Vec<u8> {
    if jpeg.len() < 2 || jpeg[0] != 0xFF || jpeg[1] != SOI || segments.is_empty() {
        return jpeg.to_vec();
    }

    let mut insert_at = 2;
    walk_segments(jpeg, |marker, start, payload| {
        if marker == APP0 && start == insert_at {
            insert_at = start + 4 + payload.len();
        }
    });

    let mut output = Vec::with_capacity(jpeg.len() + segments.iter().map(|s| s.payload.len() + 4).sum::<usize>());
    output.extend_from_slice(&jpeg[..insert_at]);
    for segment in segments {
        let Ok(len) = u16::try_from(segment.payload.len() + 2) else {
            continue;
        };
        output.extend_from_slice(&[0xFF, segment.marker]);
        output.extend_from_slice(&len.to_be_bytes());
        output.extend_from_slice(&segment.payload);
    }
    output.extend_from_slice(&jpeg[insert_at..]);
    output
}

// ---------------------------------------------------------------------------
// EXIF: IFD0 summary
// ---------------------------------------------------------------------------

/// The handful of IFD0 fields worth showing to a user deciding whether to
/// strip metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExifSummary {
    pub make: Option<String>,
    pub model: Option<String>,
    pub orientation: Option<u16>,
    pub date_time: Option<String>,
    pub has_gps: bool,
}

const TAG_MAKE: u16 = 0x010F;
const TAG_MODEL: u16 = 0x0110;
const TAG_ORIENTATION: u16 = 0x0112;
const TAG_DATE_TIME: u16 = 0x0132;
const TAG_GPS_IFD: u16 = 0x8825;

/// Summarize the EXIF payload of an APP1 segment (starting with `Exif\0\0`).
pub fn read_exif_summary(app1_payload: &[u8]) -> ExifSummary {
    match app1_payload.strip_prefix(EXIF_HEADER) {
        Some(tiff) => parse_tiff_ifd0(tiff),
        None => ExifSummary::default(),
    }
}

/// Walk IFD0 of a TIFF-structured buffer.
fn parse_tiff_ifd0(data: &[u8]) -> ExifSummary {
    let mut summary = ExifSummary::default();
    if data.len() < 8 {
        return summary;
    }

    let big_endian = match &data[0..2] {
        b"MM" => true,
        b"II" => false,
        _ => return summary,
    };

    let read_u16 = |offset: usize| -> Option<u16> {
        let bytes = [*data.get(offset)?, *data.get(offset + 1)?];
        Some(if big_endian {
            u16::from_be_bytes(bytes)
        } else {
            u16::from_le_bytes(bytes)
        })
    };
    let read_u32 = |offset: usize| -> Option<u32> {
        let bytes: [u8; 4] = data.get(offset..offset + 4)?.try_into().ok()?;
        Some(if big_endian {
            u32::from_be_bytes(bytes)
        } else {
            u32::from_le_bytes(bytes)
        })
    };

    // Verify TIFF magic (42)
    if read_u16(2) != Some(42) {
        return summary;
    }
    let Some(ifd_offset) = read_u32(4).map(|o| o as usize) else {
        return summary;
    };
    let Some(entry_count) = read_u16(ifd_offset).map(usize::from) else {
        return summary;
    };

    let read_ascii = |entry_offset: usize| -> Option<String> {
        let count = read_u32(entry_offset + 4)? as usize;
        // ASCII values of four bytes or fewer are stored inline
        let start = if count <= 4 {
            entry_offset + 8
        } else {
            read_u32(entry_offset + 8)? as usize
        };
        let raw = data.get(start..start.checked_add(count)?)?;
        let text = String::from_utf8_lossy(raw)
            .trim_end_matches('\0')
            .trim()
            .to_string();
        (!text.is_empty()).then_some(text)
    };

    for i in 0..entry_count {
        let entry_offset = ifd_offset + 2 + i * 12;
        if entry_offset + 12 > data.len() {
            break;
        }
        let Some(tag) = read_u16(entry_offset) else {
            break;
        };
        match tag {
            TAG_MAKE => summary.make = read_ascii(entry_offset),
            TAG_MODEL => summary.model = read_ascii(entry_offset),
            TAG_DATE_TIME => summary.date_time = read_ascii(entry_offset),
            TAG_ORIENTATION => summary.orientation = read_u16(entry_offset + 8),
            TAG_GPS_IFD => summary.has_gps = true,
            _ => {}
        }
    }

    summary
}

// ---------------------------------------------------------------------------
// IPTC-IIM record parsing
// ---------------------------------------------------------------------------

/// IPTC Record 2 fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IptcData {
    pub object_name: Option<String>,
    pub caption: Option<String>,
    pub keywords: Vec<String>,
}

/// Extract IPTC from an APP13 payload (Photoshop 8BIM resources).
pub fn read_iptc(app13_payload: &[u8]) -> IptcData {
    extract_iptc_from_8bim(app13_payload)
        .map(parse_iptc_iim)
        .unwrap_or_default()
}

/// Parse raw IPTC-IIM bytes into structured metadata.
///
/// IIM record format (each dataset):
///   Byte 0:    0x1C (tag marker)
///   Byte 1:    Record number (we want 0x02)
///   Byte 2:    Dataset number (0x05=ObjectName, 0x19=Keywords, 0x78=Caption)
///   Bytes 3-4: Data length (big-endian u16)
///   Bytes 5+:  Data (UTF-8/ASCII string)
fn parse_iptc_iim(data: &[u8]) -> IptcData {
    let mut result = IptcData::default();
    let mut pos = 0;

    while pos + 5 <= data.len() {
        if data[pos] != 0x1C {
            pos += 1;
            continue;
        }

        let record = data[pos + 1];
        let dataset = data[pos + 2];
        let length = u16::from_be_bytes([data[pos + 3], data[pos + 4]]) as usize;
        pos += 5;

        if pos + length > data.len() {
            break;
        }

        if record == 2 {
            let value = String::from_utf8_lossy(&data[pos..pos + length])
                .trim()
                .to_string();

            if !value.is_empty() {
                match dataset {
                    5 => result.object_name = Some(value),
                    25 => result.keywords.push(value),
                    120 => result.caption = Some(value),
                    _ => {}
                }
            }
        }

        pos += length;
    }

    result
}

/// Find the IPTC-IIM bytes inside a Photoshop 8BIM resource block.
fn extract_iptc_from_8bim(segment: &[u8]) -> Option<&[u8]> {
    let data = segment.strip_prefix(PHOTOSHOP_HEADER).unwrap_or(segment);

    let mut pos = 0;
    while pos + 12 <= data.len() {
        // Each resource: "8BIM" (4) + resource_id (2) + pascal_string + data_len (4) + data
        if &data[pos..pos + 4] != BIM_MARKER {
            pos += 1;
            continue;
        }
        pos += 4;

        let resource_id = u16::from_be_bytes([data[pos], data[pos + 1]]);
        pos += 2;

        // Pascal string: 1 byte length + string, padded to even total
        let pascal_len = data[pos] as usize;
        pos += 1 + pascal_len + ((1 + pascal_len) % 2);

        if pos + 4 > data.len() {
            break;
        }
        let res_len =
            u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]]) as usize;
        pos += 4;

        if pos + res_len > data.len() {
            break;
        }
        if resource_id == IPTC_RESOURCE_ID {
            return Some(&data[pos..pos + res_len]);
        }

        // Advance past data, padded to even
        pos += res_len + (res_len % 2);
    }

    None
}
