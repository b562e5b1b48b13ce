//! Saving edited photos.
//!
//! The session builds an [`ExportRequest`] (final pixels plus, unless the
//! user asked to strip it, the source metadata) and hands it to an
//! [`ExportSink`]. Where the bytes end up is the sink's business: a photo
//! library, a share sheet, or [`FileExportSink`] for a plain file.
//!
//! Failures are reported, never fatal, and a failed save leaves no partial
//! file behind.

use crate::imaging::metadata_parser::embed_segments;
use crate::imaging::{BackendError, JpegQuality, encode_jpeg};
use crate::metadata::ImageMetadata;
use crate::photo::EditablePhoto;
use crate::settings::ExportOptions;
use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("not authorized to save photos")]
    AuthorizationDenied,
    #[error("there is no image to save")]
    NoImage,
    #[error("encoding failed: {0}")]
    Encode(#[from] BackendError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything a sink needs to save one photo.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub image: Arc<DynamicImage>,
    /// `None` when metadata is being stripped.
    pub metadata: Option<Arc<ImageMetadata>>,
}

impl ExportRequest {
    /// The processed image when present, otherwise the original.
    pub fn from_photo(photo: &EditablePhoto, options: &ExportOptions) -> Self {
        Self {
            image: Arc::clone(photo.display_image()),
            metadata: if options.remove_metadata {
                None
            } else {
                photo.metadata.clone()
            },
        }
    }
}

/// Destination for saved photos.
pub trait ExportSink {
    fn save(&self, request: &ExportRequest) -> Result<(), ExportError>;
}

/// Writes a JPEG to a fixed path, re-embedding kept metadata segments.
#[derive(Debug, Clone)]
pub struct FileExportSink {
    path: PathBuf,
    quality: JpegQuality,
}

impl FileExportSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            quality: JpegQuality::default(),
        }
    }

    pub fn with_quality(mut self, quality: JpegQuality) -> Self {
        self.quality = quality;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn partial_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".partial");
        self.path.with_file_name(name)
    }
}

impl ExportSink for FileExportSink {
    fn save(&self, request: &ExportRequest) -> Result<(), ExportError> {
        if request.image.width() == 0 || request.image.height() == 0 {
            return Err(ExportError::NoImage);
        }

        let mut bytes = encode_jpeg(&request.image, self.quality)?;
        if let Some(metadata) = &request.metadata {
            bytes = embed_segments(&bytes, metadata.segments());
        }

        // Write beside the target, then rename into place
        let partial = self.partial_path();
        if let Err(e) = std::fs::write(&partial, &bytes) {
            let _ = std::fs::remove_file(&partial);
            return Err(e.into());
        }
        if let Err(e) = std::fs::rename(&partial, &self.path) {
            let _ = std::fs::remove_file(&partial);
            return Err(e.into());
        }

        info!(
            path = %self.path.display(),
            bytes = bytes.len(),
            metadata = request.metadata.is_some(),
            "saved photo"
        );
        Ok(())
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::imaging::decode_image;
    use crate::imaging::metadata_parser::tests::{jpeg_with_segments, sample_exif_payload};
    use crate::imaging::metadata_parser::{APP1, JpegSegment, metadata_segments};
    use crate::metadata::read_metadata;
    use crate::test_helpers::gradient_image;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Sink that keeps every request, or refuses them all.
    pub struct RecordingSink {
        pub denied: bool,
        pub saved: Mutex<Vec<ExportRequest>>,
    }

    impl RecordingSink {
        pub fn accepting() -> Self {
            Self {
                denied: false,
                saved: Mutex::new(Vec::new()),
            }
        }

        pub fn denying() -> Self {
            Self {
                denied: true,
                saved: Mutex::new(Vec::new()),
            }
        }

        pub fn saved(&self) -> Vec<ExportRequest> {
            self.saved.lock().unwrap().clone()
        }
    }

    impl ExportSink for RecordingSink {
        fn save(&self, request: &ExportRequest) -> Result<(), ExportError> {
            if self.denied {
                return Err(ExportError::AuthorizationDenied);
            }
            self.saved.lock().unwrap().push(request.clone());
            Ok(())
        }
    }

    fn tagged_metadata() -> Arc<ImageMetadata> {
        let jpeg = jpeg_with_segments(&[JpegSegment {
            marker: APP1,
            payload: sample_exif_payload(),
        }]);
        Arc::new(read_metadata(&jpeg, 30, 20))
    }

    fn photo_with_metadata() -> EditablePhoto {
        EditablePhoto::new(
            Arc::new(gradient_image(30, 20)),
            Some(tagged_metadata()),
            vec![],
        )
    }

    #[test]
    fn request_strips_metadata_by_default() {
        let request = ExportRequest::from_photo(&photo_with_metadata(), &ExportOptions::default());
        assert!(request.metadata.is_none());
    }

    #[test]
    fn request_keeps_metadata_when_asked() {
        let options = ExportOptions {
            remove_metadata: false,
        };
        let request = ExportRequest::from_photo(&photo_with_metadata(), &options);
        assert!(request.metadata.is_some());
    }

    #[test]
    fn request_prefers_processed_image() {
        let mut photo = photo_with_metadata();
        let rendered = Arc::new(gradient_image(30, 20));
        photo.set_processed(rendered.clone());
        let request = ExportRequest::from_photo(&photo, &ExportOptions::default());
        assert!(Arc::ptr_eq(&request.image, &rendered));
    }

    #[test]
    fn file_sink_writes_jpeg_without_metadata() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out.jpg");
        let request = ExportRequest::from_photo(&photo_with_metadata(), &ExportOptions::default());

        FileExportSink::new(&path).save(&request).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let decoded = decode_image(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (30, 20));
        assert!(metadata_segments(&bytes).iter().all(|s| s.marker != APP1));
        assert!(!tmp.path().join("out.jpg.partial").exists());
    }

    #[test]
    fn file_sink_embeds_kept_metadata() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out.jpg");
        let options = ExportOptions {
            remove_metadata: false,
        };
        let request = ExportRequest::from_photo(&photo_with_metadata(), &options);

        FileExportSink::new(&path).save(&request).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let reread = read_metadata(&bytes, 30, 20);
        assert_eq!(reread.get("Exif.Make"), Some("Acme"));
        assert!(decode_image(&bytes).is_ok());
    }

    #[test]
    fn empty_image_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out.jpg");
        let request = ExportRequest {
            image: Arc::new(DynamicImage::new_rgba8(0, 0)),
            metadata: None,
        };
        let result = FileExportSink::new(&path).save(&request);
        assert!(matches!(result, Err(ExportError::NoImage)));
        assert!(!path.exists());
    }

    #[test]
    fn unwritable_directory_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("missing").join("out.jpg");
        let request = ExportRequest::from_photo(&photo_with_metadata(), &ExportOptions::default());
        let result = FileExportSink::new(&path).save(&request);
        assert!(matches!(result, Err(ExportError::Io(_))));
    }
}
