//! Blur filter trait and shared error type.
//!
//! The [`BlurFilter`] trait is the one pixel operation the render engine
//! needs: turn a whole image into its blurred counterpart. A filter may
//! decline (return `None`), in which case rendering degrades to the sharp
//! original instead of failing.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend): pure Rust on top of
//! the `image` crate.

use super::params::FilterParams;
use image::DynamicImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Trait for whole-image blur filters.
///
/// `Sync` so one filter can be shared by every background job.
pub trait BlurFilter: Send + Sync {
    /// Blur the entire image. The result must have the input's dimensions.
    fn blur(&self, image: &DynamicImage, params: &FilterParams) -> Option<DynamicImage>;
}
