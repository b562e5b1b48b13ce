//! Image processing in pure Rust on top of the `image` crate.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::load_from_memory` |
//! | **Gaussian blur** | `image::imageops::blur` |
//! | **Pixellate** | block averaging over `RgbaImage` |
//! | **Encode → JPEG** | `JpegEncoder` at a fixed quality |
//! | **EXIF / IPTC** | custom parser (JPEG APP1 + APP13) |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for filter strength (unit testable)
//! - **Parameters**: Data structures describing a filter request
//! - **Backend**: [`BlurFilter`] trait + [`RustBackend`]
//! - **Metadata parser**: JPEG segment scanning, EXIF IFD0 and IPTC-IIM

pub mod backend;
mod calculations;
pub(crate) mod metadata_parser;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, BlurFilter};
pub use calculations::{filter_params, gaussian_radius, pixellate_block_size};
pub use params::{FilterParams, JpegQuality};
pub use rust_backend::{RustBackend, decode_image, encode_jpeg};
