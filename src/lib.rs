//! # Face Blur
//!
//! The editing engine behind a photo redaction tool: pick photos, let a face
//! detector find the faces, adjust which regions are blurred, add circles by
//! hand, and save the result with or without the source metadata.
//!
//! # Architecture: Snapshot In, Snapshot Out
//!
//! A single [`session::Session`] owns the photos. Everything expensive runs
//! on a worker pool against snapshots and comes back as a result the session
//! applies:
//!
//! ```text
//! PhotoSource ──decode──▶ detect ──▶ reconcile ──▶ render ──▶ EditablePhoto
//!                           ▲                        ▲
//!                 threshold change          any target or style edit
//! ```
//!
//! The stages are pure functions over values, so each is unit tested
//! without a session, a detector model, or real photos.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`geometry`] | Points, rects, clamping, bottom-left to top-left box conversion |
//! | [`target`] | `BlurTarget`: face or manual circle, radius rules |
//! | [`settings`] | Blur style, intensity, face scale, detection threshold |
//! | [`detect`] | Detector trait, detection scoring and thresholding |
//! | [`reconcile`] | Carries blurred/unblurred choices across re-detection |
//! | [`render`] | Composites blurred circles onto the original |
//! | [`viewport`] | Zoom/pan state, screen-to-image mapping, hit-testing, tap resolution |
//! | [`photo`] | `EditablePhoto` and its edit operations; photo sources |
//! | [`session`] | Owner of photos, background jobs, alerts, save |
//! | [`export`] | Export sinks; JPEG file sink with metadata carry-over |
//! | [`metadata`] | EXIF/GPS/IPTC summary and raw segments of a source |
//! | [`config`] | `config.toml` loading, validation and merging |
//! | [`imaging`] | Pure-Rust pixel work: blur filters, JPEG codec, metadata parser |
//!
//! # Design Decisions
//!
//! ## Detection Is Not Trusted To Be Stable
//!
//! Re-running detection with a different threshold returns brand new boxes.
//! Rather than asking the detector for identities, [`reconcile`] matches each
//! new face to the nearest previous one and keeps the user's choice when the
//! centers are close relative to the radii. Matching is greedy and may map
//! two new faces onto one old face; both then inherit its choice.
//!
//! ## Never Fail, Degrade
//!
//! A detector error means no faces, a filter that declines means the sharp
//! original, a photo that won't decode is skipped. The user hears about it
//! through [`session::SessionAlert`], and the session keeps working.
//!
//! ## Nothing Leaves Unblurred
//!
//! Every edit drops the photo's cached render. Saving a photo whose fresh
//! render hasn't arrived yet waits for the worker pool to deliver it, so an
//! export never reflects an older target set than the one on screen.
//!
//! ## Metadata Is Stripped Unless Asked
//!
//! Location and camera data are exactly what a redacted photo should not
//! leak, so [`settings::ExportOptions`] defaults to removing them. When the
//! user keeps metadata, the source's original APP1/APP13 segments are
//! written back byte for byte.

pub mod config;
pub mod detect;
pub mod export;
pub mod geometry;
pub mod imaging;
pub mod metadata;
pub mod photo;
pub mod reconcile;
pub mod render;
pub mod session;
pub mod settings;
pub mod target;
pub mod viewport;

#[cfg(test)]
pub(crate) mod test_helpers;
