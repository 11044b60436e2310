//! Workspace umbrella crate for Rollcall, photo-based identity matching for
//! attendance.
//!
//! The workspace is split along the pipeline:
//!
//! - `extract`: decoded photo to fixed-length grayscale intensity fingerprint.
//! - `gallery`: enrolled identities with snapshot reads and pluggable storage.
//! - `matcher`: cosine scoring and the matched / ambiguous / no-match decision.
//!
//! This crate stitches them together behind [`Recognizer`], adds the
//! photo-level enrollment workflow, a reference [`attendance`] recorder that
//! owns the "once per identity, context and day" rule, and YAML
//! [`config`] loading.
//!
//! ```
//! use std::sync::Arc;
//!
//! use rollcall::image::{DynamicImage, GrayImage, Luma};
//! use rollcall::{
//!     ExtractConfig, Gallery, GrayscaleExtractor, MatchConfig, MatchDecision, Matcher, Recognizer,
//! };
//! use serde_json::json;
//!
//! let extractor = GrayscaleExtractor::new(ExtractConfig::default().with_resolution(16, 16)).unwrap();
//! let recognizer = Recognizer::new(
//!     Arc::new(extractor),
//!     Matcher::new(MatchConfig::default()).unwrap(),
//!     Arc::new(Gallery::new()),
//! )
//! .unwrap();
//!
//! let photo = DynamicImage::ImageLuma8(GrayImage::from_fn(64, 64, |x, _| Luma([(x * 4) as u8])));
//! recognizer.enroll("S001", &photo, json!({ "name": "Ada" })).unwrap();
//!
//! let decision = recognizer.recognize(&photo).unwrap();
//! assert!(matches!(decision, MatchDecision::Matched { ref identity_id, .. } if identity_id == "S001"));
//! ```

pub mod attendance;
pub mod config;
pub mod enroll;
mod recognizer;
#[cfg(feature = "telemetry")]
pub mod telemetry;

use thiserror::Error;

pub use extract::{
    decode_image, extract_fingerprint, image, ExtractConfig, ExtractionError, Fingerprint,
    FingerprintExtractor, FingerprintMeta, GrayscaleExtractor, ResizeFilter,
};
pub use gallery::{
    BackendConfig, CompressionCodec, CompressionConfig, Gallery, GalleryBackend, GalleryConfig,
    GalleryError, GallerySnapshot, IdentityRecord, InMemoryBackend,
};
pub use matcher::{
    cosine_similarity, set_match_metrics, AmbiguityPolicy, Candidate, CosineScorer,
    DimensionMismatchError, MatchConfig, MatchDecision, MatchError, MatchMetrics, Matcher,
    SimilarityScorer, Verification,
};

pub use crate::attendance::{
    AttendanceDesk, AttendanceError, AttendanceEvent, AttendanceLedger, Clock, FixedClock,
    InMemoryLedger, RecordOutcome, SubmissionOutcome, SystemClock,
};
pub use crate::config::{ConfigLoadError, RollcallConfig};
pub use crate::enroll::{enroll_image, reenroll_image};
pub use crate::recognizer::Recognizer;

/// Errors surfaced by the umbrella API.
#[derive(Debug, Error)]
pub enum RollcallError {
    /// The photo could not be turned into a fingerprint; ask for another capture.
    #[error("extraction failed: {0}")]
    Extraction(#[from] ExtractionError),
    #[error("gallery error: {0}")]
    Gallery(#[from] GalleryError),
    #[error("match failed: {0}")]
    Match(#[from] MatchError),
    #[error("attendance error: {0}")]
    Attendance(#[from] AttendanceError),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigLoadError),
}
