//! # Rollcall Fingerprint Extraction
//!
//! This crate turns a decoded photo into a fixed-length numeric fingerprint
//! that the matcher can compare against enrolled identities.
//!
//! ## Contract
//!
//! - Input is an already decoded raster ([`image::DynamicImage`]). Decoding
//!   uploads is the caller's job; [`GrayscaleExtractor::extract_encoded`] is
//!   a thin convenience on top of `image::load_from_memory`.
//! - The API is a pure function of `(raster, config)`. The same photo and the
//!   same [`ExtractConfig`] always produce a bit-identical [`Fingerprint`].
//! - On failure nothing is returned but an [`ExtractionError`]; a partially
//!   filled vector never escapes.
//!
//! ## Pipeline
//!
//! 1.  **Luma**: color rasters are collapsed to one intensity channel.
//! 2.  **Resample**: the intensity image is resized to the canonical
//!     resolution (100×100 by default) regardless of input size, which is
//!     what makes fingerprints from different cameras comparable.
//! 3.  **Normalize**: 8-bit intensities are scaled into `[0, 1]`.
//! 4.  **Flatten**: row-major, length `width * height`.
//!
//! ## Example Usage
//!
//! ```
//! use extract::{ExtractConfig, FingerprintExtractor, GrayscaleExtractor};
//! use image::{DynamicImage, GrayImage, Luma};
//!
//! let photo = GrayImage::from_fn(40, 30, |x, y| Luma([((x + y) * 4) as u8]));
//! let extractor = GrayscaleExtractor::new(ExtractConfig::default().with_resolution(16, 16)).unwrap();
//!
//! let fp = extractor.extract(&DynamicImage::ImageLuma8(photo)).unwrap();
//! assert_eq!(fp.len(), 256);
//! assert!(fp.as_slice().iter().all(|v| (0.0..=1.0).contains(v)));
//! ```
pub mod config;
pub mod fingerprint;

use std::time::Instant;

use image::{imageops, DynamicImage, GenericImageView};
use tracing::{debug, warn};

pub use crate::config::{ExtractConfig, ExtractionError, ResizeFilter};
pub use crate::fingerprint::{Fingerprint, FingerprintMeta, RAW_ALGORITHM};
pub use image;

/// Current grayscale extraction algorithm version.
pub const EXTRACT_VERSION: u16 = 1;

/// Identifier stored in every fingerprint this crate produces.
pub const EXTRACT_ALGORITHM: &str = "gray_intensity_v1";

/// A strategy that turns a decoded photo into a fingerprint.
///
/// Implementations must be deterministic and must always return vectors of
/// [`FingerprintExtractor::fingerprint_len`] values.
pub trait FingerprintExtractor: Send + Sync {
    fn extract(&self, image: &DynamicImage) -> Result<Fingerprint, ExtractionError>;

    /// Length of every fingerprint this extractor produces.
    fn fingerprint_len(&self) -> usize;
}

/// Grayscale intensity extractor: luma → resample → normalize → flatten.
#[derive(Debug, Clone)]
pub struct GrayscaleExtractor {
    cfg: ExtractConfig,
}

impl GrayscaleExtractor {
    /// Build an extractor, rejecting degenerate configurations up front.
    pub fn new(cfg: ExtractConfig) -> Result<Self, ExtractionError> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    pub fn config(&self) -> &ExtractConfig {
        &self.cfg
    }

    /// Decode encoded bytes (PNG or JPEG) and extract in one step.
    pub fn extract_encoded(&self, bytes: &[u8]) -> Result<Fingerprint, ExtractionError> {
        let image = decode_image(bytes)?;
        self.extract(&image)
    }
}

impl Default for GrayscaleExtractor {
    fn default() -> Self {
        Self {
            cfg: ExtractConfig::default(),
        }
    }
}

impl FingerprintExtractor for GrayscaleExtractor {
    fn extract(&self, image: &DynamicImage) -> Result<Fingerprint, ExtractionError> {
        extract_fingerprint(image, &self.cfg)
    }

    fn fingerprint_len(&self) -> usize {
        self.cfg.fingerprint_len()
    }
}

/// Decode an encoded photo into a raster.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, ExtractionError> {
    if bytes.is_empty() {
        return Err(ExtractionError::Decode("no image bytes supplied".into()));
    }
    image::load_from_memory(bytes).map_err(|err| {
        warn!(error = %err, len = bytes.len(), "extract_decode_failure");
        ExtractionError::Decode(err.to_string())
    })
}

/// Compute a grayscale intensity fingerprint for `image`.
pub fn extract_fingerprint(
    image: &DynamicImage,
    cfg: &ExtractConfig,
) -> Result<Fingerprint, ExtractionError> {
    let start = Instant::now();
    cfg.validate()?;

    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        warn!(width, height, "extract_empty_image");
        return Err(ExtractionError::EmptyImage { width, height });
    }

    let gray = image.to_luma8();
    let resized = imageops::resize(&gray, cfg.width, cfg.height, cfg.filter.as_filter_type());

    let expected = cfg.fingerprint_len();
    let pixels = resized.into_raw();
    if pixels.len() != expected {
        return Err(ExtractionError::Resample {
            expected,
            actual: pixels.len(),
        });
    }

    let values: Vec<f32> = pixels.iter().map(|&p| f32::from(p) / 255.0).collect();

    debug!(
        source_width = width,
        source_height = height,
        len = values.len(),
        elapsed_micros = start.elapsed().as_micros() as u64,
        "extract_success"
    );

    Ok(Fingerprint::new(
        values,
        FingerprintMeta {
            algorithm: EXTRACT_ALGORITHM.to_string(),
            algorithm_version: EXTRACT_VERSION,
            width: cfg.width,
            height: cfg.height,
        },
    ))
}
