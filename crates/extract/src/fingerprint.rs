//! Fingerprint and metadata types.
//!
//! A fingerprint is immutable once produced. The values are private and only
//! ever lent out as `&[f32]`, so a stored fingerprint cannot be changed through
//! anything handed to a caller.

use serde::{Deserialize, Serialize};

/// Algorithm identifier written into fingerprints built from raw values.
pub const RAW_ALGORITHM: &str = "raw";

/// Fixed-length feature vector derived from one photo.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Fingerprint {
    values: Vec<f32>,
    meta: FingerprintMeta,
}

/// How a fingerprint was produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FingerprintMeta {
    /// Human-readable algorithm identifier (e.g. "gray_intensity_v1").
    pub algorithm: String,
    /// Algorithm version; bumped whenever output for the same photo changes.
    pub algorithm_version: u16,
    /// Canonical width the photo was resampled to.
    pub width: u32,
    /// Canonical height the photo was resampled to.
    pub height: u32,
}

impl Fingerprint {
    /// Assemble a fingerprint from already computed values.
    ///
    /// Custom extractors use this; `meta.width * meta.height` is expected to
    /// equal `values.len()` but is not enforced for non-raster strategies.
    pub fn new(values: Vec<f32>, meta: FingerprintMeta) -> Self {
        Self { values, meta }
    }

    /// Wrap a bare vector, e.g. one produced outside this crate or in tests.
    pub fn from_values(values: Vec<f32>) -> Self {
        let width = u32::try_from(values.len()).unwrap_or(u32::MAX);
        Self {
            values,
            meta: FingerprintMeta {
                algorithm: RAW_ALGORITHM.to_string(),
                algorithm_version: 0,
                width,
                height: 1,
            },
        }
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn meta(&self) -> &FingerprintMeta {
        &self.meta
    }

    /// Consume the fingerprint, returning its values and metadata.
    pub fn into_parts(self) -> (Vec<f32>, FingerprintMeta) {
        (self.values, self.meta)
    }
}

impl AsRef<[f32]> for Fingerprint {
    fn as_ref(&self) -> &[f32] {
        &self.values
    }
}
