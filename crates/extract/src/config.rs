//! Configuration and error types for fingerprint extraction.
//!
//! Extraction is a pure function of `(raster, config)`: no I/O, no clocks and
//! no global state, so two runs over the same pixels always agree bit for bit.

use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Resampling kernel used to bring every photo to the canonical resolution.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResizeFilter {
    Nearest,
    /// Bilinear interpolation.
    #[default]
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl ResizeFilter {
    pub(crate) fn as_filter_type(self) -> FilterType {
        match self {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Triangle => FilterType::Triangle,
            ResizeFilter::CatmullRom => FilterType::CatmullRom,
            ResizeFilter::Gaussian => FilterType::Gaussian,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }

    /// Parse the lowercase name used in config files.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "nearest" => Some(ResizeFilter::Nearest),
            "triangle" | "bilinear" => Some(ResizeFilter::Triangle),
            "catmull_rom" => Some(ResizeFilter::CatmullRom),
            "gaussian" => Some(ResizeFilter::Gaussian),
            "lanczos3" => Some(ResizeFilter::Lanczos3),
            _ => None,
        }
    }
}

/// Configuration for the grayscale intensity extractor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractConfig {
    /// Configuration schema version.
    ///
    /// Any change that can alter fingerprints for the same photo must bump
    /// this, since stored galleries are only comparable within one version.
    pub version: u32,
    /// Canonical width in pixels after resampling.
    pub width: u32,
    /// Canonical height in pixels after resampling.
    pub height: u32,
    /// Resampling kernel.
    pub filter: ResizeFilter,
}

impl ExtractConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the canonical resolution. Fingerprint length is `width * height`.
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_filter(mut self, filter: ResizeFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Number of values every fingerprint produced with this config holds.
    pub fn fingerprint_len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn validate(&self) -> Result<(), ExtractionError> {
        if self.version == 0 {
            return Err(ExtractionError::InvalidConfig(
                "version must be >= 1".into(),
            ));
        }
        if self.width == 0 || self.height == 0 {
            return Err(ExtractionError::InvalidConfig(format!(
                "canonical resolution must be at least 1x1 (got {}x{})",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            version: 1,
            width: 100,
            height: 100,
            filter: ResizeFilter::Triangle,
        }
    }
}

/// Errors returned while turning a photo into a fingerprint.
///
/// All variants are recoverable from the caller's point of view: the usual
/// reaction is to ask for another capture.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("image could not be decoded: {0}")]
    Decode(String),

    #[error("image is empty ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    #[error("invalid extract config: {0}")]
    InvalidConfig(String),

    #[error("resampling produced {actual} values, expected {expected}")]
    Resample { expected: usize, actual: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_hundred_square_bilinear() {
        let cfg = ExtractConfig::default();
        assert_eq!(cfg.version, 1);
        assert_eq!((cfg.width, cfg.height), (100, 100));
        assert_eq!(cfg.filter, ResizeFilter::Triangle);
        assert_eq!(cfg.fingerprint_len(), 10_000);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn zero_resolution_rejected() {
        let cfg = ExtractConfig::default().with_resolution(0, 10);
        assert!(matches!(
            cfg.validate(),
            Err(ExtractionError::InvalidConfig(msg)) if msg.contains("0x10")
        ));
    }

    #[test]
    fn zero_version_rejected() {
        let cfg = ExtractConfig {
            version: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn filter_names_parse() {
        assert_eq!(ResizeFilter::from_name("bilinear"), Some(ResizeFilter::Triangle));
        assert_eq!(ResizeFilter::from_name("lanczos3"), Some(ResizeFilter::Lanczos3));
        assert_eq!(ResizeFilter::from_name("cubic"), None);
    }

    #[test]
    fn config_serde_uses_snake_case_filters() {
        let cfg = ExtractConfig::default().with_filter(ResizeFilter::CatmullRom);
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(json.contains("\"catmull_rom\""));
        let back: ExtractConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
    }
}
