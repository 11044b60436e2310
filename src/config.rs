//! YAML configuration file support for Rollcall.
//!
//! One file configures every stage: extraction, matching, gallery storage,
//! attendance contexts and logging. Each section converts into the owning
//! crate's config type, so the crates themselves never see YAML.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! version: "1.0"
//! name: "lecture-hall"
//!
//! extract:
//!   version: 1
//!   width: 100
//!   height: 100
//!   filter: "triangle"
//!
//! matcher:
//!   threshold: 0.8
//!   policy: "reject"
//!   use_parallel: false
//!   parallel_min_candidates: 256
//!
//! gallery:
//!   backend: "redb"
//!   redb_path: "/var/lib/rollcall/gallery.redb"
//!   compression: "zstd"
//!   compression_level: 3
//!
//! attendance:
//!   contexts: ["ALDS301", "SEP401", "DBS501", "NWC601"]
//!
//! logging:
//!   level: "info"
//!   json: false
//! ```

use std::fs;
use std::path::Path;

use extract::{ExtractConfig, ResizeFilter};
use gallery::{BackendConfig, CompressionCodec, CompressionConfig, GalleryConfig};
use matcher::{AmbiguityPolicy, MatchConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when loading YAML configuration files
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),

    #[error("missing required field: {0}")]
    MissingField(String),
}

/// Top-level YAML configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct RollcallConfig {
    /// Configuration format version
    pub version: String,

    /// Optional deployment name
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub extract: ExtractYamlConfig,

    #[serde(default)]
    pub matcher: MatcherYamlConfig,

    #[serde(default)]
    pub gallery: GalleryYamlConfig,

    #[serde(default)]
    pub attendance: AttendanceYamlConfig,

    #[serde(default)]
    pub logging: LoggingYamlConfig,
}

impl RollcallConfig {
    /// Load a YAML configuration file from the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: RollcallConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        self.extract.validate()?;
        self.matcher.validate()?;
        self.gallery.validate()?;
        self.attendance.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    pub fn extract_config(&self) -> Result<ExtractConfig, ConfigLoadError> {
        self.extract.to_extract_config()
    }

    pub fn match_config(&self) -> Result<MatchConfig, ConfigLoadError> {
        self.matcher.to_match_config()
    }

    /// Gallery config, pinned to the fingerprint length the extractor produces.
    pub fn gallery_config(&self) -> Result<GalleryConfig, ConfigLoadError> {
        let extract = self.extract_config()?;
        Ok(self
            .gallery
            .to_gallery_config()?
            .with_expected_len(extract.fingerprint_len()))
    }
}

impl Default for RollcallConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            name: None,
            extract: ExtractYamlConfig::default(),
            matcher: MatcherYamlConfig::default(),
            gallery: GalleryYamlConfig::default(),
            attendance: AttendanceYamlConfig::default(),
            logging: LoggingYamlConfig::default(),
        }
    }
}

/// Extraction stage YAML configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractYamlConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default = "default_resolution")]
    pub width: u32,

    #[serde(default = "default_resolution")]
    pub height: u32,

    #[serde(default = "default_filter")]
    pub filter: String,
}

impl ExtractYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        self.to_extract_config().map(|_| ())
    }

    pub fn to_extract_config(&self) -> Result<ExtractConfig, ConfigLoadError> {
        let filter = ResizeFilter::from_name(&self.filter).ok_or_else(|| {
            ConfigLoadError::Validation(format!(
                "extract.filter must be one of nearest, triangle, catmull_rom, gaussian, lanczos3 (got '{}')",
                self.filter
            ))
        })?;
        let cfg = ExtractConfig {
            version: self.version,
            width: self.width,
            height: self.height,
            filter,
        };
        cfg.validate()
            .map_err(|e| ConfigLoadError::Validation(format!("extract: {e}")))?;
        Ok(cfg)
    }
}

impl Default for ExtractYamlConfig {
    fn default() -> Self {
        Self {
            version: 1,
            width: default_resolution(),
            height: default_resolution(),
            filter: default_filter(),
        }
    }
}

/// Matcher YAML configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatcherYamlConfig {
    #[serde(default = "default_threshold")]
    pub threshold: f32,

    #[serde(default = "default_policy")]
    pub policy: String,

    #[serde(default)]
    pub use_parallel: bool,

    #[serde(default = "default_parallel_min_candidates")]
    pub parallel_min_candidates: usize,
}

impl MatcherYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        self.to_match_config().map(|_| ())
    }

    pub fn to_match_config(&self) -> Result<MatchConfig, ConfigLoadError> {
        let policy = AmbiguityPolicy::from_name(&self.policy).ok_or_else(|| {
            ConfigLoadError::Validation(format!(
                "matcher.policy must be 'reject' or 'best_score' (got '{}')",
                self.policy
            ))
        })?;
        let cfg = MatchConfig {
            threshold: self.threshold,
            policy,
            use_parallel: self.use_parallel,
            parallel_min_candidates: self.parallel_min_candidates,
        };
        cfg.validate()
            .map_err(|e| ConfigLoadError::Validation(format!("matcher: {e}")))?;
        Ok(cfg)
    }
}

impl Default for MatcherYamlConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            policy: default_policy(),
            use_parallel: false,
            parallel_min_candidates: default_parallel_min_candidates(),
        }
    }
}

/// Gallery storage YAML configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GalleryYamlConfig {
    #[serde(default = "default_backend")]
    pub backend: String,

    #[serde(default)]
    pub redb_path: Option<String>,

    #[serde(default = "default_compression")]
    pub compression: String,

    #[serde(default = "default_compression_level")]
    pub compression_level: i32,
}

impl GalleryYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        self.to_gallery_config().map(|_| ())
    }

    pub fn to_gallery_config(&self) -> Result<GalleryConfig, ConfigLoadError> {
        let backend = match self.backend.as_str() {
            "in_memory" => BackendConfig::in_memory(),
            "redb" => match self.redb_path.as_deref() {
                Some(path) if !path.trim().is_empty() => BackendConfig::redb(path),
                _ => {
                    return Err(ConfigLoadError::MissingField(
                        "gallery.redb_path is required when backend is 'redb'".to_string(),
                    ))
                }
            },
            other => {
                return Err(ConfigLoadError::Validation(format!(
                    "gallery.backend must be 'in_memory' or 'redb' (got '{other}')"
                )))
            }
        };

        let compression = match self.compression.as_str() {
            "none" => CompressionConfig::none(),
            "zstd" => {
                if !(1..=22).contains(&self.compression_level) {
                    return Err(ConfigLoadError::Validation(
                        "gallery.compression_level must be between 1 and 22".to_string(),
                    ));
                }
                CompressionConfig::new(CompressionCodec::Zstd, self.compression_level)
            }
            other => {
                return Err(ConfigLoadError::Validation(format!(
                    "gallery.compression must be 'zstd' or 'none' (got '{other}')"
                )))
            }
        };

        Ok(GalleryConfig::new()
            .with_backend(backend)
            .with_compression(compression))
    }
}

impl Default for GalleryYamlConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            redb_path: None,
            compression: default_compression(),
            compression_level: default_compression_level(),
        }
    }
}

/// Attendance recording YAML configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AttendanceYamlConfig {
    /// Accepted context codes. Empty accepts any non-empty code.
    #[serde(default)]
    pub contexts: Vec<String>,
}

impl AttendanceYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.contexts.iter().any(|c| c.trim().is_empty()) {
            return Err(ConfigLoadError::Validation(
                "attendance.contexts must not contain empty codes".to_string(),
            ));
        }
        Ok(())
    }
}

/// Logging YAML configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingYamlConfig {
    /// `EnvFilter` directive, e.g. `info` or `rollcall=debug,gallery=warn`.
    /// `RUST_LOG` takes precedence when set.
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,
}

impl LoggingYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.level.trim().is_empty() {
            return Err(ConfigLoadError::Validation(
                "logging.level must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for LoggingYamlConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_version() -> u32 {
    1
}
fn default_resolution() -> u32 {
    100
}
fn default_filter() -> String {
    "triangle".to_string()
}
fn default_threshold() -> f32 {
    0.8
}
fn default_policy() -> String {
    "reject".to_string()
}
fn default_parallel_min_candidates() -> usize {
    256
}
fn default_backend() -> String {
    "in_memory".to_string()
}
fn default_compression() -> String {
    "zstd".to_string()
}
fn default_compression_level() -> i32 {
    3
}
fn default_log_level() -> String {
    "info".to_string()
}
