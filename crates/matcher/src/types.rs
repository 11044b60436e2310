use gallery::GalleryError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::score::DimensionMismatchError;

/// What to do when more than one enrolled identity clears the threshold.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguityPolicy {
    /// Report every qualifying candidate and let the caller decide.
    #[default]
    Reject,
    /// Pick the highest score; exact ties go to the lexically smallest id.
    BestScore,
}

impl AmbiguityPolicy {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "reject" => Some(AmbiguityPolicy::Reject),
            "best_score" | "best-score" | "best" => Some(AmbiguityPolicy::BestScore),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AmbiguityPolicy::Reject => "reject",
            AmbiguityPolicy::BestScore => "best_score",
        }
    }
}

/// Matching knobs. Cheap to clone and serde-friendly so it can be embedded in
/// higher-level configs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchConfig {
    /// A candidate qualifies when its score is strictly greater than this.
    #[serde(default = "MatchConfig::default_threshold")]
    pub threshold: f32,
    #[serde(default)]
    pub policy: AmbiguityPolicy,
    /// Score candidates on the rayon pool for large galleries.
    #[serde(default)]
    pub use_parallel: bool,
    /// Gallery size from which `use_parallel` takes effect.
    #[serde(default = "MatchConfig::default_parallel_min_candidates")]
    pub parallel_min_candidates: usize,
}

impl MatchConfig {
    pub(crate) fn default_threshold() -> f32 {
        0.8
    }

    pub(crate) fn default_parallel_min_candidates() -> usize {
        256
    }

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_policy(mut self, policy: AmbiguityPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_parallel(mut self, enabled: bool) -> Self {
        self.use_parallel = enabled;
        self
    }

    pub fn validate(&self) -> Result<(), MatchError> {
        if !self.threshold.is_finite() {
            return Err(MatchError::InvalidConfig(
                "threshold must be a finite number".into(),
            ));
        }
        if !(-1.0..1.0).contains(&self.threshold) {
            return Err(MatchError::InvalidConfig(
                "threshold must be in [-1.0, 1.0)".into(),
            ));
        }
        if self.use_parallel && self.parallel_min_candidates == 0 {
            return Err(MatchError::InvalidConfig(
                "parallel_min_candidates must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            threshold: Self::default_threshold(),
            policy: AmbiguityPolicy::default(),
            use_parallel: false,
            parallel_min_candidates: Self::default_parallel_min_candidates(),
        }
    }
}

/// One scored gallery entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candidate {
    pub identity_id: String,
    pub score: f32,
}

impl Candidate {
    pub fn new(identity_id: impl Into<String>, score: f32) -> Self {
        Self {
            identity_id: identity_id.into(),
            score,
        }
    }
}

/// Outcome of a 1:N match.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum MatchDecision {
    Matched { identity_id: String, score: f32 },
    /// Several identities cleared the threshold; sorted by identity id.
    Ambiguous { candidates: Vec<Candidate> },
    /// Nothing cleared the threshold. `best` is the closest entry, if any.
    NoMatch { best: Option<Candidate> },
}

impl MatchDecision {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            MatchDecision::Matched { .. } => "matched",
            MatchDecision::Ambiguous { .. } => "ambiguous",
            MatchDecision::NoMatch { .. } => "no_match",
        }
    }

    pub fn matched_identity(&self) -> Option<&str> {
        match self {
            MatchDecision::Matched { identity_id, .. } => Some(identity_id),
            _ => None,
        }
    }
}

/// Outcome of a 1:1 check against a claimed identity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Verification {
    Verified { score: f32 },
    Rejected { score: f32 },
}

impl Verification {
    pub fn is_verified(&self) -> bool {
        matches!(self, Verification::Verified { .. })
    }

    pub fn score(&self) -> f32 {
        match self {
            Verification::Verified { score } | Verification::Rejected { score } => *score,
        }
    }
}

/// Errors produced by the matching layer.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MatchError {
    #[error("invalid match config: {0}")]
    InvalidConfig(String),
    #[error("identity `{identity_id}`: {source}")]
    DimensionMismatch {
        identity_id: String,
        #[source]
        source: DimensionMismatchError,
    },
    #[error("gallery error: {0}")]
    Gallery(#[from] GalleryError),
}
