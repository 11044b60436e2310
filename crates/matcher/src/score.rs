//! Similarity scoring between two fingerprints.

use thiserror::Error;

/// Two fingerprints of different lengths were compared.
///
/// This means the extractor configuration changed without re-enrolling the
/// gallery. It is never resolved by truncating or padding.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("fingerprint dimension mismatch: expected {expected}, got {actual}")]
pub struct DimensionMismatchError {
    pub expected: usize,
    pub actual: usize,
}

/// Scores how alike two fingerprints are. Higher is more similar.
pub trait SimilarityScorer: Send + Sync {
    /// Similarity in `[-1.0, 1.0]`.
    fn score(&self, a: &[f32], b: &[f32]) -> Result<f32, DimensionMismatchError>;

    /// `true` when `score(a, b)` is strictly greater than `threshold`.
    fn is_match(&self, a: &[f32], b: &[f32], threshold: f32) -> Result<bool, DimensionMismatchError> {
        Ok(self.score(a, b)? > threshold)
    }
}

/// Cosine similarity: `dot(a, b) / (|a| * |b|)`.
///
/// Sums are accumulated in `f64` and the result is clamped to `[-1.0, 1.0]`,
/// so self-similarity of a non-zero vector lands at `1.0` within float
/// tolerance and `score(a, b) == score(b, a)` exactly. A zero-magnitude vector
/// on either side scores `-1.0`, the least similar value, and can never pass
/// a threshold.
#[derive(Debug, Default, Clone, Copy)]
pub struct CosineScorer;

impl CosineScorer {
    pub fn new() -> Self {
        Self
    }
}

impl SimilarityScorer for CosineScorer {
    fn score(&self, a: &[f32], b: &[f32]) -> Result<f32, DimensionMismatchError> {
        cosine_similarity(a, b)
    }
}

/// Free-function form of [`CosineScorer::score`].
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, DimensionMismatchError> {
    if a.len() != b.len() {
        return Err(DimensionMismatchError {
            expected: a.len(),
            actual: b.len(),
        });
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(-1.0);
    }

    // Multiplying the two norms keeps the expression symmetric in a and b.
    let cosine = dot / (norm_a.sqrt() * norm_b.sqrt());
    Ok(cosine.clamp(-1.0, 1.0) as f32)
}
