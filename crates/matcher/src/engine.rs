use std::sync::Arc;
use std::time::Instant;

use extract::Fingerprint;
use gallery::{Gallery, GalleryError, GallerySnapshot, IdentityRecord};
use rayon::prelude::*;
use tracing::{error, info, Level};

use crate::metrics::metrics_recorder;
use crate::score::{CosineScorer, SimilarityScorer};
use crate::types::{AmbiguityPolicy, Candidate, MatchConfig, MatchDecision, MatchError, Verification};


/// Decides which enrolled identity, if any, a live fingerprint belongs to.
///
/// The matcher holds no gallery state of its own. Each call takes one
/// [`GallerySnapshot`], so enrollments that land mid-match are either fully
/// visible or not visible at all.
pub struct Matcher {
    scorer: Box<dyn SimilarityScorer>,
    cfg: MatchConfig,
}

impl Matcher {
    /// Cosine matcher with the given configuration.
    pub fn new(cfg: MatchConfig) -> Result<Self, MatchError> {
        Self::with_scorer(cfg, Box::new(CosineScorer::new()))
    }

    /// Matcher with a custom similarity function.
    pub fn with_scorer(
        cfg: MatchConfig,
        scorer: Box<dyn SimilarityScorer>,
    ) -> Result<Self, MatchError> {
        cfg.validate()?;
        Ok(Self { scorer, cfg })
    }

    pub fn config(&self) -> &MatchConfig {
        &self.cfg
    }

    /// 1:N match using this matcher's configuration.
    pub fn match_fingerprint(
        &self,
        live: &Fingerprint,
        gallery: &Gallery,
    ) -> Result<MatchDecision, MatchError> {
        self.decide(live, &gallery.all(), &self.cfg)
    }

    /// 1:N match with a per-request configuration override.
    pub fn match_with_config(
        &self,
        live: &Fingerprint,
        gallery: &Gallery,
        cfg: &MatchConfig,
    ) -> Result<MatchDecision, MatchError> {
        cfg.validate()?;
        self.decide(live, &gallery.all(), cfg)
    }

    /// 1:N match against a snapshot the caller already holds.
    pub fn match_snapshot(
        &self,
        live: &Fingerprint,
        snapshot: &GallerySnapshot,
    ) -> Result<MatchDecision, MatchError> {
        self.decide(live, snapshot, &self.cfg)
    }

    /// 1:1 check of a live fingerprint against one claimed identity.
    pub fn verify(
        &self,
        live: &Fingerprint,
        gallery: &Gallery,
        identity_id: &str,
    ) -> Result<Verification, MatchError> {
        let start = Instant::now();
        let record = gallery
            .get(identity_id)
            .ok_or_else(|| GalleryError::NotFound(identity_id.to_string()))?;

        let score = self.score_record(live, &record)?;
        let verification = if score > self.cfg.threshold {
            Verification::Verified { score }
        } else {
            Verification::Rejected { score }
        };

        let latency = start.elapsed();
        let decision = if verification.is_verified() {
            "verified"
        } else {
            "rejected"
        };
        info!(
            identity_id,
            decision,
            score,
            elapsed_micros = latency.as_micros(),
            "match_verify"
        );
        if let Some(recorder) = metrics_recorder() {
            recorder.record_match(decision, 1, latency);
        }
        Ok(verification)
    }

    fn decide(
        &self,
        live: &Fingerprint,
        snapshot: &GallerySnapshot,
        cfg: &MatchConfig,
    ) -> Result<MatchDecision, MatchError> {
        let span = tracing::span!(
            Level::INFO,
            "matcher.match",
            candidates = snapshot.len(),
            threshold = cfg.threshold
        );
        let _guard = span.enter();
        let start = Instant::now();

        let scored = self.score_all(live, snapshot, cfg)?;
        let decision = resolve(scored, cfg);

        let latency = start.elapsed();
        info!(
            decision = decision.kind(),
            identity_id = decision.matched_identity(),
            elapsed_micros = latency.as_micros(),
            "match_decision"
        );
        if let Some(recorder) = metrics_recorder() {
            recorder.record_match(decision.kind(), snapshot.len(), latency);
        }
        Ok(decision)
    }

    /// Scores in identity-id order, whichever path computes them.
    fn score_all(
        &self,
        live: &Fingerprint,
        snapshot: &GallerySnapshot,
        cfg: &MatchConfig,
    ) -> Result<Vec<Candidate>, MatchError> {
        if cfg.use_parallel && snapshot.len() >= cfg.parallel_min_candidates {
            let records: Vec<&Arc<IdentityRecord>> = snapshot.iter().collect();
            records
                .par_iter()
                .map(|record| {
                    let score = self.score_record(live, record)?;
                    Ok(Candidate::new(record.identity_id(), score))
                })
                .collect()
        } else {
            snapshot
                .iter()
                .map(|record| {
                    let score = self.score_record(live, record)?;
                    Ok(Candidate::new(record.identity_id(), score))
                })
                .collect()
        }
    }

    fn score_record(&self, live: &Fingerprint, record: &IdentityRecord) -> Result<f32, MatchError> {
        self.scorer
            .score(live.as_slice(), record.fingerprint().as_slice())
            .map_err(|source| {
                error!(
                    identity_id = record.identity_id(),
                    expected = source.expected,
                    actual = source.actual,
                    "match_dimension_mismatch"
                );
                MatchError::DimensionMismatch {
                    identity_id: record.identity_id().to_string(),
                    source,
                }
            })
    }
}

/// Turn id-ordered scores into a decision.
fn resolve(scored: Vec<Candidate>, cfg: &MatchConfig) -> MatchDecision {
    let mut best: Option<&Candidate> = None;
    for candidate in &scored {
        // Strictly greater: on ties the earlier (smaller) id is kept.
        if best.map_or(true, |b| candidate.score > b.score || b.score.is_nan()) {
            best = Some(candidate);
        }
    }

    let qualifying: Vec<&Candidate> = scored
        .iter()
        .filter(|c| c.score > cfg.threshold)
        .collect();

    match qualifying.as_slice() {
        [] => MatchDecision::NoMatch {
            best: best.cloned(),
        },
        [only] => MatchDecision::Matched {
            identity_id: only.identity_id.clone(),
            score: only.score,
        },
        many => match cfg.policy {
            AmbiguityPolicy::Reject => MatchDecision::Ambiguous {
                candidates: many.iter().map(|c| (*c).clone()).collect(),
            },
            AmbiguityPolicy::BestScore => {
                // `best` clears the threshold whenever anything does.
                let winner = best.unwrap_or(many[0]);
                MatchDecision::Matched {
                    identity_id: winner.identity_id.clone(),
                    score: winner.score,
                }
            }
        },
    }
}
