//! # Rollcall Matcher (`matcher`)
//!
//! ## Purpose
//!
//! `matcher` answers "who is this?" for a live fingerprint. It scores the
//! fingerprint against every identity in one [`gallery::GallerySnapshot`] and
//! turns the scores into a [`MatchDecision`]:
//!
//! - no candidate strictly above the threshold gives `NoMatch`, carrying the
//!   closest candidate for diagnostics;
//! - exactly one gives `Matched`;
//! - several are resolved by the configured [`AmbiguityPolicy`]. `Reject`
//!   (the default) returns `Ambiguous` with every candidate sorted by id,
//!   `BestScore` picks the highest score with ties going to the smallest id.
//!
//! Candidates are visited in identity-id order, so the same gallery and the
//! same live fingerprint always produce the same decision.
//!
//! ## Core Types
//!
//! - [`SimilarityScorer`] / [`CosineScorer`]: pairwise similarity in `[-1, 1]`.
//! - [`MatchConfig`]: threshold (default `0.8`), ambiguity policy, parallelism.
//! - [`Matcher`]: 1:N [`Matcher::match_fingerprint`] and 1:1 [`Matcher::verify`].
//!
//! ## Example Usage
//!
//! ```
//! use extract::Fingerprint;
//! use gallery::Gallery;
//! use matcher::{MatchConfig, MatchDecision, Matcher};
//! use serde_json::json;
//!
//! let gallery = Gallery::new();
//! gallery.enroll("S001", Fingerprint::from_values(vec![0.9, 0.1, 0.4]), json!({})).unwrap();
//!
//! let matcher = Matcher::new(MatchConfig::default()).unwrap();
//! let live = Fingerprint::from_values(vec![0.88, 0.12, 0.41]);
//! match matcher.match_fingerprint(&live, &gallery).unwrap() {
//!     MatchDecision::Matched { identity_id, score } => println!("{identity_id} ({score:.3})"),
//!     other => println!("not recognized: {other:?}"),
//! }
//! ```
//!
//! ## Observability
//!
//! Install a [`MatchMetrics`] implementation via [`set_match_metrics`] to record
//! decision kinds, candidate counts and latency. This is typically done once
//! during service startup.

pub mod engine;
pub mod metrics;
pub mod score;
pub mod types;

pub use crate::engine::Matcher;
pub use crate::metrics::{set_match_metrics, MatchMetrics};
pub use crate::score::{cosine_similarity, CosineScorer, DimensionMismatchError, SimilarityScorer};
pub use crate::types::{
    AmbiguityPolicy, Candidate, MatchConfig, MatchDecision, MatchError, Verification,
};
