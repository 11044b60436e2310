//! Process-wide observer for match decisions.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use once_cell::sync::OnceCell;

/// Receives one observation per completed match or verification.
pub trait MatchMetrics: Send + Sync {
    /// `decision` is [`crate::MatchDecision::kind`] for 1:N matches and
    /// `"verified"` / `"rejected"` for 1:1 checks.
    fn record_match(&self, decision: &str, candidates: usize, latency: Duration);
}

static MATCH_METRICS: OnceCell<RwLock<Option<Arc<dyn MatchMetrics>>>> = OnceCell::new();

fn slot() -> &'static RwLock<Option<Arc<dyn MatchMetrics>>> {
    MATCH_METRICS.get_or_init(|| RwLock::new(None))
}

/// Install (or clear, with `None`) the metrics recorder.
pub fn set_match_metrics(recorder: Option<Arc<dyn MatchMetrics>>) {
    let mut guard = slot().write().unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = recorder;
}

pub(crate) fn metrics_recorder() -> Option<Arc<dyn MatchMetrics>> {
    slot()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}
