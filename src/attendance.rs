//! Attendance recording on top of [`Recognizer`].
//!
//! The matcher only says who is in a photo. Whether that person was already
//! marked present today for a given context (a module or class code) is the
//! ledger's business: [`AttendanceLedger::record`] stores at most one event
//! per `(identity, context, date)` and reports a repeat as
//! [`RecordOutcome::AlreadyRecorded`].

use std::sync::Arc;

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use extract::image::DynamicImage;
use matcher::{Candidate, MatchDecision, Verification};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::RollcallConfig;
use crate::recognizer::Recognizer;
use crate::RollcallError;

/// One "present" mark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceEvent {
    pub identity_id: String,
    pub context: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    /// Similarity score of the capture that produced this mark.
    pub score: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordOutcome {
    Recorded,
    AlreadyRecorded,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AttendanceError {
    #[error("context code must not be empty")]
    EmptyContext,
    #[error("unknown context code `{0}`")]
    UnknownContext(String),
    #[error("ledger error: {0}")]
    Ledger(String),
}

/// Storage for attendance events.
pub trait AttendanceLedger: Send + Sync {
    /// Store `event` unless one already exists for the same identity, context
    /// and date. Must be atomic: two concurrent calls for the same key yield
    /// exactly one `Recorded`.
    fn record(&self, event: &AttendanceEvent) -> Result<RecordOutcome, AttendanceError>;

    /// Every event for one identity, oldest first.
    fn events_for(&self, identity_id: &str) -> Result<Vec<AttendanceEvent>, AttendanceError>;

    /// Distinct identities marked present for `context` on `date`, sorted.
    fn present_on(&self, context: &str, date: NaiveDate) -> Result<Vec<String>, AttendanceError>;
}

type LedgerKey = (String, String, NaiveDate);

/// Process-local ledger backed by a `DashMap`.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    events: DashMap<LedgerKey, AttendanceEvent>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl AttendanceLedger for InMemoryLedger {
    fn record(&self, event: &AttendanceEvent) -> Result<RecordOutcome, AttendanceError> {
        let key = (
            event.identity_id.clone(),
            event.context.clone(),
            event.date,
        );
        match self.events.entry(key) {
            Entry::Occupied(_) => Ok(RecordOutcome::AlreadyRecorded),
            Entry::Vacant(slot) => {
                slot.insert(event.clone());
                Ok(RecordOutcome::Recorded)
            }
        }
    }

    fn events_for(&self, identity_id: &str) -> Result<Vec<AttendanceEvent>, AttendanceError> {
        let mut events: Vec<AttendanceEvent> = self
            .events
            .iter()
            .filter(|entry| entry.key().0 == identity_id)
            .map(|entry| entry.value().clone())
            .collect();
        events.sort_by(|a, b| {
            (a.date, a.time, &a.context).cmp(&(b.date, b.time, &b.context))
        });
        Ok(events)
    }

    fn present_on(&self, context: &str, date: NaiveDate) -> Result<Vec<String>, AttendanceError> {
        let mut ids: Vec<String> = self
            .events
            .iter()
            .filter(|entry| entry.key().1 == context && entry.key().2 == date)
            .map(|entry| entry.key().0.clone())
            .collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }
}

/// Source of the current local date and time.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Wall clock in the machine's local time zone.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock that always returns the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// What happened to one photo submission.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    Recorded(AttendanceEvent),
    AlreadyRecorded { identity_id: String },
    /// Nothing was written; a human has to pick.
    Ambiguous { candidates: Vec<Candidate> },
    /// Nothing was written.
    NoMatch { best: Option<Candidate> },
}

/// Turns photo submissions into ledger entries.
pub struct AttendanceDesk {
    recognizer: Recognizer,
    ledger: Arc<dyn AttendanceLedger>,
    clock: Arc<dyn Clock>,
    contexts: Vec<String>,
}

impl AttendanceDesk {
    pub fn new(recognizer: Recognizer, ledger: Arc<dyn AttendanceLedger>) -> Self {
        Self {
            recognizer,
            ledger,
            clock: Arc::new(SystemClock),
            contexts: Vec::new(),
        }
    }

    /// Recognizer, gallery and accepted contexts as described by `cfg`.
    pub fn from_config(
        cfg: &RollcallConfig,
        ledger: Arc<dyn AttendanceLedger>,
    ) -> Result<Self, RollcallError> {
        let recognizer = Recognizer::from_config(cfg)?;
        Ok(Self::new(recognizer, ledger).with_contexts(cfg.attendance.contexts.iter().cloned()))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Restrict submissions to these context codes. Empty accepts any code.
    pub fn with_contexts<I, S>(mut self, contexts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.contexts = contexts.into_iter().map(Into::into).collect();
        self
    }

    pub fn recognizer(&self) -> &Recognizer {
        &self.recognizer
    }

    pub fn ledger(&self) -> &Arc<dyn AttendanceLedger> {
        &self.ledger
    }

    /// Recognize whoever is in `image` and mark them present for `context`.
    pub fn submit(
        &self,
        context: &str,
        image: &DynamicImage,
    ) -> Result<SubmissionOutcome, RollcallError> {
        let context = self.check_context(context)?;
        match self.recognizer.recognize(image)? {
            MatchDecision::Matched { identity_id, score } => {
                self.record(identity_id, context, score)
            }
            MatchDecision::Ambiguous { candidates } => {
                warn!(
                    context,
                    candidates = candidates.len(),
                    "attendance_ambiguous"
                );
                Ok(SubmissionOutcome::Ambiguous { candidates })
            }
            MatchDecision::NoMatch { best } => {
                info!(context, "attendance_no_match");
                Ok(SubmissionOutcome::NoMatch { best })
            }
        }
    }

    /// Self-service marking: check `image` against the claimed identity only.
    pub fn submit_for(
        &self,
        identity_id: &str,
        context: &str,
        image: &DynamicImage,
    ) -> Result<SubmissionOutcome, RollcallError> {
        let context = self.check_context(context)?;
        match self.recognizer.verify(identity_id, image)? {
            Verification::Verified { score } => {
                self.record(identity_id.to_string(), context, score)
            }
            Verification::Rejected { score } => {
                info!(identity_id, context, score, "attendance_verify_rejected");
                Ok(SubmissionOutcome::NoMatch {
                    best: Some(Candidate::new(identity_id, score)),
                })
            }
        }
    }

    fn record(
        &self,
        identity_id: String,
        context: &str,
        score: f32,
    ) -> Result<SubmissionOutcome, RollcallError> {
        let now = self.clock.now();
        let event = AttendanceEvent {
            identity_id,
            context: context.to_string(),
            date: now.date(),
            time: now.time(),
            score,
        };
        match self.ledger.record(&event)? {
            RecordOutcome::Recorded => {
                info!(
                    identity_id = %event.identity_id,
                    context,
                    date = %event.date,
                    "attendance_recorded"
                );
                Ok(SubmissionOutcome::Recorded(event))
            }
            RecordOutcome::AlreadyRecorded => {
                info!(
                    identity_id = %event.identity_id,
                    context,
                    date = %event.date,
                    "attendance_already_recorded"
                );
                Ok(SubmissionOutcome::AlreadyRecorded {
                    identity_id: event.identity_id,
                })
            }
        }
    }

    fn check_context<'a>(&self, context: &'a str) -> Result<&'a str, AttendanceError> {
        let context = context.trim();
        if context.is_empty() {
            return Err(AttendanceError::EmptyContext);
        }
        if !self.contexts.is_empty() && !self.contexts.iter().any(|c| c == context) {
            return Err(AttendanceError::UnknownContext(context.to_string()));
        }
        Ok(context)
    }
}
