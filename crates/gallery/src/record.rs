use chrono::{DateTime, Utc};
use extract::Fingerprint;
use serde_json::Value as JsonValue;

/// One enrolled identity.
///
/// Records are created on enrollment and replaced wholesale on re-enrollment.
/// The gallery hands them out as `Arc<IdentityRecord>`, and nothing on this
/// type allows mutation, so a stored fingerprint cannot be altered by readers.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityRecord {
    identity_id: String,
    fingerprint: Fingerprint,
    metadata: JsonValue,
    enrolled_at: DateTime<Utc>,
}

impl IdentityRecord {
    pub fn new(identity_id: impl Into<String>, fingerprint: Fingerprint, metadata: JsonValue) -> Self {
        Self::with_enrolled_at(identity_id, fingerprint, metadata, Utc::now())
    }

    pub fn with_enrolled_at(
        identity_id: impl Into<String>,
        fingerprint: Fingerprint,
        metadata: JsonValue,
        enrolled_at: DateTime<Utc>,
    ) -> Self {
        Self {
            identity_id: identity_id.into(),
            fingerprint,
            metadata,
            enrolled_at,
        }
    }

    pub fn identity_id(&self) -> &str {
        &self.identity_id
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Opaque caller metadata (name, contact details, photo location, ...).
    pub fn metadata(&self) -> &JsonValue {
        &self.metadata
    }

    pub fn enrolled_at(&self) -> DateTime<Utc> {
        self.enrolled_at
    }
}
