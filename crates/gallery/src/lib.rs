//! # Rollcall Gallery
//!
//! The gallery is the set of enrolled `(identity, fingerprint)` pairs the
//! matcher compares live captures against. It is an explicit value owned by
//! the application (typically behind an `Arc`), never a process-wide global.
//!
//! ## Consistency
//!
//! - Readers call [`Gallery::all`] and get a [`GallerySnapshot`]: an immutable
//!   view that stays valid however many enrollments happen afterwards.
//!   Iteration is in identity-id lexical order, finite and restartable.
//! - Writers are serialized. Each mutation validates against the current
//!   snapshot, writes through to the [`GalleryBackend`], and only then
//!   applies the change. A failing backend leaves the gallery as it was, and
//!   readers never observe a half-written record.
//! - The map is copied on write only while some snapshot still shares it;
//!   otherwise the change is made in place.
//! - Every fingerprint in a gallery has the same length; a mutation that
//!   would break this fails with [`GalleryError::DimensionMismatch`].
//!
//! ## Example Usage
//!
//! ```
//! use extract::Fingerprint;
//! use gallery::{Gallery, GalleryError};
//! use serde_json::json;
//!
//! let gallery = Gallery::new();
//! gallery.enroll("S001", Fingerprint::from_values(vec![0.2, 0.4]), json!({ "name": "Ada" })).unwrap();
//!
//! let again = gallery.enroll("S001", Fingerprint::from_values(vec![0.9, 0.1]), json!({}));
//! assert!(matches!(again, Err(GalleryError::DuplicateIdentity(_))));
//!
//! let ids: Vec<_> = gallery.all().iter().map(|r| r.identity_id().to_string()).collect();
//! assert_eq!(ids, vec!["S001"]);
//! ```

mod backend;
pub mod codec;
mod record;

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, RwLock};

use extract::Fingerprint;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{info, warn};

#[cfg(feature = "backend-redb")]
pub use crate::backend::RedbBackend;
pub use crate::backend::{BackendConfig, GalleryBackend, InMemoryBackend};
pub use crate::codec::{CodecError, CompressionCodec, CompressionConfig, RECORD_SCHEMA_VERSION};
pub use crate::record::IdentityRecord;

type Entries = BTreeMap<Arc<str>, Arc<IdentityRecord>>;

/// Errors produced by gallery mutations and loading.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GalleryError {
    #[error("identity `{0}` is already enrolled")]
    DuplicateIdentity(String),
    #[error("identity `{0}` is not enrolled")]
    NotFound(String),
    #[error("fingerprint length {actual} does not match gallery length {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("invalid identity id: {0}")]
    InvalidIdentity(String),
    #[error("invalid fingerprint: {0}")]
    InvalidFingerprint(String),
    #[error("backend error: {0}")]
    Backend(String),
    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl GalleryError {
    pub fn backend<E: std::fmt::Display>(err: E) -> Self {
        Self::Backend(err.to_string())
    }
}

/// Configuration for opening a gallery.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GalleryConfig {
    pub backend: BackendConfig,
    pub compression: CompressionConfig,
    /// Required fingerprint length. When `None` the first enrolled record
    /// establishes it.
    pub expected_len: Option<usize>,
}

impl GalleryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_backend(mut self, backend: BackendConfig) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_compression(mut self, compression: CompressionConfig) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_expected_len(mut self, len: usize) -> Self {
        self.expected_len = Some(len);
        self
    }
}

/// Immutable, point-in-time view of the gallery.
#[derive(Clone, Debug, Default)]
pub struct GallerySnapshot {
    entries: Arc<Entries>,
}

impl GallerySnapshot {
    /// Records in identity-id order. Can be called any number of times.
    pub fn iter(&self) -> btree_map::Values<'_, Arc<str>, Arc<IdentityRecord>> {
        self.entries.values()
    }

    pub fn get(&self, identity_id: &str) -> Option<&Arc<IdentityRecord>> {
        self.entries.get(identity_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Length shared by every fingerprint in this snapshot.
    pub fn fingerprint_len(&self) -> Option<usize> {
        self.entries.values().next().map(|r| r.fingerprint().len())
    }
}

impl<'a> IntoIterator for &'a GallerySnapshot {
    type Item = &'a Arc<IdentityRecord>;
    type IntoIter = btree_map::Values<'a, Arc<str>, Arc<IdentityRecord>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// The set of enrolled identities.
pub struct Gallery {
    state: RwLock<Arc<Entries>>,
    writer: Mutex<()>,
    backend: Box<dyn GalleryBackend>,
    cfg: GalleryConfig,
}

impl Gallery {
    /// Empty, in-memory gallery with default settings.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(Arc::new(Entries::new())),
            writer: Mutex::new(()),
            backend: Box::new(InMemoryBackend::new()),
            cfg: GalleryConfig::default(),
        }
    }

    /// Build the configured backend and load every record it holds.
    pub fn open(cfg: GalleryConfig) -> Result<Self, GalleryError> {
        let backend = cfg.backend.build()?;
        Self::with_backend(cfg, backend)
    }

    /// Load a gallery from an explicit backend (dependency injection, tests).
    pub fn with_backend(
        cfg: GalleryConfig,
        backend: Box<dyn GalleryBackend>,
    ) -> Result<Self, GalleryError> {
        let mut entries = Entries::new();
        let mut established = cfg.expected_len;

        backend.scan(&mut |key, data| {
            let record = codec::decode_record(data)?;
            if record.identity_id() != key {
                return Err(GalleryError::Codec(CodecError::Decode(format!(
                    "record for `{}` stored under key `{key}`",
                    record.identity_id()
                ))));
            }
            validate_fingerprint(record.fingerprint())?;
            let len = record.fingerprint().len();
            match established {
                Some(expected) if expected != len => {
                    warn!(
                        identity_id = %key,
                        expected,
                        actual = len,
                        "gallery_load_dimension_mismatch"
                    );
                    return Err(GalleryError::DimensionMismatch {
                        expected,
                        actual: len,
                    });
                }
                Some(_) => {}
                None => established = Some(len),
            }
            entries.insert(Arc::from(key), Arc::new(record));
            Ok(())
        })?;

        info!(records = entries.len(), "gallery_loaded");

        Ok(Self {
            state: RwLock::new(Arc::new(entries)),
            writer: Mutex::new(()),
            backend,
            cfg,
        })
    }

    /// Consistent view of every enrolled identity.
    pub fn all(&self) -> GallerySnapshot {
        GallerySnapshot {
            entries: self.current(),
        }
    }

    pub fn get(&self, identity_id: &str) -> Option<Arc<IdentityRecord>> {
        self.current().get(identity_id).cloned()
    }

    pub fn contains(&self, identity_id: &str) -> bool {
        self.current().contains_key(identity_id)
    }

    pub fn len(&self) -> usize {
        self.current().len()
    }

    pub fn is_empty(&self) -> bool {
        self.current().is_empty()
    }

    /// Required fingerprint length, if configured or established.
    pub fn fingerprint_len(&self) -> Option<usize> {
        self.cfg
            .expected_len
            .or_else(|| self.all().fingerprint_len())
    }

    /// Add a new identity. Fails if the id is already enrolled.
    pub fn enroll(
        &self,
        identity_id: &str,
        fingerprint: Fingerprint,
        metadata: JsonValue,
    ) -> Result<Arc<IdentityRecord>, GalleryError> {
        validate_identity(identity_id)?;
        validate_fingerprint(&fingerprint)?;

        let _writer = self.lock_writer()?;
        {
            let current = self.current();
            if current.contains_key(identity_id) {
                warn!(identity_id, "gallery_enroll_duplicate");
                return Err(GalleryError::DuplicateIdentity(identity_id.to_string()));
            }
            self.check_dimensions(&current, identity_id, &fingerprint)?;
        }

        let record = Arc::new(IdentityRecord::new(identity_id, fingerprint, metadata));
        self.persist(&record)?;
        self.apply(|entries| {
            entries.insert(Arc::from(identity_id), Arc::clone(&record));
        })?;

        info!(identity_id, "gallery_enroll");
        Ok(record)
    }

    /// Replace an enrolled identity's fingerprint and metadata wholesale.
    pub fn update(
        &self,
        identity_id: &str,
        fingerprint: Fingerprint,
        metadata: JsonValue,
    ) -> Result<Arc<IdentityRecord>, GalleryError> {
        validate_fingerprint(&fingerprint)?;

        let _writer = self.lock_writer()?;
        {
            let current = self.current();
            if !current.contains_key(identity_id) {
                return Err(GalleryError::NotFound(identity_id.to_string()));
            }
            self.check_dimensions(&current, identity_id, &fingerprint)?;
        }

        let record = Arc::new(IdentityRecord::new(identity_id, fingerprint, metadata));
        self.persist(&record)?;
        self.apply(|entries| {
            entries.insert(Arc::from(identity_id), Arc::clone(&record));
        })?;

        info!(identity_id, "gallery_update");
        Ok(record)
    }

    /// Delete an identity, returning the record that was removed.
    pub fn remove(&self, identity_id: &str) -> Result<Arc<IdentityRecord>, GalleryError> {
        let _writer = self.lock_writer()?;
        let Some(existing) = self.get(identity_id) else {
            return Err(GalleryError::NotFound(identity_id.to_string()));
        };

        self.backend.delete(identity_id)?;
        self.apply(|entries| {
            entries.remove(identity_id);
        })?;

        info!(identity_id, "gallery_remove");
        Ok(existing)
    }

    pub fn flush(&self) -> Result<(), GalleryError> {
        self.backend.flush()
    }

    fn current(&self) -> Arc<Entries> {
        let guard = self
            .state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&guard)
    }

    fn lock_writer(&self) -> Result<std::sync::MutexGuard<'_, ()>, GalleryError> {
        self.writer
            .lock()
            .map_err(|_| GalleryError::backend("poisoned lock"))
    }

    /// Mutate the live map. Callers hold the writer lock and must not keep a
    /// handle from `current()` alive, or the map is copied needlessly.
    fn apply(&self, change: impl FnOnce(&mut Entries)) -> Result<(), GalleryError> {
        let mut guard = self
            .state
            .write()
            .map_err(|_| GalleryError::backend("poisoned lock"))?;
        change(Arc::make_mut(&mut guard));
        Ok(())
    }

    fn persist(&self, record: &IdentityRecord) -> Result<(), GalleryError> {
        let payload = codec::encode_record(record, &self.cfg.compression)?;
        self.backend.put(record.identity_id(), &payload)
    }

    fn check_dimensions(
        &self,
        current: &Entries,
        identity_id: &str,
        fingerprint: &Fingerprint,
    ) -> Result<(), GalleryError> {
        // The record being replaced does not count towards the established length.
        let expected = self.cfg.expected_len.or_else(|| {
            current
                .iter()
                .find(|(id, _)| &***id != identity_id)
                .map(|(_, r)| r.fingerprint().len())
        });
        match expected {
            Some(expected) if expected != fingerprint.len() => {
                warn!(
                    identity_id,
                    expected,
                    actual = fingerprint.len(),
                    "gallery_dimension_mismatch"
                );
                Err(GalleryError::DimensionMismatch {
                    expected,
                    actual: fingerprint.len(),
                })
            }
            _ => Ok(()),
        }
    }
}

impl Default for Gallery {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_identity(identity_id: &str) -> Result<(), GalleryError> {
    if identity_id.trim().is_empty() {
        return Err(GalleryError::InvalidIdentity(
            "identity id must not be empty".into(),
        ));
    }
    if identity_id.chars().any(char::is_control) {
        return Err(GalleryError::InvalidIdentity(format!(
            "identity id {identity_id:?} contains control characters"
        )));
    }
    Ok(())
}

fn validate_fingerprint(fingerprint: &Fingerprint) -> Result<(), GalleryError> {
    if fingerprint.is_empty() {
        return Err(GalleryError::InvalidFingerprint(
            "fingerprint has no values".into(),
        ));
    }
    if fingerprint.as_slice().iter().any(|v| !v.is_finite()) {
        return Err(GalleryError::InvalidFingerprint(
            "fingerprint contains non-finite values".into(),
        ));
    }
    Ok(())
}
