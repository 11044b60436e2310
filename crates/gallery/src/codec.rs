//! Versioned binary encoding for stored identity records.
//!
//! Layout of every stored value:
//!
//! ```text
//! +-------+----------------+-------+------------------------------+
//! | "RCG" | schema (u16 LE)| codec | bincode payload (maybe zstd) |
//! +-------+----------------+-------+------------------------------+
//! ```
//!
//! The schema version lives outside the bincode payload so that a reader can
//! refuse a layout it does not know before trying to decode it. Bump
//! [`RECORD_SCHEMA_VERSION`] whenever [`StoredRecordV1`] changes shape.

use bincode::config::standard;
use bincode::serde::{decode_from_slice, encode_to_vec};
use chrono::DateTime;
use extract::{Fingerprint, FingerprintMeta};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zstd::{decode_all, encode_all};

use crate::record::IdentityRecord;

/// Bump this value whenever the stored record layout changes.
pub const RECORD_SCHEMA_VERSION: u16 = 1;

const MAGIC: [u8; 3] = *b"RCG";
const HEADER_LEN: usize = MAGIC.len() + 2 + 1;

const CODEC_NONE: u8 = 0;
const CODEC_ZSTD: u8 = 1;

mod metadata_serde {
    use serde::de::Error as DeError;
    use serde::ser::Error as SerError;
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub(super) fn serialize<S>(value: &Value, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let bytes = serde_json::to_vec(value).map_err(SerError::custom)?;
        serializer.serialize_bytes(&bytes)
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bytes = Vec::<u8>::deserialize(deserializer)?;
        serde_json::from_slice(&bytes).map_err(DeError::custom)
    }
}

#[derive(Serialize, Deserialize)]
struct StoredRecordV1 {
    identity_id: String,
    values: Vec<f32>,
    meta: FingerprintMeta,
    #[serde(with = "metadata_serde")]
    metadata: serde_json::Value,
    enrolled_at_millis: i64,
}

/// Compression codec options for stored records.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CompressionCodec {
    None,
    #[default]
    Zstd,
}

/// Compression behavior configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompressionConfig {
    pub codec: CompressionCodec,
    /// Zstd level (1-22); ignored for `None`.
    pub level: i32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            codec: CompressionCodec::default(),
            level: 3,
        }
    }
}

impl CompressionConfig {
    pub fn new(codec: CompressionCodec, level: i32) -> Self {
        Self { codec, level }
    }

    pub fn none() -> Self {
        Self::new(CompressionCodec::None, 0)
    }
}

/// Errors raised while encoding or decoding stored records.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("stored record is truncated ({0} bytes)")]
    Truncated(usize),
    #[error("stored record has an unknown header")]
    BadMagic,
    #[error("unsupported record schema version {found} (this build reads {supported})")]
    UnsupportedVersion { found: u16, supported: u16 },
    #[error("unknown compression codec tag {0}")]
    UnknownCodec(u8),
    #[error("record encode error: {0}")]
    Encode(String),
    #[error("record decode error: {0}")]
    Decode(String),
    #[error("compression error: {0}")]
    Compression(String),
}

/// Serialize a record into its versioned storage form.
pub fn encode_record(
    record: &IdentityRecord,
    compression: &CompressionConfig,
) -> Result<Vec<u8>, CodecError> {
    let stored = StoredRecordV1 {
        identity_id: record.identity_id().to_string(),
        values: record.fingerprint().as_slice().to_vec(),
        meta: record.fingerprint().meta().clone(),
        metadata: record.metadata().clone(),
        enrolled_at_millis: record.enrolled_at().timestamp_millis(),
    };
    let payload = encode_to_vec(&stored, standard()).map_err(|e| CodecError::Encode(e.to_string()))?;

    let (tag, body) = match compression.codec {
        CompressionCodec::None => (CODEC_NONE, payload),
        CompressionCodec::Zstd => (
            CODEC_ZSTD,
            encode_all(payload.as_slice(), compression.level)
                .map_err(|e| CodecError::Compression(e.to_string()))?,
        ),
    };

    let mut out = Vec::with_capacity(HEADER_LEN + body.len());
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&RECORD_SCHEMA_VERSION.to_le_bytes());
    out.push(tag);
    out.extend_from_slice(&body);
    Ok(out)
}

/// Decode a stored value, refusing unknown headers, versions and codecs.
pub fn decode_record(data: &[u8]) -> Result<IdentityRecord, CodecError> {
    if data.len() < HEADER_LEN {
        return Err(CodecError::Truncated(data.len()));
    }
    if data[..MAGIC.len()] != MAGIC {
        return Err(CodecError::BadMagic);
    }
    let version = u16::from_le_bytes([data[3], data[4]]);
    if version != RECORD_SCHEMA_VERSION {
        return Err(CodecError::UnsupportedVersion {
            found: version,
            supported: RECORD_SCHEMA_VERSION,
        });
    }
    let body = &data[HEADER_LEN..];
    let payload = match data[5] {
        CODEC_NONE => body.to_vec(),
        CODEC_ZSTD => decode_all(body).map_err(|e| CodecError::Compression(e.to_string()))?,
        other => return Err(CodecError::UnknownCodec(other)),
    };

    let (stored, _): (StoredRecordV1, usize) =
        decode_from_slice(&payload, standard()).map_err(|e| CodecError::Decode(e.to_string()))?;
    let enrolled_at = DateTime::from_timestamp_millis(stored.enrolled_at_millis).ok_or_else(|| {
        CodecError::Decode(format!(
            "enrollment timestamp {} out of range",
            stored.enrolled_at_millis
        ))
    })?;

    Ok(IdentityRecord::with_enrolled_at(
        stored.identity_id,
        Fingerprint::new(stored.values, stored.meta),
        stored.metadata,
        enrolled_at,
    ))
}
