//! Enrollment and re-enrollment from photos.
//!
//! Extraction always runs first and outside any gallery lock. If the photo
//! cannot be turned into a fingerprint the gallery is not touched, so a failed
//! re-enrollment leaves the previous fingerprint in place.

use std::sync::Arc;
use std::time::Instant;

use extract::image::DynamicImage;
use extract::FingerprintExtractor;
use gallery::{Gallery, IdentityRecord};
use serde_json::Value as JsonValue;
use tracing::{info, warn};

use crate::RollcallError;

/// Extract a fingerprint from `image` and add a new identity.
pub fn enroll_image(
    extractor: &dyn FingerprintExtractor,
    gallery: &Gallery,
    identity_id: &str,
    image: &DynamicImage,
    metadata: JsonValue,
) -> Result<Arc<IdentityRecord>, RollcallError> {
    let start = Instant::now();
    let fingerprint = extractor.extract(image).map_err(|err| {
        warn!(identity_id, error = %err, "enroll_extraction_failure");
        err
    })?;

    let record = gallery.enroll(identity_id, fingerprint, metadata)?;
    info!(
        identity_id,
        elapsed_micros = start.elapsed().as_micros(),
        "enroll_success"
    );
    Ok(record)
}

/// Extract a fingerprint from `image` and replace an enrolled identity's
/// record wholesale.
pub fn reenroll_image(
    extractor: &dyn FingerprintExtractor,
    gallery: &Gallery,
    identity_id: &str,
    image: &DynamicImage,
    metadata: JsonValue,
) -> Result<Arc<IdentityRecord>, RollcallError> {
    let start = Instant::now();
    let fingerprint = extractor.extract(image).map_err(|err| {
        warn!(identity_id, error = %err, "reenroll_extraction_failure");
        err
    })?;

    let record = gallery.update(identity_id, fingerprint, metadata)?;
    info!(
        identity_id,
        elapsed_micros = start.elapsed().as_micros(),
        "reenroll_success"
    );
    Ok(record)
}
