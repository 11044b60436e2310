use std::sync::Arc;

use extract::image::DynamicImage;
use extract::{decode_image, FingerprintExtractor, GrayscaleExtractor};
use gallery::{Gallery, GalleryError, IdentityRecord};
use matcher::{MatchDecision, Matcher, Verification};
use serde_json::Value as JsonValue;
use tracing::warn;

use crate::config::RollcallConfig;
use crate::enroll::{enroll_image, reenroll_image};
use crate::RollcallError;

/// Photo-in, decision-out facade over an extractor, a matcher and a shared
/// gallery.
///
/// Cloning is cheap; clones share the same gallery.
#[derive(Clone)]
pub struct Recognizer {
    extractor: Arc<dyn FingerprintExtractor>,
    matcher: Arc<Matcher>,
    gallery: Arc<Gallery>,
}

impl Recognizer {
    /// Wire the parts together, refusing a gallery whose fingerprints the
    /// extractor cannot produce.
    pub fn new(
        extractor: Arc<dyn FingerprintExtractor>,
        matcher: Matcher,
        gallery: Arc<Gallery>,
    ) -> Result<Self, RollcallError> {
        if let Some(stored) = gallery.fingerprint_len() {
            let produced = extractor.fingerprint_len();
            if stored != produced {
                warn!(stored, produced, "recognizer_dimension_mismatch");
                return Err(GalleryError::DimensionMismatch {
                    expected: stored,
                    actual: produced,
                }
                .into());
            }
        }
        Ok(Self {
            extractor,
            matcher: Arc::new(matcher),
            gallery,
        })
    }

    /// Build the grayscale extractor, matcher and gallery described by `cfg`.
    pub fn from_config(cfg: &RollcallConfig) -> Result<Self, RollcallError> {
        let extractor = GrayscaleExtractor::new(cfg.extract_config()?)?;
        let matcher = Matcher::new(cfg.match_config()?)?;
        let gallery = Gallery::open(cfg.gallery_config()?)?;
        Self::new(Arc::new(extractor), matcher, Arc::new(gallery))
    }

    pub fn gallery(&self) -> &Arc<Gallery> {
        &self.gallery
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    pub fn extractor(&self) -> &dyn FingerprintExtractor {
        self.extractor.as_ref()
    }

    pub fn enroll(
        &self,
        identity_id: &str,
        image: &DynamicImage,
        metadata: JsonValue,
    ) -> Result<Arc<IdentityRecord>, RollcallError> {
        enroll_image(self.extractor(), &self.gallery, identity_id, image, metadata)
    }

    pub fn reenroll(
        &self,
        identity_id: &str,
        image: &DynamicImage,
        metadata: JsonValue,
    ) -> Result<Arc<IdentityRecord>, RollcallError> {
        reenroll_image(self.extractor(), &self.gallery, identity_id, image, metadata)
    }

    pub fn remove(&self, identity_id: &str) -> Result<Arc<IdentityRecord>, RollcallError> {
        Ok(self.gallery.remove(identity_id)?)
    }

    /// Who is in this photo?
    pub fn recognize(&self, image: &DynamicImage) -> Result<MatchDecision, RollcallError> {
        let live = self.extractor.extract(image)?;
        Ok(self.matcher.match_fingerprint(&live, &self.gallery)?)
    }

    /// [`Recognizer::recognize`] for an encoded PNG or JPEG upload.
    pub fn recognize_encoded(&self, bytes: &[u8]) -> Result<MatchDecision, RollcallError> {
        let image = decode_image(bytes)?;
        self.recognize(&image)
    }

    /// Is this photo of `identity_id`?
    pub fn verify(
        &self,
        identity_id: &str,
        image: &DynamicImage,
    ) -> Result<Verification, RollcallError> {
        let live = self.extractor.extract(image)?;
        Ok(self.matcher.verify(&live, &self.gallery, identity_id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use extract::image::{GrayImage, Luma};
    use extract::ExtractConfig;
    use matcher::MatchConfig;
    use serde_json::json;

    fn recognizer(side: u32) -> Recognizer {
        let extractor =
            GrayscaleExtractor::new(ExtractConfig::new().with_resolution(side, side)).unwrap();
        Recognizer::new(
            Arc::new(extractor),
            Matcher::new(MatchConfig::default()).unwrap(),
            Arc::new(Gallery::new()),
        )
        .unwrap()
    }

    /// Left half bright, right half dark (or the reverse).
    fn split(width: u32, height: u32, bright_left: bool) -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_fn(width, height, |x, _| {
            let left = x < width / 2;
            Luma([if left == bright_left { 230 } else { 0 }])
        }))
    }

    #[test]
    fn recognize_after_enroll() {
        let rec = recognizer(8);
        rec.enroll("S001", &split(32, 32, true), json!({})).unwrap();
        rec.enroll("S002", &split(32, 32, false), json!({})).unwrap();

        let decision = rec.recognize(&split(48, 40, true)).unwrap();
        assert_eq!(decision.matched_identity(), Some("S001"));
    }

    #[test]
    fn verify_claimed_identity() {
        let rec = recognizer(8);
        rec.enroll("S001", &split(32, 32, true), json!({})).unwrap();
        rec.enroll("S002", &split(32, 32, false), json!({})).unwrap();

        assert!(rec.verify("S001", &split(32, 32, true)).unwrap().is_verified());
        assert!(!rec.verify("S002", &split(32, 32, true)).unwrap().is_verified());
    }

    #[test]
    fn recognize_encoded_rejects_garbage() {
        let rec = recognizer(8);
        assert!(matches!(
            rec.recognize_encoded(b"not an image"),
            Err(RollcallError::Extraction(_))
        ));
    }

    #[test]
    fn mismatched_extractor_is_refused() {
        let gallery = Arc::new(Gallery::new());
        gallery
            .enroll("S001", extract::Fingerprint::from_values(vec![0.5; 16]), json!({}))
            .unwrap();
        let extractor =
            GrayscaleExtractor::new(ExtractConfig::new().with_resolution(8, 8)).unwrap();
        let result = Recognizer::new(
            Arc::new(extractor),
            Matcher::new(MatchConfig::default()).unwrap(),
            gallery,
        );
        assert!(matches!(
            result,
            Err(RollcallError::Gallery(GalleryError::DimensionMismatch {
                expected: 16,
                actual: 64
            }))
        ));
    }

    #[test]
    fn from_default_config() {
        let rec = Recognizer::from_config(&RollcallConfig::default()).unwrap();
        assert_eq!(rec.extractor().fingerprint_len(), 100 * 100);
        assert!(rec.gallery().is_empty());
    }
}
