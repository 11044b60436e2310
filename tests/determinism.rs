use std::io::Cursor;
use std::sync::Arc;

use image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgb, RgbImage};
use rollcall::{
    cosine_similarity, AmbiguityPolicy, ExtractConfig, FingerprintExtractor, Gallery,
    GrayscaleExtractor, MatchConfig, MatchDecision, Matcher, Recognizer,
};
use serde_json::json;

fn gradient(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    }))
}

fn extractor() -> GrayscaleExtractor {
    GrayscaleExtractor::new(ExtractConfig::default()).unwrap()
}

#[test]
fn same_photo_gives_bit_identical_fingerprints() {
    let photo = gradient(321, 207);
    let a = extractor().extract(&photo).unwrap();
    let b = extractor().extract(&photo).unwrap();
    assert_eq!(a.len(), 100 * 100);

    let bits_a: Vec<u32> = a.as_slice().iter().map(|v| v.to_bits()).collect();
    let bits_b: Vec<u32> = b.as_slice().iter().map(|v| v.to_bits()).collect();
    assert_eq!(bits_a, bits_b);
}

#[test]
fn lossless_encoding_does_not_change_the_fingerprint() {
    let photo = gradient(150, 90);
    let mut png = Vec::new();
    photo
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .unwrap();

    let direct = extractor().extract(&photo).unwrap();
    let decoded = extractor().extract_encoded(&png).unwrap();
    assert_eq!(direct, decoded);
}

#[test]
fn self_similarity_is_one_and_scores_are_symmetric() {
    let ex = extractor();
    let a = ex.extract(&gradient(200, 200)).unwrap();
    let b = ex
        .extract(&DynamicImage::ImageLuma8(GrayImage::from_fn(90, 120, |x, y| {
            Luma([((x * y) % 251) as u8])
        })))
        .unwrap();

    let self_score = cosine_similarity(a.as_slice(), a.as_slice()).unwrap();
    assert!((self_score - 1.0).abs() < 1e-6);

    let ab = cosine_similarity(a.as_slice(), b.as_slice()).unwrap();
    let ba = cosine_similarity(b.as_slice(), a.as_slice()).unwrap();
    assert_eq!(ab.to_bits(), ba.to_bits());
}

#[test]
fn decisions_do_not_depend_on_enrollment_order() {
    let photo = gradient(120, 120);
    let recapture = gradient(130, 125);
    let ids = ["S010", "S002", "S007"];

    let mut outcomes = Vec::new();
    for order in [[0, 1, 2], [2, 1, 0], [1, 2, 0]] {
        let recognizer = Recognizer::new(
            Arc::new(extractor()),
            Matcher::new(MatchConfig::default()).unwrap(),
            Arc::new(Gallery::new()),
        )
        .unwrap();
        for i in order {
            recognizer.enroll(ids[i], &photo, json!({})).unwrap();
        }
        outcomes.push(recognizer.recognize(&recapture).unwrap());
    }

    for outcome in &outcomes {
        match outcome {
            MatchDecision::Ambiguous { candidates } => {
                let ids: Vec<_> = candidates.iter().map(|c| c.identity_id.as_str()).collect();
                assert_eq!(ids, vec!["S002", "S007", "S010"]);
            }
            other => panic!("expected ambiguous, got {other:?}"),
        }
    }
    assert_eq!(outcomes[0], outcomes[1]);
    assert_eq!(outcomes[1], outcomes[2]);
}

#[test]
fn best_score_tie_break_is_stable() {
    let ex = extractor();
    let fingerprint = ex.extract(&gradient(100, 100)).unwrap();

    let gallery = Gallery::new();
    for id in ["B", "C", "A"] {
        gallery.enroll(id, fingerprint.clone(), json!({})).unwrap();
    }
    let matcher =
        Matcher::new(MatchConfig::default().with_policy(AmbiguityPolicy::BestScore)).unwrap();

    for _ in 0..10 {
        let decision = matcher.match_fingerprint(&fingerprint, &gallery).unwrap();
        assert_eq!(decision.matched_identity(), Some("A"));
    }
}
