use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use rollcall::image::{DynamicImage, GrayImage, Luma};
use rollcall::{
    cosine_similarity, ExtractConfig, Fingerprint, FingerprintExtractor, Gallery,
    GrayscaleExtractor, MatchConfig, Matcher,
};
use serde_json::json;

const DIM: usize = 100 * 100;

/// Deterministic pseudo-random fingerprint (LCG), values in [0, 1).
fn synthetic_fingerprint(seed: u64, len: usize) -> Fingerprint {
    let mut state = seed;
    let values = (0..len)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            ((state >> 40) as f32) / ((1u64 << 24) as f32)
        })
        .collect();
    Fingerprint::from_values(values)
}

fn populated_gallery(size: usize) -> Gallery {
    let gallery = Gallery::new();
    for i in 0..size {
        gallery
            .enroll(
                &format!("S{i:05}"),
                synthetic_fingerprint(i as u64, DIM),
                json!({ "i": i }),
            )
            .expect("enroll should succeed");
    }
    gallery
}

/// Benchmark a single cosine comparison at the canonical resolution
fn bench_cosine(c: &mut Criterion) {
    let a = synthetic_fingerprint(1, DIM);
    let b = synthetic_fingerprint(2, DIM);
    c.bench_function("cosine_100x100", |bench| {
        bench.iter(|| cosine_similarity(black_box(a.as_slice()), black_box(b.as_slice())));
    });
}

/// Benchmark 1:N matching with different gallery sizes, sequential and rayon
fn bench_match_scale(c: &mut Criterion) {
    let mut group = c.benchmark_group("match_scale");
    let live = synthetic_fingerprint(u64::MAX, DIM);

    for &size in [50, 500, 2000].iter() {
        let gallery = populated_gallery(size);
        group.throughput(Throughput::Elements(size as u64));

        let sequential = Matcher::new(MatchConfig::default()).expect("valid config");
        group.bench_function(format!("sequential_{size}"), |b| {
            b.iter(|| {
                let _ = sequential
                    .match_fingerprint(black_box(&live), &gallery)
                    .expect("match should succeed");
            });
        });

        let parallel = Matcher::new(MatchConfig {
            use_parallel: true,
            parallel_min_candidates: 1,
            ..MatchConfig::default()
        })
        .expect("valid config");
        group.bench_function(format!("parallel_{size}"), |b| {
            b.iter(|| {
                let _ = parallel
                    .match_fingerprint(black_box(&live), &gallery)
                    .expect("match should succeed");
            });
        });
    }

    group.finish();
}

/// Benchmark bulk enrollment into an in-memory gallery
fn bench_bulk_enroll(c: &mut Criterion) {
    let mut group = c.benchmark_group("bulk_enroll");
    group.sample_size(10);

    for &size in [1_000, 20_000].iter() {
        let fingerprints: Vec<_> = (0..size)
            .map(|i| synthetic_fingerprint(i as u64, 2))
            .collect();
        group.throughput(Throughput::Elements(size as u64));
        group.bench_function(format!("enroll_{size}"), |b| {
            b.iter(|| {
                let gallery = Gallery::new();
                for (i, fingerprint) in fingerprints.iter().enumerate() {
                    gallery
                        .enroll(&format!("S{i:05}"), fingerprint.clone(), json!({}))
                        .expect("enroll should succeed");
                }
                black_box(gallery.len())
            });
        });
    }

    group.finish();
}

/// Benchmark extraction from a webcam-sized capture
fn bench_extract(c: &mut Criterion) {
    let extractor = GrayscaleExtractor::new(ExtractConfig::default()).expect("valid config");
    let photo = DynamicImage::ImageLuma8(GrayImage::from_fn(640, 480, |x, y| {
        Luma([((x ^ y) & 0xff) as u8])
    }));
    c.bench_function("extract_640x480", |b| {
        b.iter(|| extractor.extract(black_box(&photo)).expect("extract should succeed"));
    });
}

criterion_group!(
    benches,
    bench_cosine,
    bench_match_scale,
    bench_bulk_enroll,
    bench_extract
);
criterion_main!(benches);
