//! Concurrency and thread safety tests for Rollcall

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use image::{DynamicImage, GrayImage, Luma};
use rollcall::{
    AttendanceDesk, ExtractConfig, FixedClock, Fingerprint, Gallery, GalleryError,
    GrayscaleExtractor, InMemoryLedger, MatchConfig, MatchDecision, Matcher, Recognizer,
    SubmissionOutcome,
};
use serde_json::json;

fn fp(seed: u32, len: usize) -> Fingerprint {
    Fingerprint::from_values(
        (0..len)
            .map(|i| ((i as u32 * 31 + seed * 17) % 97) as f32 / 97.0)
            .collect(),
    )
}

#[test]
fn concurrent_enrollment_of_one_id_has_a_single_winner() {
    let gallery = Arc::new(Gallery::new());
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let gallery = Arc::clone(&gallery);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                gallery.enroll("S001", fp(i, 32), json!({ "thread": i }))
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| *e == GalleryError::DuplicateIdentity("S001".into())));
    assert_eq!(gallery.len(), 1);
}

#[test]
fn readers_never_observe_a_torn_gallery() {
    const LEN: usize = 64;
    let gallery = Arc::new(Gallery::new());
    gallery.enroll("S000", fp(0, LEN), json!({})).unwrap();
    let done = Arc::new(AtomicBool::new(false));

    let writer = {
        let gallery = Arc::clone(&gallery);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            for i in 1..200u32 {
                gallery
                    .enroll(&format!("S{i:03}"), fp(i, LEN), json!({}))
                    .unwrap();
                if i % 3 == 0 {
                    gallery.update("S000", fp(i, LEN), json!({ "rev": i })).unwrap();
                }
            }
            done.store(true, Ordering::SeqCst);
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let gallery = Arc::clone(&gallery);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut last_len = 0;
                while !done.load(Ordering::SeqCst) {
                    let snapshot = gallery.all();
                    // Count only grows, every record is complete, order is stable.
                    assert!(snapshot.len() >= last_len);
                    last_len = snapshot.len();
                    let ids: Vec<_> = snapshot.iter().map(|r| r.identity_id().to_string()).collect();
                    let mut sorted = ids.clone();
                    sorted.sort();
                    assert_eq!(ids, sorted);
                    assert!(snapshot.iter().all(|r| r.fingerprint().len() == LEN));
                    assert_eq!(snapshot.iter().count(), snapshot.len());
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(gallery.len(), 200);
}

#[test]
fn matching_runs_concurrently_with_enrollment() {
    const LEN: usize = 48;
    let gallery = Arc::new(Gallery::new());
    gallery.enroll("TARGET", fp(5, LEN), json!({})).unwrap();
    let matcher = Arc::new(Matcher::new(MatchConfig::default()).unwrap());

    let writer = {
        let gallery = Arc::clone(&gallery);
        thread::spawn(move || {
            for i in 0..100u32 {
                // Orthogonal-ish noise identities that never clear the threshold.
                let mut values = vec![0.0; LEN];
                values[(i as usize) % LEN] = 1.0;
                gallery
                    .enroll(&format!("N{i:03}"), Fingerprint::from_values(values), json!({}))
                    .unwrap();
            }
        })
    };

    let matchers: Vec<_> = (0..4)
        .map(|_| {
            let gallery = Arc::clone(&gallery);
            let matcher = Arc::clone(&matcher);
            thread::spawn(move || {
                for _ in 0..50 {
                    let decision = matcher.match_fingerprint(&fp(5, LEN), &gallery).unwrap();
                    assert_eq!(decision.matched_identity(), Some("TARGET"));
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for handle in matchers {
        handle.join().unwrap();
    }
}

#[test]
fn simultaneous_submissions_record_attendance_once() {
    let recognizer = Recognizer::new(
        Arc::new(GrayscaleExtractor::new(ExtractConfig::new().with_resolution(16, 16)).unwrap()),
        Matcher::new(MatchConfig::default()).unwrap(),
        Arc::new(Gallery::new()),
    )
    .unwrap();
    let face = DynamicImage::ImageLuma8(GrayImage::from_fn(64, 64, |x, y| {
        Luma([if x < 32 && y < 32 { 230 } else { 5 }])
    }));
    recognizer.enroll("S001", &face, json!({})).unwrap();

    let ledger = Arc::new(InMemoryLedger::new());
    let clock = Arc::new(FixedClock(NaiveDateTime::new(
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
        NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
    )));
    let desk = Arc::new(AttendanceDesk::new(recognizer, ledger.clone()).with_clock(clock));
    let face = Arc::new(face);
    let barrier = Arc::new(Barrier::new(6));

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let desk = Arc::clone(&desk);
            let face = Arc::clone(&face);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                desk.submit("ALDS301", &face).unwrap()
            })
        })
        .collect();

    let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let recorded = outcomes
        .iter()
        .filter(|o| matches!(o, SubmissionOutcome::Recorded(_)))
        .count();
    let repeats = outcomes
        .iter()
        .filter(|o| matches!(o, SubmissionOutcome::AlreadyRecorded { .. }))
        .count();
    assert_eq!(recorded, 1);
    assert_eq!(repeats, 5);
    assert_eq!(ledger.len(), 1);
}

#[test]
fn recognizer_clones_share_one_gallery() {
    let recognizer = Recognizer::new(
        Arc::new(GrayscaleExtractor::new(ExtractConfig::new().with_resolution(8, 8)).unwrap()),
        Matcher::new(MatchConfig::default()).unwrap(),
        Arc::new(Gallery::new()),
    )
    .unwrap();
    let face = DynamicImage::ImageLuma8(GrayImage::from_fn(32, 32, |x, _| {
        Luma([if x < 16 { 200 } else { 0 }])
    }));

    let enroller = recognizer.clone();
    let face_for_thread = face.clone();
    thread::spawn(move || enroller.enroll("S001", &face_for_thread, json!({})).unwrap())
        .join()
        .unwrap();

    assert!(matches!(
        recognizer.recognize(&face).unwrap(),
        MatchDecision::Matched { ref identity_id, .. } if identity_id == "S001"
    ));
}
