// Integration tests for voiceprint enrollment and identification.

mod common;

use std::sync::atomic::Ordering;

use common::{harness, GROUP_ID};
use medscribe::error::Error;

const SAMPLE: &[u8] = b"fake wav enrollment sample";

#[tokio::test]
async fn test_register_persists_enrollment_and_audio() {
    let h = harness(vec![], vec![], vec![]);

    let enrollment = h
        .registry
        .register("clinician-1", SAMPLE, 16000, "朗读这段文字", GROUP_ID)
        .await
        .unwrap();

    assert_eq!(enrollment.speaker_id, "clinician-1");
    assert_eq!(enrollment.voiceprint_id, "vp-1");
    assert_eq!(enrollment.group_id, GROUP_ID);
    assert_eq!(enrollment.provider, "fake-vpr");

    assert!(h.registry.has_enrollment("clinician-1").await.unwrap());
    let stored = h
        .registry
        .get_enrollment("clinician-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.voiceprint_id, enrollment.voiceprint_id);

    // The uploaded sample is retained.
    assert!(h.store.contains(&enrollment.audio_ref).await);
    assert_eq!(h.store.puts.load(Ordering::SeqCst), 1);
    assert_eq!(h.store.deletes.load(Ordering::SeqCst), 0);
}

// A failed provider enrollment leaves no local record and removes the
// uploaded sample.
#[tokio::test]
async fn test_register_provider_failure_rolls_back_upload() {
    let h = harness(vec![], vec![], vec![]);
    h.vpr.fail_enroll.store(true, Ordering::SeqCst);

    let err = h
        .registry
        .register("clinician-1", SAMPLE, 16000, "朗读这段文字", GROUP_ID)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Enrollment { .. }));

    assert!(!h.registry.has_enrollment("clinician-1").await.unwrap());
    // The sample was uploaded once and deleted once.
    assert_eq!(h.store.puts.load(Ordering::SeqCst), 1);
    assert_eq!(h.store.deletes.load(Ordering::SeqCst), 1);
    assert_eq!(h.store.len().await, 0);
}

#[tokio::test]
async fn test_reregistration_replaces_enrollment() {
    let h = harness(vec![], vec![], vec![]);

    h.registry
        .register("clinician-1", SAMPLE, 16000, "第一次", GROUP_ID)
        .await
        .unwrap();
    h.registry
        .register("clinician-1", SAMPLE, 16000, "第二次", GROUP_ID)
        .await
        .unwrap();

    // One active enrollment per (speaker, provider).
    let stored = h
        .registry
        .get_enrollment("clinician-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.voiceprint_id, "vp-2");
    assert_eq!(h.vpr.enroll_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_identify_below_threshold_is_no_match() {
    let h = harness(vec![], vec![], vec![]);
    h.vpr.set_match("clinician-1", 0.4); // below the 0.6 threshold

    let matched = h.registry.identify(SAMPLE, 16000, GROUP_ID).await.unwrap();
    assert!(matched.is_none());
}

#[tokio::test]
async fn test_identify_above_threshold_matches() {
    let h = harness(vec![], vec![], vec![]);
    h.vpr.set_match("clinician-1", 0.87);

    let matched = h
        .registry
        .identify(SAMPLE, 16000, GROUP_ID)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(matched.speaker_id, "clinician-1");
    assert!((matched.confidence - 0.87).abs() < f32::EPSILON);
}

#[tokio::test]
async fn test_identify_without_candidates_is_no_match() {
    let h = harness(vec![], vec![], vec![]);
    let matched = h.registry.identify(SAMPLE, 16000, GROUP_ID).await.unwrap();
    assert!(matched.is_none());
}

#[tokio::test]
async fn test_has_enrollment_false_for_unknown_speaker() {
    let h = harness(vec![], vec![], vec![]);
    assert!(!h.registry.has_enrollment("clinician-9").await.unwrap());
    assert!(h
        .registry
        .get_enrollment("clinician-9")
        .await
        .unwrap()
        .is_none());
}
