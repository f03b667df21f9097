//! Integration tests for frame matching, lifetimes and relinking.
//!
//! Exercises fibril-core feature sets flowing through fibril-tracking.

use fibril_core::{Coordinate, Feature, FeatureSet};
use fibril_tracking::{
    link_completed, match_frames, LifetimeTracker, TrackStatus, TrackTable, TrackerParams, TrackingResult,
    TrackingSummary,
};

// ── Helpers ────────────────────────────────────────────────────

fn vertical(x: f32, y0: f32) -> Feature {
    Feature::new((0..10).map(|i| Coordinate::new(x, y0 + i as f32)).collect()).unwrap()
}

fn frame(features: Vec<Feature>) -> FeatureSet {
    features.into_iter().collect()
}

fn run(frames: &[FeatureSet], params: TrackerParams) -> TrackingResult {
    let mut tracker = LifetimeTracker::new(params).unwrap();
    for (index, set) in frames.iter().enumerate() {
        tracker.push_frame(index, set).unwrap();
    }
    tracker.finish()
}

// ── Matching ───────────────────────────────────────────────────

#[test]
fn translated_feature_matches_mutually() {
    let a = frame(vec![vertical(10.0, 5.0)]);
    let b = frame(vec![vertical(12.0, 5.0)]);
    let matched = match_frames(&a, &b, 20.0).unwrap();

    assert_eq!(matched.confirmed_pairs(), vec![(0, 0)]);
    let records = matched.forward.get(0).unwrap();
    assert_eq!(records.len(), 10);
    for record in records {
        let record = record.unwrap();
        assert_eq!(record.feature, 0);
        assert!((record.distance - 2.0).abs() < 1e-5);
    }
}

#[test]
fn distant_feature_is_unmatched() {
    let a = frame(vec![vertical(10.0, 5.0)]);
    let b = frame(vec![vertical(60.0, 5.0)]);
    let matched = match_frames(&a, &b, 20.0).unwrap();
    assert!(matched.confirmed_pairs().is_empty());
    assert!(matched.forward.get(0).unwrap().iter().all(Option::is_none));
}

// ── Lifetimes ──────────────────────────────────────────────────

#[test]
fn vanishing_feature_completes_track() {
    let frames: Vec<FeatureSet> = (0..8)
        .map(|i| if i <= 4 { frame(vec![vertical(10.0, 5.0)]) } else { FeatureSet::new() })
        .collect();
    let result = run(&frames, TrackerParams::default());

    assert!(result.active.is_empty());
    assert_eq!(result.completed.len(), 1);
    let track = &result.completed[0];
    assert_eq!(track.start_frame, 0);
    assert_eq!(track.end_frame, Some(4));
    assert_eq!(track.frames.len(), 5);
    assert_eq!(result.completed_lifetimes(), vec![4]);
}

#[test]
fn persistent_feature_stays_active() {
    let frames: Vec<FeatureSet> = (0..10).map(|i| frame(vec![vertical(10.0 + 0.5 * i as f32, 5.0)])).collect();
    let result = run(&frames, TrackerParams::default());

    assert!(result.completed.is_empty());
    assert_eq!(result.active.len(), 1);
    assert_eq!(result.final_frame, 9);
    assert_eq!(result.active_lifetimes(), vec![9]);

    let stats = result.active[0].statistics(result.final_frame);
    assert_eq!(stats.frames, 10);
    assert!((stats.centroid.x - 12.25).abs() < 1e-4);
    assert_eq!(stats.mean_length, None);

    let summary = TrackingSummary::new(&result, None);
    assert_eq!(summary.active.unwrap().mean, 9.0);
    assert_eq!(summary.completed, None);
}

#[test]
fn track_table_lists_every_entry() {
    let frames: Vec<FeatureSet> = (0..10)
        .map(|i| {
            let mut features = vec![vertical(10.0, 5.0)];
            if i < 5 {
                features.push(vertical(50.0, 5.0));
            }
            frame(features)
        })
        .collect();
    let result = run(&frames, TrackerParams::default());
    let table = TrackTable::from_result(&result);

    assert_eq!(table.track_ids(TrackStatus::Active), vec![result.active[0].id]);
    assert_eq!(table.track_ids(TrackStatus::Completed), vec![result.completed[0].id]);
    assert_eq!(table.rows.len(), (10 + 5) * 10);
}

// ── Relinking ──────────────────────────────────────────────────

#[test]
fn gap_in_feature_is_relinked() {
    // present in 0..=4, gone in 5, back in 6..=11, gone after
    let frames: Vec<FeatureSet> = (0..14)
        .map(|i| {
            if i <= 4 || (6..=11).contains(&i) {
                frame(vec![vertical(10.0, 5.0)])
            } else {
                FeatureSet::new()
            }
        })
        .collect();
    let params = TrackerParams {
        relink_distance: Some(10.0),
        ..TrackerParams::default()
    };
    let result = run(&frames, params);

    assert_eq!(result.completed.len(), 2);
    assert_eq!(result.completed[1].start_frame, 6);
    assert_eq!(result.completed[1].end_frame, Some(11));

    let linked = link_completed(&result.completed, 10.0).unwrap();
    assert_eq!(linked.len(), 1);
    assert_eq!(linked[0].members.len(), 2);
    assert_eq!(linked[0].start_frames, vec![0, 6]);
    assert_eq!(linked[0].total_lifetime, 9);

    let summary = TrackingSummary::new(&result, Some(&linked));
    assert_eq!(summary.linked.unwrap().count, 1);
    assert_eq!(summary.completed.unwrap().count, 2);
}
