//! Integration tests for tracing and analysis.
//!
//! Exercises fibril-filters edge maps feeding fibril-analysis, and
//! fibril-trace output flowing through the analyzer.

use fibril_analysis::{flag_outliers, summarize_breadths, Analyzer, AnalyzerParams, AuxFields, BreadthStrategy};
use fibril_core::{Coordinate, Feature, FeatureSet, FeatureTable, Image};
use fibril_filters::EdgeMap;
use fibril_trace::{trace, TracerParams};

// ── Helpers ────────────────────────────────────────────────────

/// 10-pixel horizontal ridge at y = 20 with edges 3 pixels either side.
fn ridge_with_edges() -> (FeatureSet, EdgeMap) {
    let coords = (10..20).map(|x| Coordinate::new(x as f32, 20.0)).collect();
    let set = std::iter::once(Feature::new(coords).unwrap()).collect();
    let edges = EdgeMap::from_pixels(40, 40, (0..40).flat_map(|x| [(x, 17), (x, 23)]));
    (set, edges)
}

fn gaussian_ridge(rows: usize, cols: usize, row: f32) -> Image {
    Image::from_fn(rows, cols, |x, y| {
        if (10..cols - 10).contains(&x) {
            let d = y as f32 - row;
            (-d * d / (2.0 * 1.5 * 1.5)).exp()
        } else {
            0.0
        }
    })
    .unwrap()
}

fn small_tracer() -> TracerParams {
    TracerParams {
        nsm1: 3,
        rmin: 15,
        lmin: 10.0,
        nstruc: 50,
        qthresh2: 0.0,
        ..TracerParams::default()
    }
}

// ── Straight ridge ─────────────────────────────────────────────

#[test]
fn straight_ridge_length_and_breadth() {
    let (mut set, edges) = ridge_with_edges();
    let image = Image::filled(40, 40, 0.0).unwrap();
    let analyzer = Analyzer::with_edges(AnalyzerParams::default(), edges).unwrap();
    analyzer.analyze(&image, &mut set, &AuxFields::new()).unwrap();

    assert_eq!(set.len(), 1);
    let (_, feature) = set.iter().next().unwrap();
    assert_eq!(feature.len(), 10);
    assert_eq!(feature.points()[9].length, Some(9.0));
    for point in &feature.points()[1..9] {
        assert!((point.breadth.unwrap() - 6.0).abs() < 1e-4);
    }
    let summary = feature.breadth_summary().unwrap();
    assert_eq!(summary.excluded, 0);
    assert!((summary.median - 6.0).abs() < 1e-4);
}

#[test]
fn edge_pair_strategy_agrees_on_straight_ridge() {
    let (mut set, edges) = ridge_with_edges();
    let image = Image::filled(40, 40, 0.0).unwrap();
    let params = AnalyzerParams {
        breadth: Some(BreadthStrategy::EdgePair(Default::default())),
        ..AnalyzerParams::default()
    };
    let analyzer = Analyzer::with_edges(params, edges).unwrap();
    analyzer.analyze(&image, &mut set, &AuxFields::new()).unwrap();

    let (_, feature) = set.iter().next().unwrap();
    for point in &feature.points()[2..8] {
        assert!((point.breadth.unwrap() - 6.0).abs() < 0.5);
    }
}

#[test]
fn breadth_spike_excluded_from_summary() {
    let breadths = [5.0, 5.0, 5.0, 5.0, 100.0];
    let flags = flag_outliers(&breadths, 3.5);
    assert_eq!(flags, vec![false, false, false, false, true]);
    let summary = summarize_breadths(&breadths, &flags).unwrap();
    assert_eq!(summary.mean, 5.0);
    assert_eq!(summary.included, 4);
}

// ── Trace then analyze ─────────────────────────────────────────

#[test]
fn traced_ridge_is_analyzed_and_persisted() {
    let image = gaussian_ridge(64, 64, 32.0);
    let mut set = trace(&image, &small_tracer()).unwrap();
    assert!(!set.is_empty());

    let mut aux = AuxFields::new();
    aux.insert("velocity".into(), Image::filled(64, 64, 2.5).unwrap());
    let analyzer = Analyzer::new(AnalyzerParams::default()).unwrap();
    analyzer.analyze(&image, &mut set, &aux).unwrap();

    let (_, first) = set.iter().next().unwrap();
    assert!(first.coordinates().all(|c| (29.0..=35.0).contains(&c.y)));
    for (_, feature) in set.iter() {
        assert_eq!(feature.points()[0].length, Some(0.0));
        assert!(feature.total_length().unwrap() >= small_tracer().lmin - 1.0);
        for point in feature.points() {
            assert_eq!(point.custom.get("velocity"), Some(&2.5));
            assert!(point.breadth.unwrap() >= 0.0);
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frame.json");
    FeatureTable::from_feature_set(&set).save_to_file(&path).unwrap();
    let restored = FeatureTable::load_from_file(&path).unwrap().into_feature_set().unwrap();
    assert_eq!(restored.len(), set.len());
    for ((id_a, a), (id_b, b)) in set.iter().zip(restored.iter()) {
        assert_eq!(id_a, id_b);
        assert_eq!(a.coords_vec(), b.coords_vec());
        assert_eq!(a.total_length(), b.total_length());
    }
}

#[test]
fn ten_pixel_ridge_traces_to_one_unit_spaced_feature() {
    // sigma 1 ridge on row 15, columns 15..25
    let image = Image::from_fn(30, 40, |x, y| {
        if (15..25).contains(&x) {
            let d = y as f32 - 15.0;
            (-d * d / 2.0).exp()
        } else {
            0.0
        }
    })
    .unwrap();
    let params = TracerParams {
        nsm1: 1,
        rmin: 6,
        lmin: 5.0,
        qthresh2: 0.0,
        ..TracerParams::default()
    };
    let mut set = trace(&image, &params).unwrap();

    assert_eq!(set.len(), 1);
    let (_, feature) = set.iter().next().unwrap();
    assert_eq!(feature.len(), 10);
    assert!((feature.arc_length() - 9.0).abs() < 1e-3, "arc length {}", feature.arc_length());
    assert!(feature.coordinates().all(|c| (14.0..=16.0).contains(&c.y)));

    let edges = EdgeMap::from_pixels(30, 40, (0..40).flat_map(|x| [(x, 12), (x, 18)]));
    let analyzer = Analyzer::with_edges(AnalyzerParams::default(), edges).unwrap();
    analyzer.analyze(&image, &mut set, &AuxFields::new()).unwrap();
    let (_, feature) = set.iter().next().unwrap();
    assert!((feature.total_length().unwrap() - 9.0).abs() < 1e-3);
    assert!(feature.points()[1..9].iter().all(|p| p.breadth.unwrap() > 0.0));
}

#[test]
fn blank_image_traces_nothing() {
    let image = Image::filled(64, 64, 1.0).unwrap();
    let set = trace(&image, &small_tracer()).unwrap();
    assert!(set.is_empty());
}
