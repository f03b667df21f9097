//! End-to-end tests of the sequence pipeline.

use std::collections::BTreeMap;

use fibril_core::{FeatureTable, Image, ImageStack};
use fibril_pipeline::{PipelineConfig, SequenceProcessor, SequenceStage};
use fibril_trace::TracerParams;
use fibril_tracking::{TrackStatus, TrackTable};

fn ridge() -> Image {
    Image::from_fn(64, 64, |x, y| {
        if (10..54).contains(&x) {
            let d = y as f32 - 32.0;
            (-d * d / (2.0 * 1.5 * 1.5)).exp()
        } else {
            0.0
        }
    })
    .unwrap()
}

fn config() -> PipelineConfig {
    PipelineConfig {
        tracer: TracerParams {
            nsm1: 3,
            rmin: 15,
            lmin: 10.0,
            nstruc: 50,
            qthresh2: 0.0,
            ..TracerParams::default()
        },
        workers: Some(2),
        ..PipelineConfig::default()
    }
}

#[test]
fn stationary_ridge_yields_active_tracks() {
    let frames = vec![ridge(); 5];
    let stack = ImageStack::from_frames(&frames).unwrap();
    let mut aux = BTreeMap::new();
    aux.insert(
        "velocity".to_string(),
        ImageStack::from_frames(&vec![Image::filled(64, 64, 1.5).unwrap(); 5]).unwrap(),
    );

    let processor = SequenceProcessor::new(config()).unwrap();
    let mut last_stage = None;
    let output = processor
        .process_stack_with_progress(&stack, &aux, |p| last_stage = Some(p.stage))
        .unwrap();

    assert_eq!(last_stage, Some(SequenceStage::Complete));
    assert_eq!(output.frames.len(), 5);
    let per_frame = output.frames[0].len();
    assert!(per_frame > 0);
    for set in &output.frames {
        assert_eq!(set, &output.frames[0]);
        for (_, feature) in set.iter() {
            assert!(feature.points().iter().all(|p| p.custom.get("velocity") == Some(&1.5)));
        }
    }

    assert!(output.tracking.completed.is_empty());
    assert_eq!(output.tracking.active.len(), per_frame);
    assert!(output.tracking.active_lifetimes().iter().all(|&l| l == 4));
    assert_eq!(output.summary.active.unwrap().count, per_frame);
    assert!(output.linked.is_none());

    let table = TrackTable::from_result(&output.tracking);
    assert_eq!(table.track_ids(TrackStatus::Active).len(), per_frame);
    assert!(table.track_ids(TrackStatus::Completed).is_empty());
}

#[test]
fn config_file_drives_processing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, config().to_json().unwrap()).unwrap();
    let config = PipelineConfig::load(&path).unwrap();
    let processor = SequenceProcessor::new(config).unwrap();

    let set = processor.process_frame(&ridge(), &Default::default()).unwrap();
    let table = FeatureTable::from_feature_set(&set);
    assert_eq!(table.rows.len(), set.coordinate_count());
    assert!(table.rows.iter().all(|r| r.length.is_some() && r.breadth.is_some()));
}

#[test]
fn single_frame_stack_has_no_lifetimes() {
    let stack = ImageStack::from_frames(&[ridge()]).unwrap();
    let processor = SequenceProcessor::new(config()).unwrap();
    let output = processor.process_stack(&stack, &BTreeMap::new()).unwrap();

    assert_eq!(output.tracking.final_frame, 0);
    assert!(output.tracking.completed.is_empty());
    // tracks seeded in frame 0 have lifetime 0 and are left out of the statistics
    assert_eq!(output.summary.active, None);
}
