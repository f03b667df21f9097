//! JSON report of a sequence run.

use fibril_core::{FeatureRow, FeatureTable};
use fibril_pipeline::SequenceOutput;
use fibril_tracking::{LinkedTrack, TrackRow, TrackTable, TrackingSummary};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct FrameReport {
    pub frame: usize,
    pub features: usize,
    pub rows: Vec<FeatureRow>,
}

/// Feature tables, track table and lifetime summary of one run.
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub frames: Vec<FrameReport>,
    pub tracks: Vec<TrackRow>,
    pub summary: &'a TrackingSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linked: Option<&'a [LinkedTrack]>,
}

impl<'a> Report<'a> {
    pub fn new(output: &'a SequenceOutput) -> Self {
        let frames = output
            .frames
            .iter()
            .enumerate()
            .map(|(frame, set)| FrameReport {
                frame,
                features: set.len(),
                rows: FeatureTable::from_feature_set(set).rows,
            })
            .collect();
        Self {
            frames,
            tracks: TrackTable::from_result(&output.tracking).rows,
            summary: &output.summary,
            linked: output.linked.as_deref(),
        }
    }
}
