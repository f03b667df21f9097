//! Sequence processing: parallel per-frame stage, sequential tracking stage.

use std::collections::BTreeMap;

use fibril_analysis::{Analyzer, AuxFields};
use fibril_core::{FeatureSet, FibrilError, Image, ImageStack, Result};
use fibril_trace::trace;
use fibril_tracking::{link_completed, LifetimeTracker, LinkedTrack, TrackingResult, TrackingSummary};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::PipelineConfig;

/// Named auxiliary stacks, frame-aligned with the primary stack.
pub type AuxStacks = BTreeMap<String, ImageStack>;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SequenceStage {
    /// Tracing and analyzing every frame.
    Extraction,
    /// Matching consecutive frames.
    Tracking,
    /// Relinking completed tracks.
    Linking,
    /// All done.
    Complete,
}

/// Progress report passed to the caller's callback.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SequenceProgress {
    pub stage: SequenceStage,
    /// Frames finished within the current stage.
    pub frames_done: usize,
    pub frames_total: usize,
}

/// Everything a sequence run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceOutput {
    /// Annotated features of every frame, in frame order.
    pub frames: Vec<FeatureSet>,
    pub tracking: TrackingResult,
    /// Relinked completed tracks, when relinking is configured.
    pub linked: Option<Vec<LinkedTrack>>,
    pub summary: TrackingSummary,
}

/// Runs tracing, analysis and tracking with one configuration.
pub struct SequenceProcessor {
    config: PipelineConfig,
    analyzer: Analyzer,
    pool: rayon::ThreadPool,
}

impl SequenceProcessor {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let analyzer = Analyzer::new(config.analyzer)?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.worker_count())
            .thread_name(|i| format!("fibril-worker-{}", i))
            .build()
            .map_err(|e| FibrilError::Internal(format!("Failed to build worker pool: {}", e)))?;
        Ok(Self {
            config,
            analyzer,
            pool,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Trace and analyze a single image.
    pub fn process_frame(&self, image: &Image, aux: &AuxFields) -> Result<FeatureSet> {
        let mut features = trace(image, &self.config.tracer)?;
        self.analyzer.analyze(image, &mut features, aux)?;
        Ok(features)
    }

    /// Process a whole stack.
    pub fn process_stack(&self, stack: &ImageStack, aux: &AuxStacks) -> Result<SequenceOutput> {
        self.process_stack_with_progress(stack, aux, |_| {})
    }

    /// Process a whole stack, reporting stage transitions and tracking progress.
    pub fn process_stack_with_progress(
        &self,
        stack: &ImageStack,
        aux: &AuxStacks,
        mut progress: impl FnMut(SequenceProgress),
    ) -> Result<SequenceOutput> {
        check_aux_stacks(stack, aux)?;
        let total = stack.len();

        progress(SequenceProgress {
            stage: SequenceStage::Extraction,
            frames_done: 0,
            frames_total: total,
        });
        info!(frames = total, workers = self.config.worker_count(), "Starting feature extraction");
        let frames: Vec<FeatureSet> = self.pool.install(|| {
            (0..total)
                .into_par_iter()
                .map(|index| -> Result<FeatureSet> {
                    let image = frame_of(stack, index)?;
                    let fields = aux
                        .iter()
                        .map(|(name, s)| -> Result<(String, Image)> { Ok((name.clone(), frame_of(s, index)?)) })
                        .collect::<Result<AuxFields>>()?;
                    let features = self.process_frame(&image, &fields)?;
                    debug!(frame = index, features = features.len(), "Frame extracted");
                    Ok(features)
                })
                .collect::<Result<Vec<_>>>()
        })?;
        let feature_count: usize = frames.iter().map(FeatureSet::len).sum();
        info!(features = feature_count, "Feature extraction complete");

        let mut tracker = LifetimeTracker::new(self.config.tracker)?;
        for (index, features) in frames.iter().enumerate() {
            tracker.push_frame(index, features)?;
            progress(SequenceProgress {
                stage: SequenceStage::Tracking,
                frames_done: index + 1,
                frames_total: total,
            });
        }
        let tracking = tracker.finish();
        info!(
            active = tracking.active.len(),
            completed = tracking.completed.len(),
            "Tracking complete"
        );

        let linked = match self.config.tracker.relink_distance {
            Some(distance) => {
                progress(SequenceProgress {
                    stage: SequenceStage::Linking,
                    frames_done: total,
                    frames_total: total,
                });
                let groups = link_completed(&tracking.completed, distance)?;
                info!(groups = groups.len(), "Relinking complete");
                Some(groups)
            }
            None => None,
        };

        let summary = TrackingSummary::new(&tracking, linked.as_deref());
        progress(SequenceProgress {
            stage: SequenceStage::Complete,
            frames_done: total,
            frames_total: total,
        });
        Ok(SequenceOutput {
            frames,
            tracking,
            linked,
            summary,
        })
    }
}

fn frame_of(stack: &ImageStack, index: usize) -> Result<Image> {
    stack
        .frame(index)
        .ok_or_else(|| FibrilError::Internal(format!("frame {} missing from stack of {}", index, stack.len())))
}

fn check_aux_stacks(stack: &ImageStack, aux: &AuxStacks) -> Result<()> {
    for (name, field) in aux {
        if field.len() != stack.len() {
            return Err(FibrilError::InvalidParameter(format!(
                "auxiliary stack '{}' has {} frames, expected {}",
                name,
                field.len(),
                stack.len()
            )));
        }
        if field.frame_shape() != stack.frame_shape() {
            return Err(FibrilError::ShapeMismatch {
                expected: stack.frame_shape(),
                got: field.frame_shape(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fibril_trace::TracerParams;
    use fibril_tracking::TrackerParams;

    fn ridge(row: f32) -> Image {
        Image::from_fn(64, 64, |x, y| {
            if (10..54).contains(&x) {
                let d = y as f32 - row;
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
            tracker: TrackerParams {
                relink_distance: Some(10.0),
                ..TrackerParams::default()
            },
            workers: Some(2),
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn test_process_frame_annotates_features() {
        let processor = SequenceProcessor::new(config()).unwrap();
        let features = processor.process_frame(&ridge(32.0), &AuxFields::new()).unwrap();
        assert!(!features.is_empty());
        let (_, first) = features.iter().next().unwrap();
        assert_eq!(first.points()[0].length, Some(0.0));
        assert!(first.points().iter().all(|p| p.breadth.is_some()));
    }

    #[test]
    fn test_stack_reports_progress_in_order() {
        let frames: Vec<Image> = (0..4).map(|i| ridge(30.0 + i as f32)).collect();
        let stack = ImageStack::from_frames(&frames).unwrap();
        let processor = SequenceProcessor::new(config()).unwrap();

        let mut stages = Vec::new();
        let output = processor
            .process_stack_with_progress(&stack, &AuxStacks::new(), |p| stages.push(p.stage))
            .unwrap();

        assert_eq!(output.frames.len(), 4);
        assert!(output.linked.is_some());
        assert_eq!(stages.first(), Some(&SequenceStage::Extraction));
        assert_eq!(stages.last(), Some(&SequenceStage::Complete));
        assert_eq!(stages.iter().filter(|s| **s == SequenceStage::Tracking).count(), 4);
    }

    #[test]
    fn test_aux_stack_validation() {
        let stack = ImageStack::from_frames(&[ridge(32.0), ridge(32.0)]).unwrap();
        let processor = SequenceProcessor::new(config()).unwrap();

        let mut short = AuxStacks::new();
        short.insert("velocity".into(), ImageStack::from_frames(&[ridge(32.0)]).unwrap());
        assert!(matches!(
            processor.process_stack(&stack, &short),
            Err(FibrilError::InvalidParameter(_))
        ));

        let small = Image::filled(8, 8, 0.0).unwrap();
        let mut wrong_shape = AuxStacks::new();
        wrong_shape.insert("velocity".into(), ImageStack::from_frames(&[small.clone(), small]).unwrap());
        assert!(matches!(
            processor.process_stack(&stack, &wrong_shape),
            Err(FibrilError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let bad = PipelineConfig {
            workers: Some(0),
            ..PipelineConfig::default()
        };
        assert!(SequenceProcessor::new(bad).is_err());
    }
}
