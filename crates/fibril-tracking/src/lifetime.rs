//! Persistent feature tracks over a frame sequence.
//!
//! Frames are pushed in order. Between consecutive frames the confirmed
//! mutual matches extend existing tracks or start new ones; a track with no
//! confirmed match in the newest frame leaves the active set, as a completed
//! track when it spanned more than `min_span` frames and silently otherwise.

use fibril_core::geometry::mean_point;
use fibril_core::stats::mean;
use fibril_core::{Coordinate, Feature, FeatureId, FeatureSet, FibrilError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::matcher::match_frames;

/// Identifier of a track, unique within one tracker run.
pub type TrackId = u32;

/// Settings of the lifetime tracker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerParams {
    /// Largest coordinate distance considered a match (default: 20).
    pub max_distance: f32,
    /// A terminated track is kept only when its span exceeds this (default: 2).
    pub min_span: u32,
    /// Centroid distance for relinking completed tracks, `None` to skip relinking.
    pub relink_distance: Option<f32>,
}

impl Default for TrackerParams {
    fn default() -> Self {
        Self {
            max_distance: 20.0,
            min_span: 2,
            relink_distance: None,
        }
    }
}

impl TrackerParams {
    pub fn validate(&self) -> Result<()> {
        if !self.max_distance.is_finite() || self.max_distance <= 0.0 {
            return Err(FibrilError::InvalidParameter(format!(
                "max_distance must be finite and positive, got {}",
                self.max_distance
            )));
        }
        if let Some(d) = self.relink_distance {
            if !d.is_finite() || d <= 0.0 {
                return Err(FibrilError::InvalidParameter(format!(
                    "relink_distance must be finite and positive, got {}",
                    d
                )));
            }
        }
        Ok(())
    }
}

/// One frame's entry of a track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackFrame {
    pub frame: usize,
    pub feature: FeatureId,
    pub coords: Vec<Coordinate>,
    /// Total length of the feature, when it was analyzed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<f32>,
    /// Mean breadth of the feature, when it was analyzed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean_breadth: Option<f32>,
}

impl TrackFrame {
    pub fn from_feature(frame: usize, id: FeatureId, feature: &Feature) -> Self {
        let breadths: Vec<f32> = feature.breadths().collect();
        Self {
            frame,
            feature: id,
            coords: feature.coords_vec(),
            length: feature.total_length(),
            mean_breadth: feature.breadth_summary().map(|s| s.mean).or_else(|| mean(&breadths)),
        }
    }

    /// Mean coordinate of this frame's feature.
    pub fn centroid(&self) -> Coordinate {
        mean_point(&self.coords).unwrap_or(Coordinate::ZERO)
    }
}

/// Whether a track is still being extended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackStatus {
    Active,
    Completed,
}

/// Summary numbers of one track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackStatistics {
    pub lifetime: u32,
    pub frames: usize,
    /// Mean of the per-frame centroids.
    pub centroid: Coordinate,
    pub mean_length: Option<f32>,
    pub mean_breadth: Option<f32>,
}

/// A temporally ordered sequence of one physical feature's per-frame entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub start_frame: usize,
    /// Last frame of a completed track; `None` while active.
    pub end_frame: Option<usize>,
    /// Extended in the most recent frame.
    #[serde(skip)]
    pub alive: bool,
    pub frames: Vec<TrackFrame>,
}

impl Track {
    /// Frame of the newest entry.
    pub fn last_frame(&self) -> usize {
        self.frames.last().map(|f| f.frame).unwrap_or(self.start_frame)
    }

    fn last_feature(&self) -> Option<FeatureId> {
        self.frames.last().map(|f| f.feature)
    }

    /// Frames from start to last entry.
    pub fn span(&self) -> u32 {
        (self.last_frame() - self.start_frame) as u32
    }

    pub fn status(&self) -> TrackStatus {
        if self.end_frame.is_some() {
            TrackStatus::Completed
        } else {
            TrackStatus::Active
        }
    }

    /// `end_frame - start_frame`, or `final_frame - start_frame` while active.
    pub fn lifetime(&self, final_frame: usize) -> u32 {
        let end = self.end_frame.unwrap_or(final_frame);
        end.saturating_sub(self.start_frame) as u32
    }

    /// Mean of the per-frame centroids.
    pub fn centroid(&self) -> Coordinate {
        let centroids: Vec<Coordinate> = self.frames.iter().map(TrackFrame::centroid).collect();
        mean_point(&centroids).unwrap_or(Coordinate::ZERO)
    }

    pub fn statistics(&self, final_frame: usize) -> TrackStatistics {
        let lengths: Vec<f32> = self.frames.iter().filter_map(|f| f.length).collect();
        let breadths: Vec<f32> = self.frames.iter().filter_map(|f| f.mean_breadth).collect();
        TrackStatistics {
            lifetime: self.lifetime(final_frame),
            frames: self.frames.len(),
            centroid: self.centroid(),
            mean_length: mean(&lengths),
            mean_breadth: mean(&breadths),
        }
    }
}

/// Tracks at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackingResult {
    /// Index of the last pushed frame.
    pub final_frame: usize,
    pub active: Vec<Track>,
    pub completed: Vec<Track>,
}

impl TrackingResult {
    pub fn active_lifetimes(&self) -> Vec<u32> {
        self.active.iter().map(|t| t.lifetime(self.final_frame)).collect()
    }

    pub fn completed_lifetimes(&self) -> Vec<u32> {
        self.completed.iter().map(|t| t.lifetime(self.final_frame)).collect()
    }
}

/// Builds tracks from frames pushed in increasing order.
#[derive(Debug, Clone)]
pub struct LifetimeTracker {
    params: TrackerParams,
    next_frame: usize,
    previous: Option<FeatureSet>,
    active: Vec<Track>,
    completed: Vec<Track>,
    next_id: TrackId,
}

impl LifetimeTracker {
    pub fn new(params: TrackerParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            next_frame: 0,
            previous: None,
            active: Vec::new(),
            completed: Vec::new(),
            next_id: 0,
        })
    }

    pub fn params(&self) -> &TrackerParams {
        &self.params
    }

    /// Index the next pushed frame must have.
    pub fn next_frame(&self) -> usize {
        self.next_frame
    }

    pub fn active(&self) -> &[Track] {
        &self.active
    }

    pub fn completed(&self) -> &[Track] {
        &self.completed
    }

    fn new_track(&mut self, start_frame: usize, frames: Vec<TrackFrame>, alive: bool) -> Track {
        let id = self.next_id;
        self.next_id += 1;
        Track {
            id,
            start_frame,
            end_frame: None,
            alive,
            frames,
        }
    }

    /// Add frame `frame`, which must follow the previously pushed one.
    pub fn push_frame(&mut self, frame: usize, features: &FeatureSet) -> Result<()> {
        if frame != self.next_frame {
            return Err(FibrilError::FrameOrder {
                expected: self.next_frame,
                got: frame,
            });
        }

        let Some(previous) = self.previous.take() else {
            for (id, feature) in features.iter() {
                let entry = TrackFrame::from_feature(frame, id, feature);
                let track = self.new_track(frame, vec![entry], false);
                self.active.push(track);
            }
            debug!(frame, seeded = self.active.len(), "Seeded tracks from first frame");
            self.previous = Some(features.clone());
            self.next_frame = frame + 1;
            return Ok(());
        };

        for track in &mut self.active {
            track.alive = false;
        }

        let pairs = match_frames(&previous, features, self.params.max_distance)?.confirmed_pairs();
        let mut created = 0usize;
        for &(a, b) in &pairs {
            let Some(feature_b) = features.get(b) else {
                continue;
            };
            let entry = TrackFrame::from_feature(frame, b, feature_b);
            let existing = self
                .active
                .iter_mut()
                .find(|t| t.last_frame() + 1 == frame && t.last_feature() == Some(a));
            match existing {
                Some(track) => {
                    track.frames.push(entry);
                    track.alive = true;
                }
                None => {
                    let Some(feature_a) = previous.get(a) else {
                        continue;
                    };
                    let first = TrackFrame::from_feature(frame - 1, a, feature_a);
                    let track = self.new_track(frame - 1, vec![first, entry], true);
                    self.active.push(track);
                    created += 1;
                }
            }
        }

        let min_span = self.params.min_span;
        let mut completed_now = 0usize;
        let mut discarded = 0usize;
        let mut kept = Vec::with_capacity(self.active.len());
        for mut track in self.active.drain(..) {
            if track.alive {
                kept.push(track);
            } else if track.span() > min_span {
                track.end_frame = Some(track.last_frame());
                debug!(
                    track = track.id,
                    start = track.start_frame,
                    end = track.last_frame(),
                    "Track completed"
                );
                self.completed.push(track);
                completed_now += 1;
            } else {
                discarded += 1;
            }
        }
        self.active = kept;

        info!(
            frame,
            confirmed = pairs.len(),
            created,
            completed = completed_now,
            discarded,
            active = self.active.len(),
            "Matched frame"
        );

        self.previous = Some(features.clone());
        self.next_frame = frame + 1;
        Ok(())
    }

    /// End the run; remaining tracks are reported as active.
    pub fn finish(self) -> TrackingResult {
        TrackingResult {
            final_frame: self.next_frame.saturating_sub(1),
            active: self.active,
            completed: self.completed,
        }
    }
}
