//! Fibril Tracking - feature correspondence across frames.
//!
//! - [`matcher`]: bidirectional nearest-coordinate matching with mutual votes
//! - [`lifetime`]: persistent tracks built from confirmed matches
//! - [`linking`]: post-hoc merging of completed tracks across gaps
//! - [`stats`]: lifetime statistics
//! - [`export`]: row-oriented track tables
//! - [`comparison`]: scoring a tracing against a reference tracing

pub mod comparison;
pub mod export;
pub mod lifetime;
pub mod linking;
pub mod matcher;
pub mod stats;

pub use comparison::{match_by_center, match_by_line, mean_line_distance, CenterMatch, ComparisonScore};
pub use export::{TrackRow, TrackTable};
pub use lifetime::{
    LifetimeTracker, Track, TrackFrame, TrackId, TrackStatistics, TrackStatus, TrackerParams, TrackingResult,
};
pub use linking::{link_completed, LinkedTrack};
pub use matcher::{match_frames, mutual_pairs, FrameMatch, MatchRecord, MatchTable};
pub use stats::{LifetimeStats, TrackingSummary};
