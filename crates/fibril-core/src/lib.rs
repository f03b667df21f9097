//! Fibril Core - Foundation types for curvilinear feature tracing
//!
//! This crate provides the fundamental types used throughout Fibril:
//! - Intensity images and frame stacks
//! - Coordinates, features and per-frame feature sets
//! - Row-oriented feature tables with JSON persistence
//! - Shared error type and small statistics helpers

pub mod error;
pub mod feature;
pub mod geometry;
pub mod image;
pub mod stats;
pub mod table;

pub use error::{FibrilError, Result};
pub use feature::{BreadthSummary, CoordinateAttributes, Feature, FeatureId, FeatureSet};
pub use geometry::{Coordinate, Vec2};
pub use image::{Image, ImageStack};
pub use table::{FeatureRow, FeatureTable};
