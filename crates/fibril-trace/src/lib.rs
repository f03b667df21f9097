//! Fibril Trace - ridge-following extraction of curvilinear features.
//!
//! [`trace`] turns an intensity image into a [`fibril_core::FeatureSet`] of
//! unit-spaced coordinate sequences, one per traced ridge.

pub mod params;
pub mod tracer;

pub use params::TracerParams;
pub use tracer::trace;
