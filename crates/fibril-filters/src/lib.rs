//! Fibril Filters - smoothing primitives and edge-map providers.
//!
//! The filters here are the preprocessing stages consumed by the tracer
//! (band-pass) and the analyzer (edge detection, which runs on an 8-bit
//! rendering through `imageproc`).

pub mod edges;
pub mod gray;
pub mod smooth;

pub use edges::{CannyEdges, CannyParams, EdgeMap, EdgeMapProvider};
pub use smooth::{bandpass, box_smooth, normalize_unit};
