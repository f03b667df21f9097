//! Fibril Pipeline - sequence processing.
//!
//! Tracing and analysis run per frame on a rayon pool; the results are then
//! fed in frame order to the lifetime tracker and, optionally, the linker.

pub mod config;
pub mod sequence;

pub use config::PipelineConfig;
pub use sequence::{AuxStacks, SequenceOutput, SequenceProcessor, SequenceProgress, SequenceStage};
