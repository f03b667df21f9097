//! Pipeline configuration, loadable from JSON.

use std::path::Path;

use fibril_analysis::AnalyzerParams;
use fibril_core::{FibrilError, Result};
use fibril_trace::TracerParams;
use fibril_tracking::TrackerParams;
use serde::{Deserialize, Serialize};

/// Settings of every stage of the sequence pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub tracer: TracerParams,
    pub analyzer: AnalyzerParams,
    pub tracker: TrackerParams,
    /// Worker threads for the per-frame stage, `None` for one per CPU.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        self.tracer.validate()?;
        self.analyzer.validate()?;
        self.tracker.validate()?;
        if self.workers == Some(0) {
            return Err(FibrilError::InvalidParameter("workers must be at least 1".into()));
        }
        Ok(())
    }

    /// Number of worker threads to use.
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(num_cpus::get).max(1)
    }

    /// Parse and validate a JSON configuration; missing fields take defaults.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        let config: Self = serde_json::from_slice(data)
            .map_err(|e| FibrilError::Serialization(format!("Invalid pipeline config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
            .map_err(|e| FibrilError::Serialization(format!("Failed to serialize pipeline config: {}", e)))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_json(&data)
    }
}
