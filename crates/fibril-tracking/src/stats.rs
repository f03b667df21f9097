//! Lifetime statistics over tracking results.

use fibril_core::stats::{mean, std_dev};
use serde::{Deserialize, Serialize};

use crate::lifetime::TrackingResult;
use crate::linking::LinkedTrack;

/// Count, mean and population standard deviation of track lifetimes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LifetimeStats {
    pub count: usize,
    pub mean: f32,
    pub std: f32,
}

impl LifetimeStats {
    pub fn from_lifetimes(lifetimes: &[u32]) -> Option<Self> {
        let values: Vec<f32> = lifetimes.iter().map(|&l| l as f32).collect();
        Some(Self {
            count: values.len(),
            mean: mean(&values)?,
            std: std_dev(&values)?,
        })
    }
}

/// Lifetime statistics of a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackingSummary {
    /// Active tracks, excluding those that began in the final frame.
    pub active: Option<LifetimeStats>,
    pub completed: Option<LifetimeStats>,
    /// Relinked groups, when relinking ran.
    pub linked: Option<LifetimeStats>,
}

impl TrackingSummary {
    pub fn new(result: &TrackingResult, linked: Option<&[LinkedTrack]>) -> Self {
        let active: Vec<u32> = result.active_lifetimes().into_iter().filter(|&l| l > 0).collect();
        let linked_totals: Option<Vec<u32>> = linked.map(|groups| groups.iter().map(|g| g.total_lifetime).collect());
        Self {
            active: LifetimeStats::from_lifetimes(&active),
            completed: LifetimeStats::from_lifetimes(&result.completed_lifetimes()),
            linked: linked_totals.and_then(|totals| LifetimeStats::from_lifetimes(&totals)),
        }
    }
}
