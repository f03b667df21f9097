//! Traced features and per-frame feature sets.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{FibrilError, Result};
use crate::geometry::{arc_lengths, mean_point, Coordinate};

/// Identifier of a feature, unique within one frame.
pub type FeatureId = u32;

/// Attributes recorded for one coordinate of a feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinateAttributes {
    pub coord: Coordinate,
    /// Cumulative arc length from the feature's first coordinate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<f32>,
    /// Local cross-sectional width, 0 when undeterminable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breadth: Option<f32>,
    /// Set when the breadth was rejected by the outlier filter.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub breadth_outlier: bool,
    /// Samples of auxiliary images, keyed by field name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom: BTreeMap<String, f32>,
}

impl CoordinateAttributes {
    pub fn new(coord: Coordinate) -> Self {
        Self {
            coord,
            length: None,
            breadth: None,
            breadth_outlier: false,
            custom: BTreeMap::new(),
        }
    }

    /// Drop every derived attribute, keeping only `coord` and the custom
    /// fields for which `keep` returns true.
    pub fn reset(&mut self, keep: impl Fn(&str) -> bool) {
        self.length = None;
        self.breadth = None;
        self.breadth_outlier = false;
        self.custom.retain(|name, _| keep(name));
    }
}

/// Breadth statistics of a feature, computed over non-outlier coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BreadthSummary {
    pub median: f32,
    pub mean: f32,
    pub min: f32,
    pub max: f32,
    pub included: usize,
    pub excluded: usize,
}

/// One traced ridge: an ordered, non-empty coordinate sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    points: Vec<CoordinateAttributes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    breadth_summary: Option<BreadthSummary>,
}

impl Feature {
    /// Create a feature from coordinates in trace order.
    pub fn new(coords: Vec<Coordinate>) -> Result<Self> {
        Self::from_points(coords.into_iter().map(CoordinateAttributes::new).collect())
    }

    /// Create a feature from fully populated attribute records.
    ///
    /// Every coordinate must be finite.
    pub fn from_points(points: Vec<CoordinateAttributes>) -> Result<Self> {
        if points.is_empty() {
            return Err(FibrilError::EmptyFeature);
        }
        if let Some((index, p)) = points.iter().enumerate().find(|(_, p)| !p.coord.is_finite()) {
            return Err(FibrilError::InvalidParameter(format!(
                "feature coordinate {index} is not finite: ({}, {})",
                p.coord.x, p.coord.y
            )));
        }
        Ok(Self {
            points,
            breadth_summary: None,
        })
    }

    /// Number of coordinates.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[CoordinateAttributes] {
        &self.points
    }

    /// Mutable access to the attribute records; the sequence itself is fixed.
    pub fn points_mut(&mut self) -> &mut [CoordinateAttributes] {
        &mut self.points
    }

    pub fn coordinates(&self) -> impl Iterator<Item = Coordinate> + '_ {
        self.points.iter().map(|p| p.coord)
    }

    pub fn coords_vec(&self) -> Vec<Coordinate> {
        self.coordinates().collect()
    }

    /// Cumulative length at the last coordinate, if lengths were computed.
    pub fn total_length(&self) -> Option<f32> {
        self.points.last().and_then(|p| p.length)
    }

    /// Geometric arc length of the coordinate sequence.
    pub fn arc_length(&self) -> f32 {
        arc_lengths(&self.coords_vec()).last().copied().unwrap_or(0.0)
    }

    /// Mean position of the coordinates.
    pub fn centroid(&self) -> Coordinate {
        mean_point(&self.coords_vec()).unwrap_or(Coordinate::ZERO)
    }

    /// Breadths of all coordinates that carry one.
    pub fn breadths(&self) -> impl Iterator<Item = f32> + '_ {
        self.points.iter().filter_map(|p| p.breadth)
    }

    pub fn breadth_summary(&self) -> Option<&BreadthSummary> {
        self.breadth_summary.as_ref()
    }

    pub fn set_breadth_summary(&mut self, summary: Option<BreadthSummary>) {
        self.breadth_summary = summary;
    }
}

/// All features traced in one frame, keyed by id in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    features: BTreeMap<FeatureId, Feature>,
}

impl FeatureSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a feature under the next free id and return that id.
    pub fn push(&mut self, feature: Feature) -> FeatureId {
        let id = self
            .features
            .keys()
            .next_back()
            .map(|last| last + 1)
            .unwrap_or(0);
        self.features.insert(id, feature);
        id
    }

    /// Insert under an explicit id, returning any feature it replaces.
    pub fn insert(&mut self, id: FeatureId, feature: Feature) -> Option<Feature> {
        self.features.insert(id, feature)
    }

    pub fn get(&self, id: FeatureId) -> Option<&Feature> {
        self.features.get(&id)
    }

    pub fn get_mut(&mut self, id: FeatureId) -> Option<&mut Feature> {
        self.features.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = FeatureId> + '_ {
        self.features.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FeatureId, &Feature)> {
        self.features.iter().map(|(id, f)| (*id, f))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (FeatureId, &mut Feature)> {
        self.features.iter_mut().map(|(id, f)| (*id, f))
    }

    /// Total number of coordinates over all features.
    pub fn coordinate_count(&self) -> usize {
        self.features.values().map(Feature::len).sum()
    }
}

impl FromIterator<Feature> for FeatureSet {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        let mut set = FeatureSet::new();
        for feature in iter {
            set.push(feature);
        }
        set
    }
}
