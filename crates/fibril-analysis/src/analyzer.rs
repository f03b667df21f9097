//! Feature analyzer: length, breadth and auxiliary field sampling.

use std::collections::BTreeMap;

use fibril_core::geometry::arc_lengths;
use fibril_core::{FeatureSet, FibrilError, Image, Result};
use fibril_filters::{CannyEdges, EdgeMapProvider};
use tracing::{debug, info};

use crate::breadth::measure_breadths;
use crate::outlier::{flag_outliers, summarize_breadths};
use crate::params::AnalyzerParams;

/// Named auxiliary images sampled at every coordinate (velocity, intensity...).
pub type AuxFields = BTreeMap<String, Image>;

/// Annotates the coordinates of a feature set in place.
#[derive(Debug, Clone)]
pub struct Analyzer<E: EdgeMapProvider = CannyEdges> {
    params: AnalyzerParams,
    edges: E,
}

impl Analyzer<CannyEdges> {
    /// Analyzer using the Canny provider configured by `params.canny`.
    pub fn new(params: AnalyzerParams) -> Result<Self> {
        let edges = CannyEdges::new(params.canny);
        Self::with_edges(params, edges)
    }
}

impl<E: EdgeMapProvider> Analyzer<E> {
    /// Analyzer with a custom edge-map provider.
    pub fn with_edges(params: AnalyzerParams, edges: E) -> Result<Self> {
        params.validate()?;
        Ok(Self { params, edges })
    }

    pub fn params(&self) -> &AnalyzerParams {
        &self.params
    }

    /// Recompute every derived attribute of `features`.
    ///
    /// Attributes from an earlier run are discarded first, so analyzing the
    /// same set twice gives the same result. `image` is only read.
    pub fn analyze(&self, image: &Image, features: &mut FeatureSet, aux: &AuxFields) -> Result<()> {
        let shape = image.shape();
        for (name, field) in aux {
            if field.shape() != shape {
                debug!(field = %name, "Auxiliary field shape mismatch");
                return Err(FibrilError::ShapeMismatch {
                    expected: shape,
                    got: field.shape(),
                });
            }
        }

        for (_, feature) in features.iter_mut() {
            feature.set_breadth_summary(None);
            for point in feature.points_mut() {
                point.reset(|name| aux.contains_key(name));
                for (name, field) in aux {
                    match field.sample_rounded(point.coord) {
                        Some(value) => {
                            point.custom.insert(name.clone(), value);
                        }
                        None => {
                            point.custom.remove(name);
                        }
                    }
                }
            }
        }

        let mut flagged = 0usize;
        if let Some(strategy) = &self.params.breadth {
            let edges = self.edges.edge_map(image)?;
            if edges.shape() != shape {
                return Err(FibrilError::ShapeMismatch {
                    expected: shape,
                    got: edges.shape(),
                });
            }
            for (id, feature) in features.iter_mut() {
                let breadths = measure_breadths(strategy, &edges, &feature.coords_vec());
                let outliers = flag_outliers(&breadths, self.params.mad_threshold);
                for ((point, &breadth), &outlier) in feature.points_mut().iter_mut().zip(&breadths).zip(&outliers) {
                    point.breadth = Some(breadth);
                    point.breadth_outlier = outlier;
                }
                let summary = summarize_breadths(&breadths, &outliers);
                if let Some(s) = &summary {
                    flagged += s.excluded;
                    debug!(id, median = s.median, excluded = s.excluded, "Measured breadth");
                }
                feature.set_breadth_summary(summary);
            }
        }

        if self.params.length {
            for (_, feature) in features.iter_mut() {
                let lengths = arc_lengths(&feature.coords_vec());
                for (point, length) in feature.points_mut().iter_mut().zip(lengths) {
                    point.length = Some(length);
                }
            }
        }

        info!(
            features = features.len(),
            coordinates = features.coordinate_count(),
            aux_fields = aux.len(),
            breadth_outliers = flagged,
            "Feature analysis complete"
        );
        Ok(())
    }
}
