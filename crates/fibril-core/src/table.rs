//! Row-oriented feature tables with versioned JSON persistence.
//!
//! One row per `(feature id, coordinate)`, minimally `{id, x, y}` and
//! optionally extended with `length`, `breadth` and custom scalar columns.

use std::collections::BTreeMap;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{FibrilError, Result};
use crate::feature::{CoordinateAttributes, Feature, FeatureId, FeatureSet};
use crate::geometry::Coordinate;

/// Current table schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Table kind tag for feature tables.
pub const FEATURE_TABLE_KIND: &str = "features";

#[derive(Serialize)]
struct TableFileRef<'a, R> {
    version: u32,
    kind: &'a str,
    rows: &'a [R],
}

/// Versioned table file wrapper.
#[derive(Debug, Deserialize)]
pub struct TableFile<R> {
    /// Schema version for migration.
    pub version: u32,
    /// What the rows describe.
    pub kind: String,
    pub rows: Vec<R>,
}

/// Serialize rows into a versioned JSON table.
pub fn write_table<R: Serialize>(kind: &str, rows: &[R]) -> Result<Vec<u8>> {
    let file = TableFileRef {
        version: CURRENT_VERSION,
        kind,
        rows,
    };
    serde_json::to_vec_pretty(&file)
        .map_err(|e| FibrilError::Serialization(format!("Failed to serialize {} table: {}", kind, e)))
}

/// Parse a versioned JSON table of the given kind, migrating old layouts.
pub fn read_table<R: DeserializeOwned>(kind: &str, data: &[u8]) -> Result<Vec<R>> {
    let raw: serde_json::Value = serde_json::from_slice(data)
        .map_err(|e| FibrilError::Serialization(format!("Invalid JSON: {}", e)))?;

    let version = raw.get("version").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
    if version > CURRENT_VERSION {
        return Err(FibrilError::Serialization(format!(
            "Table version {} is newer than supported version {}",
            version, CURRENT_VERSION
        )));
    }

    let migrated = migrate(raw, version, kind)?;
    let file: TableFile<R> = serde_json::from_value(migrated)
        .map_err(|e| FibrilError::Serialization(format!("Failed to parse {} table: {}", kind, e)))?;
    if file.kind != kind {
        return Err(FibrilError::Serialization(format!(
            "Expected a {} table, found {}",
            kind, file.kind
        )));
    }
    Ok(file.rows)
}

/// Apply sequential migrations from `from_version` to CURRENT_VERSION.
fn migrate(mut data: serde_json::Value, from_version: u32, kind: &str) -> Result<serde_json::Value> {
    let mut version = from_version;

    while version < CURRENT_VERSION {
        match version {
            0 => {
                // v0 → v1: bare row arrays get wrapped
                if data.is_array() {
                    data = serde_json::json!({
                        "version": 1,
                        "kind": kind,
                        "rows": data,
                    });
                }
                version = 1;
            }
            _ => {
                return Err(FibrilError::Serialization(format!(
                    "No migration path from version {}",
                    version
                )));
            }
        }
    }

    Ok(data)
}

/// One coordinate of one feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub id: FeatureId,
    pub x: f32,
    pub y: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breadth: Option<f32>,
    #[serde(flatten)]
    pub custom: BTreeMap<String, f32>,
}

/// A whole frame's features as rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureTable {
    pub rows: Vec<FeatureRow>,
}

impl FeatureTable {
    /// Flatten a feature set into rows, in id then trace order.
    pub fn from_feature_set(set: &FeatureSet) -> Self {
        let rows = set
            .iter()
            .flat_map(|(id, feature)| {
                feature.points().iter().map(move |p| FeatureRow {
                    id,
                    x: p.coord.x,
                    y: p.coord.y,
                    length: p.length,
                    breadth: p.breadth,
                    custom: p.custom.clone(),
                })
            })
            .collect();
        Self { rows }
    }

    /// Rebuild a feature set; each id must occupy one contiguous run of rows.
    pub fn into_feature_set(self) -> Result<FeatureSet> {
        let mut set = FeatureSet::new();
        let mut current: Option<(FeatureId, Vec<CoordinateAttributes>)> = None;

        for row in self.rows {
            let point = CoordinateAttributes {
                coord: Coordinate::new(row.x, row.y),
                length: row.length,
                breadth: row.breadth,
                breadth_outlier: false,
                custom: row.custom,
            };
            if let Some((id, points)) = current.as_mut() {
                if *id == row.id {
                    points.push(point);
                    continue;
                }
            }
            if let Some((id, points)) = current.take() {
                set.insert(id, Feature::from_points(points)?);
            }
            if set.get(row.id).is_some() {
                return Err(FibrilError::Serialization(format!(
                    "feature {} appears in non-contiguous rows",
                    row.id
                )));
            }
            current = Some((row.id, vec![point]));
        }
        if let Some((id, points)) = current {
            set.insert(id, Feature::from_points(points)?);
        }
        Ok(set)
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        write_table(FEATURE_TABLE_KIND, &self.rows)
    }

    pub fn from_json(data: &[u8]) -> Result<Self> {
        Ok(Self {
            rows: read_table(FEATURE_TABLE_KIND, data)?,
        })
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let data = self.to_json()?;
        std::fs::write(path, data)?;
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_json(&data)
    }
}
