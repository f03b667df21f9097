//! Row-oriented track tables.

use std::path::Path;

use fibril_core::table::{read_table, write_table};
use fibril_core::Result;
use serde::{Deserialize, Serialize};

use crate::lifetime::{TrackId, TrackStatus, TrackingResult};

/// Table kind tag for track tables.
pub const TRACK_TABLE_KIND: &str = "tracks";

/// One coordinate of one track in one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRow {
    pub track: TrackId,
    pub frame: usize,
    pub x: f32,
    pub y: f32,
    pub status: TrackStatus,
}

/// Active and completed tracks flattened into rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackTable {
    pub rows: Vec<TrackRow>,
}

impl TrackTable {
    /// Rows of every active then every completed track, in frame then trace order.
    pub fn from_result(result: &TrackingResult) -> Self {
        let rows = result
            .active
            .iter()
            .chain(&result.completed)
            .flat_map(|track| {
                let status = track.status();
                track.frames.iter().flat_map(move |entry| {
                    entry.coords.iter().map(move |c| TrackRow {
                        track: track.id,
                        frame: entry.frame,
                        x: c.x,
                        y: c.y,
                        status,
                    })
                })
            })
            .collect();
        Self { rows }
    }

    /// Ids of the tracks with the given status.
    pub fn track_ids(&self, status: TrackStatus) -> Vec<TrackId> {
        let mut ids: Vec<TrackId> = self.rows.iter().filter(|r| r.status == status).map(|r| r.track).collect();
        ids.dedup();
        ids
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        write_table(TRACK_TABLE_KIND, &self.rows)
    }

    pub fn from_json(data: &[u8]) -> Result<Self> {
        Ok(Self {
            rows: read_table(TRACK_TABLE_KIND, data)?,
        })
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_json(&data)
    }
}
