//! JSON image stack input.

use std::collections::BTreeMap;
use std::path::Path;

use fibril_core::{FibrilError, Image, ImageStack, Result};
use fibril_pipeline::AuxStacks;
use serde::Deserialize;

/// `{ "rows": r, "cols": c, "frames": [[f32; r * c], ...], "aux": {name: [...]} }`,
/// every frame in row-major order.
#[derive(Debug, Deserialize)]
pub struct StackFile {
    pub rows: usize,
    pub cols: usize,
    pub frames: Vec<Vec<f32>>,
    /// Auxiliary stacks with the same layout as `frames`.
    #[serde(default)]
    pub aux: BTreeMap<String, Vec<Vec<f32>>>,
}

impl StackFile {
    pub fn from_json(data: &[u8]) -> Result<Self> {
        serde_json::from_slice(data).map_err(|e| FibrilError::Serialization(format!("Invalid stack file: {}", e)))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_json(&data)
    }

    /// Build the primary stack and the auxiliary stacks.
    pub fn into_stacks(self) -> Result<(ImageStack, AuxStacks)> {
        let (rows, cols) = (self.rows, self.cols);
        let stack = build_stack(rows, cols, self.frames)?;
        let aux = self
            .aux
            .into_iter()
            .map(|(name, frames)| Ok((name, build_stack(rows, cols, frames)?)))
            .collect::<Result<AuxStacks>>()?;
        Ok((stack, aux))
    }
}

fn build_stack(rows: usize, cols: usize, frames: Vec<Vec<f32>>) -> Result<ImageStack> {
    let images = frames
        .into_iter()
        .map(|values| Image::from_vec(rows, cols, values))
        .collect::<Result<Vec<_>>>()?;
    ImageStack::from_frames(&images)
}
