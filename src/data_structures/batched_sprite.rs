//! Many sprites drawn with one program in one draw call.
//!
//! Every attribute lives in its own packed array. Each sprite instance owns six
//! consecutive rows in every array (two triangles, no shared vertices), so
//! changing one instance rewrites exactly its six rows.

use std::ops::Range;

use crate::pipelines::program::ProgramRef;

pub const VERTICES_PER_SPRITE: usize = 6;

/// Quad corner of every row, matching the winding of the UV rows.
const DISPOSITION: [[f32; 2]; VERTICES_PER_SPRITE] = [
    [0.5, 0.5],
    [0.5, -0.5],
    [-0.5, 0.5],
    [-0.5, -0.5],
    [-0.5, 0.5],
    [0.5, -0.5],
];

#[derive(thiserror::Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstanceError {
    #[error("sprite instance {index} is out of range for a batch of {len}")]
    OutOfRange { index: usize, len: usize },
}

/// Initial values of a sprite instance added to a batch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpriteInstance {
    pub position: [f32; 2],
    pub elevation: f32,
    pub size: [f32; 2],
    pub offset: [f32; 2],
    /// Atlas rectangle as `[u0, v0, u1, v1]`.
    pub uv: [f32; 4],
    pub opacity: f32,
}

impl Default for SpriteInstance {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0],
            elevation: 0.0,
            size: [1.0, 1.0],
            offset: [0.0, 0.0],
            uv: [0.0, 0.0, 1.0, 1.0],
            opacity: 1.0,
        }
    }
}

impl From<[f32; 2]> for SpriteInstance {
    fn from(position: [f32; 2]) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug)]
pub struct BatchedSprite {
    pub program: ProgramRef,
    dispositions: Vec<[f32; 2]>,
    positions: Vec<[f32; 3]>,
    scales: Vec<[f32; 2]>,
    offsets: Vec<[f32; 2]>,
    uvs: Vec<[f32; 2]>,
    opacities: Vec<f32>,
}

impl BatchedSprite {
    pub fn new(program: ProgramRef) -> Self {
        Self {
            program,
            dispositions: Vec::new(),
            positions: Vec::new(),
            scales: Vec::new(),
            offsets: Vec::new(),
            uvs: Vec::new(),
            opacities: Vec::new(),
        }
    }

    /// Appends a sprite instance and returns its index.
    pub fn push(&mut self, instance: impl Into<SpriteInstance>) -> usize {
        let instance = instance.into();
        let index = self.len();
        let [x, y] = instance.position;

        self.dispositions.extend_from_slice(&DISPOSITION);
        self.positions
            .extend([[x, y, instance.elevation]; VERTICES_PER_SPRITE]);
        self.scales.extend([instance.size; VERTICES_PER_SPRITE]);
        self.offsets.extend([instance.offset; VERTICES_PER_SPRITE]);
        self.uvs.extend(uv_rows(instance.uv));
        self.opacities.extend([instance.opacity; VERTICES_PER_SPRITE]);
        index
    }

    pub fn len(&self) -> usize {
        self.positions.len() / VERTICES_PER_SPRITE
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    fn rows(&self, index: usize) -> Result<Range<usize>, InstanceError> {
        let len = self.len();
        if index >= len {
            return Err(InstanceError::OutOfRange { index, len });
        }
        let start = index * VERTICES_PER_SPRITE;
        Ok(start..start + VERTICES_PER_SPRITE)
    }

    /// Moves instance `index`; its elevation is kept.
    pub fn set_position(&mut self, index: usize, position: [f32; 2]) -> Result<(), InstanceError> {
        let rows = self.rows(index)?;
        for row in &mut self.positions[rows] {
            row[0] = position[0];
            row[1] = position[1];
        }
        Ok(())
    }

    pub fn set_elevation(&mut self, index: usize, elevation: f32) -> Result<(), InstanceError> {
        let rows = self.rows(index)?;
        for row in &mut self.positions[rows] {
            row[2] = elevation;
        }
        Ok(())
    }

    pub fn set_size(&mut self, index: usize, size: [f32; 2]) -> Result<(), InstanceError> {
        let rows = self.rows(index)?;
        self.scales[rows].fill(size);
        Ok(())
    }

    pub fn set_offset(&mut self, index: usize, offset: [f32; 2]) -> Result<(), InstanceError> {
        let rows = self.rows(index)?;
        self.offsets[rows].fill(offset);
        Ok(())
    }

    pub fn set_opacity(&mut self, index: usize, opacity: f32) -> Result<(), InstanceError> {
        let rows = self.rows(index)?;
        self.opacities[rows].fill(opacity);
        Ok(())
    }

    /// Maps the atlas rectangle `[u0, v0, u1, v1]` onto the quad of instance `index`.
    pub fn set_uv(&mut self, index: usize, uv: [f32; 4]) -> Result<(), InstanceError> {
        let rows = self.rows(index)?;
        self.uvs[rows].copy_from_slice(&uv_rows(uv));
        Ok(())
    }

    pub fn dispositions(&self) -> &[[f32; 2]] {
        &self.dispositions
    }

    pub fn positions(&self) -> &[[f32; 3]] {
        &self.positions
    }

    pub fn scales(&self) -> &[[f32; 2]] {
        &self.scales
    }

    pub fn offsets(&self) -> &[[f32; 2]] {
        &self.offsets
    }

    pub fn uvs(&self) -> &[[f32; 2]] {
        &self.uvs
    }

    pub fn opacities(&self) -> &[f32] {
        &self.opacities
    }

    pub fn has_texture(&self) -> bool {
        self.program.borrow().texture().is_some()
    }
}

/// Atlas texture coordinates of the six rows of one quad.
///
/// The rows only read the `u0` and `u1` edges, the second component being
/// stored negated. Existing atlases are laid out for exactly this mapping.
fn uv_rows(uv: [f32; 4]) -> [[f32; 2]; VERTICES_PER_SPRITE] {
    let [u0, _, u1, _] = uv;
    [
        [u1, -u1],
        [u1, -u0],
        [u0, -u1],
        [u0, -u0],
        [u0, -u1],
        [u1, -u0],
    ]
}
