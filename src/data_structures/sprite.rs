//! Single billboard sprites.
//!
//! A sprite is a textured quad that always faces the screen. Its node's world
//! position is projected by the camera, then the quad is expanded around that
//! point in pixels: `size` scales the unit quad and `offset` moves it.

use cgmath::Vector2;

use crate::pipelines::program::ProgramRef;

/// Corners of the unit quad, centered on the origin.
pub const QUAD_VERTICES: [[f32; 2]; 4] = [[-0.5, -0.5], [0.5, -0.5], [0.5, 0.5], [-0.5, 0.5]];
pub const QUAD_UVS: [[f32; 2]; 4] = [[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]];
/// Two triangles sharing the `0 - 2` diagonal.
pub const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

#[derive(Clone, Debug)]
pub struct Sprite {
    pub program: ProgramRef,
    pub offset: Vector2<f32>,
    pub size: Vector2<f32>,
}

impl Sprite {
    pub fn new(program: ProgramRef, size: [f32; 2]) -> Self {
        Self {
            program,
            offset: Vector2::new(0.0, 0.0),
            size: size.into(),
        }
    }

    pub fn with_offset(mut self, offset: [f32; 2]) -> Self {
        self.offset = offset.into();
        self
    }

    pub fn has_texture(&self) -> bool {
        self.program.borrow().texture().is_some()
    }
}
