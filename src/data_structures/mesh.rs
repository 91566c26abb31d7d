use std::rc::Rc;

use crate::{data_structures::geometry::Geometry, pipelines::program::ProgramRef};

/// Geometry drawn as a non-indexed triangle list with one program.
///
/// Geometry and program are shared handles: many meshes may draw the same
/// buffers with the same program.
#[derive(Clone, Debug)]
pub struct Mesh {
    pub geometry: Rc<Geometry>,
    pub program: ProgramRef,
    /// Transparent meshes are drawn in ascending render order.
    pub render_order: i32,
}

impl Mesh {
    pub fn new(geometry: Rc<Geometry>, program: ProgramRef) -> Self {
        Self {
            geometry,
            program,
            render_order: 0,
        }
    }

    pub fn with_render_order(mut self, render_order: i32) -> Self {
        self.render_order = render_order;
        self
    }

    /// Number of vertices a draw covers, `None` without a position buffer.
    pub fn vertex_count(&self) -> Option<usize> {
        self.geometry.vertex_count()
    }
}
