use crate::{
    data_structures::scene_graph::SceneNode,
    pipelines::{basic::basic_layout, program::Program},
    render::{RenderError, RenderPlugin, RenderState},
};

/// A basic program whose meshes are blended over the opaque scene.
pub fn mk_transparent_program(opacity: f32) -> Program {
    let mut program = Program::new(basic_layout("transparent"));
    program.set_transparent(true).set_opacity(opacity);
    program
}

/// Draws transparent meshes after the opaque ones.
///
/// Objects are blended without writing depth, in ascending render order.
/// Objects sharing a render order keep their classification order.
#[derive(Debug)]
pub struct TransparentPass {
    objects: Vec<SceneNode>,
    sort: bool,
}

impl TransparentPass {
    pub fn new(sort: bool) -> Self {
        Self {
            objects: Vec::new(),
            sort,
        }
    }
}

impl Default for TransparentPass {
    fn default() -> Self {
        Self::new(true)
    }
}

impl RenderPlugin for TransparentPass {
    fn add_object(&mut self, object: SceneNode) {
        self.objects.push(object);
    }

    fn objects(&self) -> &[SceneNode] {
        &self.objects
    }

    fn clear(&mut self) {
        self.objects.clear();
    }

    fn render(&mut self, state: &mut RenderState<'_>) -> Result<usize, RenderError> {
        if self.sort {
            // `sort_by_key` is stable
            self.objects.sort_by_key(SceneNode::render_order);
        }
        state.ctx.set_blend(Some(wgpu::BlendState::ALPHA_BLENDING));
        state.ctx.set_depth(false, wgpu::CompareFunction::Less);
        super::render_objects(state, &self.objects)
    }
}
