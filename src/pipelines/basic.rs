use crate::{
    data_structures::scene_graph::SceneNode,
    pipelines::program::{Program, ProgramLayout},
    render::{RenderError, RenderPlugin, RenderState},
};

pub(crate) fn basic_layout(label: &'static str) -> ProgramLayout {
    ProgramLayout {
        label,
        vertex: include_str!("shaders/basic.vert"),
        fragment: include_str!("shaders/basic.frag"),
        attributes: vec!["position", "color"],
        uniforms: vec!["uCamera", "uPosition", "uColorAlpha"],
        definitions: Vec::new(),
    }
}

/// Vertex colored meshes; lighting and texturing can be enabled before first use.
pub fn mk_basic_program() -> Program {
    Program::new(basic_layout("basic"))
}

/// Draws opaque meshes with depth writes and without blending.
#[derive(Debug, Default)]
pub struct MeshPass {
    objects: Vec<SceneNode>,
}

impl RenderPlugin for MeshPass {
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
        state.ctx.set_blend(Some(wgpu::BlendState::REPLACE));
        state.ctx.set_depth(true, wgpu::CompareFunction::Less);
        super::render_objects(state, &self.objects)
    }
}
