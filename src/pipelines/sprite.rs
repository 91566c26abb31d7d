use crate::{
    data_structures::scene_graph::SceneNode,
    pipelines::program::{Definition, Program, ProgramLayout},
    render::{RenderError, RenderPlugin, RenderState},
};

/// Screen aligned textured quads. A texture must be set before they draw.
pub fn mk_sprite_program() -> Program {
    Program::new(ProgramLayout {
        label: "sprite",
        vertex: include_str!("shaders/sprite.vert"),
        fragment: include_str!("shaders/sprite.frag"),
        attributes: vec!["position", "texture"],
        uniforms: vec![
            "uCamera",
            "uPosition",
            "uScale",
            "uOffset",
            "uHalfSize",
            "uTexture",
            "uColorAlpha",
        ],
        definitions: vec![Definition::Texture],
    })
}

#[derive(Debug, Default)]
pub struct SpritePass {
    objects: Vec<SceneNode>,
}

impl RenderPlugin for SpritePass {
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
        // billboards are drawn on top of the scene
        state.ctx.set_blend(Some(wgpu::BlendState::ALPHA_BLENDING));
        state.ctx.set_depth(false, wgpu::CompareFunction::Always);
        super::render_objects(state, &self.objects)
    }
}
