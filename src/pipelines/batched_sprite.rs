use crate::{
    data_structures::scene_graph::SceneNode,
    pipelines::program::{Definition, Program, ProgramLayout},
    render::{RenderError, RenderPlugin, RenderState},
};

/// Program for [`BatchedSprite`](crate::data_structures::batched_sprite::BatchedSprite)s.
pub fn mk_batched_sprite_program() -> Program {
    Program::new(ProgramLayout {
        label: "batched sprite",
        vertex: include_str!("shaders/batched_sprite.vert"),
        fragment: include_str!("shaders/batched_sprite.frag"),
        attributes: vec![
            "disposition",
            "position",
            "scale",
            "offset",
            "texture",
            "colorAlpha",
        ],
        uniforms: vec!["uCamera", "uPosition", "uHalfSize", "uTexture", "uColorAlpha"],
        definitions: vec![Definition::Texture],
    })
}

#[derive(Debug, Default)]
pub struct BatchedSpritePass {
    objects: Vec<SceneNode>,
}

impl RenderPlugin for BatchedSpritePass {
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
        state.ctx.set_blend(Some(wgpu::BlendState::ALPHA_BLENDING));
        state.ctx.set_depth(false, wgpu::CompareFunction::Always);
        super::render_objects(state, &self.objects)
    }
}
