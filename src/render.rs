//! Render classification and pass composition.
//!
//! Every frame the [`Renderer`] walks the visible part of the scene once and
//! sorts each renderable node into the bucket of the pass that draws it. The
//! passes then run in registration order, each drawing its bucket object by
//! object.
//!
//! # Key types
//!
//! - [`RenderType`] tags the pass a renderable belongs to
//! - [`RenderPlugin`] is a pass: it collects objects and draws them
//! - [`RenderPlugins`] maps render types to passes
//! - [`RenderState`] is threaded through a frame: context, camera and the
//!   object currently drawn

use crate::{
    context::GraphicsContext,
    data_structures::scene_graph::SceneNode,
    pipelines::{
        basic::MeshPass, batched_sprite::BatchedSpritePass, program::ShaderError,
        sprite::SpritePass, transparent::TransparentPass,
    },
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RenderType {
    Mesh,
    Transparent,
    Sprite,
    BatchedSprite,
}

#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
pub enum RenderError {
    #[error(transparent)]
    Shader(#[from] ShaderError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderConfig {
    /// Viewport size in pixels; sprites are sized relative to it.
    pub viewport: [u32; 2],
    /// Re-activate the previously active program after each draw.
    pub restore_program: bool,
    /// Draw transparent meshes in ascending render order.
    pub sort_transparent: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            viewport: [800, 600],
            restore_program: true,
            sort_transparent: true,
        }
    }
}

impl RenderConfig {
    pub fn aspect(&self) -> f32 {
        self.viewport[0] as f32 / self.viewport[1].max(1) as f32
    }
}

/// State handed to every draw of a frame.
pub struct RenderState<'c> {
    pub ctx: &'c mut dyn GraphicsContext,
    pub camera: Option<SceneNode>,
    /// The node currently being drawn.
    pub object: Option<SceneNode>,
    pub viewport: [u32; 2],
    pub restore_program: bool,
    /// Failures of objects skipped so far this frame.
    pub errors: Vec<RenderError>,
}

impl<'c> RenderState<'c> {
    pub fn new(
        ctx: &'c mut dyn GraphicsContext,
        camera: Option<SceneNode>,
        config: &RenderConfig,
    ) -> Self {
        Self {
            ctx,
            camera,
            object: None,
            viewport: config.viewport,
            restore_program: config.restore_program,
            errors: Vec::new(),
        }
    }
}

/// A render pass drawing the objects classified for it.
pub trait RenderPlugin {
    fn add_object(&mut self, object: SceneNode);

    fn objects(&self) -> &[SceneNode];

    fn clear(&mut self);

    /// Draws the collected objects and returns the number of draw calls issued.
    fn render(&mut self, state: &mut RenderState<'_>) -> Result<usize, RenderError>;
}

/// Passes keyed by render type, run in registration order.
#[derive(Default)]
pub struct RenderPlugins {
    passes: Vec<(RenderType, Box<dyn RenderPlugin>)>,
}

impl RenderPlugins {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mesh, transparent, sprite and batched sprite passes, in that order.
    pub fn with_defaults(config: &RenderConfig) -> Self {
        let mut plugins = Self::new();
        plugins.register(RenderType::Mesh, Box::new(MeshPass::default()));
        plugins.register(
            RenderType::Transparent,
            Box::new(TransparentPass::new(config.sort_transparent)),
        );
        plugins.register(RenderType::Sprite, Box::new(SpritePass::default()));
        plugins.register(
            RenderType::BatchedSprite,
            Box::new(BatchedSpritePass::default()),
        );
        plugins
    }

    /// Adds a pass, replacing (in place) any pass registered for the same type.
    pub fn register(&mut self, render_type: RenderType, plugin: Box<dyn RenderPlugin>) {
        match self.passes.iter_mut().find(|(t, _)| *t == render_type) {
            Some((_, existing)) => *existing = plugin,
            None => self.passes.push((render_type, plugin)),
        }
    }

    pub fn get(&self, render_type: RenderType) -> Option<&dyn RenderPlugin> {
        self.passes
            .iter()
            .find(|(t, _)| *t == render_type)
            .map(|(_, plugin)| plugin.as_ref())
    }

    pub fn objects(&self, render_type: RenderType) -> &[SceneNode] {
        self.get(render_type)
            .map(|plugin| plugin.objects())
            .unwrap_or_default()
    }

    pub fn add_object(&mut self, render_type: RenderType, object: SceneNode) {
        match self.passes.iter_mut().find(|(t, _)| *t == render_type) {
            Some((_, plugin)) => plugin.add_object(object),
            None => log::warn!(
                "no render plugin registered for {:?}, `{}` is not drawn",
                render_type,
                object.name()
            ),
        }
    }

    pub fn clear(&mut self) {
        self.passes.iter_mut().for_each(|(_, plugin)| plugin.clear());
    }
}

/// What a frame drew.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub draw_calls: usize,
    /// Objects classified per pass, in pass order.
    pub objects: Vec<(RenderType, usize)>,
    /// Objects or passes that failed to draw. The rest of the frame was drawn.
    pub errors: Vec<RenderError>,
}

impl FrameStats {
    pub fn objects_of(&self, render_type: RenderType) -> usize {
        self.objects
            .iter()
            .find(|(t, _)| *t == render_type)
            .map_or(0, |(_, amount)| *amount)
    }
}

pub struct Renderer {
    pub config: RenderConfig,
    plugins: RenderPlugins,
}

impl Renderer {
    pub fn new(config: RenderConfig) -> Self {
        Self {
            plugins: RenderPlugins::with_defaults(&config),
            config,
        }
    }

    pub fn plugins(&self) -> &RenderPlugins {
        &self.plugins
    }

    pub fn plugins_mut(&mut self) -> &mut RenderPlugins {
        &mut self.plugins
    }

    /// Classifies the visible renderables of `scene` and runs every pass.
    ///
    /// World matrices are expected to be current; nodes still flagged dirty
    /// are refreshed right before they are drawn. Objects whose program fails
    /// to build are skipped and reported in [`FrameStats::errors`], the context
    /// is left without enabled attribute arrays.
    pub fn render(
        &mut self,
        ctx: &mut dyn GraphicsContext,
        scene: &SceneNode,
        camera: &SceneNode,
    ) -> FrameStats {
        if camera.camera().is_none() {
            log::warn!("`{}` is not a camera, rendering without a view", camera.name());
        }
        if camera.is_world_matrix_dirty() {
            camera.update_world_matrix();
        }

        self.plugins.clear();
        scene.classify(&mut self.plugins);

        let mut state = RenderState::new(ctx, Some(camera.clone()), &self.config);
        let mut stats = FrameStats::default();
        for (render_type, plugin) in self.plugins.passes.iter_mut() {
            stats.objects.push((*render_type, plugin.objects().len()));
            match plugin.render(&mut state) {
                Ok(drawn) => stats.draw_calls += drawn,
                Err(e) => {
                    log::error!("{render_type:?} pass failed: {e}");
                    state.errors.push(e);
                }
            }
        }
        stats.errors = std::mem::take(&mut state.errors);
        log::debug!(
            "frame finished with {} draw calls and {} errors",
            stats.draw_calls,
            stats.errors.len()
        );
        stats
    }
}
