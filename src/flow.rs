//! Flow control and the frame loop.
//!
//! A "flow" represents a scene or application state: it builds its part of the
//! scene graph once and updates it every frame. [`run`] drives any number of
//! flows against one graphics context.
//!
//! # Lifecycle
//!
//! 1. A root group and a perspective camera are created
//! 2. `on_init` is called once per flow
//! 3. Every frame `on_update` is called on all flows, world matrices are
//!    updated from the root and the scene is rendered

use instant::Instant;
use log::{debug, info, warn};

use anyhow::Context as _;
use cgmath::Deg;

use crate::{
    camera::Camera,
    context::GraphicsContext,
    data_structures::scene_graph::SceneNode,
    render::{FrameStats, RenderConfig, Renderer},
};

pub use instant::Duration;

/// The scene a flow works on.
pub struct Stage {
    /// Root group of the scene graph.
    pub scene: SceneNode,
    /// Camera node, attached below `scene`.
    pub camera: SceneNode,
    pub renderer: Renderer,
}

impl Stage {
    pub fn new(config: RenderConfig) -> anyhow::Result<Self> {
        let scene = SceneNode::group().with_name("scene");
        let camera =
            SceneNode::from(Camera::perspective(Deg(45.0), config.aspect(), 0.1, 500.0)).with_name("camera");
        scene.attach(&camera)?;
        Ok(Self {
            scene,
            camera,
            renderer: Renderer::new(config),
        })
    }
}

/// Trait for implementing a renderable scene or application state.
///
/// # Lifecycle
///
/// 1. `on_init()` is called once when the flow is started; build the scene
///    graph and configure the camera here
/// 2. `on_update()` is called every frame with the time elapsed since the
///    previous frame
pub trait GraphicsFlow<S> {
    fn on_init(&mut self, stage: &mut Stage, state: &mut S) -> anyhow::Result<()>;

    fn on_update(&mut self, stage: &Stage, state: &mut S, dt: Duration) -> anyhow::Result<()>;
}

/// Runs `flows` for `frames` frames and returns what every frame drew.
pub fn run<S: Default>(
    ctx: &mut dyn GraphicsContext,
    mut flows: Vec<Box<dyn GraphicsFlow<S>>>,
    config: RenderConfig,
    frames: usize,
) -> anyhow::Result<Vec<FrameStats>> {
    if let Err(e) = env_logger::try_init() {
        println!("Warning: Could not initialize logger: {}", e);
    };

    let mut state = S::default();
    let mut stage = Stage::new(config)?;
    for (i, flow) in flows.iter_mut().enumerate() {
        flow.on_init(&mut stage, &mut state)
            .with_context(|| format!("initializing flow {i}"))?;
    }
    info!("running {} flows for {frames} frames", flows.len());

    let mut stats = Vec::with_capacity(frames);
    let mut last_frame = Instant::now();
    for frame in 0..frames {
        let now = Instant::now();
        let dt = now - last_frame;
        last_frame = now;

        for flow in flows.iter_mut() {
            flow.on_update(&stage, &mut state, dt)
                .with_context(|| format!("updating frame {frame}"))?;
        }
        stage.scene.update_world_matrix();

        let frame_stats = stage.renderer.render(ctx, &stage.scene, &stage.camera);
        if !frame_stats.errors.is_empty() {
            warn!(
                "frame {frame}: {} objects could not be drawn",
                frame_stats.errors.len()
            );
        }
        debug!("frame {frame}: {frame_stats:?}");
        stats.push(frame_stats);
    }
    Ok(stats)
}
