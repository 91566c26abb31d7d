#![allow(dead_code)]

use std::rc::Rc;

use lumen_ngin::{
    camera::Camera,
    cgmath::{Deg, Vector3},
    context::{GlCommand, HeadlessContext, TextureId, UniformLocation},
    data_structures::{
        batched_sprite::BatchedSprite,
        geometry::{AttributeBuffer, Geometry},
        mesh::Mesh,
        scene_graph::SceneNode,
        sprite::Sprite,
        texture::Texture,
    },
    pipelines::{
        basic::mk_basic_program, batched_sprite::mk_batched_sprite_program,
        program::ProgramRef, sprite::mk_sprite_program, transparent::mk_transparent_program,
    },
    render::{RenderConfig, RenderState},
};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Two triangles forming a unit square around the origin in the XY plane.
pub fn square_geometry() -> Geometry {
    let positions = vec![
        -0.5, -0.5, 0.0, 0.5, -0.5, 0.0, 0.5, 0.5, 0.0, //
        -0.5, -0.5, 0.0, 0.5, 0.5, 0.0, -0.5, 0.5, 0.0,
    ];
    let colors = vec![1.0; positions.len()];
    Geometry::new()
        .with_buffer("position", AttributeBuffer::new(positions, 3))
        .with_buffer("color", AttributeBuffer::new(colors, 3))
}

pub fn mesh_node(name: &str) -> SceneNode {
    SceneNode::from(Mesh::new(Rc::new(square_geometry()), mk_basic_program().shared())).with_name(name)
}

pub fn transparent_node(name: &str, render_order: i32) -> SceneNode {
    let mesh = Mesh::new(Rc::new(square_geometry()), mk_transparent_program(0.5).shared())
        .with_render_order(render_order);
    SceneNode::from(mesh).with_name(name)
}

pub fn texture() -> Texture {
    Texture::new(TextureId(7), [64, 64], "atlas")
}

pub fn sprite_program(textured: bool) -> ProgramRef {
    let program = mk_sprite_program().shared();
    if textured {
        program.borrow_mut().set_texture(texture());
    }
    program
}

pub fn sprite_node(name: &str, textured: bool) -> SceneNode {
    SceneNode::from(Sprite::new(sprite_program(textured), [32.0, 32.0])).with_name(name)
}

pub fn batch(instances: usize) -> BatchedSprite {
    let program = mk_batched_sprite_program().shared();
    program.borrow_mut().set_texture(texture());
    let mut batch = BatchedSprite::new(program);
    for i in 0..instances {
        batch.push([i as f32, i as f32 * 2.0]);
    }
    batch
}

pub fn batch_node(name: &str, instances: usize) -> SceneNode {
    SceneNode::from(batch(instances)).with_name(name)
}

/// A perspective camera at (0, 0, 5) looking down -Z.
pub fn camera_node() -> SceneNode {
    let camera = SceneNode::from(Camera::perspective(Deg(45.0), 4.0 / 3.0, 0.1, 100.0)).with_name("camera");
    camera.set_position(Vector3::new(0.0, 0.0, 5.0));
    camera.update_world_matrix();
    camera
}

pub fn render_state<'c>(ctx: &'c mut HeadlessContext, camera: &SceneNode) -> RenderState<'c> {
    RenderState::new(ctx, Some(camera.clone()), &RenderConfig::default())
}

pub fn matrix4_uniforms(ctx: &HeadlessContext, location: UniformLocation) -> Vec<[[f32; 4]; 4]> {
    ctx.commands
        .iter()
        .filter_map(|command| match command {
            GlCommand::UniformMatrix4 {
                location: recorded,
                value,
            } if *recorded == location => Some(*value),
            _ => None,
        })
        .collect()
}

/// Vertex counts of every recorded `DrawArrays` command.
pub fn draw_arrays(ctx: &HeadlessContext) -> Vec<u32> {
    ctx.commands
        .iter()
        .filter_map(|command| match command {
            GlCommand::DrawArrays { count, .. } => Some(*count),
            _ => None,
        })
        .collect()
}

/// Shared state handed to the flows under test.
#[derive(Default)]
pub struct State {
    init_invocations: u32,
    update_invocations: u32,
}

impl State {
    pub fn init(&mut self) {
        self.init_invocations += 1;
    }

    pub fn update(&mut self) {
        self.update_invocations += 1;
    }

    pub fn init_invocations(&self) -> u32 {
        self.init_invocations
    }

    pub fn update_invocations(&self) -> u32 {
        self.update_invocations
    }
}
