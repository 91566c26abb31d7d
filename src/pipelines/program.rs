//! Shader programs and their binding to the graphics context.
//!
//! A [`Program`] starts out uncompiled. The first [`Program::enable`] builds the
//! vertex and fragment shaders from a fixed template prefixed with the
//! `#define` prologue of the currently set feature flags, links them, and
//! resolves every declared attribute and uniform to its location. From then on
//! the program is either compiled for good or permanently failed: changing
//! feature flags afterwards requires building a new program.

use std::{cell::RefCell, collections::HashMap, rc::Rc};

use cgmath::{Matrix, Matrix3, Matrix4, SquareMatrix};
use log::{debug, error, warn};

use crate::{
    context::{GraphicsContext, ProgramId, ShaderId, TextureId, UniformLocation},
    data_structures::texture::Texture,
    render::RenderState,
};

pub type ProgramRef = Rc<RefCell<Program>>;

#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
pub enum ShaderError {
    #[error("{stage:?} shader failed to compile: {log}")]
    Compile {
        stage: wgpu::ShaderStages,
        log: String,
    },
    #[error("program failed to link: {log}")]
    Link { log: String },
}

/// Preprocessor definitions baked into the shaders at compile time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Definition {
    Light,
    DirectionLights(usize),
    Texture,
}

impl Definition {
    pub fn directive(&self) -> String {
        match self {
            Definition::Light => "#define USE_LIGHT".to_string(),
            Definition::DirectionLights(amount) => format!("#define DIR_LIGHT_NUM {amount}"),
            Definition::Texture => "#define USE_TEXTURE".to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Light {
    Ambient {
        color: [f32; 3],
    },
    Directional {
        color: [f32; 3],
        direction: cgmath::Vector3<f32>,
    },
}

/// Everything needed to build a program: templates plus declared names.
#[derive(Clone, Debug)]
pub struct ProgramLayout {
    pub label: &'static str,
    pub vertex: &'static str,
    pub fragment: &'static str,
    pub attributes: Vec<&'static str>,
    pub uniforms: Vec<&'static str>,
    pub definitions: Vec<Definition>,
}

impl ProgramLayout {
    fn source(&self, template: &str) -> String {
        let mut source = String::new();
        for definition in &self.definitions {
            source.push_str(&definition.directive());
            source.push('\n');
        }
        source.push_str(template);
        source
    }

    fn compile(&self, ctx: &mut dyn GraphicsContext) -> Result<LinkedProgram, ShaderError> {
        let fragment = compile_shader(
            ctx,
            wgpu::ShaderStages::FRAGMENT,
            &self.source(self.fragment),
        )?;
        let vertex = compile_shader(ctx, wgpu::ShaderStages::VERTEX, &self.source(self.vertex))?;

        let id = ctx.create_program();
        ctx.attach_shader(id, vertex);
        ctx.attach_shader(id, fragment);
        ctx.link_program(id);
        if !ctx.program_link_status(id) {
            return Err(ShaderError::Link {
                log: ctx.program_info_log(id),
            });
        }

        let attributes = self
            .attributes
            .iter()
            .filter_map(|&name| match ctx.attribute_location(id, name) {
                Some(location) => Some((name, location)),
                None => {
                    debug!("{}: attribute `{name}` is not active", self.label);
                    None
                }
            })
            .collect();
        let uniforms = self
            .uniforms
            .iter()
            .filter_map(|&name| ctx.uniform_location(id, name).map(|location| (name, location)))
            .collect();
        debug!("{}: linked program {:?}", self.label, id);

        Ok(LinkedProgram {
            id,
            attributes,
            uniforms,
        })
    }
}

fn compile_shader(
    ctx: &mut dyn GraphicsContext,
    stage: wgpu::ShaderStages,
    source: &str,
) -> Result<ShaderId, ShaderError> {
    let shader = ctx.create_shader(stage, source);
    ctx.compile_shader(shader);
    if ctx.shader_compile_status(shader) {
        Ok(shader)
    } else {
        Err(ShaderError::Compile {
            stage,
            log: ctx.shader_info_log(shader),
        })
    }
}

#[derive(Debug)]
struct LinkedProgram {
    id: ProgramId,
    attributes: Vec<(&'static str, u32)>,
    uniforms: HashMap<&'static str, UniformLocation>,
}

impl LinkedProgram {
    fn disable(&self, ctx: &mut dyn GraphicsContext) {
        for (_, location) in &self.attributes {
            ctx.disable_vertex_attrib_array(*location);
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProgramStatus {
    Uncompiled,
    Compiled,
    Failed,
}

#[derive(Debug)]
pub struct Program {
    layout: ProgramLayout,
    lights: Vec<Light>,
    opacity: f32,
    transparent: bool,
    texture: Option<Texture>,
    state: Option<Result<LinkedProgram, ShaderError>>,
}

impl Program {
    pub fn new(layout: ProgramLayout) -> Self {
        Self {
            layout,
            lights: Vec::new(),
            opacity: 1.0,
            transparent: false,
            texture: None,
            state: None,
        }
    }

    pub fn shared(self) -> ProgramRef {
        Rc::new(RefCell::new(self))
    }

    pub fn label(&self) -> &'static str {
        self.layout.label
    }

    pub fn status(&self) -> ProgramStatus {
        match &self.state {
            None => ProgramStatus::Uncompiled,
            Some(Ok(_)) => ProgramStatus::Compiled,
            Some(Err(_)) => ProgramStatus::Failed,
        }
    }

    pub fn id(&self) -> Option<ProgramId> {
        match &self.state {
            Some(Ok(linked)) => Some(linked.id),
            _ => None,
        }
    }

    pub fn definitions(&self) -> &[Definition] {
        &self.layout.definitions
    }

    pub fn attribute_names(&self) -> &[&'static str] {
        &self.layout.attributes
    }

    pub fn uniform_names(&self) -> &[&'static str] {
        &self.layout.uniforms
    }

    /// Resolved location of `name`, once compiled.
    pub fn attribute(&self, name: &str) -> Option<u32> {
        match &self.state {
            Some(Ok(linked)) => linked
                .attributes
                .iter()
                .find(|(attribute, _)| *attribute == name)
                .map(|(_, location)| *location),
            _ => None,
        }
    }

    pub fn uniform(&self, name: &str) -> Option<UniformLocation> {
        match &self.state {
            Some(Ok(linked)) => linked.uniforms.get(name).copied(),
            _ => None,
        }
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn set_opacity(&mut self, opacity: f32) -> &mut Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }

    pub fn is_transparent(&self) -> bool {
        self.transparent
    }

    /// Meshes using a transparent program are drawn by the transparent pass.
    pub fn set_transparent(&mut self, transparent: bool) -> &mut Self {
        self.transparent = transparent;
        self
    }

    pub fn texture(&self) -> Option<&Texture> {
        self.texture.as_ref()
    }

    pub fn set_texture(&mut self, texture: Texture) -> &mut Self {
        self.texture = Some(texture);
        self
    }

    pub fn clear_texture(&mut self) -> Option<Texture> {
        self.texture.take()
    }

    /// Bakes lighting into the program. Must be called before the first `enable`.
    pub fn enable_lighting(&mut self, lights: &[Light]) -> &mut Self {
        if self.is_frozen("enable_lighting") {
            return self;
        }
        let directional = lights
            .iter()
            .filter(|light| matches!(light, Light::Directional { .. }))
            .count();

        self.define(Definition::Light);
        self.define(Definition::DirectionLights(directional));
        if directional > 0 {
            self.declare_attribute("normal");
        }
        self.declare_attribute("directionLightAlpha");
        for uniform in [
            "uAmbientLightColor",
            "uDirectionLightColors",
            "uDirectionLightPositions",
            "uNormalMatrix",
        ] {
            self.declare_uniform(uniform);
        }
        self.lights = lights.to_vec();
        self
    }

    /// Bakes texturing into the program. Must be called before the first `enable`.
    pub fn enable_texture(&mut self) -> &mut Self {
        if self.is_frozen("enable_texture") {
            return self;
        }
        self.define(Definition::Texture);
        self.declare_attribute("texture");
        self.declare_attribute("textureAlpha");
        self.declare_uniform("uTexture");
        self
    }

    fn is_frozen(&self, setter: &str) -> bool {
        let frozen = self.state.is_some();
        if frozen {
            warn!(
                "{}: `{setter}` has no effect after the program was compiled",
                self.layout.label
            );
        }
        frozen
    }

    fn define(&mut self, definition: Definition) {
        let same_kind = |existing: &Definition| {
            std::mem::discriminant(existing) == std::mem::discriminant(&definition)
        };
        match self.layout.definitions.iter().position(same_kind) {
            Some(index) => self.layout.definitions[index] = definition,
            None => self.layout.definitions.push(definition),
        }
    }

    fn declare_attribute(&mut self, name: &'static str) {
        if !self.layout.attributes.contains(&name) {
            self.layout.attributes.push(name);
        }
    }

    fn declare_uniform(&mut self, name: &'static str) {
        if !self.layout.uniforms.contains(&name) {
            self.layout.uniforms.push(name);
        }
    }

    /// Compiles on first use, binds the program and enables its attribute arrays.
    ///
    /// The returned guard disables the arrays again when dropped, on every exit
    /// path of the caller. A program whose compilation failed keeps returning
    /// the same error without touching the context.
    pub fn enable<'a, 'c>(
        &'a mut self,
        state: &'a mut RenderState<'c>,
    ) -> Result<BoundProgram<'a, 'c>, ShaderError> {
        let uniforms = UniformValues::collect(state, &self.lights, self.opacity, self.texture.as_ref());
        let restore = state.restore_program;
        let ctx: &'a mut (dyn GraphicsContext + 'c) = &mut *state.ctx;

        let label = self.layout.label;
        let layout = &self.layout;
        let linked = match self.state.get_or_insert_with(|| {
            let result = layout.compile(&mut *ctx);
            if let Err(e) = &result {
                error!("{label}: {e}");
            }
            result
        }) {
            Ok(linked) => &*linked,
            Err(e) => return Err(e.clone()),
        };

        let previous = ctx.current_program();
        ctx.use_program(Some(linked.id));
        for (_, location) in &linked.attributes {
            ctx.enable_vertex_attrib_array(*location);
        }

        let mut bound = BoundProgram {
            ctx,
            linked,
            previous,
            restore,
        };
        uniforms.apply(&mut bound);
        Ok(bound)
    }

    /// Disables every resolved attribute array. The program stays active.
    pub fn disable(&self, ctx: &mut dyn GraphicsContext) {
        if let Some(Ok(linked)) = &self.state {
            linked.disable(ctx);
        }
    }
}

/// An enabled program. Dropping it disables the attribute arrays and, if
/// configured, re-activates the program that was active before.
pub struct BoundProgram<'a, 'c> {
    ctx: &'a mut (dyn GraphicsContext + 'c),
    linked: &'a LinkedProgram,
    previous: Option<ProgramId>,
    restore: bool,
}

impl<'a, 'c> BoundProgram<'a, 'c> {
    pub fn id(&self) -> ProgramId {
        self.linked.id
    }

    pub fn attribute(&self, name: &str) -> Option<u32> {
        self.linked
            .attributes
            .iter()
            .find(|(attribute, _)| *attribute == name)
            .map(|(_, location)| *location)
    }

    pub fn uniform(&self, name: &str) -> Option<UniformLocation> {
        self.linked.uniforms.get(name).copied()
    }

    pub fn ctx(&mut self) -> &mut (dyn GraphicsContext + 'c) {
        &mut *self.ctx
    }

    /// Uploads `data` to the attribute called `name`, if the program uses it.
    pub fn attribute_data(&mut self, name: &str, format: wgpu::VertexFormat, data: &[u8]) {
        if let Some(location) = self.attribute(name) {
            self.ctx.vertex_attrib_data(location, format, data);
        }
    }

    /// Ends the binding before the guard goes out of scope.
    pub fn disable(self) {}
}

impl Drop for BoundProgram<'_, '_> {
    fn drop(&mut self) {
        self.linked.disable(&mut *self.ctx);
        if self.restore && self.previous != Some(self.linked.id) {
            self.ctx.use_program(self.previous);
        }
    }
}

/// Uniform values gathered from the render state before the program binds.
struct UniformValues {
    camera: Option<Matrix4<f32>>,
    position: Option<Matrix4<f32>>,
    sprite: Option<([f32; 2], [f32; 2])>,
    opacity: f32,
    half_size: [f32; 2],
    texture: Option<TextureId>,
    ambient: [f32; 3],
    direction_colors: Vec<[f32; 3]>,
    direction_positions: Vec<[f32; 3]>,
}

impl UniformValues {
    fn collect(
        state: &RenderState<'_>,
        lights: &[Light],
        opacity: f32,
        texture: Option<&Texture>,
    ) -> Self {
        let camera = state
            .camera
            .as_ref()
            .and_then(|node| node.camera().map(|camera| camera.model_view_matrix()));
        let position = state.object.as_ref().map(|node| node.world_matrix());
        let sprite = state.object.as_ref().and_then(|node| node.sprite_params());

        let mut ambient = [0.0; 3];
        let mut direction_colors = Vec::new();
        let mut direction_positions = Vec::new();
        for light in lights {
            match light {
                Light::Ambient { color } => {
                    for (sum, channel) in ambient.iter_mut().zip(color) {
                        *sum += channel;
                    }
                }
                Light::Directional { color, direction } => {
                    direction_colors.push(*color);
                    direction_positions.push((*direction).into());
                }
            }
        }

        Self {
            camera,
            position,
            sprite,
            opacity,
            half_size: [state.viewport[0] as f32 / 2.0, state.viewport[1] as f32 / 2.0],
            texture: texture.map(|texture| texture.id),
            ambient,
            direction_colors,
            direction_positions,
        }
    }

    fn apply(self, bound: &mut BoundProgram<'_, '_>) {
        if let (Some(location), Some(camera)) = (bound.uniform("uCamera"), self.camera) {
            bound.ctx.uniform_matrix4(location, camera.into());
        }
        if let (Some(location), Some(position)) = (bound.uniform("uPosition"), self.position) {
            bound.ctx.uniform_matrix4(location, position.into());
        }
        if let (Some(location), Some(position)) = (bound.uniform("uNormalMatrix"), self.position) {
            bound.ctx.uniform_matrix3(location, normal_matrix(position).into());
        }
        if let Some(location) = bound.uniform("uColorAlpha") {
            bound.ctx.uniform_f32(location, self.opacity);
        }
        if let Some(location) = bound.uniform("uHalfSize") {
            bound.ctx.uniform_vec2(location, self.half_size);
        }
        if let Some((offset, size)) = self.sprite {
            if let Some(location) = bound.uniform("uOffset") {
                bound.ctx.uniform_vec2(location, offset);
            }
            if let Some(location) = bound.uniform("uScale") {
                bound.ctx.uniform_vec2(location, size);
            }
        }
        if let (Some(location), Some(texture)) = (bound.uniform("uTexture"), self.texture) {
            bound.ctx.bind_texture(Texture::UNIT, texture);
            bound.ctx.uniform_i32(location, Texture::UNIT as i32);
        }
        if let Some(location) = bound.uniform("uAmbientLightColor") {
            bound.ctx.uniform_vec3_array(location, &[self.ambient]);
        }
        if let Some(location) = bound.uniform("uDirectionLightColors") {
            bound.ctx.uniform_vec3_array(location, &self.direction_colors);
        }
        if let Some(location) = bound.uniform("uDirectionLightPositions") {
            bound.ctx.uniform_vec3_array(location, &self.direction_positions);
        }
    }
}

fn normal_matrix(world: Matrix4<f32>) -> Matrix3<f32> {
    let rotation_scale = Matrix3::from_cols(world.x.truncate(), world.y.truncate(), world.z.truncate());
    rotation_scale
        .invert()
        .map(|inverse| inverse.transpose())
        .unwrap_or_else(Matrix3::identity)
}
