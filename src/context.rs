//! Graphics context surface.
//!
//! The engine never talks to a graphics API directly. Everything it needs from
//! the GPU (shader/program objects, vertex attribute state, uniforms, draw calls)
//! goes through the [`GraphicsContext`] trait, which mirrors the shape of a
//! GL-style immediate API. Vocabulary types such as topologies, index formats,
//! vertex formats and blend states are borrowed from `wgpu` so backends can map
//! them one to one.
//!
//! [`HeadlessContext`] is a complete in-memory implementation that records every
//! call as a [`GlCommand`]. It is used for tests and for running flows without a
//! window.

use std::collections::{BTreeSet, HashMap};

/// Handle of a shader object created by a [`GraphicsContext`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderId(pub u32);

/// Handle of a linked (or linkable) program object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(pub u32);

/// Resolved location of a uniform inside a linked program.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UniformLocation(pub u32);

/// Handle of a texture living on the GPU.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

/// The GPU-facing surface the engine renders through.
///
/// The context is global, mutable state for the lifetime of the GPU context:
/// the active program and the set of enabled vertex attribute arrays persist
/// between calls. The engine only touches that state through
/// [`crate::pipelines::program::BoundProgram`], which restores it on drop.
pub trait GraphicsContext {
    fn create_shader(&mut self, stage: wgpu::ShaderStages, source: &str) -> ShaderId;

    fn compile_shader(&mut self, shader: ShaderId);

    fn shader_compile_status(&self, shader: ShaderId) -> bool;

    fn shader_info_log(&self, shader: ShaderId) -> String;

    fn create_program(&mut self) -> ProgramId;

    fn attach_shader(&mut self, program: ProgramId, shader: ShaderId);

    fn link_program(&mut self, program: ProgramId);

    fn program_link_status(&self, program: ProgramId) -> bool;

    fn program_info_log(&self, program: ProgramId) -> String;

    /// `None` when the linked program has no active attribute named `name`.
    fn attribute_location(&mut self, program: ProgramId, name: &str) -> Option<u32>;

    /// `None` when the linked program has no active uniform named `name`.
    fn uniform_location(&mut self, program: ProgramId, name: &str) -> Option<UniformLocation>;

    fn use_program(&mut self, program: Option<ProgramId>);

    fn current_program(&self) -> Option<ProgramId>;

    fn enable_vertex_attrib_array(&mut self, location: u32);

    fn disable_vertex_attrib_array(&mut self, location: u32);

    /// Uploads tightly packed vertex data for one attribute.
    fn vertex_attrib_data(&mut self, location: u32, format: wgpu::VertexFormat, data: &[u8]);

    fn index_data(&mut self, format: wgpu::IndexFormat, data: &[u8]);

    fn uniform_matrix4(&mut self, location: UniformLocation, value: [[f32; 4]; 4]);

    fn uniform_f32(&mut self, location: UniformLocation, value: f32);

    fn uniform_vec2(&mut self, location: UniformLocation, value: [f32; 2]);

    fn uniform_vec3_array(&mut self, location: UniformLocation, value: &[[f32; 3]]);

    fn uniform_matrix3(&mut self, location: UniformLocation, value: [[f32; 3]; 3]);

    fn uniform_i32(&mut self, location: UniformLocation, value: i32);

    fn bind_texture(&mut self, unit: u32, texture: TextureId);

    fn set_blend(&mut self, blend: Option<wgpu::BlendState>);

    fn set_depth(&mut self, write_enabled: bool, compare: wgpu::CompareFunction);

    fn draw_arrays(&mut self, topology: wgpu::PrimitiveTopology, first: u32, count: u32);

    fn draw_elements(
        &mut self,
        topology: wgpu::PrimitiveTopology,
        count: u32,
        format: wgpu::IndexFormat,
        offset: u64,
    );
}

/// One recorded call against a [`HeadlessContext`].
#[derive(Clone, Debug, PartialEq)]
pub enum GlCommand {
    CreateShader {
        shader: ShaderId,
        stage: wgpu::ShaderStages,
    },
    CompileShader(ShaderId),
    CreateProgram(ProgramId),
    AttachShader {
        program: ProgramId,
        shader: ShaderId,
    },
    LinkProgram(ProgramId),
    UseProgram(Option<ProgramId>),
    EnableAttribute(u32),
    DisableAttribute(u32),
    AttributeData {
        location: u32,
        format: wgpu::VertexFormat,
        data: Vec<u8>,
    },
    IndexData {
        format: wgpu::IndexFormat,
        data: Vec<u8>,
    },
    UniformMatrix4 {
        location: UniformLocation,
        value: [[f32; 4]; 4],
    },
    UniformF32 {
        location: UniformLocation,
        value: f32,
    },
    UniformVec2 {
        location: UniformLocation,
        value: [f32; 2],
    },
    UniformVec3Array {
        location: UniformLocation,
        value: Vec<[f32; 3]>,
    },
    UniformMatrix3 {
        location: UniformLocation,
        value: [[f32; 3]; 3],
    },
    UniformI32 {
        location: UniformLocation,
        value: i32,
    },
    BindTexture {
        unit: u32,
        texture: TextureId,
    },
    SetBlend(Option<wgpu::BlendState>),
    SetDepth {
        write_enabled: bool,
        compare: wgpu::CompareFunction,
    },
    DrawArrays {
        topology: wgpu::PrimitiveTopology,
        first: u32,
        count: u32,
    },
    DrawElements {
        topology: wgpu::PrimitiveTopology,
        count: u32,
        format: wgpu::IndexFormat,
        offset: u64,
    },
}

impl GlCommand {
    pub fn is_draw(&self) -> bool {
        matches!(self, GlCommand::DrawArrays { .. } | GlCommand::DrawElements { .. })
    }
}

#[derive(Debug)]
struct HeadlessShader {
    stage: wgpu::ShaderStages,
    source: String,
    compiled: bool,
    log: String,
}

#[derive(Debug, Default)]
struct HeadlessProgram {
    shaders: Vec<ShaderId>,
    linked: bool,
    log: String,
    attributes: HashMap<String, u32>,
    uniforms: HashMap<String, UniformLocation>,
}

/// A [`GraphicsContext`] that keeps all state in memory and records every call.
///
/// Attribute and uniform locations are handed out in request order per program.
/// Compile and link failures can be injected to exercise error paths.
#[derive(Debug, Default)]
pub struct HeadlessContext {
    pub commands: Vec<GlCommand>,
    shaders: Vec<HeadlessShader>,
    programs: Vec<HeadlessProgram>,
    current_program: Option<ProgramId>,
    enabled_attributes: BTreeSet<u32>,
    compile_errors: Vec<(wgpu::ShaderStages, String)>,
    link_error: Option<String>,
    unknown_attributes: Vec<String>,
}

impl HeadlessContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every shader of `stage` compiled from now on fails with `log`.
    pub fn with_compile_error(mut self, stage: wgpu::ShaderStages, log: &str) -> Self {
        self.compile_errors.push((stage, log.to_string()));
        self
    }

    /// Every program linked from now on fails with `log`.
    pub fn with_link_error(mut self, log: &str) -> Self {
        self.link_error = Some(log.to_string());
        self
    }

    /// Attribute names the "driver" reports as inactive (no location).
    pub fn with_unknown_attribute(mut self, name: &str) -> Self {
        self.unknown_attributes.push(name.to_string());
        self
    }

    pub fn draw_calls(&self) -> Vec<&GlCommand> {
        self.commands.iter().filter(|c| c.is_draw()).collect()
    }

    pub fn enabled_attributes(&self) -> &BTreeSet<u32> {
        &self.enabled_attributes
    }

    pub fn programs_created(&self) -> usize {
        self.programs.len()
    }

    pub fn shader_source(&self, shader: ShaderId) -> Option<&str> {
        self.shaders
            .get(shader.0 as usize)
            .map(|shader| shader.source.as_str())
    }

    /// Sources of all shaders created for `stage`, in creation order.
    pub fn shader_sources(&self, stage: wgpu::ShaderStages) -> Vec<&str> {
        self.shaders
            .iter()
            .filter(|shader| shader.stage == stage)
            .map(|shader| shader.source.as_str())
            .collect()
    }

    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    fn linked_program(&mut self, program: ProgramId) -> Option<&mut HeadlessProgram> {
        self.programs
            .get_mut(program.0 as usize)
            .filter(|program| program.linked)
    }
}

impl GraphicsContext for HeadlessContext {
    fn create_shader(&mut self, stage: wgpu::ShaderStages, source: &str) -> ShaderId {
        let shader = ShaderId(self.shaders.len() as u32);
        self.shaders.push(HeadlessShader {
            stage,
            source: source.to_string(),
            compiled: false,
            log: String::new(),
        });
        self.commands.push(GlCommand::CreateShader { shader, stage });
        shader
    }

    fn compile_shader(&mut self, shader: ShaderId) {
        self.commands.push(GlCommand::CompileShader(shader));
        let Some(entry) = self.shaders.get_mut(shader.0 as usize) else {
            return;
        };
        match self
            .compile_errors
            .iter()
            .find(|(stage, _)| *stage == entry.stage)
        {
            Some((_, log)) => {
                entry.compiled = false;
                entry.log = log.clone();
            }
            None => entry.compiled = true,
        }
    }

    fn shader_compile_status(&self, shader: ShaderId) -> bool {
        self.shaders
            .get(shader.0 as usize)
            .is_some_and(|shader| shader.compiled)
    }

    fn shader_info_log(&self, shader: ShaderId) -> String {
        self.shaders
            .get(shader.0 as usize)
            .map(|shader| shader.log.clone())
            .unwrap_or_default()
    }

    fn create_program(&mut self) -> ProgramId {
        let program = ProgramId(self.programs.len() as u32);
        self.programs.push(HeadlessProgram::default());
        self.commands.push(GlCommand::CreateProgram(program));
        program
    }

    fn attach_shader(&mut self, program: ProgramId, shader: ShaderId) {
        self.commands.push(GlCommand::AttachShader { program, shader });
        if let Some(entry) = self.programs.get_mut(program.0 as usize) {
            entry.shaders.push(shader);
        }
    }

    fn link_program(&mut self, program: ProgramId) {
        self.commands.push(GlCommand::LinkProgram(program));
        let shaders_ok = self
            .programs
            .get(program.0 as usize)
            .map(|entry| {
                !entry.shaders.is_empty()
                    && entry
                        .shaders
                        .iter()
                        .all(|shader| self.shader_compile_status(*shader))
            })
            .unwrap_or(false);
        let link_error = self.link_error.clone();
        let Some(entry) = self.programs.get_mut(program.0 as usize) else {
            return;
        };
        match (shaders_ok, link_error) {
            (true, None) => entry.linked = true,
            (true, Some(log)) => entry.log = log,
            (false, _) => entry.log = "attached shaders did not compile".to_string(),
        }
    }

    fn program_link_status(&self, program: ProgramId) -> bool {
        self.programs
            .get(program.0 as usize)
            .is_some_and(|program| program.linked)
    }

    fn program_info_log(&self, program: ProgramId) -> String {
        self.programs
            .get(program.0 as usize)
            .map(|program| program.log.clone())
            .unwrap_or_default()
    }

    fn attribute_location(&mut self, program: ProgramId, name: &str) -> Option<u32> {
        if self.unknown_attributes.iter().any(|unknown| unknown == name) {
            return None;
        }
        let entry = self.linked_program(program)?;
        let next = entry.attributes.len() as u32;
        Some(*entry.attributes.entry(name.to_string()).or_insert(next))
    }

    fn uniform_location(&mut self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        let entry = self.linked_program(program)?;
        let next = UniformLocation(entry.uniforms.len() as u32);
        Some(*entry.uniforms.entry(name.to_string()).or_insert(next))
    }

    fn use_program(&mut self, program: Option<ProgramId>) {
        self.current_program = program;
        self.commands.push(GlCommand::UseProgram(program));
    }

    fn current_program(&self) -> Option<ProgramId> {
        self.current_program
    }

    fn enable_vertex_attrib_array(&mut self, location: u32) {
        self.enabled_attributes.insert(location);
        self.commands.push(GlCommand::EnableAttribute(location));
    }

    fn disable_vertex_attrib_array(&mut self, location: u32) {
        self.enabled_attributes.remove(&location);
        self.commands.push(GlCommand::DisableAttribute(location));
    }

    fn vertex_attrib_data(&mut self, location: u32, format: wgpu::VertexFormat, data: &[u8]) {
        self.commands.push(GlCommand::AttributeData {
            location,
            format,
            data: data.to_vec(),
        });
    }

    fn index_data(&mut self, format: wgpu::IndexFormat, data: &[u8]) {
        self.commands.push(GlCommand::IndexData {
            format,
            data: data.to_vec(),
        });
    }

    fn uniform_matrix4(&mut self, location: UniformLocation, value: [[f32; 4]; 4]) {
        self.commands
            .push(GlCommand::UniformMatrix4 { location, value });
    }

    fn uniform_f32(&mut self, location: UniformLocation, value: f32) {
        self.commands.push(GlCommand::UniformF32 { location, value });
    }

    fn uniform_vec2(&mut self, location: UniformLocation, value: [f32; 2]) {
        self.commands.push(GlCommand::UniformVec2 { location, value });
    }

    fn uniform_vec3_array(&mut self, location: UniformLocation, value: &[[f32; 3]]) {
        self.commands.push(GlCommand::UniformVec3Array {
            location,
            value: value.to_vec(),
        });
    }

    fn uniform_matrix3(&mut self, location: UniformLocation, value: [[f32; 3]; 3]) {
        self.commands
            .push(GlCommand::UniformMatrix3 { location, value });
    }

    fn uniform_i32(&mut self, location: UniformLocation, value: i32) {
        self.commands.push(GlCommand::UniformI32 { location, value });
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureId) {
        self.commands.push(GlCommand::BindTexture { unit, texture });
    }

    fn set_blend(&mut self, blend: Option<wgpu::BlendState>) {
        self.commands.push(GlCommand::SetBlend(blend));
    }

    fn set_depth(&mut self, write_enabled: bool, compare: wgpu::CompareFunction) {
        self.commands.push(GlCommand::SetDepth {
            write_enabled,
            compare,
        });
    }

    fn draw_arrays(&mut self, topology: wgpu::PrimitiveTopology, first: u32, count: u32) {
        log::debug!("draw_arrays({topology:?}, {first}, {count})");
        self.commands.push(GlCommand::DrawArrays {
            topology,
            first,
            count,
        });
    }

    fn draw_elements(
        &mut self,
        topology: wgpu::PrimitiveTopology,
        count: u32,
        format: wgpu::IndexFormat,
        offset: u64,
    ) {
        log::debug!("draw_elements({topology:?}, {count}, {format:?}, {offset})");
        self.commands.push(GlCommand::DrawElements {
            topology,
            count,
            format,
            offset,
        });
    }
}
