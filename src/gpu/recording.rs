//! In-process [`Driver`] that records calls instead of talking to a GPU.
//!
//! Shader "compilation" fails on the marker `COMPILE_ERROR`, linking on
//! `LINK_ERROR`. Active uniforms and vertex inputs are read back from
//! `uniform <type> <name>;` and `in <type> <name>;` declarations, and
//! program binaries are the linked sources behind a magic prefix.

use std::cell::RefCell;
use std::num::NonZeroU32;

use rustc_hash::FxHashMap;

use super::driver::{
    ActiveVariable, BufferHandle, BufferTarget, BufferUsage, Driver,
    DriverInfo, IntegerComponent, ProgramBinary, ProgramHandle, QueryHandle,
    QueryTarget, ShaderHandle, TexImage, TextureHandle, TextureTarget,
    UniformLocation, VertexArrayHandle,
};
use crate::shader::ShaderStage;

/// Binary format reported for recorded program binaries.
pub(crate) const RECORDED_BINARY_FORMAT: u32 = 0x5245_4342;

const BINARY_MAGIC: &[u8] = b"RECBIN\0";

/// A state-changing call, in issue order.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    AttachShader(ProgramHandle, ShaderHandle),
    DetachShader(ProgramHandle, ShaderHandle),
    FeedbackVaryings(ProgramHandle, Vec<String>),
    ValidateProgram(ProgramHandle),
    UseProgram(Option<ProgramHandle>),
    UniformI32(UniformLocation, Vec<i32>),
    UniformU32(UniformLocation, Vec<u32>),
    UniformF32(UniformLocation, Vec<f32>),
    UniformF64(UniformLocation, f64),
    UniformMatrix(UniformLocation, u8, Vec<f32>),
    BindVertexArray(Option<VertexArrayHandle>),
    EnableAttrib(u32),
    AttribPointerF32 {
        index: u32,
        size: i32,
        stride: i32,
        offset: i32,
    },
    AttribPointerI32 {
        index: u32,
        size: i32,
        component: IntegerComponent,
        stride: i32,
        offset: i32,
    },
    BindBuffer(BufferTarget, Option<BufferHandle>),
    BufferData(BufferTarget, usize, BufferUsage),
    BufferDataSize(BufferTarget, usize, BufferUsage),
    BufferSubData(BufferTarget, usize, usize),
    BindTexture(TextureTarget, Option<TextureHandle>),
    TexParameter(TextureTarget, u32, i32),
    TexBuffer(u32, BufferHandle),
    TexImage {
        target: TextureTarget,
        width: i32,
        height: i32,
        depth: i32,
        format: u32,
        bytes: usize,
    },
    BeginQuery(QueryTarget, QueryHandle),
    EndQuery(QueryTarget),
    DeleteQuery(QueryHandle),
}

#[derive(Debug)]
struct ShaderObject {
    stage: ShaderStage,
    source: String,
    log: String,
}

#[derive(Debug, Default)]
struct ProgramObject {
    attached: Vec<u32>,
    /// Sources captured at link time, vertex stage flagged.
    linked: Vec<(ShaderStage, String)>,
    log: String,
}

#[derive(Debug)]
struct State {
    next_name: u32,
    calls: Vec<Call>,
    shaders: FxHashMap<u32, ShaderObject>,
    programs: FxHashMap<u32, ProgramObject>,
    compiles: usize,
    links: usize,
    binary_loads: usize,
    binaries_supported: bool,
    validation: Option<String>,
    info: DriverInfo,
    query_value: u64,
    query_pending: usize,
    query_polls: usize,
    textures: usize,
    buffers: usize,
    buffer_creation_fails: bool,
    tex_buffer_fails: bool,
}

/// Recording driver for unit tests.
#[derive(Debug)]
pub(crate) struct RecordingDriver {
    state: RefCell<State>,
}

impl RecordingDriver {
    pub(crate) fn new() -> Self {
        Self {
            state: RefCell::new(State {
                next_name: 0,
                calls: Vec::new(),
                shaders: FxHashMap::default(),
                programs: FxHashMap::default(),
                compiles: 0,
                links: 0,
                binary_loads: 0,
                binaries_supported: true,
                validation: None,
                info: DriverInfo {
                    vendor: "Recording".to_owned(),
                    renderer: "Null".to_owned(),
                    version: "4.6".to_owned(),
                },
                query_value: 0,
                query_pending: 0,
                query_polls: 0,
                textures: 0,
                buffers: 0,
                buffer_creation_fails: false,
                tex_buffer_fails: false,
            }),
        }
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    pub(crate) fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    pub(crate) fn live_shaders(&self) -> usize {
        self.state.borrow().shaders.len()
    }

    pub(crate) fn live_programs(&self) -> usize {
        self.state.borrow().programs.len()
    }

    pub(crate) fn live_textures(&self) -> usize {
        self.state.borrow().textures
    }

    pub(crate) fn live_buffers(&self) -> usize {
        self.state.borrow().buffers
    }

    /// Make `create_buffer` fail.
    pub(crate) fn fail_buffer_creation(&self) {
        self.state.borrow_mut().buffer_creation_fails = true;
    }

    /// Make `tex_buffer` report a missing entry point.
    pub(crate) fn fail_tex_buffer(&self) {
        self.state.borrow_mut().tex_buffer_fails = true;
    }

    /// Number of successful or failed shader compilations.
    pub(crate) fn compile_count(&self) -> usize {
        self.state.borrow().compiles
    }

    /// Number of link attempts from shaders (binary loads excluded).
    pub(crate) fn link_count(&self) -> usize {
        self.state.borrow().links
    }

    /// Number of accepted binary loads.
    pub(crate) fn binary_loads(&self) -> usize {
        self.state.borrow().binary_loads
    }

    pub(crate) fn set_binaries_supported(&self, supported: bool) {
        self.state.borrow_mut().binaries_supported = supported;
    }

    /// Make validation fail with `log`.
    pub(crate) fn fail_validation(&self, log: &str) {
        self.state.borrow_mut().validation = Some(log.to_owned());
    }

    pub(crate) fn set_driver_info(&self, info: DriverInfo) {
        self.state.borrow_mut().info = info;
    }

    /// Next query reports `value` after `pending` unavailable polls.
    pub(crate) fn set_query_result(&self, value: u64, pending: usize) {
        let mut state = self.state.borrow_mut();
        state.query_value = value;
        state.query_pending = pending;
    }

    pub(crate) fn query_polls(&self) -> usize {
        self.state.borrow().query_polls
    }

    fn record(&self, call: Call) {
        self.state.borrow_mut().calls.push(call);
    }

    fn next_name(&self) -> NonZeroU32 {
        let mut state = self.state.borrow_mut();
        state.next_name += 1;
        NonZeroU32::new(state.next_name).unwrap_or(NonZeroU32::MIN)
    }

    fn declarations(
        &self,
        program: ProgramHandle,
        keyword: &str,
        vertex_only: bool,
    ) -> Vec<ActiveVariable> {
        let state = self.state.borrow();
        let Some(object) = state.programs.get(&program.get()) else {
            return Vec::new();
        };
        let mut out: Vec<ActiveVariable> = Vec::new();
        for (stage, source) in &object.linked {
            if vertex_only && *stage != ShaderStage::Vertex {
                continue;
            }
            for var in parse_declarations(source, keyword) {
                if !out.iter().any(|v| v.name == var.name) {
                    out.push(var);
                }
            }
        }
        out
    }
}

fn parse_declarations(source: &str, keyword: &str) -> Vec<ActiveVariable> {
    source
        .lines()
        .filter_map(|line| {
            let mut words = line.trim().split_whitespace();
            if words.next()? != keyword {
                return None;
            }
            let ty = words.next()?;
            let name = words.next()?.trim_end_matches(';');
            let (name, size) = match name.split_once('[') {
                Some((base, rest)) => {
                    let size = rest.trim_end_matches(']').parse().ok()?;
                    (format!("{base}[0]"), size)
                }
                None => (name.to_owned(), 1),
            };
            Some(ActiveVariable {
                name,
                size,
                gl_type: glsl_type(ty),
            })
        })
        .collect()
}

fn glsl_type(name: &str) -> u32 {
    match name {
        "float" => glow::FLOAT,
        "vec2" => glow::FLOAT_VEC2,
        "vec3" => glow::FLOAT_VEC3,
        "vec4" => glow::FLOAT_VEC4,
        "double" => glow::DOUBLE,
        "int" => glow::INT,
        "ivec2" => glow::INT_VEC2,
        "ivec3" => glow::INT_VEC3,
        "ivec4" => glow::INT_VEC4,
        "uint" => glow::UNSIGNED_INT,
        "uvec2" => glow::UNSIGNED_INT_VEC2,
        "uvec3" => glow::UNSIGNED_INT_VEC3,
        "uvec4" => glow::UNSIGNED_INT_VEC4,
        "bool" => glow::BOOL,
        "bvec2" => glow::BOOL_VEC2,
        "bvec3" => glow::BOOL_VEC3,
        "bvec4" => glow::BOOL_VEC4,
        "mat2" => glow::FLOAT_MAT2,
        "mat3" => glow::FLOAT_MAT3,
        "mat4" => glow::FLOAT_MAT4,
        "sampler1D" => glow::SAMPLER_1D,
        "sampler2D" => glow::SAMPLER_2D,
        "sampler3D" => glow::SAMPLER_3D,
        "samplerBuffer" => glow::SAMPLER_BUFFER,
        "isamplerBuffer" => glow::INT_SAMPLER_BUFFER,
        "usamplerBuffer" => glow::UNSIGNED_INT_SAMPLER_BUFFER,
        "usampler2D" => glow::UNSIGNED_INT_SAMPLER_2D,
        "image2D" => glow::IMAGE_2D,
        _ => 0,
    }
}

impl Driver for RecordingDriver {
    fn driver_info(&self) -> DriverInfo {
        self.state.borrow().info.clone()
    }

    fn create_shader(&self, stage: ShaderStage) -> Result<ShaderHandle, String> {
        let name = self.next_name();
        let _ = self.state.borrow_mut().shaders.insert(
            name.get(),
            ShaderObject {
                stage,
                source: String::new(),
                log: String::new(),
            },
        );
        Ok(ShaderHandle(name))
    }

    fn shader_source(&self, shader: ShaderHandle, source: &str) {
        if let Some(object) = self.state.borrow_mut().shaders.get_mut(&shader.get()) {
            object.source = source.to_owned();
        }
    }

    fn compile_shader(&self, shader: ShaderHandle) -> bool {
        let mut state = self.state.borrow_mut();
        state.compiles += 1;
        let Some(object) = state.shaders.get_mut(&shader.get()) else {
            return false;
        };
        if object.source.contains("COMPILE_ERROR") {
            object.log = "0:1(1): error: COMPILE_ERROR marker".to_owned();
            false
        } else {
            true
        }
    }

    fn shader_info_log(&self, shader: ShaderHandle) -> String {
        self.state
            .borrow()
            .shaders
            .get(&shader.get())
            .map(|s| s.log.clone())
            .unwrap_or_default()
    }

    fn delete_shader(&self, shader: ShaderHandle) {
        let _ = self.state.borrow_mut().shaders.remove(&shader.get());
    }

    fn create_program(&self) -> Result<ProgramHandle, String> {
        let name = self.next_name();
        let _ = self
            .state
            .borrow_mut()
            .programs
            .insert(name.get(), ProgramObject::default());
        Ok(ProgramHandle(name))
    }

    fn attach_shader(&self, program: ProgramHandle, shader: ShaderHandle) {
        self.record(Call::AttachShader(program, shader));
        if let Some(object) = self.state.borrow_mut().programs.get_mut(&program.get()) {
            object.attached.push(shader.get());
        }
    }

    fn detach_shader(&self, program: ProgramHandle, shader: ShaderHandle) {
        self.record(Call::DetachShader(program, shader));
        if let Some(object) = self.state.borrow_mut().programs.get_mut(&program.get()) {
            object.attached.retain(|s| *s != shader.get());
        }
    }

    fn transform_feedback_varyings(&self, program: ProgramHandle, names: &[&str]) {
        self.record(Call::FeedbackVaryings(
            program,
            names.iter().map(|n| (*n).to_owned()).collect(),
        ));
    }

    fn link_program(&self, program: ProgramHandle) -> bool {
        let mut state = self.state.borrow_mut();
        state.links += 1;
        let linked: Vec<(ShaderStage, String)> = match state.programs.get(&program.get()) {
            Some(object) => object
                .attached
                .iter()
                .filter_map(|s| state.shaders.get(s))
                .map(|s| (s.stage, s.source.clone()))
                .collect(),
            None => return false,
        };
        let failed = linked.iter().any(|(_, src)| src.contains("LINK_ERROR"));
        let Some(object) = state.programs.get_mut(&program.get()) else {
            return false;
        };
        if failed {
            object.log = "error: LINK_ERROR marker".to_owned();
            return false;
        }
        object.linked = linked;
        true
    }

    fn validate_program(&self, program: ProgramHandle) -> bool {
        self.record(Call::ValidateProgram(program));
        let mut state = self.state.borrow_mut();
        let Some(log) = state.validation.clone() else {
            return true;
        };
        if let Some(object) = state.programs.get_mut(&program.get()) {
            object.log = log;
        }
        false
    }

    fn program_info_log(&self, program: ProgramHandle) -> String {
        self.state
            .borrow()
            .programs
            .get(&program.get())
            .map(|p| p.log.clone())
            .unwrap_or_default()
    }

    fn program_binary(&self, program: ProgramHandle) -> Option<ProgramBinary> {
        let state = self.state.borrow();
        if !state.binaries_supported {
            return None;
        }
        let object = state.programs.get(&program.get())?;
        let mut bytes = BINARY_MAGIC.to_vec();
        for (stage, source) in &object.linked {
            bytes.push(if *stage == ShaderStage::Vertex { b'V' } else { b'F' });
            bytes.extend_from_slice(source.as_bytes());
            bytes.push(0);
        }
        Some(ProgramBinary {
            bytes,
            format: RECORDED_BINARY_FORMAT,
        })
    }

    fn load_program_binary(&self, program: ProgramHandle, binary: &ProgramBinary) -> bool {
        let mut state = self.state.borrow_mut();
        if binary.format != RECORDED_BINARY_FORMAT {
            return false;
        }
        let Some(body) = binary.bytes.strip_prefix(BINARY_MAGIC) else {
            return false;
        };
        let mut linked = Vec::new();
        for chunk in body.split(|b| *b == 0).filter(|c| !c.is_empty()) {
            let stage = if chunk[0] == b'V' {
                ShaderStage::Vertex
            } else {
                ShaderStage::Fragment
            };
            let Ok(source) = std::str::from_utf8(&chunk[1..]) else {
                return false;
            };
            linked.push((stage, source.to_owned()));
        }
        let Some(object) = state.programs.get_mut(&program.get()) else {
            return false;
        };
        object.linked = linked;
        state.binary_loads += 1;
        true
    }

    fn use_program(&self, program: Option<ProgramHandle>) {
        self.record(Call::UseProgram(program));
    }

    fn delete_program(&self, program: ProgramHandle) {
        let _ = self.state.borrow_mut().programs.remove(&program.get());
    }

    fn active_uniforms(&self, program: ProgramHandle) -> Vec<ActiveVariable> {
        self.declarations(program, "uniform", false)
    }

    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        self.active_uniforms(program)
            .iter()
            .position(|v| v.name == name || v.name.strip_suffix("[0]") == Some(name))
            .and_then(|i| u32::try_from(i).ok())
            .map(UniformLocation)
    }

    fn active_attributes(&self, program: ProgramHandle) -> Vec<ActiveVariable> {
        self.declarations(program, "in", true)
    }

    fn attrib_location(&self, program: ProgramHandle, name: &str) -> Option<u32> {
        self.active_attributes(program)
            .iter()
            .position(|v| v.name == name)
            .and_then(|i| u32::try_from(i).ok())
    }

    fn uniform_i32(&self, location: UniformLocation, values: &[i32]) {
        self.record(Call::UniformI32(location, values.to_vec()));
    }

    fn uniform_u32(&self, location: UniformLocation, values: &[u32]) {
        self.record(Call::UniformU32(location, values.to_vec()));
    }

    fn uniform_f32(&self, location: UniformLocation, values: &[f32]) {
        self.record(Call::UniformF32(location, values.to_vec()));
    }

    fn uniform_f64(&self, location: UniformLocation, value: f64) {
        self.record(Call::UniformF64(location, value));
    }

    fn uniform_matrix_f32(&self, location: UniformLocation, dim: u8, columns: &[f32]) {
        self.record(Call::UniformMatrix(location, dim, columns.to_vec()));
    }

    fn create_vertex_array(&self) -> Result<VertexArrayHandle, String> {
        Ok(VertexArrayHandle(self.next_name()))
    }

    fn bind_vertex_array(&self, vao: Option<VertexArrayHandle>) {
        self.record(Call::BindVertexArray(vao));
    }

    fn delete_vertex_array(&self, _vao: VertexArrayHandle) {}

    fn enable_vertex_attrib_array(&self, index: u32) {
        self.record(Call::EnableAttrib(index));
    }

    fn vertex_attrib_pointer_f32(&self, index: u32, size: i32, stride: i32, offset: i32) {
        self.record(Call::AttribPointerF32 {
            index,
            size,
            stride,
            offset,
        });
    }

    fn vertex_attrib_pointer_i32(
        &self,
        index: u32,
        size: i32,
        component: IntegerComponent,
        stride: i32,
        offset: i32,
    ) {
        self.record(Call::AttribPointerI32 {
            index,
            size,
            component,
            stride,
            offset,
        });
    }

    fn create_buffer(&self) -> Result<BufferHandle, String> {
        if self.state.borrow().buffer_creation_fails {
            return Err("out of buffer names".to_owned());
        }
        self.state.borrow_mut().buffers += 1;
        Ok(BufferHandle(self.next_name()))
    }

    fn bind_buffer(&self, target: BufferTarget, buffer: Option<BufferHandle>) {
        self.record(Call::BindBuffer(target, buffer));
    }

    fn buffer_data(&self, target: BufferTarget, data: &[u8], usage: BufferUsage) {
        self.record(Call::BufferData(target, data.len(), usage));
    }

    fn buffer_data_size(&self, target: BufferTarget, size: usize, usage: BufferUsage) {
        self.record(Call::BufferDataSize(target, size, usage));
    }

    fn buffer_sub_data(&self, target: BufferTarget, offset: usize, data: &[u8]) {
        self.record(Call::BufferSubData(target, offset, data.len()));
    }

    fn delete_buffer(&self, _buffer: BufferHandle) {
        let mut state = self.state.borrow_mut();
        state.buffers = state.buffers.saturating_sub(1);
    }

    fn create_texture(&self) -> Result<TextureHandle, String> {
        self.state.borrow_mut().textures += 1;
        Ok(TextureHandle(self.next_name()))
    }

    fn bind_texture(&self, target: TextureTarget, texture: Option<TextureHandle>) {
        self.record(Call::BindTexture(target, texture));
    }

    fn tex_parameter_i32(&self, target: TextureTarget, parameter: u32, value: i32) {
        self.record(Call::TexParameter(target, parameter, value));
    }

    fn tex_buffer(&self, internal_format: u32, buffer: BufferHandle) -> Result<(), String> {
        if self.state.borrow().tex_buffer_fails {
            return Err("glTexBuffer is not available".to_owned());
        }
        self.record(Call::TexBuffer(internal_format, buffer));
        Ok(())
    }

    fn tex_image(&self, image: &TexImage<'_>) {
        self.record(Call::TexImage {
            target: image.target,
            width: image.width,
            height: image.height,
            depth: image.depth,
            format: image.format,
            bytes: image.data.len(),
        });
    }

    fn delete_texture(&self, _texture: TextureHandle) {
        let mut state = self.state.borrow_mut();
        state.textures = state.textures.saturating_sub(1);
    }

    fn create_query(&self) -> Result<QueryHandle, String> {
        Ok(QueryHandle(self.next_name()))
    }

    fn begin_query(&self, target: QueryTarget, query: QueryHandle) {
        self.record(Call::BeginQuery(target, query));
    }

    fn end_query(&self, target: QueryTarget) {
        self.record(Call::EndQuery(target));
    }

    fn query_result_available(&self, _query: QueryHandle) -> bool {
        let mut state = self.state.borrow_mut();
        state.query_polls += 1;
        if state.query_pending > 0 {
            state.query_pending -= 1;
            false
        } else {
            true
        }
    }

    fn query_result(&self, _query: QueryHandle) -> u64 {
        self.state.borrow().query_value
    }

    fn delete_query(&self, query: QueryHandle) {
        self.record(Call::DeleteQuery(query));
    }
}
