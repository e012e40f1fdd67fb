//! [`Driver`] implementation over a [`glow::Context`].
//!
//! glow 0.16 has no wrappers for `glTexBuffer` and `glUniform1d`, so those
//! two are resolved through the loader function alongside the context.

use std::ffi::c_void;

use glow::HasContext;

use super::driver::{
    ActiveVariable, BufferHandle, BufferTarget, BufferUsage, Driver,
    DriverInfo, IntegerComponent, ProgramBinary, ProgramHandle, QueryHandle,
    QueryTarget, ShaderHandle, TexImage, TextureHandle, TextureTarget,
    UniformLocation, VertexArrayHandle,
};
use crate::shader::ShaderStage;

type TexBufferFn = unsafe extern "system" fn(u32, u32, u32);
type Uniform1dFn = unsafe extern "system" fn(i32, f64);

macro_rules! load_fn {
    ($loader:expr, $name:literal, $ty:ty) => {{
        let ptr: *const c_void = $loader($name);
        if ptr.is_null() {
            log::debug!("GL entry point {} not available", $name);
            None
        } else {
            // SAFETY: the loader returned the address of `$name`, whose C
            // signature is `$ty`.
            Some(unsafe { std::mem::transmute::<*const c_void, $ty>(ptr) })
        }
    }};
}

/// Entry points loaded outside of glow.
struct ExtraFns {
    tex_buffer: Option<TexBufferFn>,
    uniform_1d: Option<Uniform1dFn>,
}

impl ExtraFns {
    fn load<F>(loader: &mut F) -> Self
    where
        F: FnMut(&str) -> *const c_void,
    {
        Self {
            tex_buffer: load_fn!(loader, "glTexBuffer", TexBufferFn),
            uniform_1d: load_fn!(loader, "glUniform1d", Uniform1dFn),
        }
    }
}

/// A [`Driver`] backed by a glow context.
pub struct GlowDriver {
    gl: glow::Context,
    ext: ExtraFns,
    binaries: bool,
}

impl GlowDriver {
    /// Load all entry points through `loader` (typically the windowing
    /// library's `get_proc_address`).
    ///
    /// # Safety
    ///
    /// A GL context must be current on this thread and `loader` must return
    /// entry points valid for it (or null when unavailable).
    pub unsafe fn from_loader_function<F>(mut loader: F) -> Self
    where
        F: FnMut(&str) -> *const c_void,
    {
        // SAFETY: forwarded from the caller's contract.
        let gl = unsafe { glow::Context::from_loader_function(&mut loader) };
        let ext = ExtraFns::load(&mut loader);
        let binaries = supports_program_binary(&gl);
        if !binaries {
            log::info!("driver has no program binary support");
        }
        Self { gl, ext, binaries }
    }

    /// The wrapped glow context, for draw calls outside this crate.
    #[must_use]
    pub fn context(&self) -> &glow::Context {
        &self.gl
    }
}

/// `glGetProgramBinary` is core since GL 4.1 and GLES 3.0, earlier
/// desktop contexts need the ARB extension.
fn supports_program_binary(gl: &glow::Context) -> bool {
    let version = gl.version();
    let core = if version.is_embedded {
        version.major >= 3
    } else {
        (version.major, version.minor) >= (4, 1)
    };
    core || gl.supported_extensions().contains("GL_ARB_get_program_binary")
}

const fn program(handle: ProgramHandle) -> glow::NativeProgram {
    glow::NativeProgram(handle.0)
}

const fn shader(handle: ShaderHandle) -> glow::NativeShader {
    glow::NativeShader(handle.0)
}

const fn location(loc: UniformLocation) -> glow::NativeUniformLocation {
    glow::NativeUniformLocation(loc.0)
}

// SAFETY (whole impl): every call forwards to the GL of the context the
// driver was created for, on the thread where that context is current.
// Handles originate from the same context.
impl Driver for GlowDriver {
    fn driver_info(&self) -> DriverInfo {
        unsafe {
            DriverInfo {
                vendor: self.gl.get_parameter_string(glow::VENDOR),
                renderer: self.gl.get_parameter_string(glow::RENDERER),
                version: self.gl.get_parameter_string(glow::VERSION),
            }
        }
    }

    fn create_shader(&self, stage: ShaderStage) -> Result<ShaderHandle, String> {
        unsafe { self.gl.create_shader(stage.gl_enum()) }
            .map(|s| ShaderHandle(s.0))
    }

    fn shader_source(&self, handle: ShaderHandle, source: &str) {
        unsafe { self.gl.shader_source(shader(handle), source) }
    }

    fn compile_shader(&self, handle: ShaderHandle) -> bool {
        unsafe {
            self.gl.compile_shader(shader(handle));
            self.gl.get_shader_compile_status(shader(handle))
        }
    }

    fn shader_info_log(&self, handle: ShaderHandle) -> String {
        unsafe { self.gl.get_shader_info_log(shader(handle)) }
    }

    fn delete_shader(&self, handle: ShaderHandle) {
        unsafe { self.gl.delete_shader(shader(handle)) }
    }

    fn create_program(&self) -> Result<ProgramHandle, String> {
        unsafe { self.gl.create_program() }.map(|p| ProgramHandle(p.0))
    }

    fn attach_shader(&self, handle: ProgramHandle, s: ShaderHandle) {
        unsafe { self.gl.attach_shader(program(handle), shader(s)) }
    }

    fn detach_shader(&self, handle: ProgramHandle, s: ShaderHandle) {
        unsafe { self.gl.detach_shader(program(handle), shader(s)) }
    }

    fn transform_feedback_varyings(&self, handle: ProgramHandle, names: &[&str]) {
        unsafe {
            self.gl.transform_feedback_varyings(
                program(handle),
                names,
                glow::INTERLEAVED_ATTRIBS,
            );
        }
    }

    fn link_program(&self, handle: ProgramHandle) -> bool {
        unsafe {
            self.gl.link_program(program(handle));
            self.gl.get_program_link_status(program(handle))
        }
    }

    fn validate_program(&self, handle: ProgramHandle) -> bool {
        unsafe {
            self.gl.validate_program(program(handle));
            self.gl.get_program_validate_status(program(handle))
        }
    }

    fn program_info_log(&self, handle: ProgramHandle) -> String {
        unsafe { self.gl.get_program_info_log(program(handle)) }
    }

    fn program_binary(&self, handle: ProgramHandle) -> Option<ProgramBinary> {
        if !self.binaries {
            return None;
        }
        let binary = unsafe { self.gl.get_program_binary(program(handle)) }?;
        (!binary.buffer.is_empty()).then(|| ProgramBinary {
            bytes: binary.buffer,
            format: binary.format,
        })
    }

    fn load_program_binary(
        &self,
        handle: ProgramHandle,
        binary: &ProgramBinary,
    ) -> bool {
        if !self.binaries || i32::try_from(binary.bytes.len()).is_err() {
            return false;
        }
        let binary = glow::ProgramBinary {
            buffer: binary.bytes.clone(),
            format: binary.format,
        };
        unsafe {
            self.gl.program_binary(program(handle), &binary);
            self.gl.get_program_link_status(program(handle))
        }
    }

    fn use_program(&self, handle: Option<ProgramHandle>) {
        unsafe { self.gl.use_program(handle.map(program)) }
    }

    fn delete_program(&self, handle: ProgramHandle) {
        unsafe { self.gl.delete_program(program(handle)) }
    }

    fn active_uniforms(&self, handle: ProgramHandle) -> Vec<ActiveVariable> {
        let p = program(handle);
        unsafe {
            (0..self.gl.get_active_uniforms(p))
                .filter_map(|i| self.gl.get_active_uniform(p, i))
                .map(|u| ActiveVariable {
                    name: u.name,
                    size: u.size,
                    gl_type: u.utype,
                })
                .collect()
        }
    }

    fn uniform_location(
        &self,
        handle: ProgramHandle,
        name: &str,
    ) -> Option<UniformLocation> {
        unsafe { self.gl.get_uniform_location(program(handle), name) }
            .map(|loc| UniformLocation(loc.0))
    }

    fn active_attributes(&self, handle: ProgramHandle) -> Vec<ActiveVariable> {
        let p = program(handle);
        unsafe {
            (0..self.gl.get_active_attributes(p))
                .filter_map(|i| self.gl.get_active_attribute(p, i))
                .map(|a| ActiveVariable {
                    name: a.name,
                    size: a.size,
                    gl_type: a.atype,
                })
                .collect()
        }
    }

    fn attrib_location(&self, handle: ProgramHandle, name: &str) -> Option<u32> {
        unsafe { self.gl.get_attrib_location(program(handle), name) }
    }

    fn uniform_i32(&self, loc: UniformLocation, values: &[i32]) {
        let loc = Some(&location(loc));
        unsafe {
            match *values {
                [x] => self.gl.uniform_1_i32(loc, x),
                [x, y] => self.gl.uniform_2_i32(loc, x, y),
                [x, y, z] => self.gl.uniform_3_i32(loc, x, y, z),
                [x, y, z, w] => self.gl.uniform_4_i32(loc, x, y, z, w),
                _ => log::warn!("glUniform*i with {} components", values.len()),
            }
        }
    }

    fn uniform_u32(&self, loc: UniformLocation, values: &[u32]) {
        let loc = Some(&location(loc));
        unsafe {
            match *values {
                [x] => self.gl.uniform_1_u32(loc, x),
                [x, y] => self.gl.uniform_2_u32(loc, x, y),
                [x, y, z] => self.gl.uniform_3_u32(loc, x, y, z),
                [x, y, z, w] => self.gl.uniform_4_u32(loc, x, y, z, w),
                _ => log::warn!("glUniform*ui with {} components", values.len()),
            }
        }
    }

    fn uniform_f32(&self, loc: UniformLocation, values: &[f32]) {
        let loc = Some(&location(loc));
        unsafe {
            match *values {
                [x] => self.gl.uniform_1_f32(loc, x),
                [x, y] => self.gl.uniform_2_f32(loc, x, y),
                [x, y, z] => self.gl.uniform_3_f32(loc, x, y, z),
                [x, y, z, w] => self.gl.uniform_4_f32(loc, x, y, z, w),
                _ => log::warn!("glUniform*f with {} components", values.len()),
            }
        }
    }

    fn uniform_f64(&self, loc: UniformLocation, value: f64) {
        match self.ext.uniform_1d {
            Some(set) => {
                #[allow(clippy::cast_possible_wrap)]
                let raw = loc.0 as i32;
                unsafe { set(raw, value) }
            }
            None => {
                log::debug!("glUniform1d unavailable, narrowing to float");
                #[allow(clippy::cast_possible_truncation)]
                let narrowed = value as f32;
                unsafe {
                    self.gl.uniform_1_f32(Some(&location(loc)), narrowed);
                }
            }
        }
    }

    fn uniform_matrix_f32(&self, loc: UniformLocation, dim: u8, columns: &[f32]) {
        let loc = Some(&location(loc));
        unsafe {
            match dim {
                2 => self.gl.uniform_matrix_2_f32_slice(loc, false, columns),
                3 => self.gl.uniform_matrix_3_f32_slice(loc, false, columns),
                4 => self.gl.uniform_matrix_4_f32_slice(loc, false, columns),
                _ => log::warn!("glUniformMatrix{dim}fv is not a GL call"),
            }
        }
    }

    fn create_vertex_array(&self) -> Result<VertexArrayHandle, String> {
        unsafe { self.gl.create_vertex_array() }.map(|v| VertexArrayHandle(v.0))
    }

    fn bind_vertex_array(&self, vao: Option<VertexArrayHandle>) {
        unsafe {
            self.gl
                .bind_vertex_array(vao.map(|v| glow::NativeVertexArray(v.0)));
        }
    }

    fn delete_vertex_array(&self, vao: VertexArrayHandle) {
        unsafe { self.gl.delete_vertex_array(glow::NativeVertexArray(vao.0)) }
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        unsafe { self.gl.enable_vertex_attrib_array(index) }
    }

    fn vertex_attrib_pointer_f32(&self, index: u32, size: i32, stride: i32, offset: i32) {
        unsafe {
            self.gl.vertex_attrib_pointer_f32(
                index,
                size,
                glow::FLOAT,
                false,
                stride,
                offset,
            );
        }
    }

    fn vertex_attrib_pointer_i32(
        &self,
        index: u32,
        size: i32,
        component: IntegerComponent,
        stride: i32,
        offset: i32,
    ) {
        unsafe {
            self.gl.vertex_attrib_pointer_i32(
                index,
                size,
                component.gl_enum(),
                stride,
                offset,
            );
        }
    }

    fn create_buffer(&self) -> Result<BufferHandle, String> {
        unsafe { self.gl.create_buffer() }.map(|b| BufferHandle(b.0))
    }

    fn bind_buffer(&self, target: BufferTarget, buffer: Option<BufferHandle>) {
        unsafe {
            self.gl
                .bind_buffer(target.gl_enum(), buffer.map(|b| glow::NativeBuffer(b.0)));
        }
    }

    fn buffer_data(&self, target: BufferTarget, data: &[u8], usage: BufferUsage) {
        unsafe {
            self.gl
                .buffer_data_u8_slice(target.gl_enum(), data, usage.gl_enum());
        }
    }

    fn buffer_data_size(&self, target: BufferTarget, size: usize, usage: BufferUsage) {
        let Ok(size) = i32::try_from(size) else {
            log::warn!("buffer allocation of {size} bytes exceeds GLsizeiptr");
            return;
        };
        unsafe {
            self.gl
                .buffer_data_size(target.gl_enum(), size, usage.gl_enum());
        }
    }

    fn buffer_sub_data(&self, target: BufferTarget, offset: usize, data: &[u8]) {
        let Ok(offset) = i32::try_from(offset) else {
            log::warn!("buffer offset {offset} exceeds GLintptr");
            return;
        };
        unsafe {
            self.gl
                .buffer_sub_data_u8_slice(target.gl_enum(), offset, data);
        }
    }

    fn delete_buffer(&self, buffer: BufferHandle) {
        unsafe { self.gl.delete_buffer(glow::NativeBuffer(buffer.0)) }
    }

    fn create_texture(&self) -> Result<TextureHandle, String> {
        unsafe { self.gl.create_texture() }.map(|t| TextureHandle(t.0))
    }

    fn bind_texture(&self, target: TextureTarget, texture: Option<TextureHandle>) {
        unsafe {
            self.gl.bind_texture(
                target.gl_enum(),
                texture.map(|t| glow::NativeTexture(t.0)),
            );
        }
    }

    fn tex_parameter_i32(&self, target: TextureTarget, parameter: u32, value: i32) {
        unsafe { self.gl.tex_parameter_i32(target.gl_enum(), parameter, value) }
    }

    fn tex_buffer(&self, internal_format: u32, buffer: BufferHandle) -> Result<(), String> {
        let attach = self
            .ext
            .tex_buffer
            .ok_or_else(|| "glTexBuffer is not available".to_owned())?;
        unsafe { attach(glow::TEXTURE_BUFFER, internal_format, buffer.get()) };
        Ok(())
    }

    fn tex_image(&self, image: &TexImage<'_>) {
        let pixels = glow::PixelUnpackData::Slice(Some(image.data));
        #[allow(clippy::cast_possible_wrap)]
        let internal = image.internal_format as i32;
        unsafe {
            match image.target {
                TextureTarget::D1 => self.gl.tex_image_1d(
                    glow::TEXTURE_1D,
                    0,
                    internal,
                    image.width,
                    0,
                    image.format,
                    image.pixel_type,
                    pixels,
                ),
                TextureTarget::D2 => self.gl.tex_image_2d(
                    glow::TEXTURE_2D,
                    0,
                    internal,
                    image.width,
                    image.height,
                    0,
                    image.format,
                    image.pixel_type,
                    pixels,
                ),
                TextureTarget::D3 => self.gl.tex_image_3d(
                    glow::TEXTURE_3D,
                    0,
                    internal,
                    image.width,
                    image.height,
                    image.depth,
                    0,
                    image.format,
                    image.pixel_type,
                    pixels,
                ),
                TextureTarget::Buffer => {
                    log::warn!("buffer textures are filled through their buffer");
                }
            }
        }
    }

    fn delete_texture(&self, texture: TextureHandle) {
        unsafe { self.gl.delete_texture(glow::NativeTexture(texture.0)) }
    }

    fn create_query(&self) -> Result<QueryHandle, String> {
        unsafe { self.gl.create_query() }.map(|q| QueryHandle(q.0))
    }

    fn begin_query(&self, target: QueryTarget, query: QueryHandle) {
        unsafe { self.gl.begin_query(target.gl_enum(), glow::NativeQuery(query.0)) }
    }

    fn end_query(&self, target: QueryTarget) {
        unsafe { self.gl.end_query(target.gl_enum()) }
    }

    fn query_result_available(&self, query: QueryHandle) -> bool {
        unsafe {
            self.gl.get_query_parameter_u32(
                glow::NativeQuery(query.0),
                glow::QUERY_RESULT_AVAILABLE,
            ) != 0
        }
    }

    fn query_result(&self, query: QueryHandle) -> u64 {
        let mut value: u64 = 0;
        // No query buffer is bound, so the offset is the destination address.
        let destination = std::ptr::addr_of_mut!(value) as usize;
        unsafe {
            self.gl.get_query_parameter_u64_with_offset(
                glow::NativeQuery(query.0),
                glow::QUERY_RESULT,
                destination,
            );
        }
        value
    }

    fn delete_query(&self, query: QueryHandle) {
        unsafe { self.gl.delete_query(glow::NativeQuery(query.0)) }
    }
}
