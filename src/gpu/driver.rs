//! The driver seam: every graphics call the crate makes goes through
//! [`Driver`].
//!
//! Handles are plain non-zero object names, exactly what the GL hands out.
//! The trait takes `&self` everywhere; the GL itself is one big piece of
//! thread-bound mutable state and the caller is responsible for making the
//! right context current before calling in.

use std::num::NonZeroU32;

use crate::shader::ShaderStage;

macro_rules! gl_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(pub NonZeroU32);

        impl $name {
            /// Raw GL object name.
            #[must_use]
            pub const fn get(self) -> u32 {
                self.0.get()
            }
        }
    };
}

gl_handle!(
    /// A shader object name.
    ShaderHandle
);
gl_handle!(
    /// A program object name.
    ProgramHandle
);
gl_handle!(
    /// A buffer object name.
    BufferHandle
);
gl_handle!(
    /// A vertex array object name.
    VertexArrayHandle
);
gl_handle!(
    /// A texture object name.
    TextureHandle
);
gl_handle!(
    /// A query object name.
    QueryHandle
);

/// A resolved uniform location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub u32);

/// Name, array size and raw type of an active uniform or attribute, as
/// reported by the driver after linking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveVariable {
    /// Variable name (array uniforms carry a `[0]` suffix).
    pub name: String,
    /// Array length, 1 for scalars.
    pub size: i32,
    /// Raw driver type enumeration (`GL_FLOAT_VEC3`, ...).
    pub gl_type: u32,
}

/// Serialized program as handed out by `glGetProgramBinary`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramBinary {
    /// Driver-specific bytes.
    pub bytes: Vec<u8>,
    /// Driver binary format enumeration.
    pub format: u32,
}

/// Identification strings of the driver behind a context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriverInfo {
    /// `GL_VENDOR`.
    pub vendor: String,
    /// `GL_RENDERER`.
    pub renderer: String,
    /// `GL_VERSION`.
    pub version: String,
}

impl DriverInfo {
    /// Single string identifying the driver build, mixed into program
    /// hashes so binaries from another driver are never loaded.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        format!("{}|{}|{}", self.vendor, self.renderer, self.version)
    }
}

/// Buffer binding targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    /// `GL_ARRAY_BUFFER`.
    Array,
    /// `GL_ELEMENT_ARRAY_BUFFER`.
    ElementArray,
    /// `GL_TEXTURE_BUFFER`.
    Texture,
    /// `GL_UNIFORM_BUFFER`.
    Uniform,
    /// `GL_TRANSFORM_FEEDBACK_BUFFER`.
    TransformFeedback,
}

impl BufferTarget {
    /// GL enumeration for this target.
    #[must_use]
    pub const fn gl_enum(self) -> u32 {
        match self {
            Self::Array => glow::ARRAY_BUFFER,
            Self::ElementArray => glow::ELEMENT_ARRAY_BUFFER,
            Self::Texture => glow::TEXTURE_BUFFER,
            Self::Uniform => glow::UNIFORM_BUFFER,
            Self::TransformFeedback => glow::TRANSFORM_FEEDBACK_BUFFER,
        }
    }
}

/// Buffer usage hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BufferUsage {
    /// `GL_STATIC_DRAW`.
    #[default]
    StaticDraw,
    /// `GL_DYNAMIC_DRAW`.
    DynamicDraw,
    /// `GL_STREAM_DRAW`.
    StreamDraw,
    /// `GL_DYNAMIC_COPY`.
    DynamicCopy,
}

impl BufferUsage {
    /// GL enumeration for this usage.
    #[must_use]
    pub const fn gl_enum(self) -> u32 {
        match self {
            Self::StaticDraw => glow::STATIC_DRAW,
            Self::DynamicDraw => glow::DYNAMIC_DRAW,
            Self::StreamDraw => glow::STREAM_DRAW,
            Self::DynamicCopy => glow::DYNAMIC_COPY,
        }
    }
}

/// Texture targets supported by [`crate::gpu::Texture`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureTarget {
    /// `GL_TEXTURE_1D`.
    D1,
    /// `GL_TEXTURE_2D`.
    D2,
    /// `GL_TEXTURE_3D`.
    D3,
    /// `GL_TEXTURE_BUFFER`, backed by a buffer object.
    Buffer,
}

impl TextureTarget {
    /// GL enumeration for this target.
    #[must_use]
    pub const fn gl_enum(self) -> u32 {
        match self {
            Self::D1 => glow::TEXTURE_1D,
            Self::D2 => glow::TEXTURE_2D,
            Self::D3 => glow::TEXTURE_3D,
            Self::Buffer => glow::TEXTURE_BUFFER,
        }
    }
}

/// Query targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryTarget {
    /// `GL_TIME_ELAPSED`, result in nanoseconds.
    TimeElapsed,
    /// `GL_SAMPLES_PASSED`.
    SamplesPassed,
    /// `GL_ANY_SAMPLES_PASSED`.
    AnySamplesPassed,
    /// `GL_PRIMITIVES_GENERATED`.
    PrimitivesGenerated,
    /// `GL_TRANSFORM_FEEDBACK_PRIMITIVES_WRITTEN`.
    TransformFeedbackPrimitivesWritten,
}

impl QueryTarget {
    /// GL enumeration for this target.
    #[must_use]
    pub const fn gl_enum(self) -> u32 {
        match self {
            Self::TimeElapsed => glow::TIME_ELAPSED,
            Self::SamplesPassed => glow::SAMPLES_PASSED,
            Self::AnySamplesPassed => glow::ANY_SAMPLES_PASSED,
            Self::PrimitivesGenerated => glow::PRIMITIVES_GENERATED,
            Self::TransformFeedbackPrimitivesWritten => {
                glow::TRANSFORM_FEEDBACK_PRIMITIVES_WRITTEN
            }
        }
    }
}

/// Component type for integer vertex attribute pointers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntegerComponent {
    /// `GL_INT`.
    Int,
    /// `GL_UNSIGNED_INT`.
    UnsignedInt,
}

impl IntegerComponent {
    /// GL enumeration for this component type.
    #[must_use]
    pub const fn gl_enum(self) -> u32 {
        match self {
            Self::Int => glow::INT,
            Self::UnsignedInt => glow::UNSIGNED_INT,
        }
    }
}

/// One `glTexImage{1,2,3}D` upload. The dimensionality follows `target`.
#[derive(Debug, Clone, Copy)]
pub struct TexImage<'a> {
    /// Target the texture is bound to.
    pub target: TextureTarget,
    /// Internal storage format (`GL_RGBA32F`, ...).
    pub internal_format: u32,
    /// Width in texels.
    pub width: i32,
    /// Height in texels (ignored for 1D).
    pub height: i32,
    /// Depth in texels (3D only).
    pub depth: i32,
    /// Pixel data format (`GL_RGBA`, `GL_RED`, ...).
    pub format: u32,
    /// Pixel component type (`GL_FLOAT`, `GL_UNSIGNED_BYTE`, ...).
    pub pixel_type: u32,
    /// Raw pixel bytes.
    pub data: &'a [u8],
}

/// Graphics driver entry points used by the binding layer.
///
/// [`crate::gpu::GlowDriver`] forwards to a real GL context. Calls must be
/// made from the thread owning that context.
pub trait Driver {
    /// Vendor, renderer and version strings of the current context.
    fn driver_info(&self) -> DriverInfo;

    // -- Shaders ----------------------------------------------------------

    /// Create an empty shader object for `stage`.
    fn create_shader(&self, stage: ShaderStage) -> Result<ShaderHandle, String>;
    /// Replace the source of `shader`.
    fn shader_source(&self, shader: ShaderHandle, source: &str);
    /// Compile `shader`, returning the compile status.
    fn compile_shader(&self, shader: ShaderHandle) -> bool;
    /// Info log of the last compilation of `shader`.
    fn shader_info_log(&self, shader: ShaderHandle) -> String;
    /// Delete `shader`.
    fn delete_shader(&self, shader: ShaderHandle);

    // -- Programs ---------------------------------------------------------

    /// Create an empty program object.
    fn create_program(&self) -> Result<ProgramHandle, String>;
    /// Attach a compiled shader.
    fn attach_shader(&self, program: ProgramHandle, shader: ShaderHandle);
    /// Detach a shader after linking.
    fn detach_shader(&self, program: ProgramHandle, shader: ShaderHandle);
    /// Capture `names` into a single interleaved transform-feedback buffer.
    fn transform_feedback_varyings(&self, program: ProgramHandle, names: &[&str]);
    /// Link `program`, returning the link status.
    fn link_program(&self, program: ProgramHandle) -> bool;
    /// Validate `program` against the current state, returning the status.
    fn validate_program(&self, program: ProgramHandle) -> bool;
    /// Info log of the last link or validation of `program`.
    fn program_info_log(&self, program: ProgramHandle) -> String;
    /// Serialized binary of a linked program, `None` if the driver does not
    /// provide one.
    fn program_binary(&self, program: ProgramHandle) -> Option<ProgramBinary>;
    /// Load a serialized binary into `program`, returning the link status.
    fn load_program_binary(
        &self,
        program: ProgramHandle,
        binary: &ProgramBinary,
    ) -> bool;
    /// Make `program` the active program (`None` unbinds).
    fn use_program(&self, program: Option<ProgramHandle>);
    /// Delete `program`.
    fn delete_program(&self, program: ProgramHandle);

    // -- Introspection ----------------------------------------------------

    /// Active uniforms of a linked program.
    fn active_uniforms(&self, program: ProgramHandle) -> Vec<ActiveVariable>;
    /// Location of a uniform, `None` when inactive or block-resident.
    fn uniform_location(
        &self,
        program: ProgramHandle,
        name: &str,
    ) -> Option<UniformLocation>;
    /// Active vertex attributes of a linked program.
    fn active_attributes(&self, program: ProgramHandle) -> Vec<ActiveVariable>;
    /// Location of a vertex attribute.
    fn attrib_location(&self, program: ProgramHandle, name: &str) -> Option<u32>;

    // -- Uniform setters (act on the active program) ------------------------

    /// `glUniform{1,2,3,4}i`; the arity is `values.len()`.
    fn uniform_i32(&self, location: UniformLocation, values: &[i32]);
    /// `glUniform{1,2,3,4}ui`; the arity is `values.len()`.
    fn uniform_u32(&self, location: UniformLocation, values: &[u32]);
    /// `glUniform{1,2,3,4}f`; the arity is `values.len()`.
    fn uniform_f32(&self, location: UniformLocation, values: &[f32]);
    /// `glUniform1d`.
    fn uniform_f64(&self, location: UniformLocation, value: f64);
    /// `glUniformMatrix{2,3,4}fv` with a column-major, untransposed matrix
    /// of `dim * dim` floats.
    fn uniform_matrix_f32(&self, location: UniformLocation, dim: u8, columns: &[f32]);

    // -- Vertex state -----------------------------------------------------

    /// Create a vertex array object.
    fn create_vertex_array(&self) -> Result<VertexArrayHandle, String>;
    /// Bind a vertex array (`None` unbinds).
    fn bind_vertex_array(&self, vao: Option<VertexArrayHandle>);
    /// Delete a vertex array.
    fn delete_vertex_array(&self, vao: VertexArrayHandle);
    /// Enable attribute `index` on the bound vertex array.
    fn enable_vertex_attrib_array(&self, index: u32);
    /// Float attribute pointer into the bound array buffer.
    fn vertex_attrib_pointer_f32(&self, index: u32, size: i32, stride: i32, offset: i32);
    /// Integer attribute pointer into the bound array buffer.
    fn vertex_attrib_pointer_i32(
        &self,
        index: u32,
        size: i32,
        component: IntegerComponent,
        stride: i32,
        offset: i32,
    );

    // -- Buffers ----------------------------------------------------------

    /// Create a buffer object.
    fn create_buffer(&self) -> Result<BufferHandle, String>;
    /// Bind `buffer` to `target` (`None` unbinds).
    fn bind_buffer(&self, target: BufferTarget, buffer: Option<BufferHandle>);
    /// Allocate and fill the buffer bound to `target`.
    fn buffer_data(&self, target: BufferTarget, data: &[u8], usage: BufferUsage);
    /// Allocate `size` uninitialized bytes for the buffer bound to `target`.
    fn buffer_data_size(&self, target: BufferTarget, size: usize, usage: BufferUsage);
    /// Overwrite part of the buffer bound to `target`.
    fn buffer_sub_data(&self, target: BufferTarget, offset: usize, data: &[u8]);
    /// Delete a buffer object.
    fn delete_buffer(&self, buffer: BufferHandle);

    // -- Textures ---------------------------------------------------------

    /// Create a texture object.
    fn create_texture(&self) -> Result<TextureHandle, String>;
    /// Bind `texture` to `target` (`None` unbinds).
    fn bind_texture(&self, target: TextureTarget, texture: Option<TextureHandle>);
    /// `glTexParameteri` on the texture bound to `target`.
    fn tex_parameter_i32(&self, target: TextureTarget, parameter: u32, value: i32);
    /// Attach `buffer` as storage of the bound buffer texture.
    fn tex_buffer(&self, internal_format: u32, buffer: BufferHandle) -> Result<(), String>;
    /// Upload a full texture image.
    fn tex_image(&self, image: &TexImage<'_>);
    /// Delete a texture object.
    fn delete_texture(&self, texture: TextureHandle);

    // -- Queries ----------------------------------------------------------

    /// Create a query object.
    fn create_query(&self) -> Result<QueryHandle, String>;
    /// Start `query` on `target`.
    fn begin_query(&self, target: QueryTarget, query: QueryHandle);
    /// End the active query on `target`.
    fn end_query(&self, target: QueryTarget);
    /// Whether the result of `query` can be read without stalling.
    fn query_result_available(&self, query: QueryHandle) -> bool;
    /// 64-bit result of a finished query.
    fn query_result(&self, query: QueryHandle) -> u64;
    /// Delete a query object.
    fn delete_query(&self, query: QueryHandle);
}
