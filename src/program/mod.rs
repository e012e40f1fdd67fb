//! Linked programs with their uniform and attribute descriptors.

mod attributes;
mod uniforms;

pub use attributes::{AttribLayout, AttributeInfo, Attributes};
pub use uniforms::{UniformInfo, UniformType, UniformValue, Uniforms};

use crate::error::GlError;
use crate::gpu::{Driver, ProgramBinary, ProgramHandle};
use crate::shader::Shader;

/// Validation message some drivers emit for programs that bind samplers of
/// different types to unit 0 before any texture is assigned. Not an error.
pub const BENIGN_VALIDATION_MESSAGE: &str =
    "active samplers with a different type refer to the same texture image unit";

/// A linked program.
#[derive(Debug)]
pub struct Program {
    handle: ProgramHandle,
    uniforms: Uniforms,
    attributes: Attributes,
}

impl Program {
    /// Link `shaders` into a program. With non-empty `feedback`, the named
    /// outputs are captured interleaved into one transform-feedback buffer.
    ///
    /// The shaders are detached and deleted once linking has been attempted.
    ///
    /// # Errors
    ///
    /// [`GlError::ResourceCreation`] if the program object cannot be
    /// created, [`GlError::Link`] or [`GlError::Validate`] with the driver
    /// log.
    pub fn link(
        gl: &dyn Driver,
        shaders: Vec<Shader>,
        feedback: &[String],
        permissive: bool,
    ) -> Result<Self, GlError> {
        let handle = match gl.create_program() {
            Ok(handle) => handle,
            Err(msg) => {
                for shader in shaders {
                    shader.destroy(gl);
                }
                return Err(GlError::ResourceCreation(msg));
            }
        };

        for shader in &shaders {
            gl.attach_shader(handle, shader.handle());
        }
        if !feedback.is_empty() {
            let names: Vec<&str> = feedback.iter().map(String::as_str).collect();
            gl.transform_feedback_varyings(handle, &names);
        }

        let linked = gl.link_program(handle);
        for shader in shaders {
            gl.detach_shader(handle, shader.handle());
            shader.destroy(gl);
        }

        if !linked {
            let log = gl.program_info_log(handle);
            gl.delete_program(handle);
            return Err(GlError::Link { log });
        }

        Self::finish(gl, handle, permissive)
    }

    /// Recreate a program from a binary previously returned by
    /// [`Program::binary`].
    ///
    /// # Errors
    ///
    /// [`GlError::Link`] if the driver rejects the binary (other driver,
    /// other version, corrupt bytes), plus the errors of
    /// [`Program::link`].
    pub fn from_binary(
        gl: &dyn Driver,
        binary: &ProgramBinary,
        permissive: bool,
    ) -> Result<Self, GlError> {
        let handle = gl.create_program().map_err(GlError::ResourceCreation)?;
        if !gl.load_program_binary(handle, binary) {
            let log = gl.program_info_log(handle);
            gl.delete_program(handle);
            return Err(GlError::Link { log });
        }
        Self::finish(gl, handle, permissive)
    }

    fn finish(
        gl: &dyn Driver,
        handle: ProgramHandle,
        permissive: bool,
    ) -> Result<Self, GlError> {
        if let Err(err) = validate(gl, handle) {
            gl.delete_program(handle);
            return Err(err);
        }
        Ok(Self {
            handle,
            uniforms: Uniforms::discover(gl, handle, permissive),
            attributes: Attributes::discover(gl, handle, permissive),
        })
    }

    /// Serialized program, `None` when the driver hands out no binary.
    #[must_use]
    pub fn binary(&self, gl: &dyn Driver) -> Option<ProgramBinary> {
        gl.program_binary(self.handle)
            .filter(|binary| !binary.bytes.is_empty())
    }

    /// Make this the active program.
    pub fn bind(&self, gl: &dyn Driver) {
        gl.use_program(Some(self.handle));
    }

    /// Driver handle.
    #[must_use]
    pub const fn handle(&self) -> ProgramHandle {
        self.handle
    }

    /// Active uniforms.
    #[must_use]
    pub const fn uniforms(&self) -> &Uniforms {
        &self.uniforms
    }

    /// Active vertex attributes.
    #[must_use]
    pub const fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Delete the program object.
    pub fn destroy(self, gl: &dyn Driver) {
        gl.delete_program(self.handle);
    }
}

fn validate(gl: &dyn Driver, handle: ProgramHandle) -> Result<(), GlError> {
    if gl.validate_program(handle) {
        return Ok(());
    }
    let log = gl.program_info_log(handle);
    let message = log.trim_matches(|c: char| c.is_whitespace() || c == '\0');
    if message == BENIGN_VALIDATION_MESSAGE {
        log::debug!("ignoring validation message: {message}");
        return Ok(());
    }
    Err(GlError::Validate { log })
}
