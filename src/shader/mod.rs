//! Shader stages, source loading and per-stage compilation.

mod preprocess;

pub use preprocess::{IncludeTable, ShaderPreprocessor, Substitutions};

use std::fmt::Write as _;
use std::path::Path;

use crate::error::GlError;
use crate::gpu::{Driver, ShaderHandle};

/// One programmable pipeline stage, selected by shader file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// `.vert`
    Vertex,
    /// `.frag`
    Fragment,
    /// `.tesc`
    TessControl,
    /// `.tese`
    TessEvaluation,
    /// `.geom`
    Geometry,
}

impl ShaderStage {
    /// Stage for a file extension (without the dot).
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "vert" => Some(Self::Vertex),
            "frag" => Some(Self::Fragment),
            "tesc" => Some(Self::TessControl),
            "tese" => Some(Self::TessEvaluation),
            "geom" => Some(Self::Geometry),
            _ => None,
        }
    }

    /// Stage for a shader file name.
    ///
    /// # Errors
    ///
    /// [`GlError::UnknownShaderExtension`] when the extension is missing or
    /// not one of the five stage extensions.
    pub fn from_filename(filename: &str) -> Result<Self, GlError> {
        Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
            .ok_or_else(|| GlError::UnknownShaderExtension {
                filename: filename.to_owned(),
            })
    }

    /// GL enumeration for this stage.
    #[must_use]
    pub const fn gl_enum(self) -> u32 {
        match self {
            Self::Vertex => glow::VERTEX_SHADER,
            Self::Fragment => glow::FRAGMENT_SHADER,
            Self::TessControl => glow::TESS_CONTROL_SHADER,
            Self::TessEvaluation => glow::TESS_EVALUATION_SHADER,
            Self::Geometry => glow::GEOMETRY_SHADER,
        }
    }
}

/// Preprocessed source text of one shader file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSource {
    /// Logical file name relative to the shader directory.
    pub filename: String,
    /// Stage derived from the file extension.
    pub stage: ShaderStage,
    /// Source after include and token expansion.
    pub code: String,
}

/// A compiled shader object.
#[derive(Debug)]
pub struct Shader {
    handle: ShaderHandle,
    stage: ShaderStage,
}

impl Shader {
    /// Compile `code` as a `stage` shader. `label` names the source in
    /// error messages.
    ///
    /// # Errors
    ///
    /// [`GlError::ResourceCreation`] if the driver cannot create the object,
    /// [`GlError::Compile`] with the driver log and the line-numbered source
    /// if compilation fails.
    pub fn compile(
        gl: &dyn Driver,
        label: &str,
        stage: ShaderStage,
        code: &str,
    ) -> Result<Self, GlError> {
        let handle = gl.create_shader(stage).map_err(GlError::ResourceCreation)?;
        gl.shader_source(handle, code);

        if !gl.compile_shader(handle) {
            let log = gl.shader_info_log(handle);
            gl.delete_shader(handle);
            return Err(GlError::Compile {
                filename: label.to_owned(),
                log,
                numbered_source: numbered_source(code),
            });
        }

        Ok(Self { handle, stage })
    }

    /// Compile a preprocessed source file.
    ///
    /// # Errors
    ///
    /// See [`Shader::compile`].
    pub fn from_source(gl: &dyn Driver, source: &ShaderSource) -> Result<Self, GlError> {
        Self::compile(gl, &source.filename, source.stage, &source.code)
    }

    /// Driver handle.
    #[must_use]
    pub const fn handle(&self) -> ShaderHandle {
        self.handle
    }

    /// Pipeline stage.
    #[must_use]
    pub const fn stage(&self) -> ShaderStage {
        self.stage
    }

    /// Delete the shader object.
    pub fn destroy(self, gl: &dyn Driver) {
        gl.delete_shader(self.handle);
    }
}

/// `code` with every line prefixed by its zero-based number and a tab.
fn numbered_source(code: &str) -> String {
    let mut out = String::with_capacity(code.len() + code.len() / 8);
    for (i, line) in code.split('\n').enumerate() {
        let _ = writeln!(out, "{i}:\t{line}");
    }
    out
}
