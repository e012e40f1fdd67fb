//! Crate-level error types.

use std::fmt;
use std::path::PathBuf;

use crate::program::UniformType;

/// Errors produced by the feviz-gl crate.
#[derive(Debug)]
pub enum GlError {
    /// Reading a shader, include or settings file failed.
    Io {
        /// File or directory that could not be read or written.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },
    /// Shader file extension does not name a pipeline stage.
    UnknownShaderExtension {
        /// Offending shader file name.
        filename: String,
    },
    /// The driver rejected a shader stage.
    Compile {
        /// Shader file name (or label for inline code).
        filename: String,
        /// Driver info log.
        log: String,
        /// Full preprocessed source, one `N:\t<line>` entry per line.
        numbered_source: String,
    },
    /// Program linking (or loading a program binary) failed.
    Link {
        /// Driver info log.
        log: String,
    },
    /// Program validation failed with a non-benign message.
    Validate {
        /// Driver info log.
        log: String,
    },
    /// Uniform name not active in the program (strict mode only).
    UnknownUniform {
        /// Requested name.
        name: String,
        /// Names the driver reported as active.
        valid: Vec<String>,
    },
    /// Attribute name not active in the program (strict mode only).
    UnknownAttribute {
        /// Requested name.
        name: String,
        /// Names the driver reported as active.
        valid: Vec<String>,
    },
    /// The driver reported a uniform type with no setter.
    UnknownUniformType {
        /// Uniform name.
        name: String,
        /// Raw driver type enumeration.
        gl_type: u32,
    },
    /// The value passed to a uniform does not fit its declared type.
    UniformValueMismatch {
        /// Uniform name.
        name: String,
        /// Declared type of the uniform.
        expected: UniformType,
    },
    /// Creating a driver object failed.
    ResourceCreation(String),
    /// Encoding, decoding or persisting a cached program failed.
    CacheStore(String),
    /// TOML options or settings parsing/serialization failure.
    OptionsParse(String),
}

impl GlError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl fmt::Display for GlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "I/O error on {}: {source}", path.display())
            }
            Self::UnknownShaderExtension { filename } => {
                write!(f, "unknown shader file extension: {filename}")
            }
            Self::Compile {
                filename,
                log,
                numbered_source,
            } => write!(
                f,
                "error when compiling {filename}: {log}\ncompiled code:\n\
                 {numbered_source}"
            ),
            Self::Link { log } => write!(f, "program link failed: {log}"),
            Self::Validate { log } => {
                write!(f, "program validation failed: {log}")
            }
            Self::UnknownUniform { name, valid } => write!(
                f,
                "unknown uniform name {name}, allowed values: {valid:?}"
            ),
            Self::UnknownAttribute { name, valid } => write!(
                f,
                "unknown attribute name {name}, allowed values: {valid:?}"
            ),
            Self::UnknownUniformType { name, gl_type } => write!(
                f,
                "uniform {name} has unknown type {gl_type} (0x{gl_type:x})"
            ),
            Self::UniformValueMismatch { name, expected } => write!(
                f,
                "value for uniform {name} does not match its type {expected:?}"
            ),
            Self::ResourceCreation(msg) => {
                write!(f, "driver object creation failed: {msg}")
            }
            Self::CacheStore(msg) => write!(f, "program cache error: {msg}"),
            Self::OptionsParse(msg) => {
                write!(f, "options parse error: {msg}")
            }
        }
    }
}

impl std::error::Error for GlError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}
