//! Binding-layer configuration with TOML file support.
//!
//! Shader locations, the persisted program cache and setter strictness are
//! consolidated here. Every section uses `#[serde(default)]`, so a file that
//! only overrides `[cache]` is valid.

mod bindings;
mod cache;
mod shaders;

use std::path::Path;

pub use bindings::BindingOptions;
pub use cache::CacheOptions;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
pub use shaders::ShaderOptions;

use crate::error::GlError;

/// Top-level options container.
#[derive(
    Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema,
)]
#[serde(default)]
pub struct Options {
    /// Shader and include directories.
    pub shaders: ShaderOptions,
    /// Persisted program cache.
    pub cache: CacheOptions,
    /// Uniform/attribute setter behavior.
    pub bindings: BindingOptions,
}

impl Options {
    /// Generate JSON Schema describing the options.
    #[must_use]
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(Options)
    }

    /// Load options from a TOML file. Missing fields use defaults.
    ///
    /// # Errors
    ///
    /// [`GlError::Io`] if the file cannot be read,
    /// [`GlError::OptionsParse`] if it is not valid options TOML.
    pub fn load(path: &Path) -> Result<Self, GlError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| GlError::io(path, e))?;
        toml::from_str(&content).map_err(|e| GlError::OptionsParse(e.to_string()))
    }

    /// Save options to a TOML file (pretty-printed).
    ///
    /// # Errors
    ///
    /// [`GlError::OptionsParse`] if serialization fails, [`GlError::Io`] if
    /// the file or its parent directory cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), GlError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| GlError::OptionsParse(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| GlError::io(parent, e))?;
        }
        std::fs::write(path, content).map_err(|e| GlError::io(path, e))
    }
}
