use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Where shader sources and include files live.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Shaders", inline)]
#[serde(default)]
pub struct ShaderOptions {
    /// Directory shader file names are resolved against.
    #[schemars(title = "Shader Directory")]
    pub shader_dir: PathBuf,
    /// Directory scanned for include files (defaults to `shader_dir`).
    #[schemars(title = "Include Directory")]
    pub include_dir: Option<PathBuf>,
    /// Extension (without the dot) marking include files.
    #[schemars(skip)]
    pub include_extension: String,
}

impl Default for ShaderOptions {
    fn default() -> Self {
        Self {
            shader_dir: PathBuf::from("shader"),
            include_dir: None,
            include_extension: "inc".to_owned(),
        }
    }
}
