use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Persisted program-binary cache settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Program Cache", inline)]
#[serde(default)]
pub struct CacheOptions {
    /// Persist linked program binaries across runs.
    #[schemars(title = "Persist Programs")]
    pub persist: bool,
    /// Organization scope of the settings store.
    #[schemars(skip)]
    pub organization: String,
    /// Application scope of the settings store.
    #[schemars(skip)]
    pub application: String,
    /// Explicit settings file, overriding the organization/application
    /// location in the user config directory.
    #[schemars(title = "Store Path")]
    pub store_path: Option<PathBuf>,
    /// Mix the driver vendor/renderer/version into program hashes so a
    /// driver update invalidates persisted binaries.
    #[schemars(title = "Driver Fingerprint")]
    pub driver_fingerprint: bool,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            persist: true,
            organization: "ngsolve".to_owned(),
            application: "shaders".to_owned(),
            store_path: None,
            driver_fingerprint: true,
        }
    }
}
