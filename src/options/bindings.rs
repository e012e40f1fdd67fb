use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Behavior of uniform and attribute setters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Bindings", inline)]
#[serde(default)]
pub struct BindingOptions {
    /// Silently skip uniform/attribute names the driver does not report
    /// (e.g. optimized out) instead of failing.
    #[schemars(title = "Permissive")]
    pub permissive: bool,
}

impl Default for BindingOptions {
    fn default() -> Self {
        Self { permissive: true }
    }
}
