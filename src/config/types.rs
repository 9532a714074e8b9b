use serde::{Deserialize, Serialize};

/// Construction-time options for a [`Store`](crate::store::Store).
///
/// Every field has a default so a partial TOML file is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreOptions {
    /// Report state writes made outside the commit path.
    #[serde(default)]
    pub strict: bool,
    /// Notify the attached inspector channel, if any.
    #[serde(default = "default_devtools")]
    pub devtools: bool,
    /// Validate module definitions at registration time (default: on in
    /// debug builds).
    #[serde(default = "default_assertions")]
    pub assertions: bool,
    /// Number of reported conditions kept by the diagnostics log (default: 256).
    #[serde(default = "default_diagnostics_capacity")]
    pub diagnostics_capacity: usize,
}

fn default_devtools() -> bool {
    true
}

fn default_assertions() -> bool {
    cfg!(debug_assertions)
}

fn default_diagnostics_capacity() -> usize {
    256
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            strict: false,
            devtools: default_devtools(),
            assertions: default_assertions(),
            diagnostics_capacity: default_diagnostics_capacity(),
        }
    }
}
