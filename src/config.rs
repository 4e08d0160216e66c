use serde::{Deserialize, Serialize};
use std::{fs::read_to_string, path::Path};

use crate::error::ConduitError;

/// Engine tuning knobs, loadable from a toml file. Every field has a
/// default so partial files are fine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Upper bound on hops per walk. The cycle guard catches revisits; this
    /// backstops pathological inventories that grow without revisiting.
    pub max_hops: usize,
}

impl Default for TraceConfig {
    fn default() -> Self {
        TraceConfig { max_hops: 64 }
    }
}

impl TraceConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConduitError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConduitError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("config file {path:?} not found, using defaults");
            return Ok(TraceConfig::default());
        }
        TraceConfig::from_toml_str(&read_to_string(path)?)
    }

    pub fn to_toml_string(&self) -> Result<String, ConduitError> {
        Ok(toml::to_string(self)?)
    }
}
