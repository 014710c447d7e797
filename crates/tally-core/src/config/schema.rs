use serde::Deserialize;

use crate::error::{Result, TelemetryError};
use crate::registry::DuplicatePolicy;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TelemetryConfig {
    pub version: u32,

    /// Whether this telemetry session is active.
    #[serde(default = "default_active")]
    pub active: bool,

    #[serde(default)]
    pub duplicate_names: DuplicatePolicy,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            version: 1,
            active: default_active(),
            duplicate_names: DuplicatePolicy::default(),
        }
    }
}

impl TelemetryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(TelemetryError::UnsupportedVersion);
        }
        Ok(())
    }
}

fn default_active() -> bool {
    true
}
