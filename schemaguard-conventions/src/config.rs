//! Builder configuration.

use crate::diagnostics::DiagnosticsConfig;
use crate::error::ConventionResult;
use serde::{Deserialize, Serialize};

/// Default limit on nested convention cascades.
pub const DEFAULT_MAX_CASCADE_DEPTH: usize = 64;

/// Configuration for a [`ModelBuilder`](crate::ModelBuilder).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConventionConfig {
    /// How deep a mutation cascade may recurse before it is treated as
    /// runaway and aborted.
    pub max_cascade_depth: usize,
    pub diagnostics: DiagnosticsConfig,
}

impl Default for ConventionConfig {
    fn default() -> Self {
        Self {
            max_cascade_depth: DEFAULT_MAX_CASCADE_DEPTH,
            diagnostics: DiagnosticsConfig::default(),
        }
    }
}

impl ConventionConfig {
    /// Parses a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> ConventionResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
