//! Named diagnostics with host-configured severity.
//!
//! Conventions never log findings directly: they build a [`Diagnostic`] and
//! hand it to a [`Diagnostics`] sink, which decides from its configuration
//! whether the finding is dropped, logged, or turned into an error.

use crate::error::{ConventionError, ConventionResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::{info, warn};

/// A named diagnostic channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticEvent {
    /// A foreign key is covered by a wider key or index, so a dedicated
    /// index for it would be redundant.
    RedundantIndex,
}

impl DiagnosticEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RedundantIndex => "redundant_index",
        }
    }
}

impl fmt::Display for DiagnosticEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happens when a diagnostic is emitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Drop silently. The channel reports as disabled.
    Ignore,
    /// Log through `tracing` and keep going.
    #[default]
    Log,
    /// Fail the current operation with `ConventionError::DiagnosticRaised`.
    Throw,
}

/// A single diagnostic finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub event: DiagnosticEvent,
    /// Name of the entity type the finding is about.
    pub entity_type: String,
    pub message: String,
    /// Structured fields, for hosts that want more than the message.
    pub details: BTreeMap<String, String>,
}

impl Diagnostic {
    pub fn new(
        event: DiagnosticEvent,
        entity_type: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            event,
            entity_type: entity_type.into(),
            message: message.into(),
            details: BTreeMap::new(),
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

/// Per-channel severity configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Severity for channels without an override.
    pub default_severity: Severity,
    pub overrides: HashMap<DiagnosticEvent, Severity>,
}

impl DiagnosticsConfig {
    /// Returns the effective severity for `event`.
    pub fn severity(&self, event: DiagnosticEvent) -> Severity {
        self.overrides
            .get(&event)
            .copied()
            .unwrap_or(self.default_severity)
    }

    pub fn with_severity(mut self, event: DiagnosticEvent, severity: Severity) -> Self {
        self.overrides.insert(event, severity);
        self
    }
}

/// Sink for diagnostics emitted by conventions.
pub trait Diagnostics {
    /// Returns true if emitting `event` would have any effect. Conventions
    /// check this before doing work that only serves the diagnostic.
    fn is_enabled(&self, event: DiagnosticEvent) -> bool;

    /// Emits a diagnostic at its configured severity.
    fn emit(&mut self, diagnostic: Diagnostic) -> ConventionResult<()>;
}

/// Default sink: logs through `tracing` and retains what it logged.
#[derive(Debug, Default)]
pub struct TracingDiagnostics {
    config: DiagnosticsConfig,
    emitted: Vec<Diagnostic>,
}

impl TracingDiagnostics {
    pub fn new(config: DiagnosticsConfig) -> Self {
        Self {
            config,
            emitted: Vec::new(),
        }
    }

    /// Diagnostics emitted at `Log` or `Throw` severity, in emission order.
    pub fn emitted(&self) -> &[Diagnostic] {
        &self.emitted
    }

    pub fn config(&self) -> &DiagnosticsConfig {
        &self.config
    }
}

impl Diagnostics for TracingDiagnostics {
    fn is_enabled(&self, event: DiagnosticEvent) -> bool {
        self.config.severity(event) != Severity::Ignore
    }

    fn emit(&mut self, diagnostic: Diagnostic) -> ConventionResult<()> {
        match self.config.severity(diagnostic.event) {
            Severity::Ignore => Ok(()),
            Severity::Log => {
                info!(
                    event = %diagnostic.event,
                    entity_type = %diagnostic.entity_type,
                    "{}",
                    diagnostic.message
                );
                self.emitted.push(diagnostic);
                Ok(())
            }
            Severity::Throw => {
                warn!(
                    event = %diagnostic.event,
                    entity_type = %diagnostic.entity_type,
                    "{}",
                    diagnostic.message
                );
                let error = ConventionError::DiagnosticRaised {
                    event: diagnostic.event,
                    message: diagnostic.message.clone(),
                };
                self.emitted.push(diagnostic);
                Err(error)
            }
        }
    }
}
