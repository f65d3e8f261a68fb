//! Error types for the convention layer.

use crate::diagnostics::DiagnosticEvent;
use schemaguard_model::ModelError;
use schemaguard_types::GenerationStrategy;
use thiserror::Error;

/// Result type for convention operations.
pub type ConventionResult<T> = Result<T, ConventionError>;

/// Errors that can occur while building or finalizing a model.
#[derive(Debug, Error)]
pub enum ConventionError {
    /// Structural misuse of the model API.
    #[error("model error: {0}")]
    Model(#[from] ModelError),

    /// More than one column-generation strategy is configured on a property.
    /// The model is unusable until one of them is removed.
    #[error(
        "{second} cannot be set for '{property}' at the same time as {first}; configure only one of them"
    )]
    ConflictingGenerationStrategies {
        property: String,
        first: GenerationStrategy,
        second: GenerationStrategy,
    },

    /// A diagnostic configured with `Severity::Throw` was emitted.
    #[error("diagnostic {event} raised as error: {message}")]
    DiagnosticRaised {
        event: DiagnosticEvent,
        message: String,
    },

    /// A mutation cascade recursed deeper than the configured limit.
    #[error("convention cascade exceeded depth {depth}")]
    CascadeOverflow { depth: usize },

    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}
