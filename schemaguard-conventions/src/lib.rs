//! Reactive conventions for SchemaGuard models.
//!
//! - [`ModelBuilder`]: mutates a model and dispatches the resulting events
//! - [`ForeignKeyIndexConvention`]: keeps every foreign key served by an index
//! - [`GenerationStrategyConvention`]: keeps column-generation strategies exclusive
//! - [`report_redundant_indexes`]: flags foreign keys covered by wider structures
//! - [`invariants`]: whole-model consistency checks
//!
//! Conventions are pure: they read the model and return [`Mutation`]s. The
//! builder applies them with `ConfigurationSource::Convention`, so anything
//! configured by annotation or explicitly always wins.

mod builder;
mod config;
mod convention;
mod covering;
mod diagnostics;
mod error;
mod foreign_key_index;
mod generation_strategy;
pub mod invariants;
mod redundancy_audit;

pub use builder::ModelBuilder;
pub use config::{ConventionConfig, DEFAULT_MAX_CASCADE_DEPTH};
pub use convention::{
    Convention, ConventionOutcome, ConventionSet, HaltPolicy, Mutation, MutationResult,
};
pub use covering::{covers, properties_covered};
pub use diagnostics::{
    Diagnostic, DiagnosticEvent, Diagnostics, DiagnosticsConfig, Severity, TracingDiagnostics,
};
pub use error::{ConventionError, ConventionResult};
pub use foreign_key_index::{ForeignKeyIndexConvention, IndexRequest, create_index_if_needed};
pub use generation_strategy::{GenerationStrategyConvention, validate_generation_strategies};
pub use redundancy_audit::report_redundant_indexes;
