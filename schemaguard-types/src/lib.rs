//! Core type definitions for SchemaGuard.
//!
//! This crate defines the small, dependency-free vocabulary shared by the
//! schema model and the conventions that react to it:
//! - Element identifiers for entity types, properties, keys, foreign keys and indexes
//! - [`ConfigurationSource`]: the priority tag that arbitrates conflicting writes
//! - [`GenerationStrategy`]: the three mutually exclusive column-generation annotations
//! - [`ModelEvent`]: one variant per schema mutation, delivered in mutation order

mod event;
mod ids;
mod source;
mod strategy;

pub use event::ModelEvent;
pub use ids::{EntityTypeId, ForeignKeyId, IndexId, KeyId, PropertyId};
pub use source::ConfigurationSource;
pub use strategy::GenerationStrategy;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("unknown configuration source: {0}")]
    UnknownSource(String),

    #[error("unknown generation strategy: {0}")]
    UnknownStrategy(String),
}
