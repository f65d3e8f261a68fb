//! Error types for the schema model.

use schemaguard_types::{EntityTypeId, ForeignKeyId, IndexId, KeyId, PropertyId};
use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised by structural misuse of the model API.
///
/// Configuration-source refusals are not errors: mutators report them by
/// returning `Ok(None)`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("entity type not found: {0}")]
    EntityTypeNotFound(EntityTypeId),

    #[error("property not found: {0}")]
    PropertyNotFound(PropertyId),

    #[error("key not found: {0}")]
    KeyNotFound(KeyId),

    #[error("foreign key not found: {0}")]
    ForeignKeyNotFound(ForeignKeyId),

    #[error("index not found: {0}")]
    IndexNotFound(IndexId),

    /// An entity type or property name is already taken.
    #[error("duplicate name: {0}")]
    DuplicateName(String),

    /// A property is referenced from an entity type that cannot see it.
    #[error("property {property} is not visible on {entity_type}")]
    PropertyNotVisible {
        entity_type: EntityTypeId,
        property: PropertyId,
    },

    #[error("property list must not be empty")]
    EmptyPropertyList,

    /// Foreign key and principal key have a different number of properties.
    #[error("foreign key has {dependent} properties but principal key {principal_key} has {principal}")]
    ArityMismatch {
        principal_key: KeyId,
        dependent: usize,
        principal: usize,
    },

    #[error("setting base type of {entity_type} to {base_type} would create a cycle")]
    InheritanceCycle {
        entity_type: EntityTypeId,
        base_type: EntityTypeId,
    },

    #[error("model is finalized")]
    Finalized,
}
